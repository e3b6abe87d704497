use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::constants::MAX_TICKETS_PER_SUBMISSION;

const FRONT_COUNT: usize = 5;
const BACK_COUNT: usize = 2;
const FRONT_MAX: u8 = 35;
const BACK_MAX: u8 = 12;

/// A Super Lotto ticket: five front numbers (1-35) and two back numbers (1-12)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ticket {
    pub front: [u8; FRONT_COUNT],
    pub back: [u8; BACK_COUNT],
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketError {
    #[error("missing '+' between front and back")]
    MissingSeparator,

    #[error("expected 5 front and 2 back numbers")]
    WrongCount,

    #[error("numbers must be two digits")]
    NotANumber,

    #[error("number {0:02} is out of range")]
    OutOfRange(u8),

    #[error("number {0:02} appears twice")]
    Duplicate(u8),
}

/// Parse a run of two-digit numbers, each within 1..=max and distinct
fn parse_zone<const N: usize>(part: &str, max: u8) -> Result<[u8; N], TicketError> {
    let bytes = part.as_bytes();
    if bytes.len() != N * 2 {
        return Err(TicketError::WrongCount);
    }
    if !bytes.iter().all(u8::is_ascii_digit) {
        return Err(TicketError::NotANumber);
    }

    let mut numbers = [0u8; N];
    for (i, pair) in bytes.chunks(2).enumerate() {
        let n = (pair[0] - b'0') * 10 + (pair[1] - b'0');
        if n < 1 || n > max {
            return Err(TicketError::OutOfRange(n));
        }
        if numbers[..i].contains(&n) {
            return Err(TicketError::Duplicate(n));
        }
        numbers[i] = n;
    }

    Ok(numbers)
}

impl FromStr for Ticket {
    type Err = TicketError;

    /// Accepts `0102030405+0607` as well as `01 02 03 04 05 + 06 07`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let (front, back) = compact
            .split_once('+')
            .ok_or(TicketError::MissingSeparator)?;

        Ok(Ticket {
            front: parse_zone::<FRONT_COUNT>(front, FRONT_MAX)?,
            back: parse_zone::<BACK_COUNT>(back, BACK_MAX)?,
        })
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let zone = |numbers: &[u8]| {
            numbers
                .iter()
                .map(|n| format!("{:02}", n))
                .collect::<Vec<_>>()
                .join(" ")
        };
        write!(f, "{} + {}", zone(&self.front), zone(&self.back))
    }
}

/// Parse a multi-line submission: 1-5 non-empty lines, each a valid ticket
pub fn parse_tickets(input: &str) -> Result<Vec<Ticket>, TicketError> {
    let lines: Vec<&str> = input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() || lines.len() > MAX_TICKETS_PER_SUBMISSION {
        return Err(TicketError::WrongCount);
    }

    lines.into_iter().map(|line| line.parse::<Ticket>()).collect()
}
