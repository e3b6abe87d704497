pub mod attempt;
pub mod submission;
pub mod ticket;

pub use attempt::{minutes_until, AttemptRecord, ThrottlePolicy, ThrottleStatus};
pub use submission::{SubmissionLedger, SubmissionQuota, SubmissionRecord};
pub use ticket::{parse_tickets, Ticket, TicketError};
