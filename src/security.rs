use chrono::{SecondsFormat, Utc};
use md5::Md5;
use sha2::{Digest, Sha256};

use crate::constants::ACCESS_CODE_LEN;

// =============================================================================
// Access Codes
// =============================================================================

/// Generate a fresh daily access code
///
/// The ISO timestamp, wall-clock milliseconds and a random draw are joined
/// and hashed with MD5; the first eight hex characters are the code.
///
/// # Returns
/// * An 8-character lowercase hex string
pub fn generate_access_code() -> String {
    let now = Utc::now();
    let seed = format!(
        "{}-{}-{}",
        now.to_rfc3339_opts(SecondsFormat::Millis, true),
        now.timestamp_millis(),
        rand::random::<f64>()
    );

    let mut digest = md5_hex(&seed);
    digest.truncate(ACCESS_CODE_LEN);
    digest
}

/// MD5 digest of `input` as lowercase hex
pub fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

/// Check that a code has the shape produced by `generate_access_code`
pub fn is_access_code(code: &str) -> bool {
    code.len() == ACCESS_CODE_LEN && code.chars().all(|c| c.is_ascii_alphanumeric())
}

// =============================================================================
// Admin Credentials
// =============================================================================

/// Obfuscated path segment the admin routes are mounted under
///
/// `admin_path = MD5(admin_key)`
pub fn admin_panel_path(admin_key: &str) -> String {
    md5_hex(admin_key)
}

/// Compare a presented admin key against the configured one
///
/// Both sides are hashed first so the comparison runs over fixed-length
/// digests and does not short-circuit on the first differing byte.
pub fn verify_admin_key(presented: &str, expected: &str) -> bool {
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(expected.as_bytes());

    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// =============================================================================
// Client Fingerprints
// =============================================================================

/// Peppered fingerprint of a client identifier, safe to log or return
///
/// `fingerprint = "client_" + SHA256(identifier + pepper)[..16]`
pub fn client_fingerprint(identifier: &str, pepper: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identifier.as_bytes());
    hasher.update(pepper.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("client_{}", &digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_access_code_shape() {
        let code = generate_access_code();

        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(is_access_code(&code));
    }

    #[test]
    fn test_generate_access_code_varies() {
        let a = generate_access_code();
        let b = generate_access_code();

        // Random draw differs even within the same millisecond
        assert_ne!(a, b);
    }

    #[test]
    fn test_md5_hex_known_value() {
        assert_eq!(md5_hex(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_admin_panel_path_is_md5() {
        let path = admin_panel_path("abc");
        assert_eq!(path, "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_verify_admin_key() {
        assert!(verify_admin_key("s3cret", "s3cret"));
        assert!(!verify_admin_key("s3cret ", "s3cret"));
        assert!(!verify_admin_key("", "s3cret"));
    }

    #[test]
    fn test_is_access_code() {
        assert!(is_access_code("a1b2c3d4"));
        assert!(!is_access_code("a1b2c3d"));
        assert!(!is_access_code("a1b2c3d4e"));
        assert!(!is_access_code("a1b2-3d4"));
    }

    #[test]
    fn test_client_fingerprint() {
        let a = client_fingerprint("1.2.3.4", "pepper");
        let b = client_fingerprint("1.2.3.4", "pepper");
        let c = client_fingerprint("1.2.3.4", "other");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("client_"));
        assert_eq!(a.len(), "client_".len() + 16);
        assert!(!a.contains("1.2.3.4"));
    }
}
