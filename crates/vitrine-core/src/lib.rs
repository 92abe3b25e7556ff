#![forbid(unsafe_code)]

use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub const CRATE_NAME: &str = "vitrine-core";

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Milliseconds since the unix epoch. Clock drift before 1970 collapses to 0.
#[must_use]
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| {
            u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
        })
        .unwrap_or(0)
}

/// Short stable token derived from arbitrary input, used for identifiers
/// and object-key uniqueness suffixes.
#[must_use]
pub fn short_digest(input: &str) -> String {
    let full = sha256_hex(input.as_bytes());
    full[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_matches_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn short_digest_is_stable_and_short() {
        let a = short_digest("p-1/front/0");
        let b = short_digest("p-1/front/0");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn unix_millis_is_monotonic_enough() {
        let a = unix_millis();
        let b = unix_millis();
        assert!(b >= a);
        assert!(a > 1_600_000_000_000);
    }
}
