//! Combined digests over ordered member-file digests.
//!
//! A container's check value is SHA-512 over the UTF-8 concatenation of its
//! files' digests in declaration order. Comparing the value computed from the
//! manifest with the one recorded after a completed pass tells whether an
//! update is available.

use sha2::{Digest, Sha512};

/// Incremental combined digest.
#[derive(Clone, Default)]
pub struct CombinedDigest {
    hasher: Sha512,
}

impl CombinedDigest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one member digest.
    pub fn update(&mut self, check: &str) {
        self.hasher.update(check.to_ascii_lowercase().as_bytes());
    }

    /// Hex value of everything appended so far.
    pub fn hex(&self) -> String {
        format!("{:x}", self.hasher.clone().finalize())
    }
}

/// Combined digest of an ordered list of member digests.
pub fn combined_digest<'a, I>(checks: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut combined = CombinedDigest::new();
    for check in checks {
        combined.update(check);
    }
    combined.hex()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_sha512_of_nothing() {
        assert!(combined_digest(std::iter::empty()).starts_with("cf83e1357eefb8bd"));
    }

    #[test]
    fn test_incremental_matches_batch() {
        let mut combined = CombinedDigest::new();
        combined.update("aa");
        let partial = combined.hex();
        combined.update("bb");

        assert_eq!(partial, combined_digest(["aa"]));
        assert_eq!(combined.hex(), combined_digest(["aa", "bb"]));
    }

    #[test]
    fn test_order_matters() {
        assert_ne!(combined_digest(["aa", "bb"]), combined_digest(["bb", "aa"]));
    }

    #[test]
    fn test_case_is_normalised() {
        assert_eq!(combined_digest(["AB"]), combined_digest(["ab"]));
    }
}
