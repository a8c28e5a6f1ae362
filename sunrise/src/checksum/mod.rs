//! Streaming checksum engine for file verification.
//!
//! Files are hashed in large fixed-size blocks so memory use stays bounded by
//! the block size no matter how large the file is. Verification compares the
//! on-disk size first; a size mismatch never reaches the hasher.
//!
//! The interrupt flag is checked before every block, and an interrupted hash
//! is reported as [`ChecksumError::Interrupted`] rather than as a mismatch.

mod combined;

pub use combined::{combined_digest, CombinedDigest};

use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use md5::Md5;
use sha2::{Digest, Sha256, Sha512};
use thiserror::Error;
use tracing::debug;

use crate::interrupt::Interrupt;
use crate::manifest::{FileSpec, HashAlgorithm};

/// Default hashing block size (32 MiB).
pub const DEFAULT_BLOCK_SIZE: usize = 32 * 1024 * 1024;

/// Result type for checksum operations.
pub type ChecksumResult<T> = Result<T, ChecksumError>;

/// Errors raised while hashing a file.
#[derive(Debug, Error)]
pub enum ChecksumError {
    #[error("failed to read {path}: {source}")]
    ReadFailed { path: PathBuf, source: io::Error },

    #[error("hashing of {path} was interrupted")]
    Interrupted { path: PathBuf },
}

/// How much evidence a verification demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyMode {
    /// Size and digest must match.
    #[default]
    Full,
    /// A size match alone counts as verified. Only for re-verifying an
    /// existing install when the caller explicitly asks for it.
    FastCheck,
}

/// Outcome of verifying one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    Missing,
    SizeMismatch { expected: u64, actual: u64 },
    DigestMismatch { expected: String, actual: String },
    Interrupted,
}

impl VerifyOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

/// What a file is expected to look like on disk.
#[derive(Debug, Clone, Copy)]
pub struct Expectation<'a> {
    pub size: u64,
    pub digest: &'a str,
    pub algo: HashAlgorithm,
}

impl<'a> From<&'a FileSpec> for Expectation<'a> {
    fn from(spec: &'a FileSpec) -> Self {
        Self {
            size: spec.size,
            digest: &spec.check,
            algo: spec.algo,
        }
    }
}

/// Streaming hasher with a configurable block size.
#[derive(Debug)]
pub struct ChecksumEngine {
    block_size: usize,
    digests_computed: AtomicU64,
}

impl Default for ChecksumEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ChecksumEngine {
    /// Create an engine with the default block size.
    pub fn new() -> Self {
        Self::with_block_size(DEFAULT_BLOCK_SIZE)
    }

    /// Create an engine with a custom block size (minimum 1 byte).
    pub fn with_block_size(block_size: usize) -> Self {
        Self {
            block_size: block_size.max(1),
            digests_computed: AtomicU64::new(0),
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of digest computations started by this engine.
    pub fn digests_computed(&self) -> u64 {
        self.digests_computed.load(Ordering::Relaxed)
    }

    /// Compute the lowercase hex digest of a file.
    ///
    /// `progress` receives the cumulative number of bytes hashed after every
    /// block.
    pub fn compute_digest(
        &self,
        path: &Path,
        algo: HashAlgorithm,
        interrupt: &Interrupt,
        progress: &mut dyn FnMut(u64),
    ) -> ChecksumResult<String> {
        let mut file = File::open(path).map_err(|e| read_failed(path, e))?;
        let len = file.metadata().map_err(|e| read_failed(path, e))?.len();

        self.digests_computed.fetch_add(1, Ordering::Relaxed);
        debug!(path = %path.display(), %algo, bytes = len, "Hashing file");

        // Never allocate more than the file needs.
        let capacity = usize::try_from(len)
            .unwrap_or(usize::MAX)
            .clamp(1, self.block_size);
        let mut buffer = vec![0u8; capacity];

        match algo {
            HashAlgorithm::Md5 => {
                stream::<Md5>(&mut file, path, &mut buffer, interrupt, progress)
            }
            HashAlgorithm::Sha256 => {
                stream::<Sha256>(&mut file, path, &mut buffer, interrupt, progress)
            }
            HashAlgorithm::Sha512 => {
                stream::<Sha512>(&mut file, path, &mut buffer, interrupt, progress)
            }
        }
    }

    /// Verify a file against its expected size and digest.
    ///
    /// The size is compared first; only a size match leads to hashing, and
    /// in [`VerifyMode::FastCheck`] not even then.
    pub fn verify(
        &self,
        path: &Path,
        expected: &Expectation<'_>,
        mode: VerifyMode,
        interrupt: &Interrupt,
        progress: &mut dyn FnMut(u64),
    ) -> ChecksumResult<VerifyOutcome> {
        let actual_size = match path.metadata() {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => return Ok(VerifyOutcome::Missing),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(VerifyOutcome::Missing),
            Err(e) => return Err(read_failed(path, e)),
        };

        if actual_size != expected.size {
            debug!(
                path = %path.display(),
                expected = expected.size,
                actual = actual_size,
                "Size mismatch"
            );
            return Ok(VerifyOutcome::SizeMismatch {
                expected: expected.size,
                actual: actual_size,
            });
        }

        if mode == VerifyMode::FastCheck {
            return Ok(VerifyOutcome::Verified);
        }

        let actual = match self.compute_digest(path, expected.algo, interrupt, progress) {
            Ok(digest) => digest,
            Err(ChecksumError::Interrupted { .. }) => return Ok(VerifyOutcome::Interrupted),
            Err(e) => return Err(e),
        };

        if actual.eq_ignore_ascii_case(expected.digest) {
            Ok(VerifyOutcome::Verified)
        } else {
            Ok(VerifyOutcome::DigestMismatch {
                expected: expected.digest.to_ascii_lowercase(),
                actual,
            })
        }
    }
}

/// Calculate the digest of a file without progress or interruption.
pub fn calculate_file_checksum(path: &Path, algo: HashAlgorithm) -> ChecksumResult<String> {
    ChecksumEngine::new().compute_digest(path, algo, &Interrupt::new(), &mut |_| {})
}

fn stream<D: Digest>(
    file: &mut File,
    path: &Path,
    buffer: &mut [u8],
    interrupt: &Interrupt,
    progress: &mut dyn FnMut(u64),
) -> ChecksumResult<String> {
    let mut hasher = D::new();
    let mut hashed = 0u64;

    loop {
        if interrupt.is_set() {
            return Err(ChecksumError::Interrupted {
                path: path.to_path_buf(),
            });
        }

        let bytes_read = file.read(buffer).map_err(|e| read_failed(path, e))?;
        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
        hashed += bytes_read as u64;
        progress(hashed);
    }

    Ok(to_hex(&hasher.finalize()))
}

/// Lowercase hex encoding of digest bytes.
fn to_hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(hex, "{:02x}", byte);
    }
    hex
}

fn read_failed(path: &Path, source: io::Error) -> ChecksumError {
    ChecksumError::ReadFailed {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupt::StopReason;
    use std::fs;
    use tempfile::TempDir;

    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";
    const HELLO_MD5: &str = "5eb63bbbe01eeed093cb22bb8f5acdc3";
    const HELLO_SHA512: &str = "309ecc489c12d6eb4cc40f50c902f2b4d0ed77ee511a7c7a9bcd3ca86d4cd86f989dd35bc5ff499670da34255b45b0cfd830e81f605dcf7dc5542e93ae9cd76f";

    fn write(temp: &TempDir, name: &str, data: &[u8]) -> PathBuf {
        let path = temp.path().join(name);
        fs::write(&path, data).unwrap();
        path
    }

    fn expect(size: u64, digest: &str, algo: HashAlgorithm) -> Expectation<'_> {
        Expectation { size, digest, algo }
    }

    #[test]
    fn test_calculate_file_checksum() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "test.txt", b"hello world");

        assert_eq!(
            calculate_file_checksum(&path, HashAlgorithm::Sha256).unwrap(),
            HELLO_SHA256
        );
        assert_eq!(
            calculate_file_checksum(&path, HashAlgorithm::Md5).unwrap(),
            HELLO_MD5
        );
    }

    #[test]
    fn test_every_algorithm_matches_known_vector() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "test.txt", b"hello world");
        let engine = ChecksumEngine::with_block_size(4);

        for (algo, expected) in [
            (HashAlgorithm::Md5, HELLO_MD5),
            (HashAlgorithm::Sha256, HELLO_SHA256),
            (HashAlgorithm::Sha512, HELLO_SHA512),
        ] {
            let digest = engine
                .compute_digest(&path, algo, &Interrupt::new(), &mut |_| {})
                .unwrap();
            assert_eq!(digest, expected, "{algo}");
            assert_eq!(digest.len(), algo.hex_len());
        }
    }

    #[test]
    fn test_to_hex_pads_bytes() {
        assert_eq!(to_hex(&[0x00, 0x0f, 0xab]), "000fab");
    }

    #[test]
    fn test_calculate_empty_file_sha512() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "empty.txt", b"");

        let checksum = calculate_file_checksum(&path, HashAlgorithm::Sha512).unwrap();

        assert_eq!(
            checksum,
            "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce\
             47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e"
        );
    }

    #[test]
    fn test_calculate_nonexistent_file() {
        let result = calculate_file_checksum(Path::new("/nonexistent/file"), HashAlgorithm::Md5);
        assert!(matches!(result, Err(ChecksumError::ReadFailed { .. })));
    }

    #[test]
    fn test_block_size_does_not_change_digest() {
        let temp = TempDir::new().unwrap();
        let data = vec![0xABu8; 100_000];
        let path = write(&temp, "large.bin", &data);

        let small = ChecksumEngine::with_block_size(7)
            .compute_digest(&path, HashAlgorithm::Sha512, &Interrupt::new(), &mut |_| {})
            .unwrap();
        let large = calculate_file_checksum(&path, HashAlgorithm::Sha512).unwrap();

        assert_eq!(small, large);
    }

    #[test]
    fn test_progress_is_cumulative() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "data.bin", &[1u8; 10]);
        let mut seen = Vec::new();

        ChecksumEngine::with_block_size(4)
            .compute_digest(&path, HashAlgorithm::Md5, &Interrupt::new(), &mut |b| {
                seen.push(b)
            })
            .unwrap();

        assert_eq!(seen.last(), Some(&10));
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_verify_match_is_case_insensitive() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "test.txt", b"hello world");
        let engine = ChecksumEngine::new();
        let upper = HELLO_SHA256.to_ascii_uppercase();

        let outcome = engine
            .verify(
                &path,
                &expect(11, &upper, HashAlgorithm::Sha256),
                VerifyMode::Full,
                &Interrupt::new(),
                &mut |_| {},
            )
            .unwrap();

        assert!(outcome.is_verified());
    }

    #[test]
    fn test_verify_digest_mismatch() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "test.txt", b"hello world");

        let outcome = ChecksumEngine::new()
            .verify(
                &path,
                &expect(11, "wrong", HashAlgorithm::Sha256),
                VerifyMode::Full,
                &Interrupt::new(),
                &mut |_| {},
            )
            .unwrap();

        assert_eq!(
            outcome,
            VerifyOutcome::DigestMismatch {
                expected: "wrong".to_string(),
                actual: HELLO_SHA256.to_string(),
            }
        );
    }

    #[test]
    fn test_verify_size_mismatch_skips_hashing() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "test.txt", b"hello world");
        let engine = ChecksumEngine::new();

        let outcome = engine
            .verify(
                &path,
                &expect(12, HELLO_SHA256, HashAlgorithm::Sha256),
                VerifyMode::Full,
                &Interrupt::new(),
                &mut |_| {},
            )
            .unwrap();

        assert_eq!(
            outcome,
            VerifyOutcome::SizeMismatch {
                expected: 12,
                actual: 11
            }
        );
        assert_eq!(engine.digests_computed(), 0);
    }

    #[test]
    fn test_fast_check_trusts_size() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "test.txt", b"hello world");
        let engine = ChecksumEngine::new();

        let outcome = engine
            .verify(
                &path,
                &expect(11, "not-the-digest", HashAlgorithm::Sha256),
                VerifyMode::FastCheck,
                &Interrupt::new(),
                &mut |_| {},
            )
            .unwrap();

        assert!(outcome.is_verified());
        assert_eq!(engine.digests_computed(), 0);
    }

    #[test]
    fn test_verify_missing_file() {
        let temp = TempDir::new().unwrap();

        let outcome = ChecksumEngine::new()
            .verify(
                &temp.path().join("absent.bin"),
                &expect(1, "00", HashAlgorithm::Md5),
                VerifyMode::Full,
                &Interrupt::new(),
                &mut |_| {},
            )
            .unwrap();

        assert_eq!(outcome, VerifyOutcome::Missing);
    }

    #[test]
    fn test_verify_interrupted_is_distinct() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "test.txt", b"hello world");
        let interrupt = Interrupt::new();
        interrupt.request(StopReason::Pause);

        let outcome = ChecksumEngine::new()
            .verify(
                &path,
                &expect(11, HELLO_SHA256, HashAlgorithm::Sha256),
                VerifyMode::Full,
                &interrupt,
                &mut |_| {},
            )
            .unwrap();

        assert_eq!(outcome, VerifyOutcome::Interrupted);
    }

    #[test]
    fn test_interrupt_mid_stream() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "data.bin", &[0u8; 64]);
        let interrupt = Interrupt::new();
        let trigger = interrupt.clone();
        let mut blocks = 0;

        let result = ChecksumEngine::with_block_size(8).compute_digest(
            &path,
            HashAlgorithm::Sha512,
            &interrupt,
            &mut |_| {
                blocks += 1;
                if blocks == 2 {
                    trigger.request(StopReason::Shutdown);
                }
            },
        );

        assert!(matches!(result, Err(ChecksumError::Interrupted { .. })));
        assert_eq!(blocks, 2);
    }
}
