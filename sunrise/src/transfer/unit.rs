//! Single-file transfer with mirror pre-attempt and round-robin fallback.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use rand::Rng;
use tracing::{debug, info, warn};

use super::error::{TransferError, TransferResult};
use super::fetcher::Fetcher;
use crate::interrupt::Interrupt;
use crate::manifest::FileSpec;

/// Buffer size for reading/writing during transfers (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Receives start and progress notifications for one transfer.
pub trait TransferObserver {
    /// A source answered; `expected_size` is its declared length, or the
    /// declared file size when the source gave none.
    fn started(&mut self, expected_size: u64, display_name: &str);

    /// Cumulative bytes written for the current attempt.
    fn progressed(&mut self, bytes: u64);
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TransferObserver for NoopObserver {
    fn started(&mut self, _expected_size: u64, _display_name: &str) {}
    fn progressed(&mut self, _bytes: u64) {}
}

/// Outcome of acquiring a file.
#[derive(Debug)]
pub enum TransferOutcome {
    /// Bytes are fully written; not yet digest-verified.
    Completed,
    /// Every source was tried and none delivered.
    Failed { last_error: Option<TransferError> },
    /// The interrupt flag tripped; any partial file is left in place.
    Interrupted,
}

impl TransferOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

enum Attempt {
    Completed,
    Interrupted,
}

/// Indices `0..len` rotated to begin at `start`.
///
/// Each index is visited exactly once.
pub fn candidate_order(len: usize, start: usize) -> impl Iterator<Item = usize> {
    let start = if len == 0 { 0 } else { start % len };
    (0..len).map(move |offset| (start + offset) % len)
}

/// URL of a file under a mirror base.
pub fn mirror_url(base: &str, name: &str) -> String {
    let name = name.replace('\\', "/");
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        name.trim_start_matches('/')
    )
}

/// Transfer of one declared file to one destination.
#[derive(Debug)]
pub struct FileTransfer<'a> {
    spec: &'a FileSpec,
    destination: PathBuf,
    mirror: Option<String>,
    interrupt: Interrupt,
}

impl<'a> FileTransfer<'a> {
    /// Create a transfer writing `spec` to `destination`.
    pub fn new(spec: &'a FileSpec, destination: impl Into<PathBuf>, interrupt: Interrupt) -> Self {
        Self {
            spec,
            destination: destination.into(),
            mirror: None,
            interrupt,
        }
    }

    /// Try this mirror base once before the declared URLs.
    pub fn with_mirror(mut self, mirror: Option<String>) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn spec(&self) -> &FileSpec {
        self.spec
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Acquire the file over the network, starting at a random URL.
    pub fn acquire(
        &self,
        fetcher: &dyn Fetcher,
        observer: &mut dyn TransferObserver,
    ) -> TransferOutcome {
        let start = if self.spec.urls.is_empty() {
            0
        } else {
            rand::rng().random_range(0..self.spec.urls.len())
        };
        self.acquire_from(start, fetcher, observer)
    }

    /// Acquire the file, beginning the round-robin at `start`.
    ///
    /// The mirror, when set, gets a single attempt outside the URL budget.
    pub fn acquire_from(
        &self,
        start: usize,
        fetcher: &dyn Fetcher,
        observer: &mut dyn TransferObserver,
    ) -> TransferOutcome {
        let mut last_error = None;

        if let Some(base) = &self.mirror {
            if self.interrupt.is_set() {
                return TransferOutcome::Interrupted;
            }
            let url = mirror_url(base, &self.spec.name);
            match self.attempt(&url, fetcher, observer) {
                Ok(Attempt::Completed) => return TransferOutcome::Completed,
                Ok(Attempt::Interrupted) => return TransferOutcome::Interrupted,
                Err(e) => {
                    warn!(url = %url, error = %e, "Mirror attempt failed");
                    last_error = Some(e);
                }
            }
        }

        for index in candidate_order(self.spec.urls.len(), start) {
            if self.interrupt.is_set() {
                return TransferOutcome::Interrupted;
            }

            let url = &self.spec.urls[index];
            match self.attempt(url, fetcher, observer) {
                Ok(Attempt::Completed) => return TransferOutcome::Completed,
                Ok(Attempt::Interrupted) => return TransferOutcome::Interrupted,
                Err(e) => {
                    warn!(url = %url, error = %e, "Download attempt failed");
                    last_error = Some(e);
                }
            }
        }

        if self.spec.urls.is_empty() && last_error.is_none() {
            last_error = Some(TransferError::NoSources {
                name: self.spec.name.clone(),
            });
        }

        warn!(file = %self.spec.name, "Ran out of sources");
        TransferOutcome::Failed { last_error }
    }

    /// Satisfy the file by copying a local file believed to hold the same
    /// content. The caller re-verifies the copy.
    pub fn copy_from(&self, source: &Path, observer: &mut dyn TransferObserver) -> TransferOutcome {
        if self.interrupt.is_set() {
            return TransferOutcome::Interrupted;
        }

        info!(
            from = %source.display(),
            to = %self.destination.display(),
            "Copying from local content"
        );

        let result = File::open(source)
            .and_then(|file| Ok((file.metadata()?.len(), file)))
            .map_err(|e| TransferError::CopyFailed {
                path: source.to_path_buf(),
                source: e,
            })
            .and_then(|(len, file)| {
                observer.started(len, self.spec.display_name());
                self.write_stream(file, &source.display().to_string(), observer)
            });

        match result {
            Ok(Attempt::Completed) => TransferOutcome::Completed,
            Ok(Attempt::Interrupted) => TransferOutcome::Interrupted,
            Err(e) => {
                warn!(from = %source.display(), error = %e, "Local copy failed");
                TransferOutcome::Failed {
                    last_error: Some(e),
                }
            }
        }
    }

    fn attempt(
        &self,
        url: &str,
        fetcher: &dyn Fetcher,
        observer: &mut dyn TransferObserver,
    ) -> TransferResult<Attempt> {
        debug!(url = %url, dest = %self.destination.display(), "Starting URL download");

        let response = fetcher.fetch(url)?;
        let expected = response.content_length.unwrap_or(self.spec.size);
        observer.started(expected, self.spec.display_name());

        let written = match self.write_stream(response.body, url, observer)? {
            Attempt::Interrupted => return Ok(Attempt::Interrupted),
            Attempt::Completed => file_len(&self.destination)?,
        };

        if let Some(declared) = response.content_length {
            if written != declared {
                return Err(TransferError::Truncated {
                    url: url.to_string(),
                    expected: declared,
                    actual: written,
                });
            }
        }

        Ok(Attempt::Completed)
    }

    /// Stream `reader` into the destination, checking the interrupt before
    /// every chunk write.
    fn write_stream(
        &self,
        mut reader: impl Read,
        origin: &str,
        observer: &mut dyn TransferObserver,
    ) -> TransferResult<Attempt> {
        let file = self.create_destination()?;
        let mut writer = BufWriter::new(file);
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut written = 0u64;

        loop {
            let bytes_read = match reader.read(&mut buffer) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(TransferError::Read {
                        url: origin.to_string(),
                        source: e,
                    })
                }
            };

            if bytes_read == 0 {
                break;
            }

            if self.interrupt.is_set() {
                self.flush(&mut writer)?;
                debug!(dest = %self.destination.display(), written, "Transfer interrupted");
                return Ok(Attempt::Interrupted);
            }

            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|e| self.write_failed(e))?;

            written += bytes_read as u64;
            observer.progressed(written);
        }

        self.flush(&mut writer)?;
        Ok(Attempt::Completed)
    }

    fn create_destination(&self) -> TransferResult<File> {
        if let Some(parent) = self.destination.parent() {
            fs::create_dir_all(parent).map_err(|e| TransferError::CreateDirFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        File::create(&self.destination).map_err(|e| self.write_failed(e))
    }

    fn flush(&self, writer: &mut BufWriter<File>) -> TransferResult<()> {
        writer.flush().map_err(|e| self.write_failed(e))
    }

    fn write_failed(&self, source: io::Error) -> TransferError {
        TransferError::WriteFailed {
            path: self.destination.clone(),
            source,
        }
    }
}

fn file_len(path: &Path) -> TransferResult<u64> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| TransferError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}
