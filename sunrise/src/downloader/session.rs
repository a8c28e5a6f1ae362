//! The downloader session: containers → files → acquire → verify.

use std::path::Path;
use std::sync::Arc;

use rand::seq::IndexedRandom;
use tracing::{debug, info, warn};

use super::events::{DownloadEvent, EventSink};
use super::state::{DownloaderState, FileContext};
use crate::checksum::{ChecksumEngine, CombinedDigest, Expectation, VerifyMode, VerifyOutcome};
use crate::content_map::{modified_millis, SharedContentMap};
use crate::interrupt::{Interrupt, StopReason};
use crate::manifest::FileSpec;
use crate::resolver::ResolvedContainer;
use crate::transfer::{FileTransfer, Fetcher, TransferObserver, TransferOutcome};

/// Control surface handed to other threads.
///
/// Only the interrupt flag crosses the thread boundary; the session itself
/// observes it and reports the resulting state.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    interrupt: Interrupt,
}

impl SessionHandle {
    /// Ask the session to stop so it can be resumed later.
    pub fn pause(&self) {
        self.interrupt.request(StopReason::Pause);
    }

    /// Ask the session to stop for good.
    pub fn shutdown(&self) {
        self.interrupt.request(StopReason::Shutdown);
    }

    pub fn is_stopped(&self) -> bool {
        self.interrupt.is_set()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Download,
    Verify { full: bool },
}

/// How one file ended.
enum FileResult {
    Done,
    Interrupted,
    DownloadFailed,
    VerificationFailed,
}

/// Why the container loop stopped early.
enum Halt {
    Interrupted,
    Failed(DownloaderState, FileContext),
}

/// Forwards transfer notifications as session events.
struct EventObserver<'a> {
    events: &'a dyn EventSink,
}

impl TransferObserver for EventObserver<'_> {
    fn started(&mut self, expected_size: u64, display_name: &str) {
        self.events.emit(DownloadEvent::FileStarted {
            expected_size,
            display_name: display_name.to_string(),
        });
    }

    fn progressed(&mut self, bytes: u64) {
        self.events.emit(DownloadEvent::FileProgress { bytes });
    }
}

/// One download or verify session over a resolved container list.
///
/// A session processes one file at a time. Pausing stops it at the next
/// check point; resuming means starting a new session over the same
/// containers, which picks up verified files through the content map.
pub struct Downloader {
    containers: Vec<ResolvedContainer>,
    content_map: SharedContentMap,
    fetcher: Arc<dyn Fetcher>,
    checksum: Arc<ChecksumEngine>,
    events: Arc<dyn EventSink>,
    interrupt: Interrupt,
    full_verify: bool,
    fast_check: bool,
    state: DownloaderState,
    failure: Option<FileContext>,
}

impl Downloader {
    pub fn new(
        containers: Vec<ResolvedContainer>,
        content_map: SharedContentMap,
        fetcher: Arc<dyn Fetcher>,
        checksum: Arc<ChecksumEngine>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            containers,
            content_map,
            fetcher,
            checksum,
            events,
            interrupt: Interrupt::new(),
            full_verify: false,
            fast_check: false,
            state: DownloaderState::New,
            failure: None,
        }
    }

    /// Hash existing files even when the content map says they are
    /// unchanged.
    pub fn with_full_verify(mut self, full_verify: bool) -> Self {
        self.full_verify = full_verify;
        self
    }

    /// Accept a size match as proof when checking files that already exist.
    ///
    /// Freshly written files are always hashed.
    pub fn with_fast_check(mut self, fast_check: bool) -> Self {
        self.fast_check = fast_check;
        self
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            interrupt: self.interrupt.clone(),
        }
    }

    pub fn state(&self) -> DownloaderState {
        self.state
    }

    /// The file that failed the session, if it failed.
    pub fn failure(&self) -> Option<&FileContext> {
        self.failure.as_ref()
    }

    pub fn containers(&self) -> &[ResolvedContainer] {
        &self.containers
    }

    /// Download every file not already present and verified.
    pub fn download(&mut self) -> DownloaderState {
        self.run(Mode::Download)
    }

    /// Verify an existing install without fetching anything.
    ///
    /// With `full` set every file is hashed; otherwise files the content map
    /// recorded with an unchanged mtime are trusted.
    pub fn verify(&mut self, full: bool) -> DownloaderState {
        self.run(Mode::Verify { full })
    }

    /// Request a pause from the owning thread.
    pub fn pause(&self) {
        self.interrupt.request(StopReason::Pause);
    }

    /// Request a shutdown from the owning thread.
    pub fn shutdown(&self) {
        self.interrupt.request(StopReason::Shutdown);
    }

    fn run(&mut self, mode: Mode) -> DownloaderState {
        self.failure = None;
        if self.state == DownloaderState::Paused && self.interrupt.resume() {
            debug!("Resuming paused session");
        }

        if matches!(mode, Mode::Verify { .. }) {
            if let Some(missing) = self.containers.iter().find(|c| !c.destination.is_dir()) {
                info!(
                    container = %missing.id(),
                    path = %missing.destination.display(),
                    "Install directory missing"
                );
                return self.transition(DownloaderState::Missing, None);
            }
        }

        let working = match mode {
            Mode::Download => DownloaderState::Downloading,
            Mode::Verify { .. } => DownloaderState::Verifying,
        };
        self.transition(working, None);

        match self.process_containers(mode) {
            Ok(()) => self.transition(DownloaderState::Complete, None),
            Err(Halt::Interrupted) => {
                let state = match self.interrupt.reason() {
                    Some(StopReason::Shutdown) => DownloaderState::Shutdown,
                    _ => DownloaderState::Paused,
                };
                self.transition(state, None)
            }
            Err(Halt::Failed(state, context)) => {
                self.failure = Some(context.clone());
                self.transition(state, Some(context))
            }
        }
    }

    fn transition(&mut self, state: DownloaderState, file: Option<FileContext>) -> DownloaderState {
        match &file {
            Some(context) => info!(%state, file = %context, "Session state changed"),
            None => info!(%state, "Session state changed"),
        }
        self.state = state;
        self.events.emit(DownloadEvent::StateChanged { state, file });
        state
    }

    fn process_containers(&self, mode: Mode) -> Result<(), Halt> {
        let mut session_digest = CombinedDigest::new();

        for container in &self.containers {
            if self.interrupt.is_set() {
                return Err(Halt::Interrupted);
            }

            info!(
                container = %container.id(),
                files = container.files.len(),
                destination = %container.destination.display(),
                "Processing container"
            );
            self.events.emit(DownloadEvent::ContainerStarted {
                name: container.name().to_string(),
                file_count: container.files.len(),
            });

            let mirror = match mode {
                Mode::Download => container.mirrors().choose(&mut rand::rng()).cloned(),
                Mode::Verify { .. } => None,
            };

            for (index, file) in container.files.iter().enumerate() {
                if self.interrupt.is_set() {
                    return Err(Halt::Interrupted);
                }

                let path = match container.path_for(file) {
                    Ok(path) => path,
                    Err(e) => {
                        warn!(file = %file.name, error = %e, "Refusing file outside install directory");
                        let state = match mode {
                            Mode::Download => DownloaderState::DownloadFailed,
                            Mode::Verify { .. } => DownloaderState::VerificationFailed,
                        };
                        return Err(self.failed(state, container, file, &container.destination));
                    }
                };
                let result = match mode {
                    Mode::Download => self.download_file(file, &path, mirror.clone()),
                    Mode::Verify { full } => self.verify_file(file, &path, full),
                };

                match result {
                    FileResult::Done => self.complete_file(file, &path, index),
                    FileResult::Interrupted => return Err(Halt::Interrupted),
                    FileResult::DownloadFailed => {
                        return Err(self.failed(DownloaderState::DownloadFailed, container, file, &path))
                    }
                    FileResult::VerificationFailed => {
                        return Err(self.failed(
                            DownloaderState::VerificationFailed,
                            container,
                            file,
                            &path,
                        ))
                    }
                }

                session_digest.update(&file.check);
            }

            let digest = session_digest.hex();
            debug!(container = %container.id(), digest = %digest, "Container complete");
            self.events.emit(DownloadEvent::ContainerCompleted {
                container_id: container.id().to_string(),
                digest,
                partial: container.is_filtered(),
            });
        }

        Ok(())
    }

    /// A failure seen after a stop request is the stop, not a failure.
    fn failed(
        &self,
        state: DownloaderState,
        container: &ResolvedContainer,
        file: &FileSpec,
        path: &Path,
    ) -> Halt {
        if self.interrupt.is_set() {
            debug!(file = %file.name, "Suppressing failure after stop request");
            return Halt::Interrupted;
        }

        Halt::Failed(
            state,
            FileContext {
                container_id: container.id().to_string(),
                file_name: file.name.clone(),
                digest: file.check.clone(),
                path: path.to_path_buf(),
            },
        )
    }

    fn complete_file(&self, file: &FileSpec, path: &Path, index: usize) {
        let mtime = modified_millis(path);
        self.content_map.lock().record(&file.check, path, mtime);

        self.events.emit(DownloadEvent::FileCompleted {
            digest: file.check.clone(),
            path: path.to_path_buf(),
            mtime,
        });
        self.events.emit(DownloadEvent::OverallProgress {
            completed: index + 1,
        });
    }

    fn download_file(&self, file: &FileSpec, path: &Path, mirror: Option<String>) -> FileResult {
        if path.is_file() {
            if !self.full_verify && self.unchanged_since_recorded(file, path) {
                debug!(file = %file.name, "Unchanged since last verification");
                return FileResult::Done;
            }

            let mode = self.existing_file_mode(self.full_verify);
            match self.verify_path(file, path, mode, true) {
                VerifyOutcome::Verified => return FileResult::Done,
                VerifyOutcome::Interrupted => return FileResult::Interrupted,
                outcome => debug!(file = %file.name, ?outcome, "Existing file needs replacing"),
            }
        }

        let transfer =
            FileTransfer::new(file, path, self.interrupt.clone()).with_mirror(mirror);
        let mut observer = EventObserver {
            events: self.events.as_ref(),
        };

        let candidates: Vec<_> = self
            .content_map
            .lock()
            .lookup(&file.check)
            .iter()
            .filter(|entry| entry.path != path)
            .cloned()
            .collect();

        for entry in candidates {
            if self.interrupt.is_set() {
                return FileResult::Interrupted;
            }

            match transfer.copy_from(&entry.path, &mut observer) {
                TransferOutcome::Interrupted => return FileResult::Interrupted,
                TransferOutcome::Completed => {
                    match self.verify_path(file, path, VerifyMode::Full, false) {
                        VerifyOutcome::Verified => {
                            info!(file = %file.name, from = %entry.path.display(), "Reused local copy");
                            return FileResult::Done;
                        }
                        VerifyOutcome::Interrupted => return FileResult::Interrupted,
                        _ => {}
                    }
                }
                TransferOutcome::Failed { .. } => {}
            }

            self.invalidate(file, &entry.path);
        }

        if self.interrupt.is_set() {
            return FileResult::Interrupted;
        }

        match transfer.acquire(self.fetcher.as_ref(), &mut observer) {
            TransferOutcome::Completed => {
                match self.verify_path(file, path, VerifyMode::Full, false) {
                    VerifyOutcome::Verified => FileResult::Done,
                    VerifyOutcome::Interrupted => FileResult::Interrupted,
                    outcome => {
                        warn!(file = %file.name, ?outcome, "Downloaded file failed verification");
                        FileResult::VerificationFailed
                    }
                }
            }
            TransferOutcome::Interrupted => FileResult::Interrupted,
            TransferOutcome::Failed { last_error } => {
                match last_error {
                    Some(e) => warn!(file = %file.name, error = %e, "Download failed"),
                    None => warn!(file = %file.name, "Download failed"),
                }
                FileResult::DownloadFailed
            }
        }
    }

    fn verify_file(&self, file: &FileSpec, path: &Path, full: bool) -> FileResult {
        if !path.is_file() {
            warn!(file = %file.name, path = %path.display(), "File missing");
            return FileResult::VerificationFailed;
        }

        if !full && self.unchanged_since_recorded(file, path) {
            debug!(file = %file.name, "Unchanged since last verification");
            return FileResult::Done;
        }

        match self.verify_path(file, path, self.existing_file_mode(full), true) {
            VerifyOutcome::Verified => FileResult::Done,
            VerifyOutcome::Interrupted => FileResult::Interrupted,
            outcome => {
                warn!(file = %file.name, ?outcome, "Verification failed");
                FileResult::VerificationFailed
            }
        }
    }

    fn existing_file_mode(&self, full: bool) -> VerifyMode {
        if self.fast_check && !full {
            VerifyMode::FastCheck
        } else {
            VerifyMode::Full
        }
    }

    /// The content map holds this exact path with the file's current mtime
    /// and the size still matches.
    fn unchanged_since_recorded(&self, file: &FileSpec, path: &Path) -> bool {
        let size_matches = path.metadata().is_ok_and(|m| m.len() == file.size);
        let mtime = modified_millis(path);

        size_matches && mtime != 0 && self.content_map.lock().is_current(&file.check, path, mtime)
    }

    /// Check `path` against the declaration. With `report` set, the check
    /// is announced as a file of its own and hashing progress is emitted.
    fn verify_path(&self, file: &FileSpec, path: &Path, mode: VerifyMode, report: bool) -> VerifyOutcome {
        if report {
            self.events.emit(DownloadEvent::FileStarted {
                expected_size: file.size,
                display_name: file.display_name().to_string(),
            });
        }

        let events = self.events.as_ref();
        let mut progress = |bytes| {
            if report {
                events.emit(DownloadEvent::FileProgress { bytes });
            }
        };

        let expected = Expectation::from(file);
        match self
            .checksum
            .verify(path, &expected, mode, &self.interrupt, &mut progress)
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(file = %file.name, error = %e, "Could not read file for verification");
                VerifyOutcome::Missing
            }
        }
    }

    /// Prune a content map entry whose copy did not verify.
    fn invalidate(&self, file: &FileSpec, source: &Path) {
        let removed = self.content_map.lock().remove(&file.check, source);
        if removed {
            warn!(
                digest = %file.check,
                path = %source.display(),
                "Content map entry is stale"
            );
            self.events.emit(DownloadEvent::InvalidCacheEntry {
                digest: file.check.clone(),
                path: source.to_path_buf(),
            });
        }
    }
}
