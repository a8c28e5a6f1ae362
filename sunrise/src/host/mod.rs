//! Background execution host.
//!
//! One long-lived worker thread runs at most one [`Downloader`] session at a
//! time. Callers submit download or verify requests from any thread; the host
//! serializes them:
//!
//! ```text
//! caller ── start_download ─┐
//!                           ├─► shutdown active session, wait (bounded)
//!                           └─► job channel ─► worker ─► Downloader::run
//!                                                  │
//!                                                  └─► active slot cleared,
//!                                                      waiters notified
//! ```
//!
//! Pause requests only touch the active session's interrupt flag.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::checksum::ChecksumEngine;
use crate::config::DownloaderConfig;
use crate::content_map::SharedContentMap;
use crate::downloader::{Downloader, DownloaderState, EventSink, SessionHandle};
use crate::resolver::ResolvedContainer;
use crate::transfer::Fetcher;

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;

/// Errors raised by the host.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to spawn download worker: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("previous session {session} did not stop within {waited:?}")]
    Busy { session: u64, waited: Duration },

    #[error("download worker has stopped")]
    WorkerGone,
}

/// Identifier of a submitted session.
pub type SessionId = u64;

enum Job {
    Download {
        id: SessionId,
        downloader: Downloader,
    },
    Verify {
        id: SessionId,
        downloader: Downloader,
        full: bool,
    },
}

#[derive(Default)]
struct Slot {
    active: Option<(SessionId, SessionHandle)>,
    last: Option<(SessionId, DownloaderState)>,
    next_id: SessionId,
}

/// Slot shared with the worker plus the condvar that signals it emptied.
struct Shared {
    slot: Mutex<Slot>,
    idle: Condvar,
}

/// Owns the worker thread and the services every session shares.
pub struct DownloadHost {
    shared: Arc<Shared>,
    jobs: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
    content_map: SharedContentMap,
    fetcher: Arc<dyn Fetcher>,
    checksum: Arc<ChecksumEngine>,
    events: Arc<dyn EventSink>,
    config: DownloaderConfig,
}

impl DownloadHost {
    /// Spawn the worker thread.
    pub fn new(
        config: DownloaderConfig,
        content_map: SharedContentMap,
        fetcher: Arc<dyn Fetcher>,
        events: Arc<dyn EventSink>,
    ) -> HostResult<Self> {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot::default()),
            idle: Condvar::new(),
        });

        let (tx, rx) = mpsc::channel();
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("sunrise-download".to_string())
            .spawn(move || worker_loop(rx, worker_shared))
            .map_err(HostError::SpawnFailed)?;

        let checksum = Arc::new(ChecksumEngine::with_block_size(config.block_size));

        Ok(Self {
            shared,
            jobs: Some(tx),
            worker: Some(worker),
            content_map,
            fetcher,
            checksum,
            events,
            config,
        })
    }

    pub fn checksum(&self) -> &Arc<ChecksumEngine> {
        &self.checksum
    }

    /// Start a download session, superseding any active one.
    pub fn start_download(&self, containers: Vec<ResolvedContainer>) -> HostResult<SessionId> {
        self.submit(containers, |id, downloader| Job::Download { id, downloader })
    }

    /// Start a verify session, superseding any active one.
    pub fn start_verify(
        &self,
        containers: Vec<ResolvedContainer>,
        full: bool,
    ) -> HostResult<SessionId> {
        self.submit(containers, move |id, downloader| Job::Verify {
            id,
            downloader,
            full,
        })
    }

    fn submit(
        &self,
        containers: Vec<ResolvedContainer>,
        job: impl FnOnce(SessionId, Downloader) -> Job,
    ) -> HostResult<SessionId> {
        let jobs = self.jobs.as_ref().ok_or(HostError::WorkerGone)?;

        let mut slot = self.shared.slot.lock();
        if let Some((previous, handle)) = &slot.active {
            info!(session = previous, "Stopping active session before starting a new one");
            handle.shutdown();
        }

        let deadline = Instant::now() + self.config.shutdown_wait;
        while let Some((previous, _)) = slot.active {
            if self.shared.idle.wait_until(&mut slot, deadline).timed_out() && slot.active.is_some() {
                warn!(session = previous, "Active session did not stop in time");
                return Err(HostError::Busy {
                    session: previous,
                    waited: self.config.shutdown_wait,
                });
            }
        }

        slot.next_id += 1;
        let id = slot.next_id;

        let downloader = Downloader::new(
            containers,
            Arc::clone(&self.content_map),
            Arc::clone(&self.fetcher),
            Arc::clone(&self.checksum),
            Arc::clone(&self.events),
        )
        .with_full_verify(self.config.full_verify)
        .with_fast_check(self.config.fast_check);

        slot.active = Some((id, downloader.handle()));
        jobs.send(job(id, downloader)).map_err(|_| {
            slot.active = None;
            HostError::WorkerGone
        })?;

        debug!(session = id, "Session submitted");
        Ok(id)
    }

    /// Pause the active session, if any. Returns true if one was running.
    pub fn pause(&self) -> bool {
        self.stop_active(SessionHandle::pause)
    }

    /// Shut the active session down, if any. Returns true if one was running.
    pub fn stop(&self) -> bool {
        self.stop_active(SessionHandle::shutdown)
    }

    fn stop_active(&self, request: fn(&SessionHandle)) -> bool {
        match &self.shared.slot.lock().active {
            Some((_, handle)) => {
                request(handle);
                true
            }
            None => false,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.shared.slot.lock().active.is_some()
    }

    /// Final state of the most recently finished session.
    pub fn last_result(&self) -> Option<(SessionId, DownloaderState)> {
        self.shared.slot.lock().last
    }

    /// Block until no session is active. Returns false on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.slot.lock();
        while slot.active.is_some() {
            if self.shared.idle.wait_until(&mut slot, deadline).timed_out() {
                return slot.active.is_none();
            }
        }
        true
    }

    /// Stop the active session and join the worker.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.stop();
        // Closing the channel ends the worker loop once the session returns.
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Download worker panicked");
            }
        }
    }
}

impl Drop for DownloadHost {
    fn drop(&mut self) {
        self.close();
    }
}

fn worker_loop(jobs: Receiver<Job>, shared: Arc<Shared>) {
    debug!("Download worker started");

    for job in jobs {
        let (id, state) = match job {
            Job::Download { id, mut downloader } => (id, downloader.download()),
            Job::Verify {
                id,
                mut downloader,
                full,
            } => (id, downloader.verify(full)),
        };

        let mut slot = shared.slot.lock();
        if matches!(slot.active, Some((active, _)) if active == id) {
            slot.active = None;
        }
        slot.last = Some((id, state));
        shared.idle.notify_all();
        debug!(session = id, %state, "Session finished");
    }

    debug!("Download worker stopped");
}
