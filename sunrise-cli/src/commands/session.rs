//! Drives one host session and renders its events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use sunrise::config::DownloaderConfig;
use sunrise::content_map::{ContainerChecks, SharedContentMap};
use sunrise::downloader::{DownloadEvent, DownloaderState};
use sunrise::host::{DownloadHost, HostError};
use sunrise::manifest::Catalog;
use sunrise::resolver::ResolvedContainer;
use sunrise::transfer::HttpFetcher;
use tracing::warn;

use crate::error::CliError;
use crate::progress::ProgressRenderer;
use crate::runner::CliRunner;

/// What the session should do.
#[derive(Debug, Clone, Copy)]
pub enum SessionKind {
    Download,
    Verify { full: bool },
}

/// Run a session to its end, saving the cache as files complete.
///
/// Ctrl+C pauses the session; a paused session is not an error.
pub fn run_session(
    runner: &CliRunner,
    catalog: &Catalog,
    containers: Vec<ResolvedContainer>,
    kind: SessionKind,
    engine: DownloaderConfig,
) -> Result<(), CliError> {
    let cache = runner.load_cache()?;
    let content_map = cache.file_map.shared();
    let mut checks = cache.container_checks;
    checks.refresh_remote(catalog);

    let (tx, rx) = mpsc::channel::<DownloadEvent>();
    let fetcher = Arc::new(HttpFetcher::with_timeout(engine.timeout));
    let host = DownloadHost::new(engine, Arc::clone(&content_map), fetcher, Arc::new(tx))?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })?;

    match kind {
        SessionKind::Download => host.start_download(containers)?,
        SessionKind::Verify { full } => host.start_verify(containers, full)?,
    };

    let mut renderer = ProgressRenderer::new();
    let mut pause_requested = false;

    let outcome = loop {
        if interrupted.load(Ordering::SeqCst) && !pause_requested {
            println!();
            println!("Received interrupt, pausing...");
            host.pause();
            pause_requested = true;
        }

        let event = match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break None,
        };
        renderer.handle(&event);

        match event {
            DownloadEvent::FileCompleted { .. } | DownloadEvent::InvalidCacheEntry { .. } => {
                save(runner, &content_map, &checks);
            }
            DownloadEvent::ContainerCompleted {
                container_id,
                digest,
                partial,
            } => {
                checks.record_completed(&container_id, digest, partial);
                save(runner, &content_map, &checks);
            }
            DownloadEvent::StateChanged { state, file } if state.is_finished() => {
                break Some((state, file));
            }
            _ => {}
        }
    };

    host.shutdown();
    renderer.finish();
    runner.store().save(&content_map.lock(), &checks)?;

    match outcome {
        Some((DownloaderState::Complete, _)) => {
            println!("Done.");
            Ok(())
        }
        Some((state, _)) if state.is_interrupted() => {
            println!("Paused. Run the same command again to resume.");
            Ok(())
        }
        Some((state, file)) => Err(CliError::SessionFailed {
            state,
            detail: match file {
                Some(context) => context.to_string(),
                None => "install directory not found, run install first".to_string(),
            },
        }),
        None => Err(HostError::WorkerGone.into()),
    }
}

/// Save mid-session; a failed save is retried at the next event.
fn save(runner: &CliRunner, content_map: &SharedContentMap, checks: &ContainerChecks) {
    if let Err(e) = runner.store().save(&content_map.lock(), checks) {
        warn!(error = %e, "Failed to save cache");
    }
}
