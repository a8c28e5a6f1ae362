//! Downloader session state machine.
//!
//! A [`Downloader`] walks its resolved containers in order and, for every
//! file, takes the cheapest path that ends in a verified copy:
//!
//! 1. the file is already in place and the content map recorded it with the
//!    same mtime (no hashing at all)
//! 2. the file is already in place and verifies
//! 3. a verified copy elsewhere on disk, found through the content map
//! 4. the network, via the container's mirror then the declared URLs
//!
//! Every write is re-verified before the file counts as done. A verified file
//! is recorded in the content map and reported with
//! [`DownloadEvent::FileCompleted`].
//!
//! Pause and shutdown only set the session's interrupt flag. The session
//! notices at its next check point, leaves any partial file where it is and
//! reports [`DownloaderState::Paused`] or [`DownloaderState::Shutdown`]. A
//! failure noticed after the flag was set is reported as the stop, never as
//! a failure.

mod events;
mod session;
mod state;

pub use events::{DownloadEvent, EventLog, EventSink, NullSink};
pub use session::{Downloader, SessionHandle};
pub use state::{DownloaderState, FileContext};
