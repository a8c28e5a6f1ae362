//! Terminal rendering of session events.

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use sunrise::config::format_size;
use sunrise::downloader::{DownloadEvent, DownloaderState};

const CONTAINER_TEMPLATE: &str = "{prefix:.bold} [{bar:30.cyan/blue}] {pos}/{len} files";
const FILE_TEMPLATE: &str = "  {msg:30!} [{bar:30}] {bytes}/{total_bytes} ({bytes_per_sec})";

fn style_or_default(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// Two bars: files done in the current container, bytes of the current file.
pub struct ProgressRenderer {
    multi: MultiProgress,
    container: ProgressBar,
    file: ProgressBar,
    files_done: usize,
    cache_misses: usize,
    current_bytes: u64,
    bytes_processed: u64,
}

impl ProgressRenderer {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// Renderer that draws nowhere.
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let multi = MultiProgress::with_draw_target(target);
        let container = multi.add(ProgressBar::new(0));
        container.set_style(style_or_default(CONTAINER_TEMPLATE));
        let file = multi.add(ProgressBar::new(0));
        file.set_style(style_or_default(FILE_TEMPLATE));

        Self {
            multi,
            container,
            file,
            files_done: 0,
            cache_misses: 0,
            current_bytes: 0,
            bytes_processed: 0,
        }
    }

    /// Update the bars for one event.
    pub fn handle(&mut self, event: &DownloadEvent) {
        match event {
            DownloadEvent::StateChanged { state, file } => {
                let line = match file {
                    Some(context) => format!("{}: {}", state, context),
                    None => state.to_string(),
                };
                let line = match state {
                    DownloaderState::Complete => style(line).green().to_string(),
                    s if s.is_failure() => style(line).red().bold().to_string(),
                    s if s.is_interrupted() => style(line).yellow().to_string(),
                    _ => style(line).dim().to_string(),
                };
                let _ = self.multi.println(line);
            }
            DownloadEvent::ContainerStarted { name, file_count } => {
                self.container.set_prefix(name.clone());
                self.container.set_length(*file_count as u64);
                self.container.set_position(0);
            }
            DownloadEvent::OverallProgress { completed } => {
                self.container.set_position(*completed as u64);
            }
            DownloadEvent::FileStarted {
                expected_size,
                display_name,
            } => {
                self.file.set_message(display_name.clone());
                self.file.set_length(*expected_size);
                self.file.set_position(0);
                self.file.reset_eta();
            }
            DownloadEvent::FileProgress { bytes } => {
                self.current_bytes = *bytes;
                self.file.set_position(*bytes);
            }
            DownloadEvent::FileCompleted { .. } => {
                self.files_done += 1;
                self.bytes_processed += std::mem::take(&mut self.current_bytes);
            }
            DownloadEvent::ContainerCompleted { .. } => {}
            DownloadEvent::InvalidCacheEntry { path, .. } => {
                self.cache_misses += 1;
                let _ = self.multi.println(
                    style(format!("Stale local copy ignored: {}", path.display()))
                        .yellow()
                        .to_string(),
                );
            }
        }
    }

    pub fn files_done(&self) -> usize {
        self.files_done
    }

    pub fn cache_misses(&self) -> usize {
        self.cache_misses
    }

    /// Remove the bars and print a one-line summary.
    pub fn finish(&self) {
        self.file.finish_and_clear();
        self.container.finish_and_clear();
        println!(
            "{} file(s) done, {} read or written",
            self.files_done,
            format_size(self.bytes_processed)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_counts_completions_and_stale_entries() {
        let mut renderer = ProgressRenderer::hidden();
        renderer.handle(&DownloadEvent::ContainerStarted {
            name: "Game".into(),
            file_count: 2,
        });
        renderer.handle(&DownloadEvent::FileStarted {
            expected_size: 10,
            display_name: "a.bin".into(),
        });
        renderer.handle(&DownloadEvent::FileProgress { bytes: 10 });
        renderer.handle(&DownloadEvent::FileCompleted {
            digest: "00".into(),
            path: PathBuf::from("/a.bin"),
            mtime: 0,
        });
        renderer.handle(&DownloadEvent::InvalidCacheEntry {
            digest: "00".into(),
            path: PathBuf::from("/old.bin"),
        });
        renderer.handle(&DownloadEvent::OverallProgress { completed: 1 });

        assert_eq!(renderer.files_done(), 1);
        assert_eq!(renderer.cache_misses(), 1);
        assert_eq!(renderer.container.position(), 1);
        assert_eq!(renderer.file.position(), 10);
        assert_eq!(renderer.bytes_processed, 10);
    }
}
