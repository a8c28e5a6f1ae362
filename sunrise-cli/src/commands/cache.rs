//! Cache management CLI commands.

use clap::Subcommand;
use sunrise::config::format_size;

use crate::error::CliError;
use crate::runner::{CliRunner, GlobalOptions};

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show content map statistics
    Stats,
    /// Remove content map entries whose files no longer exist
    Prune,
}

/// Run a cache subcommand.
pub fn run(options: &GlobalOptions, action: CacheAction) -> Result<(), CliError> {
    let runner = CliRunner::new(options)?;
    let store = runner.store();
    let mut cache = runner.load_cache()?;

    match action {
        CacheAction::Stats => {
            let stats = cache.file_map.stats();
            let size = std::fs::metadata(store.path()).map(|m| m.len()).unwrap_or(0);

            println!("Cache file: {}", store.path().display());
            println!("  Digests:   {}", stats.digests);
            println!("  Locations: {}", stats.entries);
            println!("  Size:      {}", format_size(size));
            Ok(())
        }
        CacheAction::Prune => {
            let removed = cache.file_map.prune_missing();
            store.save(&cache.file_map, &cache.container_checks)?;
            println!("Removed {} stale location(s)", removed);
            Ok(())
        }
    }
}
