//! Integration tests for the download engine.
//!
//! These tests drive the full flow from a manifest document to files on
//! disk:
//! - manifest → catalog → resolver → downloader
//! - cache persistence across sessions
//! - background host with pause and resume
//!
//! Network access is replaced by an in-memory fetcher.
//!
//! Run with: `cargo test --test download_integration`

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha512};
use tempfile::TempDir;

use sunrise::checksum::ChecksumEngine;
use sunrise::config::DownloaderConfig;
use sunrise::content_map::ContentMap;
use sunrise::downloader::{DownloadEvent, Downloader, DownloaderState, EventLog};
use sunrise::host::DownloadHost;
use sunrise::manifest::{Catalog, ManifestDocument};
use sunrise::resolver::{resolve, InstallTarget, ResolvedContainer};
use sunrise::store::CacheStore;
use sunrise::transfer::MemoryFetcher;

// ============================================================================
// Helper Functions
// ============================================================================

fn sha512(data: &[u8]) -> String {
    format!("{:x}", Sha512::digest(data))
}

const CORE: &[u8] = b"runtime core library";
const SHARED: &[u8] = b"shared engine assets";
const GAME: &[u8] = b"game data pack";
const MOD: &[u8] = b"mod data pack";

/// A manifest with one runtime, two applications sharing content, and a
/// server entry.
fn manifest() -> ManifestDocument {
    let json = format!(
        r#"{{
            "name": "integration",
            "runtimes": [{{
                "id": "engine",
                "name": "Engine",
                "files": [
                    {{"name": "core.dll", "size": {core_len}, "check": "{core}", "algo": "sha512",
                      "urls": ["http://dead/core.dll", "http://cdn/core.dll"]}},
                    {{"name": "assets/shared.pak", "size": {shared_len}, "check": "{shared}", "algo": "sha512",
                      "urls": ["http://cdn/shared.pak"]}}
                ]
            }}],
            "applications": [
                {{
                    "id": "game",
                    "name": "The Game",
                    "runtime": "engine",
                    "files": [
                        {{"name": "game.pak", "size": {game_len}, "check": "{game}", "algo": "sha512",
                          "urls": ["http://cdn/game.pak"]}}
                    ]
                }},
                {{
                    "id": "mod",
                    "name": "A Mod",
                    "runtime": "engine",
                    "standalone": true,
                    "exclusions": ["assets/shared.pak"],
                    "files": [
                        {{"name": "mod.pak", "size": {mod_len}, "check": "{modd}", "algo": "sha512",
                          "urls": ["http://cdn/mod.pak"]}},
                        {{"name": "copy/shared.pak", "size": {shared_len}, "check": "{shared}", "algo": "sha512",
                          "urls": ["http://mirror-only/shared.pak"]}}
                    ]
                }}
            ],
            "servers": [{{"id": "public", "name": "Public", "application": "game"}}]
        }}"#,
        core_len = CORE.len(),
        core = sha512(CORE),
        shared_len = SHARED.len(),
        shared = sha512(SHARED),
        game_len = GAME.len(),
        game = sha512(GAME),
        mod_len = MOD.len(),
        modd = sha512(MOD),
    );
    serde_json::from_str(&json).unwrap()
}

fn fetcher() -> MemoryFetcher {
    MemoryFetcher::new()
        .with_file("http://cdn/core.dll", CORE.to_vec())
        .with_file("http://cdn/shared.pak", SHARED.to_vec())
        .with_file("http://cdn/game.pak", GAME.to_vec())
        .with_file("http://cdn/mod.pak", MOD.to_vec())
        .with_file("http://mirror-only/shared.pak", SHARED.to_vec())
}

struct Env {
    temp: TempDir,
    catalog: Catalog,
    fetcher: Arc<MemoryFetcher>,
    events: Arc<EventLog>,
    store: CacheStore,
}

impl Env {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path().join("cache"));
        Self {
            temp,
            catalog: Catalog::from_document(manifest()),
            fetcher: Arc::new(fetcher()),
            events: Arc::new(EventLog::new()),
            store,
        }
    }

    fn root(&self) -> &Path {
        self.temp.path()
    }

    fn resolve(&self, id: &str) -> Vec<ResolvedContainer> {
        resolve(&self.catalog, &InstallTarget::new(id), &self.root().join("bin")).unwrap()
    }

    /// Run a download session the way the launcher does: load the cache,
    /// run, record check values and save.
    fn install(&self, id: &str) -> DownloaderState {
        let cache = self.store.load().unwrap();
        let map = cache.file_map.shared();
        let mut checks = cache.container_checks;
        checks.refresh_remote(&self.catalog);

        self.events.clear();
        let mut downloader = Downloader::new(
            self.resolve(id),
            Arc::clone(&map),
            self.fetcher.clone(),
            Arc::new(ChecksumEngine::new()),
            self.events.clone(),
        );
        let state = downloader.download();

        for event in self.events.events() {
            if let DownloadEvent::ContainerCompleted {
                container_id,
                digest,
                partial,
            } = event
            {
                checks.record_completed(&container_id, digest, partial);
            }
        }
        self.store.save(&map.lock(), &checks).unwrap();
        state
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_install_application_with_runtime() {
    let env = Env::new();

    assert_eq!(env.install("game"), DownloaderState::Complete);

    // Not standalone: everything lands in the runtime's directory.
    let dir = env.root().join("bin/engine");
    assert_eq!(fs::read(dir.join("core.dll")).unwrap(), CORE);
    assert_eq!(fs::read(dir.join("assets/shared.pak")).unwrap(), SHARED);
    assert_eq!(fs::read(dir.join("game.pak")).unwrap(), GAME);
}

#[test]
fn test_reinstall_is_free() {
    let env = Env::new();
    env.install("game");
    let requests = env.fetcher.requests();

    assert_eq!(env.install("game"), DownloaderState::Complete);
    assert_eq!(env.fetcher.requests(), requests);
}

#[test]
fn test_content_map_survives_restart_and_dedups() {
    let env = Env::new();
    env.install("game");

    // The mod's copy of shared.pak is only declared at an unreachable URL;
    // it must come from the game's install via the persisted map.
    assert_eq!(env.install("mod"), DownloaderState::Complete);

    let copy = env.root().join("bin/mod/copy/shared.pak");
    assert_eq!(fs::read(copy).unwrap(), SHARED);
    assert!(!env
        .fetcher
        .requested_urls()
        .iter()
        .any(|url| url.contains("mirror-only")));

    let cache = env.store.load().unwrap();
    assert_eq!(cache.file_map.lookup(&sha512(SHARED)).len(), 2);
}

#[test]
fn test_exclusions_skip_runtime_files() {
    let env = Env::new();
    assert_eq!(env.install("mod"), DownloaderState::Complete);

    // The mod excludes the runtime's shared.pak and ships its own.
    assert!(!env.root().join("bin/engine/assets/shared.pak").exists());
    assert!(env.root().join("bin/engine/core.dll").exists());
    assert!(env.root().join("bin/mod/mod.pak").exists());
}

#[test]
fn test_server_installs_its_application() {
    let env = Env::new();
    let target = InstallTarget::for_server(&env.catalog, "public").unwrap();

    let containers = resolve(&env.catalog, &target, &env.root().join("bin")).unwrap();

    let ids: Vec<_> = containers.iter().map(|c| c.id()).collect();
    assert_eq!(ids, vec!["engine", "game"]);
}

#[test]
fn test_update_detection() {
    let env = Env::new();
    env.install("game");

    let mut checks = env.store.load().unwrap().container_checks;
    checks.refresh_remote(&env.catalog);
    assert!(checks.is_installed("game"));
    assert!(!checks.update_available("game"));

    // A new manifest changes the game's content.
    let mut document = manifest();
    document.applications[0].files[0].check = sha512(b"game data pack v2");
    let mut catalog = env.catalog.clone();
    catalog.merge(document);
    checks.refresh_remote(&catalog);

    assert!(checks.update_available("game"));
}

#[test]
fn test_runtime_check_after_install_with_exclusions() {
    let env = Env::new();
    assert_eq!(env.install("mod"), DownloaderState::Complete);

    let mut checks = env.store.load().unwrap().container_checks;
    checks.refresh_remote(&env.catalog);

    // The engine was installed without its excluded shared.pak.
    assert!(!checks.is_installed("engine"));
    assert!(!checks.update_available("engine"));
    assert!(checks.is_installed("mod"));
    assert!(!checks.update_available("mod"));
}

#[test]
fn test_full_runtime_install_survives_filtered_pass() {
    let env = Env::new();
    env.install("game");
    env.install("mod");

    let mut checks = env.store.load().unwrap().container_checks;
    checks.refresh_remote(&env.catalog);

    for id in ["engine", "game", "mod"] {
        assert!(checks.is_installed(id), "{id}");
        assert!(!checks.update_available(id), "{id}");
    }
}

#[test]
fn test_deleted_file_is_replaced() {
    let env = Env::new();
    env.install("game");
    fs::remove_file(env.root().join("bin/engine/game.pak")).unwrap();
    let before = env.fetcher.requests();

    assert_eq!(env.install("game"), DownloaderState::Complete);
    assert_eq!(env.fetcher.requests(), before + 1);
}

#[test]
fn test_verify_before_install_is_missing() {
    let env = Env::new();
    let mut downloader = Downloader::new(
        env.resolve("game"),
        ContentMap::new().shared(),
        env.fetcher.clone(),
        Arc::new(ChecksumEngine::new()),
        env.events.clone(),
    );

    assert_eq!(downloader.verify(true), DownloaderState::Missing);
    assert_eq!(
        env.events
            .count(|e| matches!(e, DownloadEvent::FileStarted { .. })),
        0
    );
}

#[test]
fn test_host_download_then_verify() {
    let env = Env::new();
    let map = ContentMap::new().shared();
    let host = DownloadHost::new(
        DownloaderConfig::new().with_block_size(8),
        Arc::clone(&map),
        env.fetcher.clone(),
        env.events.clone(),
    )
    .unwrap();

    let download = host.start_download(env.resolve("game")).unwrap();
    assert!(host.wait_idle(Duration::from_secs(10)));
    assert_eq!(host.last_result(), Some((download, DownloaderState::Complete)));

    let verify = host.start_verify(env.resolve("game"), true).unwrap();
    assert!(host.wait_idle(Duration::from_secs(10)));
    assert_eq!(host.last_result(), Some((verify, DownloaderState::Complete)));

    assert_eq!(map.lock().stats().entries, 3);
    host.shutdown();
}
