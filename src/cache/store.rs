//! Persisted recognition cache — a single flat JSON file on disk.
//!
//! The store maps [`CacheKey`] strings to opaque provider responses:
//!
//! ```json
//! {
//!   "bcut-cbf43926": { "code": 0, "data": { … } },
//!   "jianying-0a1b2c3d": { "statuscode": 0, "utterances": [ … ] }
//! }
//! ```
//!
//! # Failure policy
//!
//! Reads fail open: a missing, unreadable or corrupt store behaves as an
//! empty cache and never surfaces an error to the caller.  Writes are logged
//! and swallowed — a failed cache write must not fail the job that produced
//! the result.
//!
//! # Size bound
//!
//! After every write, if the serialized file exceeds the configured ceiling
//! (10 MiB by default) the whole file is deleted.  This is a deliberately
//! crude sweep, not an LRU.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::{Map, Value};

use crate::cache::key::CacheKey;
use crate::config::CacheConfig;

// ---------------------------------------------------------------------------
// RecognitionCache
// ---------------------------------------------------------------------------

/// Thread-safe, file-backed cache of provider responses.
///
/// One exclusive lock per instance covers the full read-merge-write cycle of
/// [`store`](Self::store), so concurrent writers from multiple worker threads
/// cannot lose each other's entries.  Cache writes are rare relative to
/// backend latency, so the coarse lock costs nothing measurable.
///
/// `lookup` and `store` perform synchronous file I/O — call them from a
/// blocking context (the dispatcher uses `tokio::task::spawn_blocking`).
pub struct RecognitionCache {
    path: PathBuf,
    enabled: bool,
    max_bytes: u64,
    lock: Mutex<()>,
}

impl RecognitionCache {
    /// Create a cache persisting to `path`, wiping past `max_bytes`.
    pub fn new(path: PathBuf, enabled: bool, max_bytes: u64) -> Self {
        Self {
            path,
            enabled,
            max_bytes,
            lock: Mutex::new(()),
        }
    }

    /// Build a cache from application config, resolving the default
    /// temp-directory path when none is configured.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.resolved_file(), config.enabled, config.max_bytes)
    }

    /// Path of the backing store file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    // -----------------------------------------------------------------------
    // Lookup / store
    // -----------------------------------------------------------------------

    /// Return the stored payload for `key`, or `None` when caching is
    /// disabled, the key is absent, or the store is unreadable.
    pub fn lookup(&self, key: &CacheKey) -> Option<Value> {
        if !self.enabled {
            return None;
        }

        let _guard = self.lock.lock().unwrap();
        let store = self.read_store();
        let hit = store.get(&key.to_string()).cloned();

        match &hit {
            Some(_) => log::debug!("cache: hit for {key}"),
            None => log::debug!("cache: miss for {key}"),
        }
        hit
    }

    /// Persist `payload` under `key`.
    ///
    /// Performs the full read-merge-write cycle under the instance lock.
    /// I/O errors are logged and swallowed; after a successful write the
    /// size ceiling is enforced by deleting the whole file when exceeded.
    pub fn store(&self, key: &CacheKey, payload: &Value) {
        if !self.enabled {
            return;
        }

        let _guard = self.lock.lock().unwrap();

        let mut store = self.read_store();
        store.insert(key.to_string(), payload.clone());

        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::error!("cache: failed to create {}: {e}", parent.display());
                return;
            }
        }

        let serialized = match serde_json::to_string_pretty(&Value::Object(store)) {
            Ok(s) => s,
            Err(e) => {
                log::error!("cache: failed to serialize store: {e}");
                return;
            }
        };

        if let Err(e) = fs::write(&self.path, &serialized) {
            log::error!("cache: failed to write {}: {e}", self.path.display());
            return;
        }
        log::debug!("cache: stored {key} ({} bytes total)", serialized.len());

        self.sweep_if_oversized(serialized.len() as u64);
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Read and parse the full store.  Any failure yields an empty map.
    ///
    /// Caller must hold the instance lock.
    fn read_store(&self) -> Map<String, Value> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return Map::new(),
        };

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                log::warn!(
                    "cache: {} is not a JSON object, treating as empty",
                    self.path.display()
                );
                Map::new()
            }
            Err(e) => {
                log::warn!(
                    "cache: {} is corrupt ({e}), treating as empty",
                    self.path.display()
                );
                Map::new()
            }
        }
    }

    /// Delete the whole store file once it grows past the ceiling.
    ///
    /// Caller must hold the instance lock.
    fn sweep_if_oversized(&self, written: u64) {
        if written <= self.max_bytes {
            return;
        }
        log::warn!(
            "cache: store grew to {written} bytes (ceiling {}), wiping {}",
            self.max_bytes,
            self.path.display()
        );
        if let Err(e) = fs::remove_file(&self.path) {
            log::error!("cache: failed to remove {}: {e}", self.path.display());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendKind;
    use serde_json::json;
    use std::sync::Arc;

    fn temp_cache(enabled: bool, max_bytes: u64) -> (tempfile::TempDir, RecognitionCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = RecognitionCache::new(dir.path().join("asr_cache.json"), enabled, max_bytes);
        (dir, cache)
    }

    fn key(content: &[u8]) -> CacheKey {
        CacheKey::for_audio(BackendKind::Bcut, content)
    }

    // ---- Round trip --------------------------------------------------------

    #[test]
    fn store_then_lookup_returns_identical_payload() {
        let (_dir, cache) = temp_cache(true, 10 * 1024 * 1024);
        let k = key(b"audio");
        let payload = json!({ "code": 0, "data": { "subtitles": [] } });

        assert!(cache.lookup(&k).is_none());
        cache.store(&k, &payload);
        assert_eq!(cache.lookup(&k), Some(payload));
    }

    #[test]
    fn distinct_keys_coexist() {
        let (_dir, cache) = temp_cache(true, 10 * 1024 * 1024);
        let k1 = key(b"first");
        let k2 = key(b"second");

        cache.store(&k1, &json!({ "n": 1 }));
        cache.store(&k2, &json!({ "n": 2 }));

        assert_eq!(cache.lookup(&k1), Some(json!({ "n": 1 })));
        assert_eq!(cache.lookup(&k2), Some(json!({ "n": 2 })));
    }

    // ---- Fail open ---------------------------------------------------------

    #[test]
    fn corrupt_store_behaves_as_empty() {
        let (_dir, cache) = temp_cache(true, 10 * 1024 * 1024);
        fs::create_dir_all(cache.path().parent().unwrap()).unwrap();
        fs::write(cache.path(), "{ not valid json !").unwrap();

        assert!(cache.lookup(&key(b"audio")).is_none());

        // The next store must recover: overwrite with a valid object.
        cache.store(&key(b"audio"), &json!({ "ok": true }));
        assert_eq!(cache.lookup(&key(b"audio")), Some(json!({ "ok": true })));
    }

    #[test]
    fn non_object_store_behaves_as_empty() {
        let (_dir, cache) = temp_cache(true, 10 * 1024 * 1024);
        fs::write(cache.path(), "[1, 2, 3]").unwrap();
        assert!(cache.lookup(&key(b"audio")).is_none());
    }

    #[test]
    fn missing_file_is_a_miss() {
        let (_dir, cache) = temp_cache(true, 10 * 1024 * 1024);
        assert!(cache.lookup(&key(b"never stored")).is_none());
    }

    // ---- Disabled cache ----------------------------------------------------

    #[test]
    fn disabled_cache_never_hits_and_never_writes() {
        let (_dir, cache) = temp_cache(false, 10 * 1024 * 1024);
        let k = key(b"audio");

        cache.store(&k, &json!({ "code": 0 }));
        assert!(cache.lookup(&k).is_none());
        assert!(!cache.path().exists());
    }

    // ---- Size ceiling ------------------------------------------------------

    #[test]
    fn oversized_store_is_wiped_entirely() {
        // Ceiling of 64 bytes — the first real entry blows past it.
        let (_dir, cache) = temp_cache(true, 64);
        let k = key(b"audio");

        cache.store(&k, &json!({ "data": "x".repeat(200) }));

        assert!(!cache.path().exists());
        assert!(cache.lookup(&k).is_none());
    }

    #[test]
    fn store_under_ceiling_survives() {
        let (_dir, cache) = temp_cache(true, 10 * 1024 * 1024);
        let k = key(b"audio");
        cache.store(&k, &json!({ "small": true }));
        assert!(cache.path().exists());
    }

    // ---- Concurrency -------------------------------------------------------

    /// Two threads storing different keys must not lose either entry —
    /// the read-merge-write cycle is serialized by the instance lock.
    #[test]
    fn concurrent_stores_lose_neither_entry() {
        let (_dir, cache) = temp_cache(true, 10 * 1024 * 1024);
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    let k = CacheKey::for_audio(BackendKind::Bcut, format!("audio {i}").as_bytes());
                    cache.store(&k, &json!({ "i": i }));
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        for i in 0..8 {
            let k = CacheKey::for_audio(BackendKind::Bcut, format!("audio {i}").as_bytes());
            assert_eq!(cache.lookup(&k), Some(json!({ "i": i })), "lost entry {i}");
        }
    }
}
