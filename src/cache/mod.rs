//! Recognition cache — content-hash deduplication of backend calls.
//!
//! This module provides:
//! * [`CacheKey`] — backend discriminator + CRC32 content checksum.
//! * [`RecognitionCache`] — file-backed store with fail-open reads and a
//!   crude whole-file size sweep.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use asr_relay::backend::BackendKind;
//! use asr_relay::cache::{CacheKey, RecognitionCache};
//! use asr_relay::config::CacheConfig;
//!
//! let cache = RecognitionCache::from_config(&CacheConfig::default());
//! let audio = std::fs::read("clip.mp3").unwrap();
//! let key = CacheKey::for_audio(BackendKind::Bcut, &audio);
//!
//! if let Some(payload) = cache.lookup(&key) {
//!     // replay the cached provider response
//!     let _ = payload;
//! }
//! ```

pub mod key;
pub mod store;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use key::CacheKey;
pub use store::RecognitionCache;
