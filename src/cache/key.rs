//! Cache key derivation — backend discriminator + content checksum.
//!
//! A key identifies one recognition request by *what* was recognised
//! (CRC32 of the exact audio bytes) and *who* recognised it (the backend
//! discriminator).  Two files with identical bytes produce the same key no
//! matter what they are named or where they live; the same bytes sent to a
//! different backend produce a different key.
//!
//! The checksum covers the audio bytes **as submitted** — re-encoding a file
//! to different bytes (even acoustically identical ones) yields a new key.
//!
//! # Example
//!
//! ```rust
//! use asr_relay::backend::BackendKind;
//! use asr_relay::cache::CacheKey;
//!
//! let key = CacheKey::for_audio(BackendKind::Bcut, b"123456789");
//! assert_eq!(key.to_string(), "bcut-cbf43926");
//! ```

use std::fmt;

use crate::backend::BackendKind;

// ---------------------------------------------------------------------------
// CacheKey
// ---------------------------------------------------------------------------

/// Deduplication key for one (backend, audio content) pair.
///
/// The string form — used as the field name inside the persisted store —
/// is `<backend>-<8-hex-digit-checksum>`, e.g. `bcut-cbf43926`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    backend: BackendKind,
    checksum: u32,
}

impl CacheKey {
    /// Derive the key for `audio` processed by `backend`.
    pub fn for_audio(backend: BackendKind, audio: &[u8]) -> Self {
        Self {
            backend,
            checksum: crc32fast::hash(audio),
        }
    }

    /// The backend this key belongs to.
    pub fn backend(&self) -> BackendKind {
        self.backend
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:08x}", self.backend.as_str(), self.checksum)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
