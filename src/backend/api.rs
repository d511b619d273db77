//! Core recognition backend trait and error types.
//!
//! # Overview
//!
//! [`AsrBackend`] is the single capability the rest of the crate consumes.
//! It is object-safe and `Send + Sync` so it can be held behind an
//! `Arc<dyn AsrBackend>` and called from any worker task.
//!
//! Two production implementations exist — [`BcutBackend`] and
//! [`JianYingBackend`] — differing in endpoint and wire protocol but not in
//! capability.  The dispatcher and the streaming assembler are polymorphic
//! over the trait and special-case neither.
//!
//! [`MockBackend`] (available under `#[cfg(test)]`) returns a pre-configured
//! response without any network I/O — useful for unit-testing the dispatcher
//! and assembler.
//!
//! [`BcutBackend`]: crate::backend::BcutBackend
//! [`JianYingBackend`]: crate::backend::JianYingBackend

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::backend::transcript::Segment;

// ---------------------------------------------------------------------------
// BackendKind
// ---------------------------------------------------------------------------

/// Identifies which remote recognition service a job should be sent to.
///
/// The string form (`"bcut"` / `"jianying"`) doubles as the backend
/// discriminator inside cache keys, so renaming a variant invalidates all
/// cached responses for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Bcut recognition service.
    Bcut,
    /// JianYing recognition service.
    JianYing,
}

impl BackendKind {
    /// Stable identifier used in cache keys and log messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Bcut => "bcut",
            BackendKind::JianYing => "jianying",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bcut" => Ok(BackendKind::Bcut),
            "jianying" => Ok(BackendKind::JianYing),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// BackendError
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to a recognition service.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("recognition request timed out")]
    Timeout,

    /// The server answered with a non-success HTTP status.
    #[error("server returned HTTP {0}")]
    Status(u16),

    /// The provider rejected the request at the application level
    /// (non-zero result code inside a 2xx response).
    #[error("provider rejected request: {0}")]
    Rejected(String),

    /// The response body could not be parsed as the expected JSON shape.
    #[error("failed to parse provider response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else {
            BackendError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// AsrBackend trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface to a remote recognition service.
///
/// # Contract
///
/// - [`recognize`](Self::recognize) takes the exact audio bytes as submitted
///   (no transcoding happens inside the core) and returns the raw provider
///   response.  The response is treated as opaque by everything except
///   [`parse_segments`](Self::parse_segments) — this is what allows the
///   cache to store it verbatim and replay it later.
/// - [`parse_segments`](Self::parse_segments) must be a pure function of the
///   payload: parsing a cached response must yield the same segments as
///   parsing a fresh one.
#[async_trait]
pub trait AsrBackend: Send + Sync {
    /// Which service this backend talks to.
    fn kind(&self) -> BackendKind;

    /// Submit `audio` for recognition and return the raw provider response.
    async fn recognize(&self, audio: &[u8]) -> Result<Value, BackendError>;

    /// Extract time-aligned segments from a (possibly cached) provider
    /// response.
    fn parse_segments(&self, payload: &Value) -> Result<Vec<Segment>, BackendError>;
}

// Compile-time assertion: Box<dyn AsrBackend> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn AsrBackend>) {}
};

// ---------------------------------------------------------------------------
// MockBackend (test only)
// ---------------------------------------------------------------------------

/// Test double that returns a canned response without network I/O.
///
/// `parse_segments` expects the payload shape `{"text": "..."}` and yields a
/// single zero-length segment carrying that text.
#[cfg(test)]
pub struct MockBackend {
    kind: BackendKind,
    response: Result<Value, String>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockBackend {
    /// A mock that always succeeds with `{"text": text}`.
    pub fn ok(text: &str) -> Self {
        Self {
            kind: BackendKind::Bcut,
            response: Ok(serde_json::json!({ "text": text })),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// A mock that always fails with a `Rejected` error.
    pub fn failing(message: &str) -> Self {
        Self {
            kind: BackendKind::Bcut,
            response: Err(message.to_string()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Number of times `recognize` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl AsrBackend for MockBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn recognize(&self, _audio: &[u8]) -> Result<Value, BackendError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match &self.response {
            Ok(v) => Ok(v.clone()),
            Err(msg) => Err(BackendError::Rejected(msg.clone())),
        }
    }

    fn parse_segments(&self, payload: &Value) -> Result<Vec<Segment>, BackendError> {
        let text = payload["text"]
            .as_str()
            .ok_or_else(|| BackendError::Parse("missing text field".into()))?;
        Ok(vec![Segment::new(0, 0, text)])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
