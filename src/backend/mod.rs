//! Remote recognition backends.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │                AsrBackend (trait)                  │
//! │                                                    │
//! │   ┌──────────────┐        ┌──────────────────┐     │
//! │   │ BcutBackend  │        │ JianYingBackend  │     │
//! │   │ multipart    │        │ raw body + query │     │
//! │   │ {code, data} │        │ {statuscode, …}  │     │
//! │   └──────┬───────┘        └────────┬─────────┘     │
//! │          │       recognize()       │               │
//! │          └───────────┬────────────┘                │
//! │                      ▼                             │
//! │             raw provider response                  │
//! │                      │ parse_segments()            │
//! │                      ▼                             │
//! │             Vec<Segment> → Transcript              │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! Both variants conform to the single [`AsrBackend`] capability; callers
//! hold an `Arc<dyn AsrBackend>` and never a concrete type.

pub mod api;
pub mod bcut;
pub mod jianying;
pub mod transcript;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use api::{AsrBackend, BackendError, BackendKind};
pub use bcut::BcutBackend;
pub use jianying::JianYingBackend;
pub use transcript::{Segment, Transcript};

// test-only re-export so other modules' test code can import MockBackend
// without `use asr_relay::backend::api::MockBackend`.
#[cfg(test)]
pub use api::MockBackend;
