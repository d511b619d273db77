//! Job dispatcher module — bounded-concurrency file recognition.
//!
//! This module provides:
//! * [`JobDispatcher`] — FIFO admission, hard concurrency cap, cache-first
//!   routing to a recognition backend.
//! * [`Job`] / [`JobState`] / [`OutputFormat`] — the tracked job model.
//! * [`RecognitionSink`] — one-way result notifications to the caller.
//! * [`DispatchError`] / [`JobError`] — submission and per-job errors.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use asr_relay::backend::{AsrBackend, BackendKind, BcutBackend, Segment};
//! use asr_relay::cache::RecognitionCache;
//! use asr_relay::config::AppConfig;
//! use asr_relay::dispatch::{JobDispatcher, OutputFormat, RecognitionSink};
//!
//! struct PrintSink;
//! impl RecognitionSink for PrintSink {
//!     fn on_segment_result(&self, segment: &Segment) {
//!         println!("{}", segment.text);
//!     }
//!     fn on_job_finished(&self, path: &std::path::Path, text: &str) {
//!         println!("{}: {text}", path.display());
//!     }
//!     fn on_job_failed(&self, path: &std::path::Path, message: &str) {
//!         eprintln!("{}: {message}", path.display());
//!     }
//! }
//!
//! # async fn example() {
//! let config = AppConfig::load().unwrap();
//! let backend: Arc<dyn AsrBackend> = Arc::new(BcutBackend::from_config(&config.backend));
//! let cache = Arc::new(RecognitionCache::from_config(&config.cache));
//!
//! let dispatcher = JobDispatcher::new(
//!     vec![backend],
//!     cache,
//!     Arc::new(PrintSink),
//!     &config.dispatcher,
//! );
//! dispatcher
//!     .submit("talk.mp3", BackendKind::Bcut, OutputFormat::Srt)
//!     .unwrap();
//! dispatcher.wait_idle().await;
//! # }
//! ```

pub mod dispatcher;
pub mod job;
pub mod sink;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use dispatcher::{DispatchError, JobDispatcher, JobError, SUPPORTED_SOUND_FORMATS};
pub use job::{Job, JobState, OutputFormat};
pub use sink::RecognitionSink;

// test-only re-export so the stream module's tests can reuse the recording
// sink without reaching into `sink::` internals.
#[cfg(test)]
pub use sink::RecordingSink;
