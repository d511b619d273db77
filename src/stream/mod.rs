//! Streaming recognition module.
//!
//! This module provides:
//! * [`StreamAssembler`] — buffers live audio chunks from a capture source
//!   and flushes fixed-size pieces to a backend for incremental recognition.
//! * [`ChunkBuffer`] — the append-only byte accumulator behind it.
//! * [`StreamError`] — errors surfaced by `stop()`.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use asr_relay::backend::{AsrBackend, BcutBackend, Segment};
//! use asr_relay::config::AppConfig;
//! use asr_relay::dispatch::RecognitionSink;
//! use asr_relay::stream::StreamAssembler;
//!
//! struct PrintSink;
//! impl RecognitionSink for PrintSink {
//!     fn on_segment_result(&self, segment: &Segment) {
//!         println!("[{} – {}] {}", segment.start_ms, segment.end_ms, segment.text);
//!     }
//!     fn on_job_finished(&self, _: &std::path::Path, _: &str) {}
//!     fn on_job_failed(&self, _: &std::path::Path, _: &str) {}
//! }
//!
//! # async fn example() {
//! let config = AppConfig::load().unwrap();
//! let backend: Arc<dyn AsrBackend> = Arc::new(BcutBackend::from_config(&config.backend));
//!
//! let mut assembler = StreamAssembler::new(backend, Arc::new(PrintSink), &config.stream);
//! assembler.start();
//!
//! // ... the capture source calls assembler.feed(chunk) on its own thread ...
//!
//! assembler.stop().await.unwrap(); // drains whatever is left
//! # }
//! ```

pub mod assembler;
pub mod buffer;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use assembler::{StreamAssembler, StreamError};
pub use buffer::ChunkBuffer;
