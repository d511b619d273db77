//! asr-relay — remote speech-recognition job coordination.
//!
//! The crate routes media files to remote recognition services with a hard
//! cap on concurrent in-flight jobs, deduplicates identical inputs through a
//! persisted content-hash cache, and assembles live audio streams into
//! fixed-size chunks for incremental recognition.
//!
//! # Modules
//!
//! * [`backend`]  — the `AsrBackend` capability and the Bcut / JianYing
//!   clients behind it.
//! * [`cache`]    — CRC32-keyed, file-backed response cache.
//! * [`dispatch`] — FIFO work queue, bounded worker pool, result sink.
//! * [`stream`]   — streaming assembler for live capture sources.
//! * [`config`]   — settings structs, defaults and TOML persistence.
//!
//! # Overview
//!
//! ```text
//!   files ──▶ JobDispatcher ──▶ RecognitionCache ──miss──▶ AsrBackend
//!                │                     │ hit                   │
//!                │                     ▼                       ▼
//!                │               stored payload ◀──store── response
//!                │                     │
//!                └────────▶ sink ◀── parse segments ◀──────────┘
//!
//!   capture ──feed──▶ StreamAssembler ──16 KiB──▶ AsrBackend ──▶ sink
//! ```
//!
//! The dispatcher and the assembler share nothing; both speak to a backend
//! through the same [`backend::AsrBackend`] trait and report through the
//! same [`dispatch::RecognitionSink`] trait.

pub mod backend;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod stream;
