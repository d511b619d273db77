//! Streaming assembler — buffers live audio and flushes fixed-size chunks.
//!
//! # State machine
//!
//! ```text
//! Idle ──start()──▶ Running ──stop()──▶ Idle
//!                      │
//!                      │ feed(chunk) → bounded queue (fail-fast when full)
//!                      ▼
//!            consumer loop (background task)
//!              append chunk → accumulator
//!              ≥ threshold? → flush: recognize → segments → listener
//! ```
//!
//! `stop()` is cooperative: it clears the running flag, lets the loop finish
//! its current iteration, joins it, then performs one final flush of any
//! residual bytes so no partial audio is silently discarded.
//!
//! Flush order is strictly FIFO relative to feed order — one consumer pulls
//! from one queue and the final flush happens only after the loop has
//! exited.
//!
//! Live audio is rarely byte-identical across sessions, so the assembler
//! talks to the backend directly and skips the recognition cache.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::backend::{AsrBackend, BackendError};
use crate::config::StreamConfig;
use crate::dispatch::RecognitionSink;
use crate::stream::buffer::ChunkBuffer;

// ---------------------------------------------------------------------------
// StreamError
// ---------------------------------------------------------------------------

/// Errors surfaced by [`StreamAssembler::stop`].
///
/// Mid-stream flush failures are logged and do not halt the consumer loop;
/// only the final flush propagates its error, because at that point there is
/// no loop left to carry on.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The final flush failed against the backend.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The consumer task panicked or was aborted.
    #[error("consumer task failed: {0}")]
    Join(String),
}

// ---------------------------------------------------------------------------
// StreamAssembler
// ---------------------------------------------------------------------------

/// Assembles pushed audio chunks into fixed-size buffers for incremental
/// recognition.
///
/// The listener is registered at construction — before `start()` can ever
/// run — and receives [`Segment`](crate::backend::Segment)s on the consumer
/// task, so it must be thread-safe.
pub struct StreamAssembler {
    backend: Arc<dyn AsrBackend>,
    listener: Arc<dyn RecognitionSink>,
    config: StreamConfig,
    buffer: Arc<Mutex<ChunkBuffer>>,
    running: Arc<AtomicBool>,
    tx: Option<mpsc::Sender<Vec<u8>>>,
    task: Option<JoinHandle<()>>,
}

impl StreamAssembler {
    /// Create an idle assembler.
    pub fn new(
        backend: Arc<dyn AsrBackend>,
        listener: Arc<dyn RecognitionSink>,
        config: &StreamConfig,
    ) -> Self {
        Self {
            backend,
            listener,
            config: config.clone(),
            buffer: Arc::new(Mutex::new(ChunkBuffer::new(config.chunk_threshold))),
            running: Arc::new(AtomicBool::new(false)),
            tx: None,
            task: None,
        }
    }

    /// Returns `true` while the consumer loop is active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Bytes currently accumulated towards the next flush.
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.lock().unwrap().len()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Transition Idle → Running: spawn the background consumer loop.
    ///
    /// A no-op when already running.  Restarting after `stop()` is allowed
    /// and begins a fresh session with an empty queue.
    pub fn start(&mut self) {
        if self.running.swap(true, Ordering::SeqCst) {
            log::debug!("stream: start() while already running — ignored");
            return;
        }

        let (tx, rx) = mpsc::channel(self.config.queue_capacity);
        let task = tokio::spawn(consumer_loop(
            rx,
            Arc::clone(&self.running),
            Arc::clone(&self.buffer),
            Arc::clone(&self.backend),
            Arc::clone(&self.listener),
            Duration::from_millis(self.config.poll_interval_ms),
        ));

        self.tx = Some(tx);
        self.task = Some(task);
        log::info!(
            "stream: started (threshold {} bytes, queue {} chunks)",
            self.config.chunk_threshold,
            self.config.queue_capacity
        );
    }

    /// Offer one audio chunk to the assembler.
    ///
    /// Returns `false` — and drops the chunk — when the bounded queue is
    /// full (backpressure) or the assembler is not running.  Never blocks
    /// the capture source.
    pub fn feed(&self, chunk: &[u8]) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        match tx.try_send(chunk.to_vec()) {
            Ok(()) => true,
            Err(_) => {
                log::warn!(
                    "stream: input queue full, dropping {}-byte chunk",
                    chunk.len()
                );
                false
            }
        }
    }

    /// Transition Running → Idle: signal the loop, join it, flush residual.
    ///
    /// Blocks (asynchronously) until the consumer observes the stop flag and
    /// returns, then performs exactly one final flush of whatever bytes
    /// remain below the threshold.  A no-op when already idle.
    ///
    /// # Errors
    ///
    /// Propagates a recognition failure of the final flush; the assembler is
    /// Idle again either way.
    pub async fn stop(&mut self) -> Result<(), StreamError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        // Dropping the sender wakes the loop promptly via `recv() == None`;
        // the poll timeout covers the case where chunks are still queued.
        self.tx = None;

        if let Some(task) = self.task.take() {
            task.await.map_err(|e| StreamError::Join(e.to_string()))?;
        }

        let residual = self.buffer.lock().unwrap().take();
        if residual.is_empty() {
            log::info!("stream: stopped, nothing left to flush");
            return Ok(());
        }

        log::info!("stream: stopped, final flush of {} bytes", residual.len());
        flush(&self.backend, &self.listener, residual).await
    }
}

// ---------------------------------------------------------------------------
// Consumer loop
// ---------------------------------------------------------------------------

/// Pull chunks from the bounded queue until the stop flag clears, flushing
/// every time the accumulator crosses the threshold.
async fn consumer_loop(
    mut rx: mpsc::Receiver<Vec<u8>>,
    running: Arc<AtomicBool>,
    buffer: Arc<Mutex<ChunkBuffer>>,
    backend: Arc<dyn AsrBackend>,
    listener: Arc<dyn RecognitionSink>,
    poll: Duration,
) {
    log::debug!("stream: consumer loop started");

    while running.load(Ordering::SeqCst) {
        match tokio::time::timeout(poll, rx.recv()).await {
            Ok(Some(chunk)) => {
                // Take the buffered bytes inside the lock, flush outside it
                // (the std mutex must not be held across an await).
                let ready = {
                    let mut buf = buffer.lock().unwrap();
                    buf.push(&chunk);
                    buf.is_ready().then(|| buf.take())
                };
                if let Some(bytes) = ready {
                    // A mid-stream failure is the listener's loss for this
                    // chunk only; the loop keeps consuming.
                    if let Err(e) = flush(&backend, &listener, bytes).await {
                        log::warn!("stream: flush failed: {e}");
                    }
                }
            }
            Ok(None) => break,  // producer side dropped — stop in progress
            Err(_) => continue, // poll timeout — re-check the stop flag
        }
    }

    // Move anything still queued into the accumulator so the final flush
    // in stop() loses nothing.
    while let Ok(chunk) = rx.try_recv() {
        buffer.lock().unwrap().push(&chunk);
    }

    log::debug!("stream: consumer loop exiting");
}

/// Hand `bytes` to the backend and emit each parsed segment, in order.
async fn flush(
    backend: &Arc<dyn AsrBackend>,
    listener: &Arc<dyn RecognitionSink>,
    bytes: Vec<u8>,
) -> Result<(), StreamError> {
    log::debug!("stream: flushing {} bytes", bytes.len());
    let payload = backend.recognize(&bytes).await?;
    let segments = backend.parse_segments(&payload)?;
    for segment in &segments {
        listener.on_segment_result(segment);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendKind, Segment};
    use crate::dispatch::RecordingSink;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Semaphore;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Echoes the flushed bytes back as a single segment, so tests can see
    /// exactly what each flush contained and in which order.
    struct EchoBackend {
        calls: AtomicUsize,
    }

    impl EchoBackend {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AsrBackend for EchoBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Bcut
        }

        async fn recognize(&self, audio: &[u8]) -> Result<Value, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "text": String::from_utf8_lossy(audio) }))
        }

        fn parse_segments(&self, payload: &Value) -> Result<Vec<Segment>, BackendError> {
            Ok(vec![Segment::new(
                0,
                0,
                payload["text"].as_str().unwrap_or(""),
            )])
        }
    }

    /// Always fails recognition.
    struct FailBackend {
        calls: AtomicUsize,
    }

    impl FailBackend {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AsrBackend for FailBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Bcut
        }

        async fn recognize(&self, _audio: &[u8]) -> Result<Value, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(BackendError::Rejected("stream refused".into()))
        }

        fn parse_segments(&self, _payload: &Value) -> Result<Vec<Segment>, BackendError> {
            unreachable!("recognize always fails")
        }
    }

    /// Blocks inside `recognize` until the test hands out a permit.
    struct StuckBackend {
        gate: Arc<Semaphore>,
        in_flight: AtomicUsize,
    }

    impl StuckBackend {
        fn new() -> Self {
            Self {
                gate: Arc::new(Semaphore::new(0)),
                in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AsrBackend for StuckBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Bcut
        }

        async fn recognize(&self, _audio: &[u8]) -> Result<Value, BackendError> {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            let permit = self.gate.acquire().await.expect("gate closed");
            permit.forget();
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(json!({ "text": "late" }))
        }

        fn parse_segments(&self, payload: &Value) -> Result<Vec<Segment>, BackendError> {
            Ok(vec![Segment::new(
                0,
                0,
                payload["text"].as_str().unwrap_or(""),
            )])
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn stream_config(threshold: usize, capacity: usize) -> StreamConfig {
        StreamConfig {
            chunk_threshold: threshold,
            queue_capacity: capacity,
            poll_interval_ms: 10,
        }
    }

    async fn wait_for(mut cond: impl FnMut() -> bool) {
        for _ in 0..400 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached within timeout");
    }

    // -----------------------------------------------------------------------
    // Threshold flushes
    // -----------------------------------------------------------------------

    /// Feeding exactly the threshold must trigger exactly one flush with
    /// zero residual bytes.
    #[tokio::test(flavor = "multi_thread")]
    async fn exact_threshold_triggers_exactly_one_flush() {
        let backend = Arc::new(EchoBackend::new());
        let sink = Arc::new(RecordingSink::new());
        let mut assembler = StreamAssembler::new(
            backend.clone(),
            sink.clone(),
            &stream_config(16 * 1024, 100),
        );

        assembler.start();
        // 16 KiB fed as 16 chunks of 1 KiB.
        let chunk = vec![b'x'; 1024];
        for _ in 0..16 {
            assert!(assembler.feed(&chunk));
        }

        wait_for(|| backend.calls() == 1).await;
        wait_for(|| assembler.buffered_bytes() == 0).await;

        assembler.stop().await.unwrap();

        // No residual — stop must not have flushed a second time.
        assert_eq!(backend.calls(), 1);
        let segments = sink.segments();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text.len(), 16 * 1024);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn flushes_preserve_feed_order() {
        let backend = Arc::new(EchoBackend::new());
        let sink = Arc::new(RecordingSink::new());
        let mut assembler =
            StreamAssembler::new(backend.clone(), sink.clone(), &stream_config(4, 100));

        assembler.start();
        assert!(assembler.feed(b"aaaa"));
        assert!(assembler.feed(b"bbbb"));
        assert!(assembler.feed(b"cccc"));

        wait_for(|| sink.segments().len() == 3).await;
        assembler.stop().await.unwrap();

        let texts: Vec<_> = sink.segments().into_iter().map(|s| s.text).collect();
        assert_eq!(texts, vec!["aaaa", "bbbb", "cccc"]);
    }

    // -----------------------------------------------------------------------
    // Stop semantics
    // -----------------------------------------------------------------------

    /// Sub-threshold bytes must come out in exactly one final flush.
    #[tokio::test(flavor = "multi_thread")]
    async fn stop_flushes_residual_below_threshold() {
        let backend = Arc::new(EchoBackend::new());
        let sink = Arc::new(RecordingSink::new());
        let mut assembler = StreamAssembler::new(
            backend.clone(),
            sink.clone(),
            &stream_config(16 * 1024, 100),
        );

        assembler.start();
        assert!(assembler.feed(b"tail bytes"));
        wait_for(|| assembler.buffered_bytes() == 10).await;

        assembler.stop().await.unwrap();

        assert_eq!(backend.calls(), 1);
        let segments = sink.segments();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "tail bytes");
        assert!(!assembler.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_without_any_audio_does_not_flush() {
        let backend = Arc::new(EchoBackend::new());
        let sink = Arc::new(RecordingSink::new());
        let mut assembler =
            StreamAssembler::new(backend.clone(), sink.clone(), &stream_config(1024, 100));

        assembler.start();
        assembler.stop().await.unwrap();

        assert_eq!(backend.calls(), 0);
        assert!(sink.segments().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_when_idle_is_a_no_op() {
        let backend = Arc::new(EchoBackend::new());
        let sink = Arc::new(RecordingSink::new());
        let mut assembler =
            StreamAssembler::new(backend.clone(), sink, &stream_config(1024, 100));

        assembler.stop().await.unwrap();
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn final_flush_error_propagates_to_stop_caller() {
        let backend = Arc::new(FailBackend::new());
        let sink = Arc::new(RecordingSink::new());
        let mut assembler = StreamAssembler::new(
            backend.clone(),
            sink.clone(),
            &stream_config(16 * 1024, 100),
        );

        assembler.start();
        assert!(assembler.feed(b"doomed"));
        wait_for(|| assembler.buffered_bytes() == 6).await;

        let err = assembler.stop().await.unwrap_err();
        assert!(matches!(err, StreamError::Backend(_)));
        assert!(!assembler.is_running());
    }

    /// A failed mid-stream flush must not stop later chunks from flushing.
    #[tokio::test(flavor = "multi_thread")]
    async fn mid_stream_flush_failure_does_not_halt_the_loop() {
        let backend = Arc::new(FailBackend::new());
        let sink = Arc::new(RecordingSink::new());
        let mut assembler =
            StreamAssembler::new(backend.clone(), sink.clone(), &stream_config(4, 100));

        assembler.start();
        assert!(assembler.feed(b"aaaa"));
        wait_for(|| backend.calls() == 1).await;
        assert!(assembler.feed(b"bbbb"));
        wait_for(|| backend.calls() == 2).await;

        // Residual is empty, so stop succeeds even with a failing backend.
        assembler.stop().await.unwrap();
        assert!(sink.segments().is_empty());
    }

    // -----------------------------------------------------------------------
    // Restart
    // -----------------------------------------------------------------------

    #[tokio::test(flavor = "multi_thread")]
    async fn assembler_is_restartable_after_stop() {
        let backend = Arc::new(EchoBackend::new());
        let sink = Arc::new(RecordingSink::new());
        let mut assembler = StreamAssembler::new(
            backend.clone(),
            sink.clone(),
            &stream_config(16 * 1024, 100),
        );

        assembler.start();
        assert!(assembler.feed(b"first session"));
        wait_for(|| assembler.buffered_bytes() > 0).await;
        assembler.stop().await.unwrap();

        assembler.start();
        assert!(assembler.is_running());
        assert!(assembler.feed(b"second session"));
        wait_for(|| assembler.buffered_bytes() > 0).await;
        assembler.stop().await.unwrap();

        let texts: Vec<_> = sink.segments().into_iter().map(|s| s.text).collect();
        assert_eq!(texts, vec!["first session", "second session"]);
    }

    // -----------------------------------------------------------------------
    // Backpressure
    // -----------------------------------------------------------------------

    #[tokio::test(flavor = "multi_thread")]
    async fn feed_before_start_is_rejected() {
        let backend = Arc::new(EchoBackend::new());
        let sink = Arc::new(RecordingSink::new());
        let assembler = StreamAssembler::new(backend, sink, &stream_config(1024, 100));

        assert!(!assembler.feed(b"too early"));
    }

    /// With the consumer stuck inside a flush, the bounded queue fills and
    /// further feeds fail fast instead of blocking.
    #[tokio::test(flavor = "multi_thread")]
    async fn full_queue_rejects_feed_without_blocking() {
        let backend = Arc::new(StuckBackend::new());
        let sink = Arc::new(RecordingSink::new());
        // Threshold 1: the very first chunk triggers a flush that blocks.
        let mut assembler =
            StreamAssembler::new(backend.clone(), sink.clone(), &stream_config(1, 2));

        assembler.start();
        assert!(assembler.feed(b"a")); // consumed, flush now stuck
        wait_for(|| backend.in_flight.load(Ordering::SeqCst) == 1).await;

        assert!(assembler.feed(b"b")); // queued (1/2)
        assert!(assembler.feed(b"c")); // queued (2/2)
        assert!(!assembler.feed(b"d"), "queue full must reject");

        backend.gate.add_permits(16);
        assembler.stop().await.unwrap();
    }
}
