//! Job dispatcher — bounded-concurrency routing of files to backends.
//!
//! # Flow
//!
//! ```text
//! submit(path, backend, format)
//!   └─▶ reject if path already tracked (busy)
//!       insert Pending job, append to FIFO queue, drain_queue()
//!
//! drain_queue()                 (iterative, under the state lock)
//!   └─▶ while running < limit && queue non-empty:
//!         pop head → Running → spawn worker task
//!
//! worker
//!   └─▶ read file → cache lookup ──hit──▶ payload
//!                         └──miss──▶ backend.recognize() → cache store
//!       parse segments → join text
//!       completion: remove from table, notify sink, drain_queue()
//! ```
//!
//! The chained `drain_queue()` on every completion is what keeps the pool
//! saturated — there is no dedicated scheduler thread.  Admission is FIFO;
//! completion order is whatever the backends' latencies make it.
//!
//! Blocking work (file reads, the cache's read-merge-write cycle) is pushed
//! onto `tokio::task::spawn_blocking` so the async runtime never stalls.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::Notify;

use crate::backend::{AsrBackend, BackendError, BackendKind, Transcript};
use crate::cache::{CacheKey, RecognitionCache};
use crate::config::DispatcherConfig;
use crate::dispatch::job::{Job, JobState, OutputFormat};
use crate::dispatch::sink::RecognitionSink;

/// Audio container formats accepted for submission.  Anything else fails
/// the job immediately as an input error (no transcoding in the core).
pub const SUPPORTED_SOUND_FORMATS: &[&str] = &["flac", "m4a", "mp3", "wav"];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned synchronously by [`JobDispatcher::submit`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A job for this path is already tracked (pending or running).
    #[error("{} is already queued or running", .0.display())]
    Busy(PathBuf),

    /// No backend of the requested kind was registered.
    #[error("no backend registered for {0}")]
    UnknownBackend(BackendKind),
}

/// Errors that terminate a single job.  Surfaced to the sink as a
/// human-readable message; never retried.
#[derive(Debug, Error)]
pub enum JobError {
    /// The file extension is not in [`SUPPORTED_SOUND_FORMATS`].
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// The file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backend call or response parsing failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Unexpected runtime failure (e.g. a blocking task panicked).
    #[error("internal error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// JobDispatcher
// ---------------------------------------------------------------------------

struct DispatchState {
    /// Per-path tracking table.  A path is "tracked" from submission until
    /// completion or cancellation.
    jobs: HashMap<PathBuf, Job>,
    /// FIFO queue of pending job identities.
    queue: VecDeque<PathBuf>,
    /// Number of jobs currently in flight.
    running: usize,
}

struct DispatcherInner {
    state: Mutex<DispatchState>,
    backends: HashMap<BackendKind, Arc<dyn AsrBackend>>,
    cache: Arc<RecognitionCache>,
    sink: Arc<dyn RecognitionSink>,
    limit: usize,
    /// Signalled on every completion or cancellation so `wait_idle` can
    /// re-check the tracking table.
    idle: Notify,
}

/// Routes submitted files through the cache to a recognition backend, with
/// a hard cap on concurrently running jobs.
///
/// Cheap to clone (`Arc` internally); all methods take `&self`.  Must be
/// used from within a tokio runtime — workers are spawned as tasks.
#[derive(Clone)]
pub struct JobDispatcher {
    inner: Arc<DispatcherInner>,
}

impl JobDispatcher {
    /// Create a dispatcher over the given backends.
    ///
    /// `backends` are indexed by their [`BackendKind`]; registering two
    /// backends of the same kind keeps the last one.  The concurrency limit
    /// comes from `config.max_concurrent_jobs` (floored at 1).
    pub fn new(
        backends: Vec<Arc<dyn AsrBackend>>,
        cache: Arc<RecognitionCache>,
        sink: Arc<dyn RecognitionSink>,
        config: &DispatcherConfig,
    ) -> Self {
        let backends = backends.into_iter().map(|b| (b.kind(), b)).collect();
        Self {
            inner: Arc::new(DispatcherInner {
                state: Mutex::new(DispatchState {
                    jobs: HashMap::new(),
                    queue: VecDeque::new(),
                    running: 0,
                }),
                backends,
                cache,
                sink,
                limit: config.max_concurrent_jobs.max(1),
                idle: Notify::new(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Enqueue a recognition job for `path`.
    ///
    /// Returns immediately — completion is reported through the sink.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::Busy`] when a job for this path is already
    ///   tracked.  Paths that finished (Done or Failed) are no longer
    ///   tracked and may be re-submitted freely.
    /// - [`DispatchError::UnknownBackend`] when no backend of `backend`
    ///   kind was registered.
    pub fn submit(
        &self,
        path: impl Into<PathBuf>,
        backend: BackendKind,
        format: OutputFormat,
    ) -> Result<(), DispatchError> {
        let path = path.into();

        if !self.inner.backends.contains_key(&backend) {
            return Err(DispatchError::UnknownBackend(backend));
        }

        {
            let mut state = self.inner.state.lock().unwrap();
            if state.jobs.contains_key(&path) {
                return Err(DispatchError::Busy(path));
            }
            state
                .jobs
                .insert(path.clone(), Job::new(path.clone(), backend, format));
            state.queue.push_back(path.clone());
        }

        log::info!("dispatch: queued {} for {backend}", path.display());
        self.drain_queue();
        Ok(())
    }

    /// Discard tracking state for `path`.  Returns `true` when a job was
    /// removed.
    ///
    /// A pending job is removed from the queue and never starts.  A running
    /// job cannot be aborted mid-flight — the worker runs to completion, but
    /// its result is ignored (the sink is not notified).
    pub fn cancel(&self, path: &Path) -> bool {
        let removed = {
            let mut state = self.inner.state.lock().unwrap();
            match state.jobs.remove(path) {
                Some(job) => {
                    if job.state == JobState::Pending {
                        state.queue.retain(|p| p != path);
                    }
                    true
                }
                None => false,
            }
        };
        if removed {
            log::info!("dispatch: cancelled {}", path.display());
            self.inner.idle.notify_waiters();
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Queue admission
    // -----------------------------------------------------------------------

    /// Start queued jobs until the concurrency limit is reached or the queue
    /// is empty.
    ///
    /// Idempotent and safe to invoke at any time; every completion ends by
    /// calling it again, which is the sole mechanism that advances the
    /// queue.  Runs as an iterative loop under the state lock — no
    /// recursion.
    pub fn drain_queue(&self) {
        let mut state = self.inner.state.lock().unwrap();
        while state.running < self.inner.limit {
            let Some(path) = state.queue.pop_front() else {
                break;
            };
            let Some(job) = state.jobs.get_mut(&path) else {
                // Cancelled while still queued.
                log::debug!("dispatch: skipping cancelled {}", path.display());
                continue;
            };
            let kind = job.backend;
            job.state = JobState::Running;

            let Some(backend) = self.inner.backends.get(&kind).cloned() else {
                // submit() validates the kind, so this cannot normally happen.
                log::error!("dispatch: no backend for {kind}, dropping {}", path.display());
                state.jobs.remove(&path);
                continue;
            };

            state.running += 1;
            log::debug!(
                "dispatch: {} -> Running ({}/{} slots)",
                path.display(),
                state.running,
                self.inner.limit
            );

            let dispatcher = self.clone();
            tokio::spawn(async move {
                dispatcher.run_job(path, backend).await;
            });
        }
    }

    // -----------------------------------------------------------------------
    // Worker
    // -----------------------------------------------------------------------

    /// Process one job to completion, then free the slot and re-drain.
    async fn run_job(self, path: PathBuf, backend: Arc<dyn AsrBackend>) {
        let outcome = self.execute(&path, &backend).await;

        // Transition to the terminal state and drop the tracking entry in
        // one critical section; a cancelled job is simply no longer there.
        let finished = {
            let mut state = self.inner.state.lock().unwrap();
            state.running -= 1;
            state.jobs.remove(&path).map(|mut job| {
                job.state = if outcome.is_ok() {
                    JobState::Done
                } else {
                    JobState::Failed
                };
                job
            })
        };

        match (&finished, &outcome) {
            (Some(_), Ok(text)) => {
                log::info!("dispatch: finished {}", path.display());
                self.inner.sink.on_job_finished(&path, text);
            }
            (Some(_), Err(e)) => {
                log::error!("dispatch: {} failed: {e}", path.display());
                self.inner.sink.on_job_failed(&path, &e.to_string());
            }
            (None, _) => {
                log::debug!(
                    "dispatch: {} was cancelled mid-flight, result ignored",
                    path.display()
                );
            }
        }

        self.inner.idle.notify_waiters();
        self.drain_queue();
    }

    /// The job body: read → cache lookup → recognize on miss → parse.
    async fn execute(
        &self,
        path: &Path,
        backend: &Arc<dyn AsrBackend>,
    ) -> Result<String, JobError> {
        let audio = {
            let path = path.to_path_buf();
            tokio::task::spawn_blocking(move || read_audio(&path))
                .await
                .map_err(|e| JobError::Internal(e.to_string()))??
        };

        let key = CacheKey::for_audio(backend.kind(), &audio);

        let cached = {
            let cache = Arc::clone(&self.inner.cache);
            tokio::task::spawn_blocking(move || cache.lookup(&key))
                .await
                .map_err(|e| JobError::Internal(e.to_string()))?
        };

        let payload = match cached {
            Some(payload) => {
                log::info!("dispatch: cache hit for {} ({key})", path.display());
                payload
            }
            None => {
                let payload = backend.recognize(&audio).await?;
                let cache = Arc::clone(&self.inner.cache);
                let stored = payload.clone();
                // store() logs and swallows I/O errors; a failed cache write
                // must not fail the job that produced the result.
                if let Err(e) =
                    tokio::task::spawn_blocking(move || cache.store(&key, &stored)).await
                {
                    log::warn!("dispatch: cache store task failed: {e}");
                }
                payload
            }
        };

        let segments = backend.parse_segments(&payload)?;
        Ok(Transcript::new(segments).text())
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// Current state of the job tracked for `path`, if any.
    pub fn job_state(&self, path: &Path) -> Option<JobState> {
        self.inner
            .state
            .lock()
            .unwrap()
            .jobs
            .get(path)
            .map(|j| j.state)
    }

    /// Number of tracked jobs (pending + running).
    pub fn tracked_jobs(&self) -> usize {
        self.inner.state.lock().unwrap().jobs.len()
    }

    /// Number of jobs currently in flight.
    pub fn running_jobs(&self) -> usize {
        self.inner.state.lock().unwrap().running
    }

    /// Wait until no job is tracked any more.
    ///
    /// Intended for callers (CLI, tests) that submitted a batch and want to
    /// block until every sink notification has fired.  The submitting path
    /// itself never needs this — `submit` returns immediately.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // Register interest before checking, so a completion that lands
            // between the check and the await is not missed.
            notified.as_mut().enable();
            if self.inner.state.lock().unwrap().jobs.is_empty() {
                return;
            }
            notified.await;
        }
    }
}

// ---------------------------------------------------------------------------
// Input validation
// ---------------------------------------------------------------------------

/// Validate the extension and read the file's bytes.
fn read_audio(path: &Path) -> Result<Vec<u8>, JobError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if !SUPPORTED_SOUND_FORMATS.contains(&ext.as_str()) {
        return Err(JobError::UnsupportedFormat(if ext.is_empty() {
            path.display().to_string()
        } else {
            ext
        }));
    }

    std::fs::read(path).map_err(|source| JobError::Read {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
