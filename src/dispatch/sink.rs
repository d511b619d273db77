//! Result sink — one-way notifications to the UI collaborator.
//!
//! Implementations receive calls on worker tasks or the assembler's consumer
//! loop, never on any particular "main" thread.  An implementation that
//! touches shared state must therefore be thread-safe itself (marshal to a
//! UI thread externally if needed).  Notifications are fire-and-forget: the
//! core does not wait for, or act on, anything the sink does.

use std::path::Path;

use crate::backend::Segment;

// ---------------------------------------------------------------------------
// RecognitionSink trait
// ---------------------------------------------------------------------------

/// Receiver of recognition results and failures.
pub trait RecognitionSink: Send + Sync {
    /// One time-aligned segment produced by a streaming flush.
    ///
    /// Called in flush order (FIFO relative to `feed` order).
    fn on_segment_result(&self, segment: &Segment);

    /// A file job finished successfully with the joined transcript text.
    fn on_job_finished(&self, path: &Path, text: &str);

    /// A file job failed terminally; `message` is human-readable.
    fn on_job_failed(&self, path: &Path, message: &str);
}

// ---------------------------------------------------------------------------
// RecordingSink (test only)
// ---------------------------------------------------------------------------

/// Test double that records every notification it receives.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSink {
    events: std::sync::Mutex<Vec<SinkEvent>>,
}

#[cfg(test)]
#[derive(Debug, Clone)]
pub enum SinkEvent {
    Segment(Segment),
    Finished(std::path::PathBuf, String),
    Failed(std::path::PathBuf, String),
}

#[cfg(test)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> Vec<Segment> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Segment(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn finished(&self) -> Vec<(std::path::PathBuf, String)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Finished(p, t) => Some((p.clone(), t.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn failed(&self) -> Vec<(std::path::PathBuf, String)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Failed(p, m) => Some((p.clone(), m.clone())),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl RecognitionSink for RecordingSink {
    fn on_segment_result(&self, segment: &Segment) {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Segment(segment.clone()));
    }

    fn on_job_finished(&self, path: &Path, text: &str) {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Finished(path.to_path_buf(), text.to_string()));
    }

    fn on_job_failed(&self, path: &Path, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Failed(path.to_path_buf(), message.to_string()));
    }
}
