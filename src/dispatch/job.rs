//! Job model — one file's recognition request tracked through its states.
//!
//! States are monotonic: a job moves Pending → Running → Done | Failed and
//! never revisits an earlier state.  A finished job is removed from the
//! dispatcher's tracking table; re-submitting the same path afterwards
//! creates a fresh `Job`.

use std::path::PathBuf;
use std::str::FromStr;

use crate::backend::BackendKind;

// ---------------------------------------------------------------------------
// JobState
// ---------------------------------------------------------------------------

/// Lifecycle states of a recognition job.
///
/// ```text
/// Pending ──drain_queue──▶ Running ──backend ok───▶ Done
///                                  ──any error────▶ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Waiting in the FIFO queue for a free worker slot.
    Pending,
    /// A worker is processing the file (cache lookup or backend round-trip).
    Running,
    /// Recognition finished; the sink has been notified with the text.
    Done,
    /// Recognition failed; the sink has been notified with the error.
    Failed,
}

impl JobState {
    /// Returns `true` for the two end states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }
}

// ---------------------------------------------------------------------------
// OutputFormat
// ---------------------------------------------------------------------------

/// The subtitle format the caller intends to write the result as.
///
/// Carried through the job untouched — serialising SRT/ASS is the UI
/// collaborator's concern, not the core's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Txt,
    Srt,
    Ass,
}

impl OutputFormat {
    /// File extension for this format (lowercase, no dot).
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Txt => "txt",
            OutputFormat::Srt => "srt",
            OutputFormat::Ass => "ass",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "txt" => Ok(OutputFormat::Txt),
            "srt" => Ok(OutputFormat::Srt),
            "ass" => Ok(OutputFormat::Ass),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// One tracked recognition request.
#[derive(Debug, Clone)]
pub struct Job {
    /// The submitted media file.
    pub path: PathBuf,
    /// Current lifecycle state.
    pub state: JobState,
    /// Which backend this job is routed to.
    pub backend: BackendKind,
    /// Output format the caller asked for.
    pub format: OutputFormat,
}

impl Job {
    /// Create a fresh `Pending` job.
    pub fn new(path: PathBuf, backend: BackendKind, format: OutputFormat) -> Self {
        Self {
            path,
            state: JobState::Pending,
            backend,
            format,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
