//! Processing job model.
//!
//! A [`ProcessingJob`] is the immutable request handed to the external
//! pipeline. Completion is observed by polling for artifacts on disk; the
//! [`JobState`] values exist only for the in-memory observability record.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::media::Mode;

/// A request to run the external pipeline on one input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingJob {
    pub input_path: PathBuf,
    pub add_audio: bool,
    pub mode: Mode,
}

impl ProcessingJob {
    pub fn new(mode: Mode, input_path: impl Into<PathBuf>, add_audio: bool) -> Self {
        Self {
            input_path: input_path.into(),
            add_audio,
            mode,
        }
    }
}

/// Lifecycle of a dispatched job as seen by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}
