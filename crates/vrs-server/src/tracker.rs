//! In-memory record of dispatched jobs, keyed by mode and input path.
//!
//! This is observability only. Artifact polling remains the source of truth
//! for clients, and repeated dispatches of one input simply overwrite the
//! record. Finished records beyond the retention limit are dropped oldest
//! first.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use vrs_core::{JobState, Mode, ProcessingJob};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRecord {
    pub mode: Mode,
    pub input: PathBuf,
    pub add_audio: bool,
    pub state: JobState,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Completed and failed records kept before the oldest are evicted.
pub const DEFAULT_FINISHED_RETENTION: usize = 1000;

#[derive(Debug)]
pub struct JobTracker {
    records: DashMap<(Mode, PathBuf), JobRecord>,
    finished_retention: usize,
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::with_retention(DEFAULT_FINISHED_RETENTION)
    }
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queued and running records are never evicted.
    pub fn with_retention(finished_retention: usize) -> Self {
        Self {
            records: DashMap::new(),
            finished_retention,
        }
    }

    /// Set the state of `job`, creating the record on first sight.
    pub fn update(&self, job: &ProcessingJob, state: JobState, error: Option<String>) {
        let record = JobRecord {
            mode: job.mode,
            input: job.input_path.clone(),
            add_audio: job.add_audio,
            state,
            error,
            updated_at: Utc::now(),
        };
        self.records
            .insert((job.mode, job.input_path.clone()), record);
        if state.is_terminal() {
            self.evict_finished();
        }
    }

    fn evict_finished(&self) {
        let mut finished: Vec<(DateTime<Utc>, (Mode, PathBuf))> = self
            .records
            .iter()
            .filter(|r| r.value().state.is_terminal())
            .map(|r| (r.value().updated_at, r.key().clone()))
            .collect();
        if finished.len() <= self.finished_retention {
            return;
        }
        finished.sort_by(|a, b| a.0.cmp(&b.0));
        let excess = finished.len() - self.finished_retention;
        for (_, key) in finished.into_iter().take(excess) {
            self.records
                .remove_if(&key, |_, record| record.state.is_terminal());
        }
    }

    pub fn get(&self, mode: Mode, input: &Path) -> Option<JobRecord> {
        self.records
            .get(&(mode, input.to_path_buf()))
            .map(|r| r.value().clone())
    }

    /// All records, most recently updated first.
    pub fn list(&self) -> Vec<JobRecord> {
        let mut records: Vec<JobRecord> = self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        records
    }

    /// Jobs that are queued or running.
    pub fn active_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| !r.value().state.is_terminal())
            .count()
    }
}
