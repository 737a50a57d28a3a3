//! Job dispatcher and background worker.
//!
//! Request handlers call [`JobDispatcher::dispatch`], which validates the
//! input reference, records the job and pushes it onto a queue. The worker
//! started by [`run_worker`] drains that queue and runs each job as a
//! detached task, bounded by a semaphore. Nothing on the request path waits
//! for a pipeline to finish.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use vrs_core::ingest::StoredFile;
use vrs_core::storage::{sanitize_file_name, StorageLayout};
use vrs_core::{Error, JobState, Mode, ProcessingJob, Result};

use crate::pipeline::Pipeline;
use crate::tracker::JobTracker;

/// How the caller identified the input file.
#[derive(Debug, Clone)]
pub enum InputRef {
    /// A file just written to the ingest root by the request itself.
    Uploaded(StoredFile),
    /// The name of a file expected to already exist under the ingest root.
    Existing(String),
}

/// Acknowledgment returned as soon as a job is queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Acceptance {
    pub status: &'static str,
    pub input: PathBuf,
    pub add_audio: bool,
    pub mode: Mode,
}

#[derive(Debug, Clone)]
pub struct JobDispatcher {
    tx: mpsc::UnboundedSender<ProcessingJob>,
    tracker: Arc<JobTracker>,
    layout: Arc<StorageLayout>,
}

impl JobDispatcher {
    /// Create a dispatcher and the receiving end of its queue.
    pub fn new(
        layout: Arc<StorageLayout>,
        tracker: Arc<JobTracker>,
    ) -> (Self, mpsc::UnboundedReceiver<ProcessingJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                tracker,
                layout,
            },
            rx,
        )
    }

    /// Queue a `mode` job for `input`.
    ///
    /// `None` is a client error. An existing-file reference is reduced to
    /// its base name and must be present under the ingest root.
    pub fn dispatch(
        &self,
        mode: Mode,
        input: Option<InputRef>,
        add_audio: bool,
    ) -> Result<Acceptance> {
        self.layout.ensure_roots()?;

        let input_path = match input {
            None => {
                return Err(Error::Validation("Provide either file or filename".into()));
            }
            Some(InputRef::Uploaded(stored)) => stored.path,
            Some(InputRef::Existing(name)) => {
                let name = sanitize_file_name(&name)?;
                let candidate = self.layout.ingest_path(&name);
                if !candidate.is_file() {
                    return Err(Error::not_found("Filename under input", name));
                }
                candidate
            }
        };

        let job = ProcessingJob::new(mode, input_path, add_audio);
        self.tracker.update(&job, JobState::Queued, None);
        self.tx
            .send(job.clone())
            .map_err(|_| Error::Internal("job worker is not running".into()))?;

        tracing::info!(
            mode = %job.mode,
            input = %job.input_path.display(),
            add_audio = job.add_audio,
            "Job queued"
        );

        Ok(Acceptance {
            status: "accepted",
            input: job.input_path,
            add_audio,
            mode,
        })
    }
}

/// Drain the job queue until it closes or `cancel` fires.
///
/// At most `max_concurrent` jobs run at once. Jobs already running when the
/// worker stops are left to finish on their own.
pub async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<ProcessingJob>,
    pipeline: Arc<dyn Pipeline>,
    tracker: Arc<JobTracker>,
    max_concurrent: usize,
    cancel: CancellationToken,
) {
    let max_concurrent = max_concurrent.max(1);
    let limit = Arc::new(Semaphore::new(max_concurrent));
    tracing::info!(max_concurrent, "Job worker started");

    loop {
        let job = tokio::select! {
            job = rx.recv() => match job {
                Some(job) => job,
                None => break,
            },
            _ = cancel.cancelled() => break,
        };

        let permit = tokio::select! {
            permit = Arc::clone(&limit).acquire_owned() => permit.ok(),
            _ = cancel.cancelled() => None,
        };
        let Some(permit) = permit else {
            tracing::warn!(
                mode = %job.mode,
                input = %job.input_path.display(),
                "Job dropped at shutdown"
            );
            tracker.update(
                &job,
                JobState::Failed,
                Some("Worker stopped before the job started".into()),
            );
            break;
        };

        let pipeline = Arc::clone(&pipeline);
        let tracker = Arc::clone(&tracker);
        tokio::spawn(async move {
            let _permit = permit;
            run_job(pipeline.as_ref(), &tracker, &job).await;
        });
    }

    tracing::info!("Job worker stopped");
}

async fn run_job(pipeline: &dyn Pipeline, tracker: &JobTracker, job: &ProcessingJob) {
    tracker.update(job, JobState::Running, None);
    tracing::info!(
        mode = %job.mode,
        input = %job.input_path.display(),
        add_audio = job.add_audio,
        "Job started"
    );

    match pipeline.run(job).await {
        Ok(()) => {
            tracker.update(job, JobState::Completed, None);
            tracing::info!(mode = %job.mode, input = %job.input_path.display(), "Job completed");
        }
        Err(e) => {
            tracing::error!(mode = %job.mode, input = %job.input_path.display(), "Job failed: {e}");
            tracker.update(job, JobState::Failed, Some(e.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use vrs_core::config::StorageConfig;

    fn layout(base: &Path) -> Arc<StorageLayout> {
        Arc::new(StorageLayout::from_config(&StorageConfig::with_base(base)))
    }

    #[test]
    fn missing_input_is_bad_request() {
        let tmp = tempfile::tempdir().unwrap();
        let (dispatcher, _rx) = JobDispatcher::new(layout(tmp.path()), Arc::new(JobTracker::new()));
        let err = dispatcher.dispatch(Mode::Vr180, None, true).unwrap_err();
        assert_eq!(err.http_status(), 400);
        assert_eq!(err.to_string(), "Validation error: Provide either file or filename");
    }

    #[test]
    fn unknown_existing_file_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let (dispatcher, mut rx) =
            JobDispatcher::new(layout(tmp.path()), Arc::new(JobTracker::new()));
        let err = dispatcher
            .dispatch(Mode::Vr180, Some(InputRef::Existing("ghost.mp4".into())), true)
            .unwrap_err();
        assert_eq!(err.http_status(), 404);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn existing_file_is_sanitized_and_queued() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = layout(tmp.path());
        layout.ensure_roots().unwrap();
        std::fs::write(layout.ingest_path("clip.mp4"), b"x").unwrap();

        let tracker = Arc::new(JobTracker::new());
        let (dispatcher, mut rx) = JobDispatcher::new(Arc::clone(&layout), Arc::clone(&tracker));
        let accepted = dispatcher
            .dispatch(
                Mode::Anaglyph,
                Some(InputRef::Existing("\"../secret/clip.mp4\"".into())),
                false,
            )
            .unwrap();

        assert_eq!(accepted.status, "accepted");
        assert_eq!(accepted.input, layout.ingest_path("clip.mp4"));
        assert_eq!(accepted.mode, Mode::Anaglyph);

        let job = rx.try_recv().unwrap();
        assert_eq!(job, ProcessingJob::new(Mode::Anaglyph, layout.ingest_path("clip.mp4"), false));
        assert_eq!(
            tracker.get(Mode::Anaglyph, &job.input_path).unwrap().state,
            JobState::Queued
        );
    }

    #[test]
    fn uploaded_file_is_queued_as_is() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = layout(tmp.path());
        let (dispatcher, mut rx) = JobDispatcher::new(Arc::clone(&layout), Arc::new(JobTracker::new()));
        let stored = StoredFile {
            name: "clip.mp4".into(),
            path: layout.ingest_path("clip.mp4"),
        };
        dispatcher
            .dispatch(Mode::Vr180, Some(InputRef::Uploaded(stored)), true)
            .unwrap();
        assert_eq!(rx.try_recv().unwrap().input_path, layout.ingest_path("clip.mp4"));
    }

    #[test]
    fn closed_queue_is_internal_error() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = layout(tmp.path());
        layout.ensure_roots().unwrap();
        std::fs::write(layout.ingest_path("clip.mp4"), b"x").unwrap();
        let (dispatcher, rx) = JobDispatcher::new(layout, Arc::new(JobTracker::new()));
        drop(rx);

        let err = dispatcher
            .dispatch(Mode::Vr180, Some(InputRef::Existing("clip.mp4".into())), true)
            .unwrap_err();
        assert_eq!(err.http_status(), 500);
    }

    struct SlowPipeline {
        running: AtomicUsize,
        peak: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Pipeline for SlowPipeline {
        async fn run(&self, job: &ProcessingJob) -> Result<()> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            if self.fail {
                Err(Error::pipeline(job.mode, "exit status 1"))
            } else {
                Ok(())
            }
        }
    }

    async fn wait_until_settled(tracker: &JobTracker, expected: usize) {
        for _ in 0..200 {
            if tracker.list().len() == expected && tracker.active_count() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("jobs did not settle");
    }

    #[tokio::test]
    async fn worker_bounds_concurrency_and_records_outcome() {
        let pipeline = Arc::new(SlowPipeline {
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            fail: false,
        });
        let tracker = Arc::new(JobTracker::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let worker = tokio::spawn(run_worker(
            rx,
            Arc::clone(&pipeline) as Arc<dyn Pipeline>,
            Arc::clone(&tracker),
            2,
            cancel.clone(),
        ));

        for i in 0..6 {
            let job = ProcessingJob::new(Mode::Vr180, format!("/in/{i}.mp4"), true);
            tracker.update(&job, JobState::Queued, None);
            tx.send(job).unwrap();
        }

        wait_until_settled(&tracker, 6).await;
        assert!(pipeline.peak.load(Ordering::SeqCst) <= 2);
        assert!(tracker.list().iter().all(|r| r.state == JobState::Completed));

        cancel.cancel();
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn failed_job_is_recorded_with_error() {
        let pipeline: Arc<dyn Pipeline> = Arc::new(SlowPipeline {
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            fail: true,
        });
        let tracker = Arc::new(JobTracker::new());
        let (tx, rx) = mpsc::unbounded_channel();

        let worker = tokio::spawn(run_worker(
            rx,
            pipeline,
            Arc::clone(&tracker),
            1,
            CancellationToken::new(),
        ));

        tx.send(ProcessingJob::new(Mode::Anaglyph, "/in/a.mp4", false))
            .unwrap();
        wait_until_settled(&tracker, 1).await;

        let record = tracker.get(Mode::Anaglyph, Path::new("/in/a.mp4")).unwrap();
        assert_eq!(record.state, JobState::Failed);
        assert!(record.error.unwrap().contains("exit status 1"));

        drop(tx);
        worker.await.unwrap();
    }

    struct StuckPipeline;

    #[async_trait]
    impl Pipeline for StuckPipeline {
        async fn run(&self, _job: &ProcessingJob) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn job_waiting_for_a_slot_is_failed_on_shutdown() {
        let tracker = Arc::new(JobTracker::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let worker = tokio::spawn(run_worker(
            rx,
            Arc::new(StuckPipeline),
            Arc::clone(&tracker),
            1,
            cancel.clone(),
        ));

        let running = ProcessingJob::new(Mode::Vr180, "/in/a.mp4", true);
        tx.send(running.clone()).unwrap();
        for _ in 0..200 {
            if tracker.active_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let waiting = ProcessingJob::new(Mode::Vr180, "/in/b.mp4", true);
        tracker.update(&waiting, JobState::Queued, None);
        tx.send(waiting.clone()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        cancel.cancel();
        worker.await.unwrap();

        let record = tracker.get(Mode::Vr180, &waiting.input_path).unwrap();
        assert_eq!(record.state, JobState::Failed);
        assert!(record.error.unwrap().contains("Worker stopped"));
        assert_eq!(
            tracker.get(Mode::Vr180, &running.input_path).unwrap().state,
            JobState::Running
        );
    }
}
