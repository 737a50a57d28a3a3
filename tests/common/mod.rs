//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which builds a full [`AppContext`] over a
//! temporary storage base, swaps the external pipeline for a
//! [`RecordingPipeline`], and serves the real router and job worker on a
//! random local port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use vrs_core::config::{Config, StorageConfig};
use vrs_core::storage::StorageLayout;
use vrs_core::{Error, ProcessingJob};
use vrs_server::context::AppContext;
use vrs_server::pipeline::Pipeline;

/// Pipeline stand-in that remembers every job it was asked to run.
#[derive(Default)]
pub struct RecordingPipeline {
    jobs: Mutex<Vec<ProcessingJob>>,
    fail: bool,
}

impl RecordingPipeline {
    pub fn failing() -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn jobs(&self) -> Vec<ProcessingJob> {
        self.jobs.lock().clone()
    }
}

#[async_trait]
impl Pipeline for RecordingPipeline {
    async fn run(&self, job: &ProcessingJob) -> vrs_core::Result<()> {
        self.jobs.lock().push(job.clone());
        if self.fail {
            return Err(Error::pipeline(job.mode, "simulated failure"));
        }
        Ok(())
    }
}

/// A running server over a throwaway storage base.
pub struct TestHarness {
    pub ctx: AppContext,
    pub pipeline: Arc<RecordingPipeline>,
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    cancel: CancellationToken,
    dir: TempDir,
}

impl TestHarness {
    /// Start a server with default configuration.
    pub async fn start() -> Self {
        Self::start_with(RecordingPipeline::default(), |_| {}).await
    }

    /// Start a server with a custom pipeline and configuration tweaks.
    ///
    /// The storage base always points at a fresh temporary directory.
    pub async fn start_with(pipeline: RecordingPipeline, customize: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let mut config = Config::default();
        config.storage = StorageConfig::with_base(dir.path());
        customize(&mut config);

        let (ctx, queue) = AppContext::build(config).expect("failed to build context");
        let pipeline = Arc::new(pipeline);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        let cancel = CancellationToken::new();
        let serve_ctx = ctx.clone();
        let serve_pipeline: Arc<dyn Pipeline> = pipeline.clone();
        let serve_cancel = cancel.clone();
        tokio::spawn(async move {
            vrs_server::serve(listener, serve_ctx, queue, serve_pipeline, serve_cancel)
                .await
                .ok();
        });

        Self {
            ctx,
            pipeline,
            addr,
            client: reqwest::Client::new(),
            cancel,
            dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn base(&self) -> &Path {
        self.dir.path()
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.ctx.layout
    }

    /// Write `data` to `name` under the ingest root.
    pub fn put_input(&self, name: &str, data: &[u8]) {
        let layout = self.layout();
        std::fs::create_dir_all(&layout.ingest_root).unwrap();
        std::fs::write(layout.ingest_path(name), data).unwrap();
    }

    /// Write `data` to `name` under the output root.
    pub fn put_output(&self, name: &str, data: &[u8]) {
        let layout = self.layout();
        std::fs::create_dir_all(&layout.output_root).unwrap();
        std::fs::write(layout.output_path(name), data).unwrap();
    }

    /// Write a playlist into `dir`, creating it.
    pub fn put_playlist(&self, dir: &Path) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join("output.m3u8"), "#EXTM3U\n#EXT-X-VERSION:3\n").unwrap();
    }

    /// Wait until the pipeline has seen `count` jobs.
    pub async fn wait_for_jobs(&self, count: usize) -> Vec<ProcessingJob> {
        for _ in 0..300 {
            let jobs = self.pipeline.jobs();
            if jobs.len() >= count {
                return jobs;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {count} pipeline runs, saw {}",
            self.pipeline.jobs().len()
        );
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Deterministic non-repeating-ish payload.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
