//! Application context shared with every route handler via axum state.
//!
//! Everything in here is either immutable after startup or internally
//! synchronized, so the context is cheap to clone per request.

use std::sync::Arc;

use tokio::sync::mpsc;

use vrs_core::config::Config;
use vrs_core::ingest::IngestWriter;
use vrs_core::storage::StorageLayout;
use vrs_core::ProcessingJob;

use crate::dispatcher::JobDispatcher;
use crate::mounts::MountRegistry;
use crate::proxy::RemoteProxy;
use crate::publisher::StreamPublisher;
use crate::tracker::JobTracker;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub layout: Arc<StorageLayout>,
    pub ingest: IngestWriter,
    pub mounts: Arc<MountRegistry>,
    pub publisher: StreamPublisher,
    pub dispatcher: JobDispatcher,
    pub jobs: Arc<JobTracker>,
    pub proxy: RemoteProxy,
}

impl AppContext {
    /// Assemble the context from `config`.
    ///
    /// Also returns the receiving end of the job queue, to be handed to
    /// [`run_worker`](crate::dispatcher::run_worker).
    pub fn build(
        config: Config,
    ) -> vrs_core::Result<(Self, mpsc::UnboundedReceiver<ProcessingJob>)> {
        let layout = Arc::new(StorageLayout::from_config(&config.storage));
        let mounts = Arc::new(MountRegistry::new());
        let jobs = Arc::new(JobTracker::new());
        let (dispatcher, queue) = JobDispatcher::new(Arc::clone(&layout), Arc::clone(&jobs));

        let ctx = Self {
            ingest: IngestWriter::new(layout.ingest_root.clone()),
            publisher: StreamPublisher::new(Arc::clone(&layout), Arc::clone(&mounts)),
            proxy: RemoteProxy::new()?,
            config: Arc::new(config),
            layout,
            mounts,
            dispatcher,
            jobs,
        };
        Ok((ctx, queue))
    }
}
