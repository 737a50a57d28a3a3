//! Ingest writer: persists inbound byte streams under the ingest root.

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::Result;
use crate::storage::sanitize_file_name;
use crate::Error;

/// Write buffer size; peak memory per ingest is bounded by this.
pub const INGEST_CHUNK_SIZE: usize = 1024 * 1024;

/// How the stored file name is derived from the client-supplied one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingPolicy {
    /// `{stem}_{8 hex}{ext}`; concurrent uploads of one name never collide.
    Randomized,
    /// Keep the name and overwrite any previous file (the re-run workflow).
    Exact,
}

impl NamingPolicy {
    fn failure_context(self) -> &'static str {
        match self {
            NamingPolicy::Randomized => "Upload failed",
            NamingPolicy::Exact => "Save failed",
        }
    }
}

/// A file persisted under the ingest root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    /// Final file name (basename).
    pub name: String,
    /// Full path on disk.
    pub path: PathBuf,
}

/// Streams uploads to disk under a fixed root directory.
#[derive(Debug, Clone)]
pub struct IngestWriter {
    root: PathBuf,
}

impl IngestWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Persist `stream` under a name derived from `original_name`.
    ///
    /// `Exact` stores are written to a temporary sibling and renamed over the
    /// target, so readers holding the previous file keep its contents. A
    /// failed `Exact` store removes its temporary file; a failed `Randomized`
    /// store leaves the partial file. Errors are never retried.
    pub async fn store<S, E>(
        &self,
        original_name: &str,
        policy: NamingPolicy,
        stream: S,
    ) -> Result<StoredFile>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: fmt::Display,
    {
        let name = storage_name(original_name, policy)?;
        let path = self.root.join(&name);
        let context = policy.failure_context();

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Error::write_failed(context, e))?;

        let written = match policy {
            NamingPolicy::Randomized => write_stream(&path, stream, context).await?,
            NamingPolicy::Exact => {
                let staging = self.root.join(staging_name(&name));
                let written = match write_stream(&staging, stream, context).await {
                    Ok(written) => written,
                    Err(e) => {
                        let _ = tokio::fs::remove_file(&staging).await;
                        return Err(e);
                    }
                };
                if let Err(e) = tokio::fs::rename(&staging, &path).await {
                    let _ = tokio::fs::remove_file(&staging).await;
                    return Err(Error::write_failed(context, e));
                }
                written
            }
        };

        tracing::info!(file = %path.display(), bytes = written, "Stored ingest file");
        Ok(StoredFile { name, path })
    }
}

fn staging_name(name: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(".{name}.{}.part", &suffix[..8])
}

async fn write_stream<S, E>(path: &Path, stream: S, context: &'static str) -> Result<u64>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: fmt::Display,
{
    let file = tokio::fs::File::create(path)
        .await
        .map_err(|e| Error::write_failed(context, e))?;
    let mut writer = BufWriter::with_capacity(INGEST_CHUNK_SIZE, file);

    let mut stream = std::pin::pin!(stream);
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk
            .map_err(|e| Error::write_failed(context, std::io::Error::other(e.to_string())))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| Error::write_failed(context, e))?;
        written += chunk.len() as u64;
    }
    writer
        .flush()
        .await
        .map_err(|e| Error::write_failed(context, e))?;
    Ok(written)
}


/// Storage name for `original_name` under `policy`.
pub fn storage_name(original_name: &str, policy: NamingPolicy) -> Result<String> {
    let base = sanitize_file_name(original_name)?;
    match policy {
        NamingPolicy::Exact => Ok(base),
        NamingPolicy::Randomized => {
            let path = Path::new(&base);
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let ext = path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            let suffix = uuid::Uuid::new_v4().simple().to_string();
            Ok(format!("{stem}_{}{ext}", &suffix[..8]))
        }
    }
}
