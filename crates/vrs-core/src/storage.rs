//! Storage locator: canonical locations for ingest, output and streaming
//! directories.
//!
//! Streaming directories are created asynchronously by the external pipeline,
//! so [`StorageLayout::resolve_streaming_dir`] probes its candidate list on
//! every call instead of caching an answer.

use std::path::PathBuf;

use crate::config::StorageConfig;
use crate::error::Result;
use crate::media::PLAYLIST_NAME;
use crate::Error;

/// Concrete storage paths resolved from [`StorageConfig`].
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Uploaded and source video files.
    pub ingest_root: PathBuf,
    /// Pipeline-produced artifacts (final MP4s, HLS folders).
    pub output_root: PathBuf,
    /// Persistent storage for deployments with a mounted volume.
    pub storage_root: PathBuf,
    /// Incremental HLS directory candidates, primary first.
    pub stream_candidates: Vec<PathBuf>,
    /// Directory the finalize step writes the immutable playlist into.
    pub final_hls_dir: PathBuf,
}

impl StorageLayout {
    /// Derive every unset path from `config.base_dir`.
    pub fn from_config(config: &StorageConfig) -> Self {
        let base = &config.base_dir;
        let output_root = config
            .output_dir
            .clone()
            .unwrap_or_else(|| base.join("output"));

        let stream_candidates = config.stream_dirs.clone().unwrap_or_else(|| {
            vec![
                output_root.join("stream"),
                base.join("src").join("output").join("stream"),
            ]
        });

        Self {
            ingest_root: config
                .ingest_dir
                .clone()
                .unwrap_or_else(|| base.join("input")),
            storage_root: config
                .storage_dir
                .clone()
                .unwrap_or_else(|| base.join("storage")),
            final_hls_dir: config
                .final_hls_dir
                .clone()
                .unwrap_or_else(|| output_root.join("final_hls")),
            stream_candidates,
            output_root,
        }
    }

    /// Create the ingest, output and persistent-storage roots if missing.
    ///
    /// Streaming directories are left alone; they belong to the pipeline.
    pub fn ensure_roots(&self) -> Result<()> {
        for dir in [&self.ingest_root, &self.output_root, &self.storage_root] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// First streaming candidate that exists as a directory, or the primary
    /// candidate when none does yet.
    pub fn resolve_streaming_dir(&self) -> PathBuf {
        self.stream_candidates
            .iter()
            .find(|d| d.is_dir())
            .or_else(|| self.stream_candidates.first())
            .cloned()
            .unwrap_or_else(|| self.output_root.join("stream"))
    }

    /// Path of the finalized playlist, whether or not it exists.
    pub fn final_playlist(&self) -> PathBuf {
        self.final_hls_dir.join(PLAYLIST_NAME)
    }

    /// Path of `name` inside the ingest root.
    pub fn ingest_path(&self, name: &str) -> PathBuf {
        self.ingest_root.join(name)
    }

    /// Path of `name` inside the output root.
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_root.join(name)
    }

    /// Resolve a requested media name: output root first, then ingest root.
    ///
    /// Directory components of `requested` are discarded so lookups never
    /// leave the two roots.
    pub fn resolve_media(&self, requested: &str) -> Result<PathBuf> {
        let name = sanitize_file_name(requested)?;
        [self.output_path(&name), self.ingest_path(&name)]
            .into_iter()
            .find(|p| p.is_file())
            .ok_or_else(|| Error::not_found("file", name))
    }
}

/// Reduce a client-supplied file reference to a bare file name.
///
/// Surrounding double quotes (some UIs send them) are stripped, and only the
/// final path component is kept. Empty results and `.`/`..` are rejected.
pub fn sanitize_file_name(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_matches('"');
    let base = trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if base.is_empty() || base == "." || base == ".." {
        return Err(Error::Validation(format!("Invalid filename '{raw}'")));
    }

    Ok(base.to_string())
}
