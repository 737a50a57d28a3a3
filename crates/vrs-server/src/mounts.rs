//! Process-wide registry of public URL prefixes bound to directories.
//!
//! Mounts are monotonic: once a prefix is attached it keeps its directory for
//! the lifetime of the process. Attachment is an atomic check-and-set, so two
//! requests racing to mount the same prefix are harmless.

use std::path::{Path, PathBuf};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Public prefix for the incremental HLS directory.
pub const HLS_PREFIX: &str = "/hls";
/// Public prefix for the finalized HLS directory.
pub const HLS_FINAL_PREFIX: &str = "/hls_final";

#[derive(Debug, Default)]
pub struct MountRegistry {
    mounts: DashMap<String, PathBuf>,
}

impl MountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `dir` at `prefix` unless the prefix is already mounted.
    ///
    /// Returns `true` only for the call that performed the attachment.
    pub fn mount(&self, prefix: &str, dir: &Path) -> bool {
        match self.mounts.entry(prefix.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(dir.to_path_buf());
                tracing::info!(prefix, dir = %dir.display(), "Mounted streaming directory");
                true
            }
        }
    }

    /// Directory mounted at `prefix`.
    pub fn get(&self, prefix: &str) -> Option<PathBuf> {
        self.mounts.get(prefix).map(|d| d.value().clone())
    }

    pub fn is_mounted(&self, prefix: &str) -> bool {
        self.mounts.contains_key(prefix)
    }
}
