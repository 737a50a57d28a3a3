//! Stream publisher: discovers HLS playlists and exposes them under stable
//! public prefixes.
//!
//! Directories are attached lazily through the [`MountRegistry`] the first
//! time they are seen on disk; absence of a playlist is a normal, pollable
//! state and never an error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use vrs_core::media::PLAYLIST_NAME;
use vrs_core::storage::StorageLayout;

use crate::mounts::{MountRegistry, HLS_FINAL_PREFIX, HLS_PREFIX};

/// Which playlist a manifest answer points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistKind {
    Final,
    Incremental,
}

/// Answer to "is there something to play yet?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestStatus {
    pub ready: bool,
    pub url: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<PlaylistKind>,
}

impl ManifestStatus {
    fn not_ready() -> Self {
        Self {
            ready: false,
            url: None,
            kind: None,
        }
    }

    fn ready(kind: PlaylistKind) -> Self {
        let prefix = match kind {
            PlaylistKind::Final => HLS_FINAL_PREFIX,
            PlaylistKind::Incremental => HLS_PREFIX,
        };
        Self {
            ready: true,
            url: Some(playlist_url(prefix)),
            kind: Some(kind),
        }
    }
}

/// Result of a forced re-check of both streaming directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub mounted: bool,
    pub final_mounted: bool,
    pub dir: PathBuf,
    pub final_dir: PathBuf,
}

/// Public URL of the playlist under `prefix`.
pub fn playlist_url(prefix: &str) -> String {
    format!("{prefix}/{PLAYLIST_NAME}")
}

#[derive(Debug, Clone)]
pub struct StreamPublisher {
    layout: Arc<StorageLayout>,
    mounts: Arc<MountRegistry>,
}

impl StreamPublisher {
    pub fn new(layout: Arc<StorageLayout>, mounts: Arc<MountRegistry>) -> Self {
        Self { layout, mounts }
    }

    /// Mount the incremental directory if it now exists and return the
    /// playlist path when one is present.
    ///
    /// Once mounted, the registered directory is authoritative even if the
    /// candidate resolution would now pick another one.
    pub fn ensure_mounted_and_locate(&self) -> Option<PathBuf> {
        let dir = self.layout.resolve_streaming_dir();
        if dir.is_dir() {
            self.mounts.mount(HLS_PREFIX, &dir);
        }

        let served = self.mounts.get(HLS_PREFIX).unwrap_or(dir);
        let playlist = served.join(PLAYLIST_NAME);
        playlist.is_file().then_some(playlist)
    }

    /// Mount the final directory if it now exists and return its playlist
    /// path when present.
    fn ensure_final_mounted_and_locate(&self) -> Option<PathBuf> {
        let dir = &self.layout.final_hls_dir;
        if dir.is_dir() {
            self.mounts.mount(HLS_FINAL_PREFIX, dir);
        }
        let playlist = self.layout.final_playlist();
        playlist.is_file().then_some(playlist)
    }

    /// Prefer the finalized playlist over the incremental one.
    pub fn manifest_status(&self) -> ManifestStatus {
        let incremental = self.ensure_mounted_and_locate();

        if self.ensure_final_mounted_and_locate().is_some() {
            return ManifestStatus::ready(PlaylistKind::Final);
        }
        match incremental {
            Some(_) => ManifestStatus::ready(PlaylistKind::Incremental),
            None => ManifestStatus::not_ready(),
        }
    }

    /// Re-check both directories, mounting whichever now exist.
    ///
    /// `mounted`/`final_mounted` report whether the directories exist, so
    /// repeated refreshes keep answering `true`.
    pub fn refresh(&self) -> RefreshReport {
        let dir = self.layout.resolve_streaming_dir();
        let final_dir = self.layout.final_hls_dir.clone();

        let mounted = mount_if_present(&self.mounts, HLS_PREFIX, &dir);
        let final_mounted = mount_if_present(&self.mounts, HLS_FINAL_PREFIX, &final_dir);

        RefreshReport {
            mounted,
            final_mounted,
            dir,
            final_dir,
        }
    }
}

fn mount_if_present(mounts: &MountRegistry, prefix: &str, dir: &Path) -> bool {
    if !dir.is_dir() {
        return false;
    }
    mounts.mount(prefix, dir);
    true
}
