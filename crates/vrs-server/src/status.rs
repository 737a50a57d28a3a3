//! Status reporter: polling view of a mode's outputs.

use serde::Serialize;

use vrs_core::storage::StorageLayout;
use vrs_core::{Mode, Result};

use crate::mounts::HLS_PREFIX;
use crate::publisher::{playlist_url, StreamPublisher};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub exists: bool,
    pub url: Option<String>,
}

impl Availability {
    fn from_url(exists: bool, url: impl FnOnce() -> String) -> Self {
        Self {
            exists,
            url: exists.then(url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamStatus {
    pub hls: Availability,
    pub mp4: Availability,
    pub mode: Mode,
}

/// Report whether the incremental playlist and the final MP4 for `mode`
/// exist yet.
///
/// Always answers with the `/hls` URL shape; finalized playlists are only
/// surfaced by the manifest query.
pub fn stream_status(
    layout: &StorageLayout,
    publisher: &StreamPublisher,
    mode: Mode,
) -> Result<StreamStatus> {
    layout.ensure_roots()?;

    let hls_exists = publisher.ensure_mounted_and_locate().is_some();
    let artifact = mode.artifact_name();
    let mp4_exists = layout.output_path(artifact).exists();

    Ok(StreamStatus {
        hls: Availability::from_url(hls_exists, || playlist_url(HLS_PREFIX)),
        mp4: Availability::from_url(mp4_exists, || format!("/stream?filename={artifact}")),
        mode,
    })
}
