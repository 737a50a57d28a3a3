//! Processing modes and the artifact names they produce.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Playlist file name written by the pipeline into every HLS directory.
pub const PLAYLIST_NAME: &str = "output.m3u8";

/// Older clients link to the VR180 artifact without the inner underscore.
const LEGACY_VR180_NAME: &str = "final_output_vr180.mp4";

/// Stereo conversion performed by the external pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Side-by-side VR180 output.
    #[default]
    Vr180,
    /// Red/cyan anaglyph output.
    Anaglyph,
}

impl Mode {
    /// Both modes, in dispatch order.
    pub const ALL: [Mode; 2] = [Mode::Vr180, Mode::Anaglyph];

    /// Wire name of the mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Vr180 => "vr180",
            Mode::Anaglyph => "anaglyph",
        }
    }

    /// File name of the final MP4 the pipeline writes into the output root.
    pub fn artifact_name(self) -> &'static str {
        match self {
            Mode::Vr180 => "final_output_vr_180.mp4",
            Mode::Anaglyph => "final_output_anaglyph.mp4",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vr180" => Ok(Mode::Vr180),
            "anaglyph" => Ok(Mode::Anaglyph),
            other => Err(Error::Validation(format!(
                "Unknown mode '{other}' (expected vr180 or anaglyph)"
            ))),
        }
    }
}

/// Rewrite legacy artifact names to their current form.
pub fn canonical_media_name(name: &str) -> &str {
    if name == LEGACY_VR180_NAME {
        Mode::Vr180.artifact_name()
    } else {
        name
    }
}

/// MIME type for a served media file.
pub fn content_type_for(file_name: &str) -> &'static str {
    if file_name.to_ascii_lowercase().ends_with(".mp4") {
        "video/mp4"
    } else {
        "application/octet-stream"
    }
}
