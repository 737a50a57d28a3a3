//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from TOML and carries the
//! server, storage and pipeline sections. Every section defaults sensibly so
//! an empty file is valid, and storage roots can be overridden from the
//! environment after the file is loaded.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::media::Mode;
use crate::Error;

/// Locations searched when no explicit config path is given.
const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "./vrstream.toml",
    "~/.config/vrstream/config.toml",
    "/etc/vrstream/config.toml",
];

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Config(format!("config parse error: {e}")))
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml(&contents)
    }

    /// Load from `custom_path`, or the first default location that exists,
    /// or fall back to defaults. Environment overrides are applied last.
    pub fn load_or_default(custom_path: Option<&Path>) -> Result<Self> {
        let mut config = match custom_path {
            Some(path) => Self::load(path)?,
            None => {
                let found = DEFAULT_CONFIG_PATHS
                    .iter()
                    .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
                    .find(|p| p.exists());
                match found {
                    Some(path) => {
                        tracing::info!("Loading config from {}", path.display());
                        Self::load(&path)?
                    }
                    None => {
                        tracing::info!("No config file found; using defaults");
                        Self::default()
                    }
                }
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `INPUT_DIR`, `OUTPUTS_DIR`, `STORAGE_DIR`, `HOST` and `PORT`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = non_empty("INPUT_DIR") {
            self.storage.ingest_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = non_empty("OUTPUTS_DIR") {
            self.storage.output_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = non_empty("STORAGE_DIR") {
            self.storage.storage_dir = Some(PathBuf::from(dir));
        }
        if let Some(host) = non_empty("HOST") {
            self.server.host = host;
        }
        if let Some(port) = non_empty("PORT") {
            match port.trim().parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!("Ignoring invalid PORT value '{port}'"),
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.pipeline.max_concurrent_jobs == 0 {
            warnings.push("pipeline.max_concurrent_jobs is 0; it will be treated as 1".into());
        }

        for mode in Mode::ALL {
            if self.pipeline.command(mode).is_none() {
                warnings.push(format!(
                    "no pipeline command configured for {mode}; dispatched {mode} jobs will fail"
                ));
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            static_dir: None,
        }
    }
}

/// Storage roots. Unset paths derive from `base_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub base_dir: PathBuf,
    pub ingest_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub storage_dir: Option<PathBuf>,
    /// Ordered streaming directory candidates, primary first.
    pub stream_dirs: Option<Vec<PathBuf>>,
    pub final_hls_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            ingest_dir: None,
            output_dir: None,
            storage_dir: None,
            stream_dirs: None,
            final_hls_dir: None,
        }
    }
}

impl StorageConfig {
    /// Storage rooted at `base_dir` with every other path derived.
    pub fn with_base(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }
}

/// External pipeline invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub max_concurrent_jobs: usize,
    pub vr180: Option<CommandConfig>,
    pub anaglyph: Option<CommandConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            vr180: None,
            anaglyph: None,
        }
    }
}

impl PipelineConfig {
    /// Command configured for `mode`, if any.
    pub fn command(&self, mode: Mode) -> Option<&CommandConfig> {
        match mode {
            Mode::Vr180 => self.vr180.as_ref(),
            Mode::Anaglyph => self.anaglyph.as_ref(),
        }
    }
}

/// A program and its argument template.
///
/// Arguments may contain `{input}` (input file path) and `{add_audio}`
/// (`true`/`false`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}
