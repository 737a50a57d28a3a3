//! The external processing pipeline as seen from the server.
//!
//! The server never inspects what a pipeline does; it only hands over a
//! [`ProcessingJob`] and observes success or failure for the job record.

use std::collections::HashMap;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use vrs_core::config::{CommandConfig, PipelineConfig};
use vrs_core::{Error, Mode, ProcessingJob, Result};

/// Runs one processing job to completion.
#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn run(&self, job: &ProcessingJob) -> Result<()>;
}

/// Pipeline backed by configured external commands, one per mode.
///
/// Commands run without a timeout; conversions of long videos take as long as
/// they take.
#[derive(Debug, Clone, Default)]
pub struct CommandPipeline {
    commands: HashMap<Mode, CommandConfig>,
}

impl CommandPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        let commands = Mode::ALL
            .into_iter()
            .filter_map(|mode| config.command(mode).map(|c| (mode, c.clone())))
            .collect();
        Self { commands }
    }

    pub fn with_command(mut self, mode: Mode, command: CommandConfig) -> Self {
        self.commands.insert(mode, command);
        self
    }
}

#[async_trait]
impl Pipeline for CommandPipeline {
    async fn run(&self, job: &ProcessingJob) -> Result<()> {
        let Some(command) = self.commands.get(&job.mode) else {
            return Err(Error::pipeline(job.mode, "no pipeline command configured"));
        };

        let args = render_args(&command.args, job);
        tracing::debug!(program = %command.program, ?args, "Spawning pipeline command");

        let status = Command::new(&command.program)
            .args(&args)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| {
                Error::pipeline(job.mode, format!("failed to spawn {}: {e}", command.program))
            })?;

        if !status.success() {
            return Err(Error::pipeline(
                job.mode,
                format!("{} exited with {status}", command.program),
            ));
        }
        Ok(())
    }
}

/// Substitute `{input}` and `{add_audio}` in each argument.
fn render_args(args: &[String], job: &ProcessingJob) -> Vec<String> {
    let input = job.input_path.to_string_lossy();
    let add_audio = if job.add_audio { "true" } else { "false" };
    args.iter()
        .map(|a| a.replace("{input}", &input).replace("{add_audio}", add_audio))
        .collect()
}
