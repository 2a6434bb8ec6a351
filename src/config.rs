//! Runner configuration, read from a JSON file
//!
//! Example:
//!
//! ```json
//! {
//!   "pbs_host": "m1.mason.indiana.edu",
//!   "commands": { "qsub": "/usr/bin/qsub", "showstart": "/opt/moab/bin/showstart" },
//!   "error_markers": ["error", "exception"],
//!   "max_pending_polls": 20
//! }
//! ```
//!
//! Every key is optional. Without `pbs_host` the runner can still query and cancel existing jobs,
//! but submission fails because the host must be baked into the job identifier.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Deserialize;

use crate::pbs::sniff::DEFAULT_ERROR_MARKERS;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub pbs_host: Option<String>,
    pub commands: CommandPaths,
    pub error_markers: Vec<String>,
    /// stderr file name inside the job directory, used when a submission doesn't name one
    pub stderr_file: String,
    /// Polls in a row a finished job may lack its epilogue before it is recorded as FAILED
    pub max_pending_polls: u32,
}

/// Paths to the PBS / Moab executables
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CommandPaths {
    pub qsub: String,
    pub qstat: String,
    pub qdel: String,
    pub showstart: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            pbs_host: None,
            commands: CommandPaths::default(),
            error_markers: DEFAULT_ERROR_MARKERS.iter().map(|m| m.to_string()).collect(),
            stderr_file: "stderr.txt".to_string(),
            max_pending_polls: 10,
        }
    }
}

impl Default for CommandPaths {
    fn default() -> Self {
        CommandPaths {
            qsub: "qsub".to_string(),
            qstat: "qstat".to_string(),
            qdel: "qdel".to_string(),
            showstart: "showstart".to_string(),
        }
    }
}

impl RunnerConfig {
    /// Load configuration, falling back to defaults if the file doesn't exist
    pub fn load(path: &Path) -> Result<RunnerConfig> {
        if !path.exists() {
            warn!("No configuration at {}, using defaults", path.display());
            return Ok(RunnerConfig::default());
        }

        info!("Reading configuration from {}", path.display());
        let json_string = fs::read_to_string(path)
            .with_context(|| format!("Can't read configuration {}", path.display()))?;
        let config: RunnerConfig = serde_json::from_str(&json_string)
            .with_context(|| format!("Invalid configuration {}", path.display()))?;

        match &config.pbs_host {
            Some(host) => info!("Jobs will be submitted to {host}"),
            None => warn!("pbs_host is not set, job submission will fail"),
        }

        Ok(config)
    }
}
