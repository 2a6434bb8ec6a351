//! PBS/Torque command line integration: qstat, qsub, qdel and Moab's showstart
//!
//! Everything here returns raw text. Interpreting it is left to [crate::pbs::translate].

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::process::Command;

use log::{debug, info};

use crate::config::CommandPaths;
use crate::error::SchedulerError;
use crate::pbs::id::ExternalJobId;
use crate::pbs::state::RawState;

/// Live counters read from a running job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Probe {
    CpuTime,
    Memory,
    StartTime,
    QueueTime,
}

impl Probe {
    pub const ALL: [Probe; 4] = [Probe::CpuTime, Probe::Memory, Probe::StartTime, Probe::QueueTime];

    /// Attribute name in `qstat -f` output
    pub fn attribute(&self) -> &'static str {
        match self {
            Probe::CpuTime => "resources_used.cput",
            Probe::Memory => "resources_used.vmem",
            Probe::StartTime => "start_time",
            Probe::QueueTime => "qtime",
        }
    }
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.attribute())
    }
}

/// Everything one `qstat -f` said about a job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSnapshot {
    /// Raw `job_state` letter, `None` if the scheduler didn't report one
    pub state: Option<String>,
    pub probes: HashMap<Probe, String>,
}

impl JobSnapshot {
    pub fn from_attributes(mut attributes: HashMap<String, String>) -> JobSnapshot {
        let probes = Probe::ALL
            .iter()
            .filter_map(|probe| attributes.remove(probe.attribute()).map(|value| (*probe, value)))
            .collect();
        JobSnapshot { state: attributes.remove("job_state"), probes }
    }

    pub fn raw_state(&self) -> RawState {
        RawState::from(self.state.as_deref())
    }

    pub fn probe(&self, probe: Probe) -> Option<&str> {
        self.probes.get(&probe).map(String::as_str)
    }
}

/// Result of asking the scheduler to delete a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    /// The job had already finished or been removed
    AlreadyTerminal,
    /// qdel couldn't be run or failed for another reason
    TransportFailure(String),
}

/// The batch scheduler as seen by the runner
pub trait Scheduler {
    /// State and live counters of a job, read in one go so they agree with each other
    fn snapshot(&self, job: &ExternalJobId) -> Result<JobSnapshot, SchedulerError>;

    /// Human readable start estimate for a queued job
    fn start_estimate(&self, job: &ExternalJobId) -> Result<Option<String>, SchedulerError>;

    /// Submit a job script, returning the scheduler job id
    fn submit(&self, script: &Path, working_dir: &Path) -> Result<String, SchedulerError>;

    fn delete(&self, job: &ExternalJobId) -> CancelOutcome;
}

/// [Scheduler] backed by the PBS executables
pub struct PbsCommands {
    paths: CommandPaths,
}

impl PbsCommands {
    pub fn new(paths: CommandPaths) -> PbsCommands {
        PbsCommands { paths }
    }
}

impl Scheduler for PbsCommands {
    fn snapshot(&self, job: &ExternalJobId) -> Result<JobSnapshot, SchedulerError> {
        let stdout = run(&self.paths.qstat, &["-f", &job.destination()], None)?;
        Ok(JobSnapshot::from_attributes(parse_qstat_full(&stdout)))
    }

    fn start_estimate(&self, job: &ExternalJobId) -> Result<Option<String>, SchedulerError> {
        let stdout = run(&self.paths.showstart, &[&job.destination()], None)?;
        Ok(parse_showstart(&stdout))
    }

    fn submit(&self, script: &Path, working_dir: &Path) -> Result<String, SchedulerError> {
        let script = script.display().to_string();
        info!("Running qsub in {}", working_dir.display());
        let stdout = run(&self.paths.qsub, &[&script], Some(working_dir))?;
        stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| SchedulerError::NoJobId(self.paths.qsub.clone()))
    }

    fn delete(&self, job: &ExternalJobId) -> CancelOutcome {
        match run(&self.paths.qdel, &[&job.destination()], None) {
            Ok(_) => CancelOutcome::Cancelled,
            Err(SchedulerError::Exit { stderr, .. }) if is_already_terminal(&stderr) => {
                info!("{} already finished: {}", job, stderr.trim());
                CancelOutcome::AlreadyTerminal
            }
            Err(err) => CancelOutcome::TransportFailure(err.to_string()),
        }
    }
}

/// Run a command and return stdout, failing on spawn errors and non-zero exits
fn run(program: &str, args: &[&str], working_dir: Option<&Path>) -> Result<String, SchedulerError> {
    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = working_dir {
        command.current_dir(dir);
    }
    debug!("{:?}", &command);

    let output = command.output().map_err(|source| SchedulerError::Spawn {
        command: program.to_string(),
        source,
    })?;

    if !output.status.success() {
        return Err(SchedulerError::Exit {
            command: program.to_string(),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Parse `qstat -f` output into attribute/value pairs
///
/// Attributes look like `    job_state = R`. Long values are wrapped onto continuation lines
/// that start with a tab, those are glued back onto the previous value.
pub fn parse_qstat_full(output: &str) -> HashMap<String, String> {
    let mut attributes: HashMap<String, String> = HashMap::new();
    let mut last_key: Option<String> = None;

    for line in output.lines() {
        if line.starts_with('\t') {
            if let Some(value) = last_key.as_ref().and_then(|k| attributes.get_mut(k)) {
                value.push_str(line.trim());
            }
            continue;
        }
        match line.split_once(" = ") {
            Some((key, value)) => {
                let key = key.trim().to_string();
                attributes.insert(key.clone(), value.trim().to_string());
                last_key = Some(key);
            }
            None => last_key = None,
        }
    }

    attributes
}

/// First line of showstart output carrying the start estimate
fn parse_showstart(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| line.to_lowercase().contains("start in"))
        .map(str::to_string)
}

/// qdel complaints that mean there's nothing left to cancel
fn is_already_terminal(stderr: &str) -> bool {
    let stderr = stderr.to_lowercase();
    ["unknown job id", "invalid state for job", "job has finished"]
        .iter()
        .any(|marker| stderr.contains(marker))
}
