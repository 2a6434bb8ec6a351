use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::Serialize;

/// Exit code reported for every FAILED status
pub const FAILED_EXIT_CODE: i32 = -1;

/// The states a calling job manager understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NormalizedState {
    Running,
    Queued,
    QueuedHeld,
    Suspended,
    Done,
    Failed,
}

impl NormalizedState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizedState::Running => "RUNNING",
            NormalizedState::Queued => "QUEUED",
            NormalizedState::QueuedHeld => "QUEUED_HELD",
            NormalizedState::Suspended => "SUSPENDED",
            NormalizedState::Done => "DONE",
            NormalizedState::Failed => "FAILED",
        }
    }

    /// DONE and FAILED jobs don't need to be polled again
    pub fn is_terminal(&self) -> bool {
        matches!(self, NormalizedState::Done | NormalizedState::Failed)
    }
}

impl fmt::Display for NormalizedState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NormalizedState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RUNNING" => Ok(NormalizedState::Running),
            "QUEUED" => Ok(NormalizedState::Queued),
            "QUEUED_HELD" => Ok(NormalizedState::QueuedHeld),
            "SUSPENDED" => Ok(NormalizedState::Suspended),
            "DONE" => Ok(NormalizedState::Done),
            "FAILED" => Ok(NormalizedState::Failed),
            other => Err(format!("unknown job state {other}")),
        }
    }
}

/// Why a status came back FAILED
///
/// A job that really failed stays failed. Missing or unreadable evidence can clear up on a later
/// poll, e.g. when the epilogue is written a little after qstat reports `C`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    Job,
    EvidenceUnavailable,
}

/// CPU time and memory, each independently optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceUsage {
    pub cpu_time_seconds: Option<u64>,
    pub memory_bytes: Option<u64>,
}

/// State plus the fields that make sense for it
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Running {
        usage: ResourceUsage,
        start_time: Option<DateTime<Local>>,
        submit_time: Option<DateTime<Local>>,
    },
    Queued {
        /// estimated start time from showstart
        estimate: Option<String>,
    },
    QueuedHeld,
    Suspended,
    Done {
        usage: ResourceUsage,
        end_time: DateTime<Local>,
        message: String,
    },
    Failed {
        message: String,
        cause: FailureCause,
    },
}

/// Result of one status query
///
/// Built once per query and never cached: the caller decides what to keep.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub external_id: String,
    pub state: JobState,
}

impl JobStatus {
    pub fn new(external_id: &str, state: JobState) -> JobStatus {
        JobStatus { external_id: external_id.to_string(), state }
    }

    pub fn failed(external_id: &str, message: String) -> JobStatus {
        JobStatus::new(external_id, JobState::Failed { message, cause: FailureCause::Job })
    }

    /// FAILED for now, because the evidence needed to decide couldn't be gathered
    pub fn evidence_unavailable(external_id: &str, message: String) -> JobStatus {
        JobStatus::new(external_id, JobState::Failed { message, cause: FailureCause::EvidenceUnavailable })
    }

    /// A later poll may still come to a different verdict
    pub fn is_evidence_pending(&self) -> bool {
        matches!(self.state, JobState::Failed { cause: FailureCause::EvidenceUnavailable, .. })
    }

    pub fn normalized(&self) -> NormalizedState {
        match self.state {
            JobState::Running { .. } => NormalizedState::Running,
            JobState::Queued { .. } => NormalizedState::Queued,
            JobState::QueuedHeld => NormalizedState::QueuedHeld,
            JobState::Suspended => NormalizedState::Suspended,
            JobState::Done { .. } => NormalizedState::Done,
            JobState::Failed { .. } => NormalizedState::Failed,
        }
    }

    /// 0 for DONE, -1 for FAILED, nothing while the job is still alive
    pub fn exit_code(&self) -> Option<i32> {
        match self.state {
            JobState::Done { .. } => Some(0),
            JobState::Failed { .. } => Some(FAILED_EXIT_CODE),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match &self.state {
            JobState::Queued { estimate } => estimate.as_deref(),
            JobState::Done { message, .. } | JobState::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn usage(&self) -> ResourceUsage {
        match self.state {
            JobState::Running { usage, .. } | JobState::Done { usage, .. } => usage,
            _ => ResourceUsage::default(),
        }
    }

    /// Flat view with every optional field, for JSON output and the tracking database
    pub fn summary(&self) -> StatusSummary {
        let usage = self.usage();
        let (start_time, submit_time, end_time) = match self.state {
            JobState::Running { start_time, submit_time, .. } => (start_time, submit_time, None),
            JobState::Done { end_time, .. } => (None, None, Some(end_time)),
            _ => (None, None, None),
        };
        StatusSummary {
            external_id: self.external_id.clone(),
            state: self.normalized(),
            exit_code: self.exit_code(),
            start_time,
            submit_time,
            end_time,
            cpu_time_seconds: usage.cpu_time_seconds,
            memory_bytes: usage.memory_bytes,
            message: self.message().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSummary {
    pub external_id: String,
    pub state: NormalizedState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Local>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit_time: Option<DateTime<Local>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Local>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_time_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let failed = JobStatus::failed("1__m1", "boom".to_string());
        assert_eq!(failed.normalized(), NormalizedState::Failed);
        assert_eq!(failed.exit_code(), Some(-1));
        assert_eq!(failed.message(), Some("boom"));

        let done = JobStatus::new("1__m1", JobState::Done {
            usage: ResourceUsage::default(),
            end_time: Local::now(),
            message: "ok".to_string(),
        });
        assert_eq!(done.exit_code(), Some(0));

        assert_eq!(JobStatus::new("1__m1", JobState::QueuedHeld).exit_code(), None);
    }

    #[test]
    fn test_evidence_pending_is_still_failed() {
        let pending = JobStatus::evidence_unavailable("1__m1", "no epilogue yet".to_string());
        assert_eq!(pending.normalized(), NormalizedState::Failed);
        assert_eq!(pending.exit_code(), Some(-1));
        assert!(pending.is_evidence_pending());

        assert!(!JobStatus::failed("1__m1", "exit code 1".to_string()).is_evidence_pending());
    }

    #[test]
    fn test_normalized_state_names() {
        let states = [
            NormalizedState::Running,
            NormalizedState::Queued,
            NormalizedState::QueuedHeld,
            NormalizedState::Suspended,
            NormalizedState::Done,
            NormalizedState::Failed,
        ];
        for state in states {
            assert_eq!(state.as_str().parse::<NormalizedState>(), Ok(state));
        }
        assert!("SUBMITTED".parse::<NormalizedState>().is_err());
        assert!(NormalizedState::Done.is_terminal());
        assert!(!NormalizedState::QueuedHeld.is_terminal());
    }

    #[test]
    fn test_summary_json_skips_irrelevant_fields() {
        let status = JobStatus::new("1__m1", JobState::Running {
            usage: ResourceUsage { cpu_time_seconds: Some(30), memory_bytes: None },
            start_time: None,
            submit_time: None,
        });
        let json = serde_json::to_string(&status.summary()).unwrap();
        assert_eq!(json, r#"{"external_id":"1__m1","state":"RUNNING","cpu_time_seconds":30}"#);

        let held = JobStatus::new("1__m1", JobState::QueuedHeld);
        let json = serde_json::to_string(&held.summary()).unwrap();
        assert_eq!(json, r#"{"external_id":"1__m1","state":"QUEUED_HELD"}"#);
    }
}
