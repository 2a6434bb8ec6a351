//! The status state machine
//!
//! | raw | status                                                   |
//! | --- | -------------------------------------------------------- |
//! | R   | RUNNING, with whatever live probes answered              |
//! | Q   | QUEUED, with the showstart estimate if there is one      |
//! | E   | RUNNING                                                  |
//! | H   | QUEUED_HELD                                              |
//! | S   | SUSPENDED                                                |
//! | F   | FAILED                                                   |
//! | C   | DONE or FAILED depending on the epilogue and stderr      |
//! | ?   | FAILED, message records the raw value                    |
//!
//! Nothing in here returns an error. Evidence that can't be read or parsed either drops the
//! field it would have filled in, or turns the whole status into FAILED.

use chrono::{DateTime, Local};

use crate::error::EvidenceError;
use crate::pbs::command::{JobSnapshot, Probe, Scheduler};
use crate::pbs::diagnostics::Diagnostics;
use crate::pbs::epilogue::EpilogueRecord;
use crate::pbs::evidence::{EvidenceSource, JobRecord};
use crate::pbs::id::ExternalJobId;
use crate::pbs::sniff::ErrorSniffer;
use crate::pbs::state::RawState;
use crate::pbs::status::{FailureCause, JobState, JobStatus, ResourceUsage};
use crate::pbs::value::{parse_bytes, parse_seconds, parse_timestamp};

pub struct StatusCodeTranslator<'a> {
    pub scheduler: &'a dyn Scheduler,
    pub evidence: &'a dyn EvidenceSource,
    pub sniffer: &'a ErrorSniffer,
    pub diagnostics: &'a dyn Diagnostics,
}

impl StatusCodeTranslator<'_> {
    pub fn translate(&self, job: &JobRecord, id: &ExternalJobId, snapshot: &JobSnapshot) -> JobStatus {
        let raw = &snapshot.raw_state();
        self.diagnostics.debug(&format!("{id}: job_state {raw}"));
        let state = match raw {
            RawState::Running => self.running(id, snapshot),
            RawState::Queued => self.queued(id),
            RawState::Exiting => JobState::Running {
                usage: ResourceUsage::default(),
                start_time: None,
                submit_time: None,
            },
            RawState::Held => JobState::QueuedHeld,
            RawState::Suspended => JobState::Suspended,
            RawState::Failed => JobState::Failed {
                message: format!("job didn't finish normally, scheduler declared it failed, return {raw}"),
                cause: FailureCause::Job,
            },
            RawState::Completed => self.completed(job, raw),
            RawState::Absent => {
                self.diagnostics.debug(&format!("{id}: no job_state from PBS"));
                JobState::Failed {
                    message: format!("receive null from PBS, return {raw}"),
                    cause: FailureCause::EvidenceUnavailable,
                }
            }
            RawState::Unrecognized(code) => {
                self.diagnostics.debug(&format!("{id}: unknown job_state '{code}'"));
                JobState::Failed {
                    message: format!("receive strange code from PBS, return {code}"),
                    cause: FailureCause::Job,
                }
            }
        };
        JobStatus::new(&job.external_id, state)
    }

    /// Live probes are best effort, each one that is missing or unreadable is simply left out
    fn running(&self, id: &ExternalJobId, snapshot: &JobSnapshot) -> JobState {
        JobState::Running {
            usage: ResourceUsage {
                cpu_time_seconds: self.probe_value(id, snapshot, Probe::CpuTime, parse_seconds),
                memory_bytes: self.probe_value(id, snapshot, Probe::Memory, parse_bytes),
            },
            start_time: self.probe_value(id, snapshot, Probe::StartTime, parse_timestamp),
            submit_time: self.probe_value(id, snapshot, Probe::QueueTime, parse_timestamp),
        }
    }

    fn probe_value<T>(
        &self,
        id: &ExternalJobId,
        snapshot: &JobSnapshot,
        probe: Probe,
        parse: fn(&str) -> Option<T>,
    ) -> Option<T> {
        let Some(value) = snapshot.probe(probe) else {
            self.diagnostics.debug(&format!("{id}: no {probe} reported yet"));
            return None;
        };
        let parsed = parse(value);
        if parsed.is_none() {
            self.diagnostics.warn(&format!("{id}: can't parse {probe} '{value}'"));
        }
        parsed
    }

    fn queued(&self, id: &ExternalJobId) -> JobState {
        self.diagnostics.debug(&format!("{id}: queued, checking showstart"));
        let estimate = match self.scheduler.start_estimate(id) {
            Ok(estimate) => estimate,
            Err(err) => {
                self.diagnostics.warn(&format!("{id}: no start estimate: {err}"));
                None
            }
        };
        JobState::Queued { estimate }
    }

    fn completed(&self, job: &JobRecord, raw: &RawState) -> JobState {
        match self.completion(job, raw, Local::now()) {
            Ok(state) => state,
            Err(err) => {
                self.diagnostics.warn(&format!("{}: {err}", job.external_id));
                JobState::Failed {
                    message: format!("got error while reading completion evidence, return {raw}: {err}"),
                    cause: FailureCause::EvidenceUnavailable,
                }
            }
        }
    }

    /// A completed job is DONE only if its epilogue exit code is 0 and its stderr looks clean
    fn completion(&self, job: &JobRecord, raw: &RawState, now: DateTime<Local>) -> Result<JobState, EvidenceError> {
        let external_id = &job.external_id;

        // the epilogue may lag behind qstat, a later poll will find it
        if !self.evidence.has_epilogue(job) {
            return Ok(JobState::Failed {
                message: format!("can't find pbs epilogue output (completion evidence), return {raw}"),
                cause: FailureCause::EvidenceUnavailable,
            });
        }

        let contents = self.evidence.read_epilogue(job)?;
        let record = EpilogueRecord::parse(&String::from_utf8_lossy(&contents));
        if let Some(queue) = &record.queue_name {
            self.diagnostics.debug(&format!("{external_id}: finished in queue {queue}"));
        }

        match record.exit_code.as_deref() {
            Some("0") => {}
            Some(code) => {
                return Ok(JobState::Failed {
                    message: format!("job finished but exit code is {code} not 0, return {raw}"),
                    cause: FailureCause::Job,
                });
            }
            None => {
                return Ok(JobState::Failed {
                    message: format!("job finished but epilogue has no exit code, return {raw}"),
                    cause: FailureCause::Job,
                });
            }
        }

        let message = match self.evidence.read_error_output(job)? {
            Some(stderr) if self.sniffer.contains_error_markers(&String::from_utf8_lossy(&stderr)) => {
                self.diagnostics.info(&format!("{external_id}: exit code 0 overridden by errors in stderr"));
                return Ok(JobState::Failed {
                    message: format!("job finished, stderr exists and contains some errors, return {raw}"),
                    cause: FailureCause::Job,
                });
            }
            Some(_) => format!("job finished, stderr exists but no errors in it, everything looks good, return {raw}"),
            None => format!("job finished, everything looks good, return {raw}"),
        };

        let resources = record.resources();
        let memory = resources.vmem.or(resources.mem);
        if memory.is_none() {
            self.diagnostics.warn(&format!("{external_id}: can't parse vmem from epilogue"));
        }
        if resources.cput.is_none() {
            self.diagnostics.warn(&format!("{external_id}: can't parse cput from epilogue"));
        }
        if let Some(walltime) = resources.walltime {
            self.diagnostics.debug(&format!("{external_id}: walltime {walltime}s"));
        }

        Ok(JobState::Done {
            usage: ResourceUsage { cpu_time_seconds: resources.cput, memory_bytes: memory },
            end_time: now,
            message,
        })
    }
}
