use std::path::PathBuf;

use crate::error::{IdentifierError, SubmitError};
use crate::pbs::command::{CancelOutcome, Scheduler};
use crate::pbs::diagnostics::Diagnostics;
use crate::pbs::evidence::{EvidenceSource, JobRecord};
use crate::pbs::id::ExternalJobId;
use crate::pbs::sniff::ErrorSniffer;
use crate::pbs::status::JobStatus;
use crate::pbs::translate::StatusCodeTranslator;

/// A rendered job script ready for qsub
///
/// Rendering the script is the caller's business; the runner only needs to know where it is
/// and where the job will leave its output.
#[derive(Debug, Clone)]
pub struct Submission {
    pub script: PathBuf,
    pub working_dir: PathBuf,
    pub stderr_path: Option<PathBuf>,
}

/// Entry point for the calling job manager
///
/// Holds no state between calls. `status` and `cancel` can be called as often as the caller
/// likes, `status` never changes anything on the cluster.
pub struct LifecycleMonitor<'a> {
    pub scheduler: &'a dyn Scheduler,
    pub evidence: &'a dyn EvidenceSource,
    pub sniffer: ErrorSniffer,
    pub diagnostics: &'a dyn Diagnostics,
    pub pbs_host: Option<String>,
}

impl LifecycleMonitor<'_> {
    /// Submit a job and return its record, identified by `<pbs id>__<host>`
    ///
    /// The host binding is checked before qsub runs, a job that can't be tracked is never
    /// submitted.
    pub fn submit(&self, submission: &Submission) -> Result<JobRecord, SubmitError> {
        let host = self.pbs_host.as_deref().unwrap_or_default();
        if host.is_empty() {
            return Err(SubmitError::Configuration(
                "can't find the cluster host name (pbs_host) in the configuration".to_string(),
            ));
        }

        let pbs_id = self.scheduler.submit(&submission.script, &submission.working_dir)?;
        self.diagnostics.info(&format!("PBS job id: {pbs_id}"));
        let external_id = ExternalJobId::encode(&pbs_id, host)?;

        Ok(JobRecord {
            external_id,
            working_dir: submission.working_dir.clone(),
            stderr_path: submission.stderr_path.clone(),
        })
    }

    /// One status query. Always answers, problems come back as FAILED
    ///
    /// qstat is asked once per query, the state and the live counters come from the same listing.
    pub fn status(&self, job: &JobRecord) -> JobStatus {
        let id = match ExternalJobId::decode(&job.external_id) {
            Ok(id) => id,
            Err(err) => {
                self.diagnostics.warn(&err.to_string());
                return JobStatus::failed(&job.external_id, format!("can't check job status: {err}"));
            }
        };

        let snapshot = match self.scheduler.snapshot(&id) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.diagnostics.warn(&format!("{id}: {err}"));
                return JobStatus::evidence_unavailable(
                    &job.external_id,
                    format!("got error while checking job status: {err}"),
                );
            }
        };

        let translator = StatusCodeTranslator {
            scheduler: self.scheduler,
            evidence: self.evidence,
            sniffer: &self.sniffer,
            diagnostics: self.diagnostics,
        };
        translator.translate(job, &id, &snapshot)
    }

    /// Ask the scheduler to delete the job. Deleting a finished job is not an error
    pub fn cancel(&self, external_id: &str) -> Result<CancelOutcome, IdentifierError> {
        let id = ExternalJobId::decode(external_id)?;
        let outcome = self.scheduler.delete(&id);
        match &outcome {
            CancelOutcome::Cancelled => self.diagnostics.info(&format!("{id}: cancelled")),
            CancelOutcome::AlreadyTerminal => self.diagnostics.info(&format!("{id}: nothing to cancel")),
            CancelOutcome::TransportFailure(cause) => self.diagnostics.warn(&format!("{id}: can't cancel: {cause}")),
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use log::Level;

    use super::*;
    use crate::pbs::command::Probe;
    use crate::pbs::diagnostics::testing::Recorder;
    use crate::pbs::status::NormalizedState;
    use crate::pbs::translate::testing::{job_record, FakeEvidence, FakeScheduler};

    fn monitor<'a>(
        scheduler: &'a FakeScheduler,
        evidence: &'a FakeEvidence,
        diagnostics: &'a Recorder,
        pbs_host: Option<&str>,
    ) -> LifecycleMonitor<'a> {
        LifecycleMonitor {
            scheduler,
            evidence,
            sniffer: ErrorSniffer::default(),
            diagnostics,
            pbs_host: pbs_host.map(str::to_string),
        }
    }

    fn submission() -> Submission {
        Submission {
            script: "/scratch/gp/jobs/42/command.pbs".into(),
            working_dir: "/scratch/gp/jobs/42".into(),
            stderr_path: Some("/scratch/gp/jobs/42/stderr.txt".into()),
        }
    }

    #[test]
    fn test_submit() {
        let scheduler = FakeScheduler { job_id: Some("1234.m1".to_string()), ..Default::default() };
        let evidence = FakeEvidence::default();
        let diagnostics = Recorder::default();
        let monitor = monitor(&scheduler, &evidence, &diagnostics, Some("m1.mason"));

        let record = monitor.submit(&submission()).unwrap();
        assert_eq!(record.external_id, "1234.m1__m1.mason");
        assert_eq!(record.working_dir, PathBuf::from("/scratch/gp/jobs/42"));
        assert_eq!(scheduler.submissions.get(), 1);
    }

    #[test]
    fn test_submit_without_host_never_reaches_qsub() {
        let scheduler = FakeScheduler { job_id: Some("1234.m1".to_string()), ..Default::default() };
        let evidence = FakeEvidence::default();
        let diagnostics = Recorder::default();

        for host in [None, Some("")] {
            let monitor = monitor(&scheduler, &evidence, &diagnostics, host);
            let err = monitor.submit(&submission()).unwrap_err();
            assert!(matches!(err, SubmitError::Configuration(_)));
        }
        assert_eq!(scheduler.submissions.get(), 0);
    }

    #[test]
    fn test_submit_qsub_failure() {
        let scheduler = FakeScheduler::default();
        let evidence = FakeEvidence::default();
        let diagnostics = Recorder::default();
        let monitor = monitor(&scheduler, &evidence, &diagnostics, Some("m1"));
        assert!(matches!(monitor.submit(&submission()), Err(SubmitError::Scheduler(_))));
    }

    #[test]
    fn test_status_running_without_counters() {
        let scheduler = FakeScheduler { state: Some("R".to_string()), ..Default::default() };
        let evidence = FakeEvidence::default();
        let diagnostics = Recorder::default();
        let status = monitor(&scheduler, &evidence, &diagnostics, None).status(&job_record());
        assert_eq!(status.normalized(), NormalizedState::Running);
        assert_eq!(status.external_id, "1234.m1__m1.mason.indiana.edu");
    }

    #[test]
    fn test_status_asks_qstat_once() {
        let mut scheduler = FakeScheduler { state: Some("R".to_string()), ..Default::default() };
        scheduler.probes.insert(Probe::CpuTime, "00:02:00".to_string());
        scheduler.probes.insert(Probe::Memory, "1kb".to_string());
        scheduler.probes.insert(Probe::StartTime, "Mon Jan 5 14:05:00 2025".to_string());
        scheduler.probes.insert(Probe::QueueTime, "Mon Jan 5 14:03:22 2025".to_string());
        let evidence = FakeEvidence::default();
        let diagnostics = Recorder::default();

        let status = monitor(&scheduler, &evidence, &diagnostics, None).status(&job_record());
        assert_eq!(status.usage().cpu_time_seconds, Some(120));
        assert_eq!(status.usage().memory_bytes, Some(1024));
        assert!(status.summary().start_time.is_some());
        assert!(status.summary().submit_time.is_some());
        assert_eq!(scheduler.snapshots.get(), 1);
    }

    #[test]
    fn test_status_qstat_failure() {
        let scheduler = FakeScheduler { state_fails: true, ..Default::default() };
        let evidence = FakeEvidence::default();
        let diagnostics = Recorder::default();
        let status = monitor(&scheduler, &evidence, &diagnostics, None).status(&job_record());
        assert_eq!(status.normalized(), NormalizedState::Failed);
        assert_eq!(status.exit_code(), Some(-1));
        assert!(status.message().unwrap().contains("connection refused"));
        assert!(status.is_evidence_pending());
        assert!(diagnostics.contains(Level::Warn, "qstat"));
    }

    #[test]
    fn test_status_null_state() {
        let scheduler = FakeScheduler::default();
        let evidence = FakeEvidence::default();
        let diagnostics = Recorder::default();
        let status = monitor(&scheduler, &evidence, &diagnostics, None).status(&job_record());
        assert_eq!(status.normalized(), NormalizedState::Failed);
    }

    #[test]
    fn test_status_malformed_identifier() {
        let scheduler = FakeScheduler { state: Some("R".to_string()), ..Default::default() };
        let evidence = FakeEvidence::default();
        let diagnostics = Recorder::default();
        let mut job = job_record();
        job.external_id = "1234.m1".to_string();

        let status = monitor(&scheduler, &evidence, &diagnostics, None).status(&job);
        assert_eq!(status.normalized(), NormalizedState::Failed);
        assert!(!status.is_evidence_pending());
        assert!(status.message().unwrap().contains("malformed"));
        assert_eq!(scheduler.snapshots.get(), 0);
    }

    #[test]
    fn test_status_recovers_once_epilogue_appears() {
        let scheduler = FakeScheduler { state: Some("C".to_string()), ..Default::default() };
        let diagnostics = Recorder::default();
        let job = job_record();

        let early = FakeEvidence::default();
        let status = monitor(&scheduler, &early, &diagnostics, None).status(&job);
        assert_eq!(status.normalized(), NormalizedState::Failed);
        assert!(status.is_evidence_pending());

        let later = FakeEvidence {
            epilogue: Some("Job_Exit_Code: 0\nResources_Used: cput=120,vmem=4096000\n".to_string()),
            ..Default::default()
        };
        let status = monitor(&scheduler, &later, &diagnostics, None).status(&job);
        assert_eq!(status.normalized(), NormalizedState::Done);
        assert_eq!(status.exit_code(), Some(0));
        assert_eq!(status.usage().cpu_time_seconds, Some(120));
    }

    #[test]
    fn test_cancel() {
        let evidence = FakeEvidence::default();
        let diagnostics = Recorder::default();

        let scheduler = FakeScheduler::default();
        let outcome = monitor(&scheduler, &evidence, &diagnostics, None).cancel("1234__m1");
        assert_eq!(outcome, Ok(CancelOutcome::Cancelled));

        let scheduler = FakeScheduler { cancel: Some(CancelOutcome::AlreadyTerminal), ..Default::default() };
        let outcome = monitor(&scheduler, &evidence, &diagnostics, None).cancel("1234__m1");
        assert_eq!(outcome, Ok(CancelOutcome::AlreadyTerminal));

        let scheduler = FakeScheduler {
            cancel: Some(CancelOutcome::TransportFailure("no route to host".to_string())),
            ..Default::default()
        };
        let outcome = monitor(&scheduler, &evidence, &diagnostics, None).cancel("1234__m1");
        assert!(matches!(outcome, Ok(CancelOutcome::TransportFailure(_))));
        assert!(diagnostics.contains(Level::Warn, "no route to host"));
    }

    #[test]
    fn test_cancel_malformed_identifier() {
        let scheduler = FakeScheduler::default();
        let evidence = FakeEvidence::default();
        let diagnostics = Recorder::default();
        let outcome = monitor(&scheduler, &evidence, &diagnostics, None).cancel("1234");
        assert_eq!(outcome, Err(IdentifierError::Malformed("1234".to_string())));
    }
}
