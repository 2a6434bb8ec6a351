use log::{info, warn};
use rusqlite::{Connection, OptionalExtension};

use crate::db::job::state::TrackedState;
use crate::pbs::evidence::JobRecord;
use crate::pbs::status::JobStatus;

impl JobRecord {
    /// Start tracking a freshly submitted job
    pub fn track(&self, conn: &Connection) -> rusqlite::Result<()> {
        info!("Tracking {} in {}", self.external_id, self.working_dir.display());
        let stderr_path = self.stderr_path.as_ref().map(|p| p.display().to_string());
        conn.execute(
            "INSERT INTO job (external_id, working_dir, stderr_path, state) VALUES (?1, ?2, ?3, ?4)",
            (
                &self.external_id,
                self.working_dir.display().to_string(),
                stderr_path,
                TrackedState::Submitted,
            ),
        )?;
        Ok(())
    }
}

impl JobStatus {
    /// Store the outcome of a poll and return the state written, `None` if the job isn't tracked
    ///
    /// A FAILED status caused by missing evidence is stored as EVIDENCE_PENDING, so the job keeps
    /// being polled. After `max_pending_polls` such polls in a row it is stored as FAILED for good.
    pub fn record(&self, conn: &Connection, max_pending_polls: u32) -> rusqlite::Result<Option<TrackedState>> {
        let pending_polls: Option<u32> = conn
            .query_row(
                "SELECT pending_polls FROM job WHERE external_id = ?1",
                [&self.external_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(pending_polls) = pending_polls else {
            warn!("{} is not tracked, status not recorded", self.external_id);
            return Ok(None);
        };

        let pending_polls = pending_polls.saturating_add(1);
        let (state, pending_polls, exit_code) = if self.is_evidence_pending() && pending_polls < max_pending_polls {
            info!("{}: no verdict yet ({pending_polls}/{max_pending_polls})", self.external_id);
            (TrackedState::EvidencePending, pending_polls, None)
        } else {
            (TrackedState::Polled(self.normalized()), 0, self.exit_code())
        };

        info!("Updating {} with state {state}", self.external_id);
        conn.execute(
            "UPDATE job SET state = ?1, pending_polls = ?2, exit_code = ?3, message = ?4, \
             updated_at = CURRENT_TIMESTAMP WHERE external_id = ?5",
            (state, pending_polls, exit_code, self.message(), &self.external_id),
        )?;
        Ok(Some(state))
    }
}
