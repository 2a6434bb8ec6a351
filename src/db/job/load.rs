use std::path::PathBuf;

use log::info;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::db::job::state::TrackedState;
use crate::pbs::evidence::JobRecord;

/// A tracked job and the state it was last seen in
#[derive(Debug)]
pub struct TrackedJob {
    pub record: JobRecord,
    pub state: TrackedState,
}

pub fn get_job(conn: &Connection, external_id: &str) -> rusqlite::Result<Option<TrackedJob>> {
    conn.query_row(
        "SELECT external_id, working_dir, stderr_path, state FROM job WHERE external_id = ?1",
        [external_id],
        tracked_job,
    )
    .optional()
}

/// Jobs that still need polling, oldest first
pub fn get_active_jobs(conn: &Connection) -> rusqlite::Result<Vec<TrackedJob>> {
    let mut stmt = conn.prepare(
        "SELECT external_id, working_dir, stderr_path, state FROM job ORDER BY created_at, rowid",
    )?;
    let jobs = stmt
        .query_map([], tracked_job)?
        .filter(|job| !matches!(job, Ok(job) if job.state.is_terminal()))
        .collect::<rusqlite::Result<Vec<TrackedJob>>>()?;
    info!("Loaded {} active jobs from db", jobs.len());
    Ok(jobs)
}

fn tracked_job(row: &Row) -> rusqlite::Result<TrackedJob> {
    let working_dir: String = row.get(1)?;
    let stderr_path: Option<String> = row.get(2)?;
    Ok(TrackedJob {
        record: JobRecord {
            external_id: row.get(0)?,
            working_dir: PathBuf::from(working_dir),
            stderr_path: stderr_path.map(PathBuf::from),
        },
        state: row.get(3)?,
    })
}
