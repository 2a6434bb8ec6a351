//! Submit jobs to a PBS/Torque cluster and translate scheduler evidence into a normalized job status
//!
//! The status check is a total function: whatever the scheduler, the epilogue file or the stderr
//! file say (or fail to say), [pbs::monitor::LifecycleMonitor::status] returns a
//! [pbs::status::JobStatus] instead of an error.

use std::path::PathBuf;

pub mod config;
pub mod error;
pub mod pbs;
pub mod db;

/// Directory holding runner state (the tracking database)
pub struct WorkingDirectory {
    pub path: PathBuf,
}
