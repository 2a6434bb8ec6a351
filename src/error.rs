//! Error types surfaced by the runner
//!
//! Only submission, identifier decoding and command plumbing return these. Anything that goes
//! wrong while gathering status evidence is folded into a FAILED job status instead.

use std::io;

use thiserror::Error;

/// Errors raised before a job is tracked
#[derive(Error, Debug)]
pub enum SubmitError {
    /// The deployment did not bind a cluster host, so the job could never be queried later
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

/// A composite job identifier that can't be split back into its parts
#[derive(Error, Debug, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("malformed job identifier '{0}': expected <pbs id>__<host>")]
    Malformed(String),

    #[error("ambiguous job identifier '{0}': separator '__' appears inside a component")]
    Ambiguous(String),
}

/// Failure of an external scheduler command
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("can't run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("{command} exited with {status}: {stderr}")]
    Exit {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("{0} returned no job id")]
    NoJobId(String),
}

/// Transient failure while reading completion evidence
#[derive(Error, Debug)]
pub enum EvidenceError {
    #[error("can't read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
}
