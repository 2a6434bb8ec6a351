//! Talk to a PBS/Torque scheduler and translate what it says into a normalized job status

/// Composite `<pbs id>__<host>` job identifiers
pub mod id;
/// Parse the key/value epilogue record written after a job completes
pub mod epilogue;
/// Parse PBS resource and timestamp values
pub mod value;
/// Look for failure keywords in a job's stderr
pub mod sniff;
/// Raw single-letter scheduler states
pub mod state;
/// The normalized job status returned by every status query
pub mod status;
/// Diagnostics sink passed into the status machinery
pub mod diagnostics;
/// Read completion evidence (epilogue and stderr files)
pub mod evidence;
/// Run qstat, qsub, qdel and showstart
pub mod command;
/// Turn a raw state plus evidence into a job status
pub mod translate;
/// Answer status, submit and cancel requests
pub mod monitor;
