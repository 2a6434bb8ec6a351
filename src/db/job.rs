//! Job tracking: loading submitted jobs and recording what each status poll found
//!
//! A job enters the table as SUBMITTED when qsub succeeds and is updated with the normalized
//! state after every poll. DONE and FAILED jobs are no longer polled.

pub mod load;
pub mod update;
pub mod state;
