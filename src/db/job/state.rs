use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

use crate::pbs::status::NormalizedState;

/// State column of the job table
///
/// Before the first poll a job is only known to be SUBMITTED, afterwards the column holds the
/// latest normalized state. A FAILED status that only lacked evidence is kept as
/// EVIDENCE_PENDING so the job is polled again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedState {
    Submitted,
    EvidencePending,
    Polled(NormalizedState),
}

impl TrackedState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackedState::Submitted => "SUBMITTED",
            TrackedState::EvidencePending => "EVIDENCE_PENDING",
            TrackedState::Polled(state) => state.as_str(),
        }
    }

    /// Terminal jobs are left out of polling
    pub fn is_terminal(&self) -> bool {
        match self {
            TrackedState::Submitted | TrackedState::EvidencePending => false,
            TrackedState::Polled(state) => state.is_terminal(),
        }
    }
}

impl fmt::Display for TrackedState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for TrackedState {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TrackedState {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "SUBMITTED" => Ok(TrackedState::Submitted),
            "EVIDENCE_PENDING" => Ok(TrackedState::EvidencePending),
            other => other
                .parse::<NormalizedState>()
                .map(TrackedState::Polled)
                .map_err(|err| FromSqlError::Other(err.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_done_and_failed_are_terminal() {
        assert!(!TrackedState::Submitted.is_terminal());
        assert!(!TrackedState::EvidencePending.is_terminal());
        assert!(!TrackedState::Polled(NormalizedState::Running).is_terminal());
        assert!(TrackedState::Polled(NormalizedState::Done).is_terminal());
        assert!(TrackedState::Polled(NormalizedState::Failed).is_terminal());
    }
}
