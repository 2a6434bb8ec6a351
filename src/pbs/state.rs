use std::fmt;

/// Job state letter as reported by `qstat -f` (`job_state = R`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawState {
    /// R
    Running,
    /// C
    Completed,
    /// Q
    Queued,
    /// E, leaving the queue / exiting towards completion
    Exiting,
    /// H
    Held,
    /// F, failed according to the scheduler
    Failed,
    /// S
    Suspended,
    /// No state came back at all
    Absent,
    /// Anything else, kept verbatim for the status message
    Unrecognized(String),
}

impl From<Option<&str>> for RawState {
    fn from(raw: Option<&str>) -> Self {
        let raw = match raw.map(str::trim) {
            None | Some("") => return RawState::Absent,
            Some(raw) => raw,
        };
        match raw.to_uppercase().as_str() {
            "R" => RawState::Running,
            "C" => RawState::Completed,
            "Q" => RawState::Queued,
            "E" => RawState::Exiting,
            "H" => RawState::Held,
            "F" => RawState::Failed,
            "S" => RawState::Suspended,
            _ => RawState::Unrecognized(raw.to_string()),
        }
    }
}

impl fmt::Display for RawState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RawState::Running => write!(f, "R"),
            RawState::Completed => write!(f, "C"),
            RawState::Queued => write!(f, "Q"),
            RawState::Exiting => write!(f, "E"),
            RawState::Held => write!(f, "H"),
            RawState::Failed => write!(f, "F"),
            RawState::Suspended => write!(f, "S"),
            RawState::Absent => write!(f, "null"),
            RawState::Unrecognized(raw) => write!(f, "{raw}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_state_from_str() {
        assert_eq!(RawState::from(Some("R")), RawState::Running);
        assert_eq!(RawState::from(Some(" c\n")), RawState::Completed);
        assert_eq!(RawState::from(Some("Q")), RawState::Queued);
        assert_eq!(RawState::from(Some("E")), RawState::Exiting);
        assert_eq!(RawState::from(Some("h")), RawState::Held);
        assert_eq!(RawState::from(Some("F")), RawState::Failed);
        assert_eq!(RawState::from(Some("S")), RawState::Suspended);
    }

    #[test]
    fn test_absent_and_unknown() {
        assert_eq!(RawState::from(None), RawState::Absent);
        assert_eq!(RawState::from(Some("  ")), RawState::Absent);
        assert_eq!(RawState::from(Some("Z")), RawState::Unrecognized("Z".to_string()));
        assert_eq!(RawState::from(Some("RUNNING")).to_string(), "RUNNING");
    }
}
