use std::fmt;

use crate::error::{IdentifierError, SubmitError};

/// Separator between the PBS job id and the cluster host
pub const SEPARATOR: &str = "__";

/// The externally visible handle of a submitted job: `<pbs id>__<host>`
///
/// The cluster host is part of the identifier because every later qstat / qdel has to be sent
/// to `<pbs id>@<host>`. Neither part may contain the separator, otherwise decoding would be
/// ambiguous, so [ExternalJobId::encode] refuses such input instead of producing an identifier
/// that can't be read back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalJobId {
    pub pbs_id: String,
    pub host: String,
}

impl ExternalJobId {
    pub fn encode(pbs_id: &str, host: &str) -> Result<String, SubmitError> {
        if host.is_empty() {
            return Err(SubmitError::Configuration(
                "can't find the cluster host name (pbs_host) in the configuration".to_string(),
            ));
        }
        if pbs_id.is_empty() {
            return Err(SubmitError::Configuration("scheduler returned an empty job id".to_string()));
        }
        if pbs_id.contains(SEPARATOR) || host.contains(SEPARATOR) {
            return Err(SubmitError::Configuration(format!(
                "'{pbs_id}' / '{host}' contains the identifier separator '{SEPARATOR}'"
            )));
        }
        Ok(format!("{pbs_id}{SEPARATOR}{host}"))
    }

    pub fn decode(identifier: &str) -> Result<ExternalJobId, IdentifierError> {
        let parts: Vec<&str> = identifier.split(SEPARATOR).collect();
        match parts.as_slice() {
            [pbs_id, host] if !pbs_id.is_empty() && !host.is_empty() => Ok(ExternalJobId {
                pbs_id: pbs_id.to_string(),
                host: host.to_string(),
            }),
            [_, _] | [_] => Err(IdentifierError::Malformed(identifier.to_string())),
            _ => Err(IdentifierError::Ambiguous(identifier.to_string())),
        }
    }

    /// Destination used by qstat / qdel / showstart
    pub fn destination(&self) -> String {
        format!("{}@{}", self.pbs_id, self.host)
    }
}

impl fmt::Display for ExternalJobId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}{}", self.pbs_id, SEPARATOR, self.host)
    }
}
