use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::EvidenceError;

/// Epilogue location relative to the job working directory
pub const EPILOGUE_PATH: &str = ".pbs/.epilogue.pbs";

/// What the runner knows about a tracked job besides its identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub external_id: String,
    pub working_dir: PathBuf,
    pub stderr_path: Option<PathBuf>,
}

/// Source of the files that decide whether a completed job really succeeded
pub trait EvidenceSource {
    fn has_epilogue(&self, job: &JobRecord) -> bool;

    fn read_epilogue(&self, job: &JobRecord) -> Result<Vec<u8>, EvidenceError>;

    /// `None` if the job has no stderr file (yet)
    fn read_error_output(&self, job: &JobRecord) -> Result<Option<Vec<u8>>, EvidenceError>;
}

/// Evidence read from the shared filesystem the cluster writes to
#[derive(Debug, Clone, Copy, Default)]
pub struct FileEvidence;

impl FileEvidence {
    pub fn epilogue_path(job: &JobRecord) -> PathBuf {
        job.working_dir.join(EPILOGUE_PATH)
    }
}

impl EvidenceSource for FileEvidence {
    fn has_epilogue(&self, job: &JobRecord) -> bool {
        FileEvidence::epilogue_path(job).is_file()
    }

    fn read_epilogue(&self, job: &JobRecord) -> Result<Vec<u8>, EvidenceError> {
        read(&FileEvidence::epilogue_path(job))
    }

    fn read_error_output(&self, job: &JobRecord) -> Result<Option<Vec<u8>>, EvidenceError> {
        let Some(path) = &job.stderr_path else {
            return Ok(None);
        };
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(read_error(path, err)),
        }
    }
}

fn read(path: &Path) -> Result<Vec<u8>, EvidenceError> {
    fs::read(path).map_err(|err| read_error(path, err))
}

fn read_error(path: &Path, source: io::Error) -> EvidenceError {
    EvidenceError::Read { path: path.display().to_string(), source }
}
