/// Keywords that mark a failed job when they show up in its stderr
pub const DEFAULT_ERROR_MARKERS: [&str; 6] = [
    "error",
    "exception",
    "traceback",
    "segmentation fault",
    "core dumped",
    "killed",
];

/// Heuristic check of a job's captured stderr
///
/// A zero exit code in the epilogue only says the job script exited cleanly. Wrapper scripts
/// often swallow the exit status of the tool they run, so stderr gets a second look.
#[derive(Debug, Clone)]
pub struct ErrorSniffer {
    markers: Vec<String>,
}

impl ErrorSniffer {
    pub fn new<S: AsRef<str>>(markers: &[S]) -> ErrorSniffer {
        ErrorSniffer {
            markers: markers
                .iter()
                .map(|m| m.as_ref().trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    /// Case-insensitive search for any marker
    pub fn contains_error_markers(&self, stderr: &str) -> bool {
        let stderr = stderr.to_lowercase();
        self.markers.iter().any(|m| stderr.contains(m.as_str()))
    }
}

impl Default for ErrorSniffer {
    fn default() -> Self {
        ErrorSniffer::new(&DEFAULT_ERROR_MARKERS)
    }
}
