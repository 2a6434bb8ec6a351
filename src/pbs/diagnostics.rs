//! The status machinery reports what it drops or overrides through a [Diagnostics] sink it is
//! handed, never through the global logger directly, so tests can assert on it.

use log::Level;

pub trait Diagnostics {
    fn emit(&self, level: Level, message: &str);

    fn warn(&self, message: &str) {
        self.emit(Level::Warn, message)
    }

    fn info(&self, message: &str) {
        self.emit(Level::Info, message)
    }

    fn debug(&self, message: &str) {
        self.emit(Level::Debug, message)
    }
}

/// Forwards everything to the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn emit(&self, level: Level, message: &str) {
        log::log!(target: "pbsrun::status", level, "{}", message);
    }
}

#[cfg(test)]
pub mod testing {
    use std::cell::RefCell;

    use super::*;

    /// Keeps every diagnostic for later inspection
    #[derive(Default)]
    pub struct Recorder {
        pub entries: RefCell<Vec<(Level, String)>>,
    }

    impl Recorder {
        pub fn contains(&self, level: Level, fragment: &str) -> bool {
            self.entries
                .borrow()
                .iter()
                .any(|(l, m)| *l == level && m.contains(fragment))
        }
    }

    impl Diagnostics for Recorder {
        fn emit(&self, level: Level, message: &str) {
            self.entries.borrow_mut().push((level, message.to_string()));
        }
    }
}
