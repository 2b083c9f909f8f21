//! Logging service seam. A registered `LoggingService` preempts `Log`'s
//! direct stdout/stderr writes (spec.md §4.D Response family).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Output,
    Error,
}

pub trait LoggingService: Send + Sync {
    fn write(&self, target: LogTarget, line: &str);
}

/// Default: writes straight to stdout/stderr. Installed only when an
/// embedding application hasn't registered its own sink — `Log` otherwise
/// writes directly, this exists so call sites can treat "service present"
/// uniformly.
pub struct StdioLoggingService;

impl LoggingService for StdioLoggingService {
    fn write(&self, target: LogTarget, line: &str) {
        match target {
            LogTarget::Output => println!("{line}"),
            LogTarget::Error => eprintln!("{line}"),
        }
    }
}
