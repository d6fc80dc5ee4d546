//! Core logging types: step entries, status, and the [`Log`] trait.

/// Outcome of one probe or restore category, kept for the run summary.
#[derive(Debug, Clone)]
pub struct StepEntry {
    /// Human-readable step name.
    pub name: String,
    /// Final status of the step.
    pub status: StepStatus,
    /// Optional detail message (e.g., counts, skip reason or error description).
    pub message: Option<String>,
}

/// Status of a completed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Step completed with no failures.
    Ok,
    /// Step had nothing to do (empty category, nothing found).
    Skipped,
    /// Step completed but one or more items failed.
    Partial,
    /// Step could not run at all (probe error, missing tool, missing payload).
    Failed,
}

impl StepStatus {
    /// Whether this status should make the command exit non-zero.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Partial | Self::Failed)
    }
}

/// Abstraction over logging backends.
///
/// Both [`Logger`](super::logger::Logger) (direct output) and
/// [`BufferedLog`](super::buffered::BufferedLog) (deferred output for
/// parallel probes) implement this trait, so the backup and restore engines
/// report progress without knowing how it is rendered.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Record a step result for the summary.
    fn record_step(&self, name: &str, status: StepStatus, message: Option<&str>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_statuses() {
        assert!(StepStatus::Failed.is_failure());
        assert!(StepStatus::Partial.is_failure());
        assert!(!StepStatus::Ok.is_failure());
        assert!(!StepStatus::Skipped.is_failure());
    }

    #[test]
    fn step_entry_clone() {
        let entry = StepEntry {
            name: "fonts".to_string(),
            status: StepStatus::Ok,
            message: Some("3 restored".to_string()),
        };
        let cloned = entry.clone();
        assert_eq!(cloned.name, entry.name);
        assert_eq!(cloned.status, entry.status);
        assert_eq!(cloned.message, entry.message);
    }
}
