//! Buffered logger for parallel probe execution.
use std::sync::{Arc, Mutex};

use super::logger::{Logger, STAGE_TARGET};
use super::types::{Log, StepStatus};

/// A single buffered log entry, replayed when flushed.
#[derive(Debug, Clone)]
enum LogEntry {
    Stage(String),
    Info(String),
    Debug(String),
    Warn(String),
    Error(String),
}

impl LogEntry {
    /// Replay this entry to the console and log file via tracing.
    fn replay(&self) {
        match self {
            Self::Stage(msg) => tracing::info!(target: STAGE_TARGET, "{msg}"),
            Self::Info(msg) => tracing::info!("{msg}"),
            Self::Debug(msg) => tracing::debug!("{msg}"),
            Self::Warn(msg) => tracing::warn!("{msg}"),
            Self::Error(msg) => tracing::error!("{msg}"),
        }
    }
}

/// Implement the display methods of [`Log`] by buffering each message into
/// `self.entries` as the corresponding [`LogEntry`] variant.
macro_rules! buffer_log_methods {
    ($($method:ident => $variant:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                if let Ok(mut guard) = self.entries.lock() {
                    guard.push(LogEntry::$variant(msg.to_string()));
                }
            }
        )+
    };
}

/// Buffered logger for parallel probe execution.
///
/// Captures display output in memory so that probes running on the rayon
/// pool do not interleave their console output.  The captured entries are
/// replayed in order when [`flush_and_complete`](Self::flush_and_complete)
/// is called.
///
/// [`record_step`](Log::record_step) is forwarded directly to the underlying
/// [`Logger`] because the summary collection is already thread-safe.
#[derive(Debug)]
pub struct BufferedLog {
    inner: Arc<Logger>,
    entries: Mutex<Vec<LogEntry>>,
}

impl BufferedLog {
    /// Create a new buffered logger backed by the given [`Logger`].
    #[must_use]
    pub const fn new(inner: Arc<Logger>) -> Self {
        Self {
            inner,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Replay all buffered entries without touching the progress line.
    #[cfg(test)]
    pub fn flush(&self) {
        let entries = match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => return,
        };
        for entry in &entries {
            entry.replay();
        }
    }

    /// Flush all buffered entries and remove the step from the active set.
    ///
    /// Holds the flush lock on the backing [`Logger`] while replaying, then
    /// redraws the progress line for the steps still running.
    pub fn flush_and_complete(&self, step_name: &str) {
        let _guard = self
            .inner
            .flush_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        self.inner.clear_progress();
        let entries = match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => return,
        };
        for entry in &entries {
            entry.replay();
        }
        let remaining = self.inner.active_steps.lock().ok().and_then(|mut active| {
            active.retain(|n| n != step_name);
            (!active.is_empty()).then(|| active.join(", "))
        });
        if let Some(names) = remaining {
            self.inner.draw_progress(&names);
        }
    }
}

impl Log for BufferedLog {
    buffer_log_methods! {
        stage => Stage,
        info  => Info,
        debug => Debug,
        warn  => Warn,
        error => Error,
    }

    fn record_step(&self, name: &str, status: StepStatus, message: Option<&str>) {
        self.inner.record_step(name, status, message);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::isolated_logger;
    use std::fs;

    #[test]
    fn record_step_forwards_to_logger() {
        let (log, _tmp, _guard) = isolated_logger();
        let log = Arc::new(log);
        let buf = BufferedLog::new(Arc::clone(&log));
        buf.record_step("homebrew", StepStatus::Ok, None);
        let steps = log.step_entries();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].name, "homebrew");
    }

    #[test]
    fn flush_replays_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        let log = Arc::new(log);
        let buf = BufferedLog::new(Arc::clone(&log));
        let marker = format!("buf-marker-{}", std::process::id());
        buf.info(&marker);
        let path = log.log_path().expect("log path");
        let before = fs::read_to_string(path).unwrap();
        assert!(
            !before.contains(&marker),
            "buffered output should not be written before flush"
        );
        buf.flush();
        let after = fs::read_to_string(path).unwrap();
        assert!(after.contains(&marker), "buffered output should appear after flush");
    }

    #[test]
    fn flush_preserves_entry_order() {
        let (log, _tmp, _guard) = isolated_logger();
        let log = Arc::new(log);
        let buf = BufferedLog::new(Arc::clone(&log));
        buf.stage("stage-1");
        buf.info("info-1");
        buf.debug("debug-1");
        buf.warn("warn-1");
        buf.error("error-1");
        buf.flush();
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        let positions: Vec<usize> = ["stage-1", "info-1", "debug-1", "warn-1", "error-1"]
            .iter()
            .map(|m| contents.find(m).expect("marker in log"))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
    }

    #[test]
    fn flush_and_complete_clears_progress_rows() {
        let (log, _tmp, _guard) = isolated_logger();
        let log = Arc::new(log);
        log.notify_step_start("fonts");
        let buf = BufferedLog::new(Arc::clone(&log));
        buf.flush_and_complete("fonts");
        assert_eq!(
            log.progress_rows_count(),
            0,
            "progress_rows should be zero after all steps complete"
        );
    }

    #[test]
    fn flush_and_complete_keeps_remaining_steps() {
        let (log, _tmp, _guard) = isolated_logger();
        let log = Arc::new(log);
        log.notify_step_start("appstore");
        log.notify_step_start("homebrew");
        let buf = BufferedLog::new(Arc::clone(&log));
        buf.flush_and_complete("appstore");
        let active = log.active_steps.lock().unwrap().clone();
        assert_eq!(active, vec!["homebrew".to_string()]);
        assert_eq!(log.progress_rows_count(), 1);
    }
}
