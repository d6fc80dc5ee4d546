//! Domain-specific error types for the backup and restore engine.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! Internal modules return typed errors (e.g., [`ManifestError`], [`ToolError`])
//! while command handlers at the CLI boundary convert them to [`anyhow::Error`]
//! via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! MacbacError
//! ├── Config(ConfigError)     : TOML config file reading and parsing
//! ├── Tool(ToolError)         : external program invocation
//! ├── Probe(ProbeError)       : a probe that could not produce an inventory
//! └── Manifest(ManifestError) : manifest.json loading and writing
//! ```
//!
//! Per-item restore failures are not errors at all: they are folded into
//! [`RestoreStats`](crate::restore::RestoreStats).

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the engine.
///
/// Aggregates domain-specific sub-errors and is convertible to
/// [`anyhow::Error`] for use at CLI command boundaries.
#[derive(Error, Debug)]
pub enum MacbacError {
    /// Configuration-related error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// External tool invocation error.
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Probe failure.
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    /// Manifest loading or writing error.
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),
}

/// Errors that arise from loading the TOML configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("IO error reading config file {}: {source}", .path.display())]
    Io {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for the expected schema.
    #[error("Invalid config file {}: {message}", .path.display())]
    Parse {
        /// Path to the offending file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
}

/// Errors that arise from invoking an external program.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The program could not be found on `PATH`.
    #[error("'{program}' is not installed")]
    NotFound {
        /// Name of the missing program.
        program: String,
    },

    /// The program ran and exited unsuccessfully.
    #[error("{program} failed (exit {code}): {stderr}")]
    Failed {
        /// Name of the program that was invoked.
        program: String,
        /// Exit code, or `-1` when terminated by a signal.
        code: i32,
        /// Captured standard error (trimmed).
        stderr: String,
    },

    /// The program did not finish before the deadline and was killed.
    #[error("{program} timed out after {secs}s")]
    TimedOut {
        /// Name of the program that was invoked.
        program: String,
        /// Timeout that was exceeded, in seconds.
        secs: u64,
    },

    /// The program could not be spawned or its output could not be collected.
    #[error("failed to execute {program}: {source}")]
    Io {
        /// Name of the program that was invoked.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// A probe that could not produce its inventory.
///
/// This is data recorded in the [`BackupRun`](crate::backup::BackupRun), not
/// a fault that stops the backup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProbeError {
    /// Human-readable failure description.
    pub message: String,
}

impl ProbeError {
    /// Create a probe error from any displayable message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ToolError> for ProbeError {
    fn from(e: ToolError) -> Self {
        Self::new(e.to_string())
    }
}

/// Errors that arise from reading or writing `manifest.json`.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The backup directory has no manifest file.
    #[error("Manifest file not found: {}", .path.display())]
    NotFound {
        /// Expected manifest location.
        path: PathBuf,
    },

    /// The manifest file is not valid JSON for the manifest schema.
    #[error("Invalid manifest file {}: {message}", .path.display())]
    Corrupt {
        /// Manifest location.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// The manifest could not be read or written.
    #[error("IO error on manifest {}: {source}", .path.display())]
    Io {
        /// Manifest location.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The manifest could not be serialized.
    #[error("Failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn tool_not_found_display() {
        let e = ToolError::NotFound {
            program: "mas".to_string(),
        };
        assert_eq!(e.to_string(), "'mas' is not installed");
    }

    #[test]
    fn tool_failed_display() {
        let e = ToolError::Failed {
            program: "brew".to_string(),
            code: 1,
            stderr: "Error: No such file".to_string(),
        };
        assert_eq!(e.to_string(), "brew failed (exit 1): Error: No such file");
    }

    #[test]
    fn tool_timed_out_display() {
        let e = ToolError::TimedOut {
            program: "brew".to_string(),
            secs: 30,
        };
        assert_eq!(e.to_string(), "brew timed out after 30s");
    }

    #[test]
    fn tool_io_has_source() {
        use std::error::Error as StdError;
        let e = ToolError::Io {
            program: "mas".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.source().is_some());
    }

    #[test]
    fn probe_error_from_tool_error_keeps_message() {
        let e: ProbeError = ToolError::Failed {
            program: "mas".to_string(),
            code: 2,
            stderr: "not signed in".to_string(),
        }
        .into();
        assert_eq!(e.message, "mas failed (exit 2): not signed in");
    }

    #[test]
    fn manifest_not_found_display() {
        let e = ManifestError::NotFound {
            path: PathBuf::from("/backups/x/manifest.json"),
        };
        assert_eq!(
            e.to_string(),
            "Manifest file not found: /backups/x/manifest.json"
        );
    }

    #[test]
    fn manifest_corrupt_display() {
        let e = ManifestError::Corrupt {
            path: PathBuf::from("manifest.json"),
            message: "expected value at line 1 column 1".to_string(),
        };
        assert!(e.to_string().contains("Invalid manifest file"));
        assert!(e.to_string().contains("line 1 column 1"));
    }

    #[test]
    fn config_parse_display() {
        let e = ConfigError::Parse {
            path: PathBuf::from("config.toml"),
            message: "unexpected key".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "Invalid config file config.toml: unexpected key"
        );
    }

    #[test]
    fn macbac_error_from_manifest_error() {
        let e: MacbacError = ManifestError::NotFound {
            path: PathBuf::from("m.json"),
        }
        .into();
        assert!(e.to_string().contains("Manifest error"));
    }

    #[test]
    fn macbac_error_from_probe_error() {
        let e: MacbacError = ProbeError::new("boom").into();
        assert_eq!(e.to_string(), "Probe error: boom");
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<MacbacError>();
        assert_send_sync::<ConfigError>();
        assert_send_sync::<ToolError>();
        assert_send_sync::<ProbeError>();
        assert_send_sync::<ManifestError>();
    }

    #[test]
    fn manifest_error_converts_to_anyhow() {
        let e = ManifestError::NotFound {
            path: PathBuf::from("m.json"),
        };
        let _anyhow_err: anyhow::Error = e.into();
    }
}
