use std::fmt;

use crate::exec::Executor;

/// Reported when the OS version cannot be queried.
pub const UNKNOWN_VERSION: &str = "Unknown";

/// Detected operating system platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    /// Apple macOS, the only platform the probes fully support.
    MacOs,
    /// Linux.
    Linux,
    /// Anything else.
    Other,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MacOs => write!(f, "macos"),
            Self::Linux => write!(f, "linux"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Platform information for the current system.
#[derive(Debug, Clone)]
pub struct Platform {
    /// Detected operating system.
    pub os: Os,
}

impl Platform {
    /// Detect the current platform.
    #[must_use]
    pub fn detect() -> Self {
        Self {
            os: Self::detect_os(),
        }
    }

    /// Create a platform with an explicit OS (for testing).
    #[must_use]
    pub const fn new(os: Os) -> Self {
        Self { os }
    }

    /// Whether the probes can expect macOS system tools and directories.
    #[must_use]
    pub fn is_macos(&self) -> bool {
        self.os == Os::MacOs
    }

    /// Query the OS product version (`sw_vers -productVersion`).
    ///
    /// Falls back to [`UNKNOWN_VERSION`] when the tool is missing or fails.
    #[must_use]
    pub fn product_version(&self, executor: &dyn Executor) -> String {
        if !self.is_macos() {
            return UNKNOWN_VERSION.to_string();
        }
        executor
            .run("sw_vers", &["-productVersion"])
            .ok()
            .map(|r| r.stdout.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string())
    }

    const fn detect_os() -> Os {
        if cfg!(target_os = "macos") {
            Os::MacOs
        } else if cfg!(target_os = "linux") {
            Os::Linux
        } else {
            Os::Other
        }
    }
}
