//! macOS software inventory backup and restore engine.
//!
//! A backup runs a fixed set of independent probes (App Store apps, the
//! Homebrew bundle, config files and developer tools, fonts, manually
//! installed apps), then writes a timestamped directory holding
//! `manifest.json`, `inventory.md`, and copies of font and config files.
//! A restore reads that manifest and reinstalls one category at a time.
//!
//! The public API is organised into four layers:
//!
//! - **[`probes`]**: one scanner per software category
//! - **[`backup`]**: run the probes, archive payloads, write the manifest and report
//! - **[`restore`]**: reinstall categories from a backup directory
//! - **[`commands`]**: top-level subcommand orchestration (`backup`, `restore`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod backup;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod platform;
pub mod probes;
pub mod restore;

#[cfg(test)]
mod test_helpers;
