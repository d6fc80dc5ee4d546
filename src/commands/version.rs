//! Command: print version information.
use crate::backup::VERSION;

/// Print the macbac version to stdout.
#[allow(clippy::print_stdout)]
pub fn run() {
    println!("macbac {VERSION}");
}
