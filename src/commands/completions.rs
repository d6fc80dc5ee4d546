//! Command: generate shell completions.
use clap::CommandFactory;

use crate::cli::{Cli, CompletionsOpts};

/// Write completions for the requested shell to stdout.
pub fn run(opts: &CompletionsOpts) {
    let mut cmd = Cli::command();
    clap_complete::generate(opts.shell, &mut cmd, "macbac", &mut std::io::stdout().lock());
}
