use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use macbac::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();

    match &args.command {
        cli::Command::Version => {
            commands::version::run();
            return Ok(());
        }
        cli::Command::Completions(opts) => {
            commands::completions::run(opts);
            return Ok(());
        }
        cli::Command::Backup(_) | cli::Command::Restore(_) => {}
    }

    let command = args.command.name();
    logging::init_subscriber(args.verbose, command);
    let log = Arc::new(logging::Logger::new(command));

    match args.command {
        cli::Command::Backup(opts) => commands::backup::run(&args.global, &opts, &log),
        cli::Command::Restore(opts) => commands::restore::run(&args.global, &opts, &log),
        cli::Command::Version | cli::Command::Completions(_) => Ok(()),
    }
}
