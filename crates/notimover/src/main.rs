#![warn(missing_docs)]

//! Entry point for the `notimover` binary.

mod cli;
mod diagnostics;
mod error;
mod position;
mod run;

use std::process;

use clap::Parser;
use tracing::error;

use crate::{
    cli::{Cli, Commands, ConfigArgs},
    error::Result,
};

fn main() {
    if let Err(err) = dispatch() {
        error!("{err}");
        eprintln!("error: {err}");
        process::exit(1);
    }
}

/// Parse CLI arguments, install logging, and dispatch to the chosen command.
fn dispatch() -> Result<()> {
    let Cli { log, command } = Cli::parse();
    logging::init(&log);

    match command {
        Commands::Run(args) => run::run(&args),
        Commands::Position(args) => {
            position::run(&args);
            Ok(())
        }
        Commands::Windows(args) => diagnostics::windows(&args),
        Commands::Config(args) => print_config(&args),
        Commands::Permissions => {
            diagnostics::permissions();
            Ok(())
        }
    }
}

/// The `config` command.
fn print_config(args: &ConfigArgs) -> Result<()> {
    if args.print_default {
        println!("{}", config::Settings::default().to_ron()?);
        return Ok(());
    }
    let (settings, source) = config::load(args.path.as_deref())?;
    match source {
        Some(p) => println!("// loaded from {}", p.display()),
        None => println!(
            "// no settings file at {}; built-in defaults",
            config::default_config_path().display()
        ),
    }
    println!("{}", settings.to_ron()?);
    Ok(())
}
