#![doc = include_str!("../README.md")]

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::learn::LearnArgs;

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Learn {
            problems,
            flags,
            solver,
            z3,
            out,
            minimized_out,
            dump_facts,
            format,
        } => commands::learn::run_learn_command(LearnArgs {
            problems,
            config: cli.config,
            flags,
            solver,
            z3,
            out,
            minimized_out,
            dump_facts,
            format,
        })?,
        Commands::Verify {
            problems,
            sketch,
            format,
        } => commands::verify::run_verify_command(problems, sketch, cli.config, format)?,
        Commands::Facts { problems, encoding } => {
            commands::facts::run_facts_command(problems, cli.config, encoding)?;
            0
        }
    };
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
