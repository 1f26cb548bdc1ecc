//! Tidemark CLI - versioned SQL schema migrations

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod context;

use cli::{Cli, Commands};
use commands::common::ExitCode;
use commands::{check, create, down, down_to, redo, reset, status, up, up_to, version};

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_target(false)
        .format_timestamp(None)
        .try_init();
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Up => up::execute(&cli.global),
        Commands::UpTo(args) => up_to::execute(args, &cli.global),
        Commands::Down => down::execute(&cli.global),
        Commands::DownTo(args) => down_to::execute(args, &cli.global),
        Commands::Redo => redo::execute(&cli.global),
        Commands::Reset => reset::execute(&cli.global),
        Commands::Status(args) => status::execute(args, &cli.global),
        Commands::Check => check::execute(&cli.global),
        Commands::Version => version::execute(&cli.global),
        Commands::Create(args) => create::execute(args, &cli.global),
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    match run(&cli) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<ExitCode>() {
            Some(code) => std::process::ExitCode::from(u8::try_from(code.0).unwrap_or(1)),
            None => {
                eprintln!("Error: {:#}", err);
                std::process::ExitCode::FAILURE
            }
        },
    }
}
