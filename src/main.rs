#![forbid(unsafe_code)]

//! asw: Artifact Sweeper CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();

    let filter =
        EnvFilter::try_from_env("ASW_LOG").unwrap_or_else(|_| EnvFilter::new(args.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli_app::run(&args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("asw: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
