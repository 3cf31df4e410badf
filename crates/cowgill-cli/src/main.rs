//! cowgill CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use cowgill_cli::cli::Cli;
use cowgill_cli::error::CliResult;
use cowgill_core::init_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    init_tracing(cli.tracing_config())?;
    cowgill_cli::commands::dispatch(&cli).await
}
