use anyhow::Result;
use clap::Parser;
use netscout::cli::Cli;
use netscout::output;
use netscout::ScanError;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit code after an interrupted scan.
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<ScanError>() {
            Some(ScanError::Cancelled) => ExitCode::from(EXIT_CANCELLED),
            _ => {
                output::print_error(&format!("{:#}", e));
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(cli: &Cli) -> Result<()> {
    cli.scan
        .execute(cli.verbose, cli.quiet, cli.config.as_deref())
        .await
}
