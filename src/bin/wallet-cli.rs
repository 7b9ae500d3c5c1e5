use anyhow::Result;
use clap::Parser;
use multichain_wallet::cli::Cli;
use multichain_wallet::core::config::WalletConfig;
use multichain_wallet::core::errors::WalletError;
use multichain_wallet::service::WalletService;
use multichain_wallet::utils::{error_json, to_pretty_json};
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("failed to initialize logging: {}", e);
    }

    match run(&cli).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) if !e.is_fatal() => {
            debug!("recoverable error: {}", e);
            println!("{}", to_pretty_json(&error_json(&e)));
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<String, WalletError> {
    let config = WalletConfig::from_env_file(&cli.env_file)?.with_speed(cli.command.speed());
    let service = WalletService::new(config);
    let value = cli.command.execute(&service).await?;
    Ok(to_pretty_json(&value))
}

/// Logs go to stderr so stdout stays pure JSON. `RUST_LOG` overrides the default `warn`.
fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
