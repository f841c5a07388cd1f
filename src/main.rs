//! digitforge - Main Entry Point

use clap::Parser;
use digitforge::cli::{cmd_create_data, cmd_metadata, cmd_probe, cmd_serve, cmd_train, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "digitforge=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train { mode, data, models_dir } => {
            cmd_train(mode, data, models_dir).await?;
        }
        Commands::Serve { port, host, models_dir } => {
            cmd_serve(&host, port, models_dir).await?;
        }
        Commands::CreateData { output } => {
            cmd_create_data(&output)?;
        }
        Commands::Metadata { models_dir, data, target_column } => {
            cmd_metadata(&models_dir, &data, &target_column)?;
        }
        Commands::Probe { url, retries } => {
            cmd_probe(&url, retries).await?;
        }
    }

    Ok(())
}
