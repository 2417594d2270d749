//! heartml - Main entry point

use clap::Parser;
use heartml::cli::{cmd_prepare, cmd_serve, cmd_train, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "heartml=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            quick,
            test_size,
            data,
        } => {
            cmd_train(quick, test_size, data)?;
        }
        Commands::Serve {
            host,
            port,
            model_dir,
        } => {
            cmd_serve(host, port, model_dir).await?;
        }
        Commands::Prepare => {
            cmd_prepare()?;
        }
    }

    Ok(())
}
