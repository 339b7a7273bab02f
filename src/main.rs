//! Callscope CLI entry point.

use anyhow::Result;
use callscope::cli::{commands, Cli, Commands};
use callscope::config::Settings;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli
        .config
        .as_deref()
        .map(Settings::expand_path)
        .unwrap_or_else(Settings::default_config_path);
    let mut settings = match &cli.config {
        Some(_) => Settings::load_from(Some(&config_path))?,
        None => Settings::load()?,
    };
    cli.apply_overrides(&mut settings);

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("callscope={}", log_level)),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Execute command
    match &cli.command {
        Commands::Serve { host, port } => {
            commands::run_serve(host.clone(), *port, settings).await?;
        }

        Commands::Query { text, lookahead } => {
            commands::run_query(text, *lookahead, settings)?;
        }

        Commands::Ask {
            transcript_id,
            question,
            model,
        } => {
            commands::run_ask(transcript_id, question, model.clone(), settings).await?;
        }

        Commands::Analyze {
            transcript_id,
            model,
        } => {
            commands::run_analyze(transcript_id, model.clone(), settings).await?;
        }

        Commands::Validate { path } => {
            commands::run_validate(path.as_deref(), &settings)?;
        }

        Commands::Status => {
            commands::run_status(&settings)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, config_path, settings)?;
        }
    }

    Ok(())
}
