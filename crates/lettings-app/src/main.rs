//! Lettings application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML + environment
//! 2. Initialize tracing
//! 3. Run the selected subcommand: `serve`, `chat` or `seed`

mod cli;
mod client;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lettings_assistant::{Assistant, OpenAiClient};
use lettings_core::config::LettingsConfig;
use lettings_server::{start_server, AppState};
use lettings_store::DocumentExecutor;

use cli::{CliArgs, Command};

/// `RUST_LOG` wins; otherwise the configured level. JSON in production.
fn init_tracing(config: &LettingsConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.general.is_production() {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn serve(config: LettingsConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.completion.api_key.is_empty() {
        tracing::warn!("No completion API key configured; set OPENAI_API_KEY");
    }

    let executor = Arc::new(DocumentExecutor::new(config.store.clone()));
    let completion = Arc::new(OpenAiClient::new(config.completion.clone()));
    let assistant = Arc::new(Assistant::new(
        executor,
        completion,
        config.assistant.clone(),
    ));

    if let Err(e) = assistant.initialize().await {
        tracing::error!(error = %e, "Failed to initialize assistant");
        return Err(e.into());
    }

    let state = AppState::new(config.clone(), assistant);
    if let Err(e) = start_server(&config, state, shutdown_signal()).await {
        tracing::error!(
            port = config.server.port,
            error = %e,
            "Server failed - is another instance running?"
        );
        return Err(e.into());
    }
    Ok(())
}

async fn seed(config: LettingsConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Seed explicitly so the report counts what was inserted.
    let mut store_config = config.store.clone();
    store_config.seed_sample_data = false;
    let executor = DocumentExecutor::new(store_config);
    let report = executor.seed_sample_data().await?;
    tracing::info!(
        properties = report.properties,
        residents = report.residents,
        "Sample data seeded"
    );
    println!(
        "Seeded {} properties and {} residents.",
        report.properties, report.residents
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config: file, then environment, then CLI flags.
    let config_file = args.resolve_config_path();
    let mut config = LettingsConfig::load_or_default(&config_file);
    config.apply_env_overrides();
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }
    config.server.port = args.resolve_port(config.server.port);

    init_tracing(&config);
    tracing::info!(
        path = %config_file.display(),
        environment = %config.general.environment,
        "Starting lettings v{}",
        env!("CARGO_PKG_VERSION")
    );

    match args.command {
        Command::Serve { .. } => serve(config).await,
        Command::Seed => seed(config).await,
        Command::Chat { .. } => {
            let url = args.resolve_url(&config.client.server_url);
            client::run(&url, &config.client).await?;
            Ok(())
        }
    }
}
