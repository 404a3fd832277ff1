use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use relay_llm::Interaction;
use relay_settings::{Credentials, LoggingSettings, RelaySettings};

#[derive(Parser)]
#[command(name = "coderelay", version, about = "Multi-provider LLM relay")]
struct Cli {
    /// Settings file (defaults to ~/.coderelay/settings.json).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the model catalogue as JSON.
    Models,
    /// Count tokens in a piece of text.
    CountTokens {
        #[arg(long)]
        model: Option<String>,
        text: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => relay_settings::load_settings_from_path(path),
        None => relay_settings::load_settings(),
    }
    .context("failed to load settings")?;

    init_logging(&settings.logging);

    let credentials = Credentials::from_env();
    let interaction = Interaction::from_settings(&settings, &credentials)
        .context("failed to initialize providers")?;

    match cli.command {
        Command::Serve { host, port } => serve(settings, interaction, host, port).await,
        Command::Models => {
            let json = serde_json::to_string_pretty(&interaction.available_models())?;
            println!("{json}");
            Ok(())
        }
        Command::CountTokens { model, text } => {
            let count = interaction.count_tokens(&text, model.as_deref()).await;
            println!("{}", serde_json::to_string(&count)?);
            Ok(())
        }
    }
}

async fn serve(
    settings: RelaySettings,
    interaction: Interaction,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let mut config = relay_server::ServerConfig::from(&settings.server);
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    tracing::info!(
        default_model = %settings.interaction.default_model,
        models = interaction.registry().len(),
        "starting coderelay"
    );

    let handle = relay_server::start(config, Arc::new(interaction))
        .await
        .context("failed to start server")?;
    tracing::info!(port = handle.port, "coderelay ready");

    tokio::select! {
        result = handle.wait() => {
            result.context("server task failed")?;
        }
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for ctrl+c")?;
            tracing::info!("shutting down");
        }
    }
    Ok(())
}

/// `RUST_LOG` wins over the configured level when set.
fn init_logging(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
