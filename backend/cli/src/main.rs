mod chat_cmd;
mod models_cmd;
mod prompter;
mod terminal_output;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use qchat_config::ChatConfig;
use qchat_core::{ChatError, Credential};
use qchat_gateway::{start_server, GatewayState};
use qchat_providers::{bootstrap, BootstrapOutcome, QbraidClient};
use qchat_session::ChatContext;

use prompter::StdinPrompter;
use terminal_output::{note_error, note_info, note_success};

#[derive(Parser)]
#[command(name = "qchat")]
#[command(about = "qchat: streaming chat against the qBraid API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat in the terminal
    Chat {
        /// Model id; defaults to the first model in the catalog
        #[arg(short, long)]
        model: Option<String>,
    },
    /// List the models available for this API key
    Models,
    /// Serve chat panels over WebSocket
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ChatConfig::from_env().context("Failed to read configuration")?;

    // The chat REPL owns the terminal, so its logs go to the file only.
    match cli.command {
        Commands::Chat { .. } => qchat_logging::init_file_logger(&config.log_dir, &config.log_level),
        _ => qchat_logging::init_logger(&config.log_dir, &config.log_level),
    }
    qchat_config::ensure_valid(&config)?;

    let client = Arc::new(QbraidClient::new(&config.api_url));
    let outcome = match login(&client, &config).await {
        Ok(outcome) => outcome,
        Err(ChatError::CredentialRequired) => {
            note_error("An API key is required. Set QCHAT_API_KEY or enter one when prompted.");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    match cli.command {
        Commands::Chat { model } => {
            let Some(model) = chat_cmd::select_model(model, &outcome.models) else {
                anyhow::bail!("No models available; pass one with --model");
            };
            let context = ChatContext::new(outcome.credential, client);
            chat_cmd::run(context, outcome.models, model).await?;
        }
        Commands::Models => models_cmd::run(&outcome.models),
        Commands::Serve { port } => {
            let config = match port {
                Some(port) => config.with_port(port),
                None => config,
            };
            run_server(config, client, outcome).await?;
        }
    }

    Ok(())
}

async fn login(client: &QbraidClient, config: &ChatConfig) -> Result<BootstrapOutcome, ChatError> {
    let initial = config.api_key.as_deref().map(Credential::new);
    let outcome = bootstrap(client, &StdinPrompter, initial).await?;
    note_success(&format!("API key accepted; {} models available.", outcome.models.len()));
    Ok(outcome)
}

async fn run_server(
    config: ChatConfig,
    client: Arc<QbraidClient>,
    outcome: BootstrapOutcome,
) -> Result<()> {
    let addr: SocketAddr = config
        .listen_addr()
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.listen_addr()))?;

    info!(
        addr = %addr,
        api_url = %config.api_url,
        models = outcome.models.len(),
        "Starting qchat gateway"
    );
    note_info(&format!("Panels connect to ws://{addr}/api/ws"));

    let context = ChatContext::new(outcome.credential, client);
    start_server(addr, GatewayState::new(context, outcome.models)).await
}
