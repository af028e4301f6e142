use std::sync::Arc;

use clap::{Parser, Subcommand};
use fichas_client::{AdminBackend, GestorApi, GestorClient, InMemoryGestor};
use fichas_core::Config;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod admin;
mod chat;

#[derive(Parser)]
#[command(name = "fichas-cli")]
#[command(about = "Chat y panel de administración del Gestor de Fichas")]
#[command(version)]
struct Cli {
    /// Use the seeded in-memory backend instead of the network
    #[arg(long)]
    offline: bool,

    /// Enable debug logging
    #[arg(long, short, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the end-user chat
    Chat,
    /// Admin panel operations
    Admin {
        #[command(subcommand)]
        command: admin::AdminCommand,
    },
}

/// The backend both front ends talk to.
enum Backend {
    Online(Arc<GestorClient>),
    Offline(Arc<InMemoryGestor>),
}

impl Backend {
    fn connect(config: &Config, offline: bool) -> anyhow::Result<Self> {
        if offline {
            tracing::info!("using the in-memory backend");
            return Ok(Self::Offline(Arc::new(InMemoryGestor::seeded())));
        }
        if let Err(invalid) = config.validate() {
            tracing::warn!(?invalid, "settings missing or invalid, requests to those services will fail");
        }
        Ok(Self::Online(Arc::new(GestorClient::new(config)?)))
    }

    fn gestor(&self) -> Arc<dyn GestorApi> {
        match self {
            Self::Online(client) => client.clone(),
            Self::Offline(fixture) => fixture.clone(),
        }
    }

    fn admin(&self) -> Arc<dyn AdminBackend> {
        match self {
            Self::Online(client) => client.clone(),
            Self::Offline(fixture) => fixture.clone(),
        }
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_line_number(true)
                .with_file(false),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = Config::new();
    tracing::debug!(?config, "loaded configuration");
    let backend = Backend::connect(&config, cli.offline)?;

    match cli.command {
        Commands::Chat => chat::run(backend.gestor(), &config).await,
        Commands::Admin { command } => admin::run(backend.admin(), command).await,
    }
}
