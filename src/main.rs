//! calview server binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use calview::api::create_rest_router;
use calview::calendar::CalendarService;
use calview::config::Config;
use calview::fixture::Fixture;
use calview::store::{MemoryRecordStore, RecordStore};

#[derive(Parser)]
#[command(
    name = "calview",
    about = "Calendar view engine over tabular records",
    version
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (the default action)
    Serve {
        /// Override the configured HTTP port
        #[arg(short, long)]
        port: Option<u16>,

        /// Emit logs as JSON
        #[arg(long)]
        json_logs: bool,

        /// Seed the memory store from a JSON fixture file
        #[arg(long)]
        fixture: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Serve {
        port: None,
        json_logs: false,
        fixture: None,
    });
    match command {
        Command::Serve {
            port,
            json_logs,
            fixture,
        } => serve(cli.config, port, json_logs, fixture).await,
    }
}

fn init_tracing(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("calview=info,tower_http=warn"));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn serve(
    config_path: Option<PathBuf>,
    port: Option<u16>,
    json_logs: bool,
    fixture_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    init_tracing(json_logs);

    let mut config = match config_path {
        Some(path) => Config::from_file(&path)?,
        None => Config::load()?,
    };
    if let Some(port) = port {
        config.server.http_port = port;
    }

    let store = Arc::new(MemoryRecordStore::new());
    let service =
        CalendarService::new(Arc::clone(&store) as Arc<dyn RecordStore>)
            .with_public_role(config.calendar.public_role);

    if let Some(path) = fixture_path.or_else(|| config.calendar.fixture.clone()) {
        let fixture = Fixture::from_file(&path)
            .with_context(|| format!("loading fixture {}", path.display()))?;
        for view in fixture.seed(&store)? {
            service.register_view(view)?;
        }
    }

    let service = Arc::new(service);
    let router = create_rest_router(Arc::clone(&service), &config.rest_config());

    let addr = format!("{}:{}", config.server.bind_addr, config.server.http_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(addr = %addr, views = service.views().len(), "calview server listening");
    axum::serve(listener, router).await?;
    Ok(())
}
