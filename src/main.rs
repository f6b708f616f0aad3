use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use pinshop::config::AppConfig;
use pinshop::events::{spawn_login_log_writer, LoginEventBus};
use pinshop::server::AppState;
use pinshop::storage::{MemoryStorage, Storage};
use pinshop::{logging, metrics, server};

#[derive(Parser)]
#[command(name = "pinshop")]
#[command(about = "Backend service for the pinshop digital voucher store")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve {
        /// Port to listen on; overrides the configured one
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Apply database migrations and exit
    #[cfg(feature = "db")]
    Migrate,
}

async fn build_storage(config: &AppConfig) -> Result<Arc<dyn Storage>, Box<dyn std::error::Error>> {
    if let Some(db_config) = &config.database {
        #[cfg(feature = "db")]
        {
            use pinshop::storage::DatabaseStorage;
            info!("Using libsql storage");
            let storage = DatabaseStorage::new(db_config).await?;
            return Ok(Arc::new(storage));
        }
        #[cfg(not(feature = "db"))]
        {
            let _ = db_config;
            warn!("Database configured but support is not compiled in; rebuild with --features db");
        }
    } else {
        warn!("No database configured, falling back to in-memory storage");
    }
    Ok(Arc::new(MemoryStorage::new()))
}

async fn run_server(config: AppConfig, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = metrics::init() {
        warn!("Metrics recorder not installed: {}", e);
    }

    let storage = build_storage(&config).await?;
    let (bus, receiver) = LoginEventBus::new();
    let writer = spawn_login_log_writer(storage.clone(), receiver);

    let port = port_override.unwrap_or(config.server.port);
    let state = AppState::build(config, storage, bus)?;
    server::serve(state, port).await?;

    writer.await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging();
    info!("Starting pinshop {}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command {
        None => run_server(config, None).await?,
        Some(Commands::Serve { port }) => run_server(config, port).await?,
        #[cfg(feature = "db")]
        Some(Commands::Migrate) => {
            use pinshop::storage::DatabaseManager;
            let db_config = config.database.unwrap_or_default();
            let manager = DatabaseManager::new(&db_config).await?;
            manager.run_migrations().await?;
            info!("Migrations applied");
        }
    }

    Ok(())
}
