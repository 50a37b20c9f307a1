//! Bulletin board server - Entry Point
//!
//! Loads configuration, binds the listener and serves until Ctrl-C.

use std::env;

use tracing::info;
use tracing_subscriber::EnvFilter;

use bulletin_board::{BulletinServer, ServerConfig};

/// Environment variable naming an optional JSON config file
const CONFIG_ENV: &str = "BULLETIN_BOARD_CONFIG";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=bulletin_board=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bulletin_board=info")),
        )
        .init();

    let mut config = match env::var(CONFIG_ENV) {
        Ok(path) => {
            info!("Loading configuration from {}", path);
            ServerConfig::load(&path)?
        }
        Err(_) => ServerConfig::default(),
    };

    // Bind address from the command line overrides the config
    if let Some(addr) = env::args().nth(1) {
        config.listen_addr = addr;
    }

    let server = BulletinServer::bind(&config).await?;
    info!("Bulletin board listening on {}", server.local_addr()?);

    server.run_until_ctrl_c().await;
    Ok(())
}
