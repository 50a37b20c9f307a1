//! BulletinServer accept loop
//!
//! Owns the listener and the board registry; spawns one handler task per
//! accepted connection.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::registry::BoardRegistry;

/// The bulletin board server
pub struct BulletinServer {
    listener: TcpListener,
    registry: Arc<BoardRegistry>,
    max_line_length: usize,
}

impl BulletinServer {
    /// Wrap an already-bound listener
    pub fn new(listener: TcpListener, registry: Arc<BoardRegistry>, max_line_length: usize) -> Self {
        Self {
            listener,
            registry,
            max_line_length,
        }
    }

    /// Bind the configured address and build the configured boards
    pub async fn bind(config: &ServerConfig) -> Result<Self, AppError> {
        config.validate()?;
        let listener = TcpListener::bind(&config.listen_addr).await?;
        let registry = Arc::new(BoardRegistry::from_config(config));
        Ok(Self::new(listener, registry, config.max_line_length))
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared board registry
    pub fn registry(&self) -> Arc<BoardRegistry> {
        Arc::clone(&self.registry)
    }

    /// Accept connections until `shutdown` resolves
    ///
    /// Sessions already running are left to finish on their own.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        info!("Bulletin board serving {} boards", self.registry.len());
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => self.spawn_session(stream, addr),
                    Err(e) => error!("Failed to accept connection: {}", e),
                },
            }
        }
    }

    /// Accept connections until Ctrl-C
    pub async fn run_until_ctrl_c(self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to install Ctrl-C handler: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    fn spawn_session(&self, stream: TcpStream, addr: SocketAddr) {
        info!("New connection from {}", addr);
        let registry = Arc::clone(&self.registry);
        let max_line_length = self.max_line_length;

        // Spawn handler task for each connection
        tokio::spawn(async move {
            if let Err(e) =
                handle_connection(stream, addr.to_string(), registry, max_line_length).await
            {
                error!("Connection handler error for {}: {}", addr, e);
            }
        });
    }
}
