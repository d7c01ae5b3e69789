//! TCP listener and accept loop
//!
//! The server owns the listener and the shutdown channel. Each accepted
//! connection runs as its own task; shutdown is signalled on a broadcast
//! channel every connection task subscribes to, then the accept loop waits
//! for all of them to finish.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use etcord_utils::{EtcordError, Result};

use crate::channel::ChannelMap;
use crate::config::AppConfig;
use crate::connection;
use crate::registry::ClientRegistry;

/// State shared by the accept loop and every connection task
#[derive(Clone)]
pub struct SharedState {
    pub registry: Arc<ClientRegistry>,
    pub channels: Arc<ChannelMap>,
    pub config: Arc<AppConfig>,
    pub shutdown_tx: broadcast::Sender<()>,
}

/// The chat server: a bound listener plus its shared state
pub struct Server {
    listener: TcpListener,
    state: SharedState,
}

impl Server {
    /// Bind the listener and build the shared state from configuration
    pub async fn bind(config: AppConfig) -> Result<Self> {
        let addr = config.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| EtcordError::connection(format!("failed to bind {}: {}", addr, e)))?;

        let (shutdown_tx, _) = broadcast::channel(1);

        let state = SharedState {
            registry: Arc::new(ClientRegistry::new()),
            channels: Arc::new(ChannelMap::from_config(&config.channels)),
            config: Arc::new(config),
            shutdown_tx,
        };

        info!(
            "Listening on {} with {} channel(s)",
            listener.local_addr()?,
            state.channels.len()
        );

        Ok(Self { listener, state })
    }

    /// The address the listener actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// A sender that stops the server when signalled
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.state.shutdown_tx.clone()
    }

    /// Accept connections until shutdown, then drain connection tasks
    pub async fn run(self) -> Result<()> {
        let mut shutdown_rx = self.state.shutdown_tx.subscribe();
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            debug!("Failed to set TCP_NODELAY for {}: {}", peer, e);
                        }
                        connections.spawn(connection::handle_client(
                            stream,
                            peer,
                            self.state.clone(),
                            self.state.shutdown_tx.subscribe(),
                        ));
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                },
                _ = shutdown_rx.recv() => {
                    info!("Shutdown requested, closing {} connection(s)", connections.len());
                    break;
                }
            }

            // Reap finished connection tasks as we go
            while connections.try_join_next().is_some() {}
        }

        drop(self.listener);
        while connections.join_next().await.is_some() {}

        info!("Server stopped");
        Ok(())
    }
}
