use tracing::{error, info};

use etcord_server::{AppConfig, Server};
use etcord_utils::LogConfig;

#[tokio::main]
async fn main() -> etcord_utils::Result<()> {
    etcord_utils::init_logging_with_config(LogConfig::server())?;

    let config = AppConfig::load_default()?;
    let server = Server::bind(config).await?;

    // Ctrl-C triggers the same broadcast shutdown the tests use
    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, shutting down");
                let _ = shutdown.send(());
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    server.run().await
}
