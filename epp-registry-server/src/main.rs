//! EPP registry server entry point.

use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use epp_registry_server::{Server, ServerConfig};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        "starting EPP registry server as {} with tlds {:?}",
        config.server_id,
        config.tlds
    );

    let server = match Server::bind(&config).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("failed to bind: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = server.run().await {
        tracing::error!("server terminated: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
