pub mod api; // JSON API: router, middleware, handlers, server lifecycle
pub mod client; // API client, session, prescription draft
pub mod config;
pub mod core_state;
pub mod crypto;
pub mod db;
pub mod dosage;
pub mod models;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Run the clinic server until Ctrl-C.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let server_config = config::ServerConfig::from_env();
    let bind_addr = server_config.bind_addr;
    let core = Arc::new(core_state::CoreState::open(server_config)?);
    core.bootstrap_admin()?;

    let mut server = api::start_server_on(core, bind_addr).await?;
    tracing::info!(addr = %server.addr, "Listening");

    tokio::signal::ctrl_c().await?;
    server.shutdown();
    server.stopped().await;
    Ok(())
}
