use std::net::SocketAddr;
use std::sync::Arc;

use estatehive_backend::config::AppConfig;
use estatehive_backend::handlers::{router, AppState};
use estatehive_backend::payment::PaymentClient;
use estatehive_backend::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let config = AppConfig::load().map_err(|e| anyhow::anyhow!("config error: {}", e))?;
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));

    // Store and collaborators are constructed once here and injected; no
    // component reaches for globals.
    let store = Arc::new(Store::new());
    let payment = Arc::new(PaymentClient::from_config(&config));
    let state = AppState::new(&config, store, payment);

    log::info!("EstateHive backend listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state).into_make_service()).await?;

    Ok(())
}
