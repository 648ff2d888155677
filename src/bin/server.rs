use std::sync::Arc;

use scriptorium::{api, install_tracing_subscriber, AppState, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    install_tracing_subscriber();

    let config = Config::default();
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config));
    state.spawn_visibility_worker();

    let router = api::build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "scriptorium-server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
