use std::sync::Arc;

use clap::Parser;
use scriptorium::cli::Cli;
use scriptorium::{install_tracing_subscriber, AppState, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    install_tracing_subscriber();

    let cli = Cli::parse();
    let state = Arc::new(AppState::new(Config::default()));
    state.pump_visibility_once().await?;
    scriptorium::cli::run(state, cli.command).await?;
    Ok(())
}
