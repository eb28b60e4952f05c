//! lemming-server: standalone REST server for goal compilation and plan
//! disambiguation.
//!
//! Configuration comes from flags or environment (see `--help`); a `.env`
//! file in the working directory is loaded first.

use clap::Parser;
use lemming_server::config::Config;
use lemming_server::router::build_router;
use lemming_server::state::AppState;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lemming_server=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::parse();
    let state = AppState::from_config(&config)?;
    let app = build_router(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("lemming-server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
