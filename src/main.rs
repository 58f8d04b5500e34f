//! Fare finder HTTP server.
//!
//! Builds the airline directory once, then serves route searches.
//!
//! # Environment Variables
//!
//! - `TP_API_TOKEN`: pricing API token (required)
//! - `AIRLINES_URL`, `PRICES_URL`: source overrides
//! - `CURRENCY`: target currency (default: TWD)
//! - `HTTP_TIMEOUT_MS`: outbound request timeout (default: 10000)
//! - `HOST`, `PORT`: bind address (default: 0.0.0.0:8080)
//! - `RUST_LOG`: log filter (default: info)

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fare_finder::{
    create_router, AirlineDirectory, AppConfig, AppState, FlightOfferResolver, OpenFlightsClient,
    TravelpayoutsClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    // No directory, no service
    let airline_source = OpenFlightsClient::new(&config.airlines_url, config.timeout_ms)?;
    let directory = AirlineDirectory::build(&airline_source)
        .await
        .context("failed to build airline directory")?;

    let pricing = TravelpayoutsClient::new(&config.prices_url, &config.api_token, config.timeout_ms)?;
    let resolver = FlightOfferResolver::new(Arc::new(pricing), Arc::new(directory), &config.currency);
    let app = create_router(AppState::new(resolver));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Server listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
