//! services/api/src/bin/api.rs

use companion_api::{
    adapters::{GooglePlacesAdapter, InMemoryPreferenceStore, OpenWeatherAdapter},
    config::Config,
    error::ApiError,
    web::{router, state::AppState},
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    if config.openweather_api_key.is_none() {
        warn!("OPENWEATHER_API_KEY is not set; weather falls back to defaults.");
    }
    if config.google_places_api_key.is_none() {
        warn!("GOOGLE_PLACES_API_KEY is not set; place searches will fail.");
    }
    info!(
        location_threshold_km = config.location_change_threshold_km,
        temperature_threshold_c = config.temperature_change_threshold_c,
        history_limit = config.notification_history_limit,
        provider_timeout = ?config.provider_timeout,
        "Engine thresholds."
    );

    // --- 2. Initialize Service Adapters ---
    let http = reqwest::Client::builder()
        .timeout(config.provider_timeout)
        .build()?;
    let weather = Arc::new(OpenWeatherAdapter::new(
        http.clone(),
        config.openweather_api_key.clone(),
    ));
    let places = Arc::new(GooglePlacesAdapter::new(
        http,
        config.google_places_api_key.clone(),
    ));
    let preferences = Arc::new(InMemoryPreferenceStore::new());

    // --- 3. Build the Shared AppState & Router ---
    let app_state = Arc::new(AppState::new(config.clone(), preferences, weather, places));
    let app = router(app_state);

    // --- 4. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
