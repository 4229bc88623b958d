//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use companion_core::{
    ports::{PlaceProvider, PreferenceStore, WeatherProvider},
    ContextChangeDetector, ConnectionRegistry, DetectorThresholds, NotificationCenter,
    RecommendationEngine,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub notifications: NotificationCenter,
    pub recommender: RecommendationEngine,
}

impl AppState {
    /// Wires the engine components to the given adapters.
    pub fn new(
        config: Arc<Config>,
        preferences: Arc<dyn PreferenceStore>,
        weather: Arc<dyn WeatherProvider>,
        places: Arc<dyn PlaceProvider>,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(config.push_write_timeout));
        let detector = ContextChangeDetector::new(DetectorThresholds {
            location_km: config.location_change_threshold_km,
            temperature_c: config.temperature_change_threshold_c,
        });
        let notifications = NotificationCenter::new(
            preferences,
            registry,
            detector,
            config.notification_history_limit,
        );
        let recommender =
            RecommendationEngine::new(weather, places, config.provider_timeout);

        Self {
            config,
            notifications,
            recommender,
        }
    }
}
