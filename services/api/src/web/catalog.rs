//! services/api/src/web/catalog.rs
//!
//! Read-only lookups: the cuisine and activity catalogs, service-area checks,
//! health and the service banner.

use crate::{
    error::{AppError, ErrorBody},
    web::{extract::ApiJson, payloads::*, state::AppState},
};
use axum::{extract::State, response::Json};
use chrono::Utc;
use companion_core::{
    geo::ServiceArea,
    rules::{self, CUISINE_SEARCH_TERMS, OUTDOOR_MAX_TEMP_C, OUTDOOR_MIN_TEMP_C},
    ActivityType, TimePeriod,
};
use std::{collections::BTreeMap, sync::Arc};

fn providers(app_state: &AppState) -> ProvidersConfigured {
    ProvidersConfigured {
        openweather: app_state.config.openweather_api_key.is_some(),
        google_places: app_state.config.google_places_api_key.is_some(),
    }
}

fn categories_by_period(activity: ActivityType) -> BTreeMap<&'static str, Vec<&'static str>> {
    TimePeriod::ALL
        .iter()
        .map(|period| {
            (
                period.category_key(),
                rules::activity_categories(activity, *period).to_vec(),
            )
        })
        .collect()
}

/// Supported cuisines and the search term each maps to, sorted by name.
#[utoipa::path(
    get,
    path = "/api/cuisines/categories",
    responses((status = 200, description = "Cuisine catalog", body = CuisineCatalog))
)]
pub async fn cuisine_categories_handler() -> Json<CuisineCatalog> {
    let mut cuisines: Vec<CuisineEntry> = CUISINE_SEARCH_TERMS
        .iter()
        .map(|(name, term)| CuisineEntry {
            name: name.to_string(),
            search_term: term.to_string(),
        })
        .collect();
    cuisines.sort_by(|a, b| a.name.cmp(&b.name));
    Json(CuisineCatalog {
        total: cuisines.len(),
        cuisines,
    })
}

/// Activity categories searched for each time period.
#[utoipa::path(
    get,
    path = "/api/activities/categories",
    responses((status = 200, description = "Activity catalog", body = ActivityCatalog))
)]
pub async fn activity_categories_handler() -> Json<ActivityCatalog> {
    let indoor = categories_by_period(ActivityType::Indoor);
    let outdoor = categories_by_period(ActivityType::Outdoor);
    Json(ActivityCatalog {
        total_indoor: indoor.values().map(Vec::len).sum(),
        total_outdoor: outdoor.values().map(Vec::len).sum(),
        indoor,
        outdoor,
    })
}

/// Check whether a coordinate lies inside the Montreal service area.
#[utoipa::path(
    post,
    path = "/api/location/validate",
    request_body = LocationPayload,
    responses(
        (status = 200, description = "Service-area verdict", body = LocationValidation),
        (status = 422, description = "Invalid coordinate", body = ErrorBody)
    )
)]
pub async fn validate_location_handler(
    ApiJson(location): ApiJson<LocationPayload>,
) -> Result<Json<LocationValidation>, AppError> {
    let at = location.to_coordinate()?;
    let area = ServiceArea::MONTREAL;
    let in_service_area = area.contains(at);
    let distance = (area.distance_from_center_km(at) * 100.0).round() / 100.0;
    let recommendation = if in_service_area {
        "OK".to_string()
    } else {
        format!(
            "Location is outside {} area. Recommendations may be limited.",
            area.name
        )
    };
    Ok(Json(LocationValidation {
        location,
        in_service_area,
        distance_from_center_km: distance,
        service_area_center: LocationPayload {
            latitude: area.center_latitude,
            longitude: area.center_longitude,
        },
        recommendation,
    }))
}

/// Liveness plus engine counters and the active thresholds.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Preference store unavailable", body = ErrorBody)
    )
)]
pub async fn health_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, AppError> {
    let stats = app_state.notifications.stats().await?;
    let config = &app_state.config;
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        apis_configured: providers(&app_state),
        active_users: stats.users_with_preferences,
        users_with_context: stats.users_with_context,
        active_websocket_connections: stats.live_connections,
        total_notifications_stored: stats.stored_notifications,
        configuration: HealthThresholds {
            location_threshold_km: config.location_change_threshold_km,
            temperature_threshold_c: config.temperature_change_threshold_c,
            notification_history_limit: config.notification_history_limit,
            outdoor_temp_range: format!("{OUTDOOR_MIN_TEMP_C}°C to {OUTDOOR_MAX_TEMP_C}°C"),
        },
    }))
}

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service banner", body = InfoResponse))
)]
pub async fn root_handler(State(app_state): State<Arc<AppState>>) -> Json<InfoResponse> {
    Json(InfoResponse {
        message: "Montreal Travel Companion API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
        apis_configured: providers(&app_state),
        websocket_endpoint: "/ws/notifications/{user_id}".to_string(),
        documentation: "/swagger-ui".to_string(),
    })
}
