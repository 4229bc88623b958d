//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the preference, recommendation and weather
//! endpoints, and the master definition for the OpenAPI specification.

use crate::{
    error::{AppError, ErrorBody},
    web::{
        catalog, context,
        extract::ApiJson,
        payloads::*,
        state::AppState,
    },
};
use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::{Timelike, Utc};
use companion_core::{
    geo::ServiceArea, Coordinate, PreferenceProfile, ValidationError, Weather, WeatherReport,
};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        save_preferences_handler,
        get_preferences_handler,
        update_preferences_handler,
        delete_preferences_handler,
        recommendations_handler,
        manual_recommendations_handler,
        weather_handler,
        context::update_context_handler,
        context::get_context_handler,
        context::notification_history_handler,
        context::clear_notifications_handler,
        catalog::cuisine_categories_handler,
        catalog::activity_categories_handler,
        catalog::validate_location_handler,
        catalog::health_handler,
        catalog::root_handler,
    ),
    components(
        schemas(
            ErrorBody,
            LocationPayload,
            LocationView,
            PreferencesPayload,
            PreferencesResponse,
            PreferencesUpdateResponse,
            MessageResponse,
            RecommendationRequest,
            ManualContext,
            ManualRecommendationRequest,
            RecommendationContext,
            RecommendationResponse,
            WeatherResponse,
            ContextUpdateRequest,
            ContextUpdateResponse,
            ContextResponse,
            HistoryResponse,
            HistoryClearedResponse,
            CuisineEntry,
            CuisineCatalog,
            ActivityCatalog,
            LocationValidation,
            ProvidersConfigured,
            HealthThresholds,
            HealthResponse,
            InfoResponse,
        )
    ),
    tags(
        (name = "Travel Companion API", description = "Context-aware recommendations and live notifications.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Helpers
//=========================================================================================

/// The server's local hour of day.
pub(crate) fn local_hour() -> u8 {
    chrono::Local::now().hour() as u8
}

pub(crate) fn checked_hour(hour: u32) -> Result<u8, ValidationError> {
    u8::try_from(hour)
        .ok()
        .filter(|h| *h <= 23)
        .ok_or(ValidationError::Hour(hour))
}

pub(crate) fn location_view(at: Coordinate) -> LocationView {
    LocationView {
        latitude: at.latitude(),
        longitude: at.longitude(),
        in_service_area: ServiceArea::MONTREAL.contains(at),
    }
}

async fn recommend(
    app_state: &AppState,
    profile: &PreferenceProfile,
    location: Coordinate,
    hour: u8,
    weather_override: Option<WeatherReport>,
    manual_override: Option<bool>,
) -> Result<RecommendationResponse, AppError> {
    let view = location_view(location);
    if !view.in_service_area {
        warn!(
            latitude = location.latitude(),
            longitude = location.longitude(),
            "Location outside the service area."
        );
    }

    let (set, reading) = app_state
        .recommender
        .recommend_live(profile, location, hour, weather_override)
        .await?;

    Ok(RecommendationResponse {
        recommendations: set.recommendations,
        context: RecommendationContext {
            time_hour: hour,
            time_period: set.period.label().to_string(),
            meal: set.meal,
            weather: reading.report.weather,
            temperature_c: reading.report.temperature_c,
            weather_fallback: reading.fallback,
            indoor_alternatives: set.indoor_substituted,
            location: view,
            manual_override,
        },
        timestamp: Utc::now(),
    })
}

//=========================================================================================
// Preference Handlers
//=========================================================================================

/// Save (create or replace) a user's preferences.
#[utoipa::path(
    post,
    path = "/api/preferences",
    request_body = PreferencesPayload,
    responses(
        (status = 200, description = "Preferences saved", body = PreferencesResponse),
        (status = 422, description = "Invalid preferences", body = ErrorBody)
    )
)]
pub async fn save_preferences_handler(
    State(app_state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<PreferencesPayload>,
) -> Result<Json<PreferencesResponse>, AppError> {
    let profile = payload.into_profile()?;
    app_state.notifications.save_preferences(profile.clone()).await?;
    Ok(Json(PreferencesResponse {
        message: "Preferences saved successfully".to_string(),
        user_id: profile.user_id.clone(),
        preferences: profile,
    }))
}

/// Get a user's preferences.
#[utoipa::path(
    get,
    path = "/api/preferences/{user_id}",
    params(("user_id" = String, Path, description = "The user's identifier.")),
    responses(
        (status = 200, description = "The stored preferences", body = PreferencesResponse),
        (status = 404, description = "User preferences not found", body = ErrorBody)
    )
)]
pub async fn get_preferences_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<PreferencesResponse>, AppError> {
    let preferences = app_state.notifications.preferences(&user_id).await?;
    Ok(Json(PreferencesResponse {
        message: "Preferences found".to_string(),
        user_id,
        preferences,
    }))
}

/// Update existing preferences. Sends a `preferences_updated` notification
/// listing what changed.
#[utoipa::path(
    put,
    path = "/api/preferences/{user_id}",
    params(("user_id" = String, Path, description = "The user's identifier.")),
    request_body = PreferencesPayload,
    responses(
        (status = 200, description = "Preferences updated", body = PreferencesUpdateResponse),
        (status = 404, description = "User preferences not found", body = ErrorBody),
        (status = 422, description = "Invalid preferences", body = ErrorBody)
    )
)]
pub async fn update_preferences_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    ApiJson(mut payload): ApiJson<PreferencesPayload>,
) -> Result<Json<PreferencesUpdateResponse>, AppError> {
    // The path names the user; a differing body id is ignored.
    payload.user_id = user_id.clone();
    let profile = payload.into_profile()?;
    let update = app_state.notifications.update_preferences(profile).await?;
    Ok(Json(PreferencesUpdateResponse {
        message: "Preferences updated successfully".to_string(),
        user_id,
        preferences: update.profile,
        notification_sent: update.notification_sent,
        changes_detected: update.changes,
    }))
}

/// Delete a user: preferences, stored context, notification history and
/// any live connection.
#[utoipa::path(
    delete,
    path = "/api/preferences/{user_id}",
    params(("user_id" = String, Path, description = "The user's identifier.")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 404, description = "User not found", body = ErrorBody)
    )
)]
pub async fn delete_preferences_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    app_state.notifications.forget_user(&user_id).await?;
    Ok(Json(MessageResponse {
        message: "Preferences deleted successfully".to_string(),
        user_id,
    }))
}

//=========================================================================================
// Recommendation Handlers
//=========================================================================================

/// Get recommendations for the current hour and live weather.
#[utoipa::path(
    post,
    path = "/api/recommendations",
    request_body = RecommendationRequest,
    responses(
        (status = 200, description = "Recommendations", body = RecommendationResponse),
        (status = 422, description = "Invalid request", body = ErrorBody),
        (status = 503, description = "Weather and place providers are both unavailable", body = ErrorBody)
    )
)]
pub async fn recommendations_handler(
    State(app_state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<RecommendationRequest>,
) -> Result<Json<RecommendationResponse>, AppError> {
    let profile = request.preferences.into_profile()?;
    let location = request.location.to_coordinate()?;
    let response = recommend(&app_state, &profile, location, local_hour(), None, None).await?;
    info!(
        user_id = %profile.user_id,
        count = response.recommendations.len(),
        "Recommendations served."
    );
    Ok(Json(response))
}

/// Get recommendations with parts of the context overridden.
///
/// `weather` and `temperature_c` must both be set to bypass the weather provider.
#[utoipa::path(
    post,
    path = "/api/recommendations/manual",
    request_body = ManualRecommendationRequest,
    responses(
        (status = 200, description = "Recommendations", body = RecommendationResponse),
        (status = 422, description = "Invalid request", body = ErrorBody),
        (status = 503, description = "Weather and place providers are both unavailable", body = ErrorBody)
    )
)]
pub async fn manual_recommendations_handler(
    State(app_state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ManualRecommendationRequest>,
) -> Result<Json<RecommendationResponse>, AppError> {
    let profile = request.preferences.into_profile()?;
    let manual_override = request.manual_context.is_some();
    let manual = request.manual_context.unwrap_or_default();

    let hour = match manual.time_hour {
        Some(hour) => checked_hour(hour)?,
        None => local_hour(),
    };
    let location = Coordinate::new(
        manual.latitude.unwrap_or(request.location.latitude),
        manual.longitude.unwrap_or(request.location.longitude),
    )?;

    let weather = manual.weather.as_deref().map(str::parse::<Weather>).transpose()?;
    let weather_override = match (weather, manual.temperature_c) {
        (Some(weather), Some(temperature_c)) => Some(WeatherReport {
            description: Some(format!("manually set to {weather}")),
            ..WeatherReport::new(weather, temperature_c)
        }),
        _ => None,
    };

    let response = recommend(
        &app_state,
        &profile,
        location,
        hour,
        weather_override,
        Some(manual_override),
    )
    .await?;
    Ok(Json(response))
}

//=========================================================================================
// Weather Handler
//=========================================================================================

/// Get the current weather for a location, or the fallback when the provider
/// is unavailable.
#[utoipa::path(
    post,
    path = "/api/weather",
    request_body = LocationPayload,
    responses(
        (status = 200, description = "Current weather", body = WeatherResponse),
        (status = 422, description = "Invalid coordinate", body = ErrorBody)
    )
)]
pub async fn weather_handler(
    State(app_state): State<Arc<AppState>>,
    ApiJson(location): ApiJson<LocationPayload>,
) -> Result<Json<WeatherResponse>, AppError> {
    let at = location.to_coordinate()?;
    let reading = app_state.recommender.current_weather(at).await;
    Ok(Json(WeatherResponse {
        weather: reading.report.weather,
        temperature_c: reading.report.temperature_c,
        description: reading.report.description,
        humidity: reading.report.humidity,
        wind_speed: reading.report.wind_speed,
        fallback: reading.fallback,
        location: location_view(at),
        timestamp: Utc::now(),
    }))
}
