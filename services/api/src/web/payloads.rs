//! services/api/src/web/payloads.rs
//!
//! Request and response bodies of the REST API. Core types are serialized
//! as-is; the `schema(value_type = ..)` hints describe them to OpenAPI.

use chrono::{DateTime, Utc};
use companion_core::{
    ActivityType, ContextSnapshot, Coordinate, Meal, MealSchedule, NotificationEvent,
    PreferenceProfile, Recommendation, ValidationError, Weather,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

//=========================================================================================
// Shared Pieces
//=========================================================================================

/// A coordinate as sent by the client. Range checks happen in `to_coordinate`.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema)]
pub struct LocationPayload {
    #[schema(example = 45.5017)]
    pub latitude: f64,
    #[schema(example = -73.5673)]
    pub longitude: f64,
}

impl LocationPayload {
    pub fn to_coordinate(self) -> Result<Coordinate, ValidationError> {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// A coordinate echoed back with its service-area verdict.
#[derive(Debug, Serialize, ToSchema)]
pub struct LocationView {
    pub latitude: f64,
    pub longitude: f64,
    pub in_service_area: bool,
}

//=========================================================================================
// Preferences
//=========================================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PreferencesPayload {
    #[schema(example = "user-123")]
    pub user_id: String,
    #[schema(example = "outdoor")]
    pub activity_type: String,
    /// Meal name to `HH:MM`. Keys are kept in the order sent.
    #[serde(default)]
    #[schema(value_type = BTreeMap<String, String>)]
    pub meal_times: MealSchedule,
    #[serde(default)]
    pub preferred_cuisines: Vec<String>,
}

impl PreferencesPayload {
    pub fn into_profile(self) -> Result<PreferenceProfile, ValidationError> {
        let activity_type: ActivityType = self.activity_type.parse()?;
        PreferenceProfile::new(
            self.user_id,
            activity_type,
            self.meal_times,
            self.preferred_cuisines,
        )
    }
}

#[derive(Serialize, ToSchema)]
pub struct PreferencesResponse {
    pub message: String,
    pub user_id: String,
    #[schema(value_type = Object)]
    pub preferences: PreferenceProfile,
}

#[derive(Serialize, ToSchema)]
pub struct PreferencesUpdateResponse {
    pub message: String,
    pub user_id: String,
    #[schema(value_type = Object)]
    pub preferences: PreferenceProfile,
    pub notification_sent: bool,
    pub changes_detected: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
    pub user_id: String,
}

//=========================================================================================
// Recommendations
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecommendationRequest {
    pub preferences: PreferencesPayload,
    pub location: LocationPayload,
}

/// Optional overrides of the live context, for demos and testing.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ManualContext {
    pub time_hour: Option<u32>,
    #[schema(example = "rainy")]
    pub weather: Option<String>,
    #[serde(alias = "temperature")]
    pub temperature_c: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ManualRecommendationRequest {
    pub preferences: PreferencesPayload,
    pub location: LocationPayload,
    pub manual_context: Option<ManualContext>,
}

/// The context a recommendation list was computed for.
#[derive(Serialize, ToSchema)]
pub struct RecommendationContext {
    pub time_hour: u8,
    #[schema(example = "Afternoon")]
    pub time_period: String,
    #[schema(value_type = Option<String>)]
    pub meal: Option<Meal>,
    #[schema(value_type = String)]
    pub weather: Weather,
    pub temperature_c: i32,
    /// True when the weather provider failed and a fallback was used.
    pub weather_fallback: bool,
    /// True when outdoor was requested but the weather called for indoor options.
    pub indoor_alternatives: bool,
    pub location: LocationView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_override: Option<bool>,
}

#[derive(Serialize, ToSchema)]
pub struct RecommendationResponse {
    #[schema(value_type = Vec<Object>)]
    pub recommendations: Vec<Recommendation>,
    pub context: RecommendationContext,
    pub timestamp: DateTime<Utc>,
}

//=========================================================================================
// Weather
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct WeatherResponse {
    #[schema(value_type = String)]
    pub weather: Weather,
    pub temperature_c: i32,
    pub description: Option<String>,
    pub humidity: Option<u8>,
    pub wind_speed: Option<f64>,
    pub fallback: bool,
    pub location: LocationView,
    pub timestamp: DateTime<Utc>,
}

//=========================================================================================
// Context and Notifications
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct ContextUpdateRequest {
    pub user_id: String,
    pub location: Option<LocationPayload>,
    /// Hour of day, 0-23. Defaults to the server's local hour.
    pub current_time: Option<u32>,
    /// Used together with `temperature_c` instead of asking the weather provider.
    #[schema(example = "sunny")]
    pub weather: Option<String>,
    #[serde(alias = "temperature")]
    pub temperature_c: Option<i32>,
}

#[derive(Serialize, ToSchema)]
pub struct ContextUpdateResponse {
    pub user_id: String,
    #[schema(value_type = Object)]
    pub context_updated: ContextSnapshot,
    pub notifications_generated: usize,
    pub notifications_delivered: usize,
    #[schema(value_type = Vec<Object>)]
    pub notifications: Vec<NotificationEvent>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct ContextResponse {
    pub user_id: String,
    #[schema(value_type = Object)]
    pub context: ContextSnapshot,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    pub user_id: String,
    #[schema(value_type = Vec<Object>)]
    pub notifications: Vec<NotificationEvent>,
    pub total: usize,
    pub showing: usize,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryClearedResponse {
    pub user_id: String,
    pub message: String,
    pub notifications_cleared: usize,
}

//=========================================================================================
// Catalog, Location and Info
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct CuisineEntry {
    pub name: String,
    pub search_term: String,
}

#[derive(Serialize, ToSchema)]
pub struct CuisineCatalog {
    pub cuisines: Vec<CuisineEntry>,
    pub total: usize,
}

#[derive(Serialize, ToSchema)]
pub struct ActivityCatalog {
    #[schema(value_type = BTreeMap<String, Vec<String>>)]
    pub indoor: BTreeMap<&'static str, Vec<&'static str>>,
    #[schema(value_type = BTreeMap<String, Vec<String>>)]
    pub outdoor: BTreeMap<&'static str, Vec<&'static str>>,
    pub total_indoor: usize,
    pub total_outdoor: usize,
}

#[derive(Serialize, ToSchema)]
pub struct LocationValidation {
    pub location: LocationPayload,
    pub in_service_area: bool,
    pub distance_from_center_km: f64,
    pub service_area_center: LocationPayload,
    pub recommendation: String,
}

#[derive(Serialize, ToSchema)]
pub struct ProvidersConfigured {
    pub openweather: bool,
    pub google_places: bool,
}

#[derive(Serialize, ToSchema)]
pub struct HealthThresholds {
    pub location_threshold_km: f64,
    pub temperature_threshold_c: i32,
    pub notification_history_limit: usize,
    pub outdoor_temp_range: String,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub apis_configured: ProvidersConfigured,
    pub active_users: usize,
    pub users_with_context: usize,
    pub active_websocket_connections: usize,
    pub total_notifications_stored: usize,
    pub configuration: HealthThresholds,
}

#[derive(Serialize, ToSchema)]
pub struct InfoResponse {
    pub message: String,
    pub version: String,
    pub status: String,
    pub apis_configured: ProvidersConfigured,
    pub websocket_endpoint: String,
    pub documentation: String,
}
