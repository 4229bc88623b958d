//! services/api/src/web/context.rs
//!
//! Handlers for context updates and the per-user notification history.

use crate::{
    error::{AppError, ErrorBody},
    web::{
        extract::ApiJson,
        payloads::*,
        rest::{checked_hour, local_hour},
        state::AppState,
    },
};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::Json,
};
use chrono::Utc;
use companion_core::{ContextSnapshot, ValidationError, Weather};
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_HISTORY_PAGE: usize = 20;
pub const MAX_HISTORY_PAGE: usize = 100;

/// Submit a new context for a user. Changes against the stored context are
/// turned into notifications and pushed to the user's live connection.
#[utoipa::path(
    post,
    path = "/api/context/update",
    request_body = ContextUpdateRequest,
    responses(
        (status = 200, description = "Context stored", body = ContextUpdateResponse),
        (status = 404, description = "User preferences not found", body = ErrorBody),
        (status = 422, description = "Invalid context", body = ErrorBody)
    )
)]
pub async fn update_context_handler(
    State(app_state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ContextUpdateRequest>,
) -> Result<Json<ContextUpdateResponse>, AppError> {
    if request.user_id.trim().is_empty() {
        return Err(ValidationError::EmptyUserId.into());
    }
    let hour = match request.current_time {
        Some(hour) => checked_hour(hour)?,
        None => local_hour(),
    };
    let location = request
        .location
        .map(LocationPayload::to_coordinate)
        .transpose()?;
    let weather = request
        .weather
        .as_deref()
        .map(str::parse::<Weather>)
        .transpose()?;

    let mut snapshot = ContextSnapshot::default().with_hour(hour);
    match (weather, request.temperature_c, location) {
        (Some(weather), Some(temperature_c), _) => {
            snapshot = snapshot.with_weather(weather, temperature_c);
        }
        (_, _, Some(at)) => {
            let reading = app_state.recommender.current_weather(at).await;
            if reading.fallback {
                debug!(user_id = %request.user_id, "No live weather; context stored without it.");
            } else {
                snapshot =
                    snapshot.with_weather(reading.report.weather, reading.report.temperature_c);
            }
        }
        _ => {}
    }
    if let Some(at) = location {
        snapshot = snapshot.with_location(at);
    }

    let update = app_state
        .notifications
        .apply(&request.user_id, snapshot)
        .await?;
    info!(
        user_id = %request.user_id,
        generated = update.events.len(),
        delivered = update.delivered,
        "Context updated."
    );

    Ok(Json(ContextUpdateResponse {
        user_id: request.user_id,
        context_updated: update.snapshot,
        notifications_generated: update.events.len(),
        notifications_delivered: update.delivered,
        notifications: update.events,
        timestamp: Utc::now(),
    }))
}

/// The most recent context stored for a user.
#[utoipa::path(
    get,
    path = "/api/context/{user_id}",
    params(("user_id" = String, Path, description = "The user's identifier.")),
    responses(
        (status = 200, description = "The stored context", body = ContextResponse),
        (status = 404, description = "No context for this user", body = ErrorBody)
    )
)]
pub async fn get_context_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<ContextResponse>, AppError> {
    let context = app_state.notifications.context(&user_id).await?;
    Ok(Json(ContextResponse {
        user_id,
        context,
        timestamp: Utc::now(),
    }))
}

/// The user's most recent notifications, oldest first.
#[utoipa::path(
    get,
    path = "/api/notifications/{user_id}",
    params(
        ("user_id" = String, Path, description = "The user's identifier."),
        ("limit" = Option<usize>, Query, description = "Page size, 1 to 100. Defaults to 20.")
    ),
    responses(
        (status = 200, description = "Notification history", body = HistoryResponse),
        (status = 404, description = "User not found", body = ErrorBody),
        (status = 422, description = "Invalid limit", body = ErrorBody)
    )
)]
pub async fn notification_history_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<HistoryResponse>, AppError> {
    let Query(params) = params.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_PAGE);
    if !(1..=MAX_HISTORY_PAGE).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {MAX_HISTORY_PAGE}, got {limit}"
        )));
    }
    let page = app_state.notifications.history(&user_id, limit).await?;
    Ok(Json(HistoryResponse {
        user_id,
        notifications: page.events,
        total: page.total,
        showing: page.showing,
    }))
}

/// Clear a user's notification history.
#[utoipa::path(
    delete,
    path = "/api/notifications/{user_id}",
    params(("user_id" = String, Path, description = "The user's identifier.")),
    responses(
        (status = 200, description = "History cleared", body = HistoryClearedResponse),
        (status = 404, description = "User not found", body = ErrorBody)
    )
)]
pub async fn clear_notifications_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<HistoryClearedResponse>, AppError> {
    let cleared = app_state.notifications.clear_history(&user_id).await?;
    let message = if cleared > 0 {
        "Notification history cleared"
    } else {
        "No notification history found"
    };
    Ok(Json(HistoryClearedResponse {
        user_id,
        message: message.to_string(),
        notifications_cleared: cleared,
    }))
}
