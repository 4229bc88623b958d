pub mod catalog;
pub mod context;
pub mod extract;
pub mod payloads;
pub mod protocol;
pub mod push_channel;
pub mod rest;
pub mod state;
pub mod ws_handler;

pub use ws_handler::ws_handler;

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use rest::ApiDoc;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let allow_origin = match origin.map(str::parse::<HeaderValue>) {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(_)) => {
            warn!("CORS_ALLOWED_ORIGIN is not a valid header value; allowing any origin.");
            AllowOrigin::from(Any)
        }
        None => AllowOrigin::from(Any),
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT])
}

/// Builds the full application: REST routes, the notification socket and
/// the Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Router {
    let cors = cors_layer(app_state.config.cors_allowed_origin.as_deref());

    let api_router = Router::new()
        .route("/", get(catalog::root_handler))
        .route("/health", get(catalog::health_handler))
        .route("/api/preferences", post(rest::save_preferences_handler))
        .route(
            "/api/preferences/{user_id}",
            get(rest::get_preferences_handler)
                .put(rest::update_preferences_handler)
                .delete(rest::delete_preferences_handler),
        )
        .route("/api/recommendations", post(rest::recommendations_handler))
        .route(
            "/api/recommendations/manual",
            post(rest::manual_recommendations_handler),
        )
        .route("/api/weather", post(rest::weather_handler))
        .route("/api/context/update", post(context::update_context_handler))
        .route("/api/context/{user_id}", get(context::get_context_handler))
        .route(
            "/api/notifications/{user_id}",
            get(context::notification_history_handler).delete(context::clear_notifications_handler),
        )
        .route(
            "/api/cuisines/categories",
            get(catalog::cuisine_categories_handler),
        )
        .route(
            "/api/activities/categories",
            get(catalog::activity_categories_handler),
        )
        .route(
            "/api/location/validate",
            post(catalog::validate_location_handler),
        )
        .route("/ws/notifications/{user_id}", get(ws_handler))
        .layer(cors)
        .with_state(app_state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
