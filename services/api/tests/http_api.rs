//! End-to-end tests of the REST surface, driven through the router with
//! scripted weather and place providers.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use companion_api::{
    adapters::InMemoryPreferenceStore,
    config::Config,
    web::{router, state::AppState},
};
use companion_core::{
    ports::{PlaceProvider, PortError, PortResult, WeatherProvider},
    Coordinate, Place, PlaceQuery, Weather, WeatherReport,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct FixedWeather(Option<WeatherReport>);

#[async_trait]
impl WeatherProvider for FixedWeather {
    async fn current(&self, _at: Coordinate) -> PortResult<WeatherReport> {
        self.0
            .clone()
            .ok_or_else(|| PortError::Unavailable("weather down".to_string()))
    }
}

struct FixedPlaces(Option<Vec<Place>>);

#[async_trait]
impl PlaceProvider for FixedPlaces {
    async fn search(&self, _query: &PlaceQuery) -> PortResult<Vec<Place>> {
        self.0
            .clone()
            .ok_or_else(|| PortError::Unavailable("places down".to_string()))
    }
}

fn place(name: &str, category: &str) -> Place {
    Place {
        name: name.to_string(),
        address: format!("{name}, Montreal"),
        coordinate: Some(Coordinate::new(45.505, -73.57).unwrap()),
        categories: vec![category.to_string()],
        rating: Some(4.5),
    }
}

fn app(weather: Option<WeatherReport>, places: Option<Vec<Place>>) -> Router {
    let state = AppState::new(
        Arc::new(Config::default()),
        Arc::new(InMemoryPreferenceStore::new()),
        Arc::new(FixedWeather(weather)),
        Arc::new(FixedPlaces(places)),
    );
    router(Arc::new(state))
}

fn healthy_app() -> Router {
    app(
        Some(WeatherReport::new(Weather::Sunny, 22)),
        Some(vec![
            place("Chez Tony", "restaurant"),
            place("Mount Royal Park", "park"),
        ]),
    )
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn preferences(user_id: &str, activity_type: &str) -> Value {
    json!({
        "user_id": user_id,
        "activity_type": activity_type,
        "meal_times": { "lunch": "12:00" },
        "preferred_cuisines": ["Italian"]
    })
}

const DOWNTOWN: (f64, f64) = (45.5017, -73.5673);

#[tokio::test]
async fn preferences_lifecycle() {
    let app = healthy_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/preferences",
        Some(preferences("u1", "outdoor")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "u1");

    let (status, body) = send(&app, Method::GET, "/api/preferences/u1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["preferences"]["activity_type"], "outdoor");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/preferences/u1",
        Some(preferences("ignored", "indoor")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "u1");
    assert_eq!(body["preferences"]["activity_type"], "indoor");
    assert!(!body["changes_detected"].as_array().unwrap().is_empty());
    assert_eq!(body["notification_sent"], false);

    let (status, _) = send(&app, Method::DELETE, "/api/preferences/u1", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/api/preferences/u1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().contains("not found"));

    let (status, _) = send(&app, Method::DELETE, "/api/preferences/u1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_preferences_are_rejected() {
    let app = healthy_app();

    let mut bad_time = preferences("u1", "outdoor");
    bad_time["meal_times"] = json!({ "lunch": "25:00" });
    let (status, body) = send(&app, Method::POST, "/api/preferences", Some(bad_time)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/preferences",
        Some(preferences("u1", "underwater")),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/preferences/nobody",
        Some(preferences("nobody", "indoor")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn context_update_requires_preferences() {
    let app = healthy_app();
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/context/update",
        Some(json!({ "user_id": "ghost", "current_time": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(&app, Method::POST, "/api/preferences", Some(preferences("u1", "outdoor"))).await;
    let (status, body) = send(&app, Method::GET, "/api/context/u1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "No context found for this user");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/context/update",
        Some(json!({ "user_id": "u1", "current_time": 24 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/context/update",
        Some(json!({ "user_id": " ", "current_time": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"], "user_id must not be empty");
}

#[tokio::test]
async fn context_changes_become_notifications() {
    let app = healthy_app();
    send(&app, Method::POST, "/api/preferences", Some(preferences("u1", "outdoor"))).await;

    let update = |weather: &str| {
        json!({
            "user_id": "u1",
            "location": { "latitude": DOWNTOWN.0, "longitude": DOWNTOWN.1 },
            "current_time": 10,
            "weather": weather,
            "temperature": 20
        })
    };

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/context/update",
        Some(update("sunny")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notifications_generated"], 0);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/context/update",
        Some(update("rainy")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notifications_generated"], 1);
    assert_eq!(body["notifications_delivered"], 0);
    assert_eq!(body["notifications"][0]["type"], "weather_change");

    let (status, body) = send(&app, Method::GET, "/api/context/u1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["context"]["weather"], "rainy");
    assert_eq!(body["context"]["hour_of_day"], 10);

    let (status, body) = send(&app, Method::GET, "/api/notifications/u1?limit=5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["showing"], 1);

    for bad in ["0", "101", "many"] {
        let (status, _) = send(
            &app,
            Method::GET,
            &format!("/api/notifications/u1?limit={bad}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "limit={bad}");
    }

    let (status, body) = send(&app, Method::DELETE, "/api/notifications/u1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notifications_cleared"], 1);
    assert_eq!(body["message"], "Notification history cleared");

    let (_, body) = send(&app, Method::DELETE, "/api/notifications/u1", None).await;
    assert_eq!(body["message"], "No notification history found");
}

#[tokio::test]
async fn history_of_unknown_user_is_not_found() {
    let app = healthy_app();
    let (status, _) = send(&app, Method::GET, "/api/notifications/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(&app, Method::POST, "/api/preferences", Some(preferences("u1", "indoor"))).await;
    let (status, body) = send(&app, Method::GET, "/api/notifications/u1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn manual_recommendations_mix_meals_and_activities() {
    let app = healthy_app();
    let request = json!({
        "preferences": preferences("u1", "outdoor"),
        "location": { "latitude": DOWNTOWN.0, "longitude": DOWNTOWN.1 },
        "manual_context": { "time_hour": 12, "weather": "sunny", "temperature": 22 }
    });

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/recommendations/manual",
        Some(request),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let context = &body["context"];
    assert_eq!(context["time_hour"], 12);
    assert_eq!(context["meal"], "lunch");
    assert_eq!(context["weather"], "sunny");
    assert_eq!(context["weather_fallback"], false);
    assert_eq!(context["manual_override"], true);
    assert_eq!(context["location"]["in_service_area"], true);

    let recommendations = body["recommendations"].as_array().unwrap();
    assert_eq!(recommendations.len(), 2);
    assert_eq!(recommendations[0]["name"], "Chez Tony");
    assert_eq!(recommendations[0]["category"], "restaurant");
    assert_eq!(recommendations[1]["name"], "Mount Royal Park");
}

#[tokio::test]
async fn manual_recommendations_validate_overrides() {
    let app = healthy_app();
    for manual in [
        json!({ "time_hour": 24 }),
        json!({ "weather": "hail", "temperature": 3 }),
        json!({ "latitude": 91.0 }),
    ] {
        let request = json!({
            "preferences": preferences("u1", "indoor"),
            "location": { "latitude": DOWNTOWN.0, "longitude": DOWNTOWN.1 },
            "manual_context": manual
        });
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/recommendations/manual",
            Some(request),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}

#[tokio::test]
async fn recommendations_unavailable_when_every_provider_fails() {
    let app = app(None, None);
    let request = json!({
        "preferences": preferences("u1", "indoor"),
        "location": { "latitude": DOWNTOWN.0, "longitude": DOWNTOWN.1 }
    });
    let (status, body) = send(&app, Method::POST, "/api/recommendations", Some(request)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn weather_falls_back_when_provider_fails() {
    let app = app(None, Some(vec![]));
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/weather",
        Some(json!({ "latitude": DOWNTOWN.0, "longitude": DOWNTOWN.1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fallback"], true);
    assert_eq!(body["weather"], "cloudy");
    assert_eq!(body["temperature_c"], 15);
}

#[tokio::test]
async fn catalogs_list_cuisines_and_activities() {
    let app = healthy_app();

    let (status, body) = send(&app, Method::GET, "/api/cuisines/categories", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["cuisines"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted);
    assert_eq!(body["total"], names.len());

    let (status, body) = send(&app, Method::GET, "/api/activities/categories", None).await;
    assert_eq!(status, StatusCode::OK);
    for key in ["early_morning", "morning", "noon", "evening", "night"] {
        assert!(body["indoor"][key].is_array(), "indoor {key}");
        assert!(body["outdoor"][key].is_array(), "outdoor {key}");
    }
}

#[tokio::test]
async fn location_validation_reports_service_area() {
    let app = healthy_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/location/validate",
        Some(json!({ "latitude": DOWNTOWN.0, "longitude": DOWNTOWN.1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["in_service_area"], true);
    assert_eq!(body["recommendation"], "OK");

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/location/validate",
        Some(json!({ "latitude": 43.6532, "longitude": -79.3832 })),
    )
    .await;
    assert_eq!(body["in_service_area"], false);
    assert!(body["distance_from_center_km"].as_f64().unwrap() > 400.0);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/location/validate",
        Some(json!({ "latitude": "north" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn health_reports_counters() {
    let app = healthy_app();
    send(&app, Method::POST, "/api/preferences", Some(preferences("u1", "indoor"))).await;
    send(&app, Method::POST, "/api/preferences", Some(preferences("u2", "outdoor"))).await;

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["active_users"], 2);
    assert_eq!(body["active_websocket_connections"], 0);
    assert_eq!(body["configuration"]["outdoor_temp_range"], "-25°C to 38°C");
    assert_eq!(body["apis_configured"]["openweather"], false);
}
