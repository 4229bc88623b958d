//! services/api/src/adapters/google_places.rs
//!
//! This module contains the adapter for the Google Places text-search API.
//! It implements the `PlaceProvider` port from the `core` crate.

use async_trait::async_trait;
use companion_core::{
    ports::{PlaceProvider, PortError, PortResult},
    Coordinate, Place, PlaceQuery,
};
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};

pub const TEXT_SEARCH_URL: &str = "https://maps.googleapis.com/maps/api/place/textsearch/json";

/// Searched when a query carries no terms.
pub const DEFAULT_QUERY: &str = "restaurant OR attraction OR museum OR park";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `PlaceProvider` port using Google Places.
#[derive(Clone)]
pub struct GooglePlacesAdapter {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl GooglePlacesAdapter {
    /// Creates a new `GooglePlacesAdapter`. Without a key every search fails
    /// as `Denied`.
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: TEXT_SEARCH_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Joins the query terms into one text-search query.
pub fn build_query(terms: &[String]) -> String {
    if terms.is_empty() {
        DEFAULT_QUERY.to_string()
    } else {
        terms.join(" OR ")
    }
}

//=========================================================================================
// Response Payload
//=========================================================================================

#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<PlaceResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    name: Option<String>,
    formatted_address: Option<String>,
    geometry: Option<Geometry>,
    #[serde(default)]
    types: Vec<String>,
    rating: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Option<LatLng>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl From<PlaceResult> for Place {
    fn from(result: PlaceResult) -> Self {
        let coordinate = result
            .geometry
            .and_then(|g| g.location)
            .and_then(|at| Coordinate::new(at.lat, at.lng).ok());
        Place {
            name: result.name.unwrap_or_else(|| "Unknown".to_string()),
            address: result
                .formatted_address
                .unwrap_or_else(|| "Address not available".to_string()),
            coordinate,
            categories: result.types,
            rating: result.rating,
        }
    }
}

/// Interprets a text-search response body. `ZERO_RESULTS` is an empty
/// success; `REQUEST_DENIED` is a distinct denial.
pub fn interpret_response(body: &str, limit: usize) -> PortResult<Vec<Place>> {
    let response: TextSearchResponse = serde_json::from_str(body)
        .map_err(|e| PortError::Unexpected(format!("malformed places response: {e}")))?;

    match response.status.as_str() {
        "OK" => Ok(response
            .results
            .into_iter()
            .take(limit)
            .map(Place::from)
            .collect()),
        "ZERO_RESULTS" => Ok(Vec::new()),
        "REQUEST_DENIED" => Err(PortError::Denied(response.error_message.unwrap_or_else(
            || "Check API key and ensure Places API is enabled".to_string(),
        ))),
        other => Err(PortError::Unavailable(format!(
            "{} - {}",
            other,
            response
                .error_message
                .unwrap_or_else(|| "Unknown error".to_string())
        ))),
    }
}

//=========================================================================================
// `PlaceProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl PlaceProvider for GooglePlacesAdapter {
    async fn search(&self, query: &PlaceQuery) -> PortResult<Vec<Place>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PortError::Denied("Google Places API key not configured".to_string()))?;

        let text = build_query(&query.terms);
        info!(query = %text, "Searching places.");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("query", text),
                (
                    "location",
                    format!("{},{}", query.center.latitude(), query.center.longitude()),
                ),
                ("radius", query.radius_meters.to_string()),
                ("key", api_key.to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PortError::Timeout(e.to_string())
                } else {
                    PortError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = status.as_u16(), "Places API HTTP error.");
            return Err(PortError::Unavailable(format!(
                "Google Places API HTTP error: {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let places = interpret_response(&body, query.limit)?;
        info!(found = places.len(), "Places search complete.");
        Ok(places)
    }
}
