//! services/api/src/adapters/openweather.rs
//!
//! This module contains the adapter for the OpenWeatherMap current-weather API.
//! It implements the `WeatherProvider` port from the `core` crate.

use async_trait::async_trait;
use companion_core::{
    ports::{PortError, PortResult, WeatherProvider},
    Coordinate, Weather, WeatherReport,
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error};

pub const OPENWEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `WeatherProvider` port using OpenWeatherMap.
#[derive(Clone)]
pub struct OpenWeatherAdapter {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenWeatherAdapter {
    /// Creates a new `OpenWeatherAdapter`. Without a key every lookup fails as
    /// `Unavailable`, which the engine turns into fallback weather.
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: OPENWEATHER_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Maps an OpenWeather `main` condition to the engine's four-value enum.
pub fn map_condition(main: &str) -> Weather {
    match main.to_lowercase().as_str() {
        "rain" | "drizzle" | "thunderstorm" => Weather::Rainy,
        "snow" => Weather::Snowy,
        "clouds" | "mist" | "fog" => Weather::Cloudy,
        _ => Weather::Sunny,
    }
}

//=========================================================================================
// Response Payload
//=========================================================================================

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    weather: Vec<Condition>,
    main: Readings,
    wind: Option<Wind>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    main: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Readings {
    temp: f64,
    humidity: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: Option<f64>,
}

impl From<CurrentWeather> for WeatherReport {
    fn from(data: CurrentWeather) -> Self {
        let condition = data.weather.first();
        WeatherReport {
            weather: condition
                .map(|c| map_condition(&c.main))
                .unwrap_or(Weather::Sunny),
            temperature_c: data.main.temp.round() as i32,
            description: condition.and_then(|c| c.description.clone()),
            humidity: data.main.humidity,
            wind_speed: data.wind.and_then(|w| w.speed),
        }
    }
}

/// Interprets a response body. Kept separate from the HTTP call so the
/// mapping can be tested without a network.
pub fn parse_report(body: &str) -> PortResult<WeatherReport> {
    serde_json::from_str::<CurrentWeather>(body)
        .map(WeatherReport::from)
        .map_err(|e| PortError::Unexpected(format!("malformed weather response: {e}")))
}

//=========================================================================================
// `WeatherProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl WeatherProvider for OpenWeatherAdapter {
    async fn current(&self, at: Coordinate) -> PortResult<WeatherReport> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| {
                PortError::Unavailable("OpenWeather API key not configured".to_string())
            })?;

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("lat", at.latitude().to_string()),
                ("lon", at.longitude().to_string()),
                ("appid", api_key.to_string()),
                ("units", "metric".to_string()),
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
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            error!(status = status.as_u16(), "Weather API rejected the key.");
            return Err(PortError::Denied(format!("OpenWeather returned {status}")));
        }
        if !status.is_success() {
            error!(status = status.as_u16(), "Weather API error.");
            return Err(PortError::Unavailable(format!("OpenWeather returned {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let report = parse_report(&body)?;
        debug!(weather = %report.weather, temperature_c = report.temperature_c, "Weather fetched.");
        Ok(report)
    }
}
