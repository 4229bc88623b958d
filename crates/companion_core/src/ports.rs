//! crates/companion_core/src/ports.rs
//!
//! Defines the service contracts (traits) for every collaborator the engine
//! talks to: the preference boundary, the weather and place providers, the
//! per-user push channel, and the food-venue heuristic. Concrete adapters live
//! in the service crate; tests substitute scripted fakes.

use async_trait::async_trait;

use crate::domain::{
    Coordinate, NotificationEvent, Place, PlaceQuery, PreferenceProfile, WeatherReport,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (HTTP, sockets).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The provider explicitly refused the request (bad key, API disabled).
    #[error("Request denied: {0}")]
    Denied(String),
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, user_id: &str) -> PortResult<Option<PreferenceProfile>>;

    /// Creates or replaces a profile, returning the one it replaced.
    async fn put(&self, profile: PreferenceProfile) -> PortResult<Option<PreferenceProfile>>;

    async fn remove(&self, user_id: &str) -> PortResult<Option<PreferenceProfile>>;

    async fn count(&self) -> PortResult<usize>;
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Current conditions at `at`, already mapped to the four-value weather enum.
    async fn current(&self, at: Coordinate) -> PortResult<WeatherReport>;
}

#[async_trait]
pub trait PlaceProvider: Send + Sync {
    /// Searches for places. An empty result set is a success, not an error.
    async fn search(&self, query: &PlaceQuery) -> PortResult<Vec<Place>>;
}

#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Writes one event to the client. Callers bound this with a timeout.
    async fn push(&self, event: &NotificationEvent) -> PortResult<()>;

    /// Tears the channel down. Must be idempotent.
    async fn close(&self);
}

/// Decides whether a place is a food venue, used both to keep meal results
/// and to keep food venues out of activity results.
pub trait FoodClassifier: Send + Sync {
    /// True if the place is a good answer to a meal-time search.
    fn is_meal_venue(&self, place: &Place) -> bool;

    /// True if the place is primarily about food and should not count as an activity.
    fn is_food_venue(&self, place: &Place) -> bool;
}
