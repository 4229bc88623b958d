pub mod classifier;
pub mod detector;
pub mod domain;
pub mod geo;
pub mod history;
pub mod ports;
pub mod recommend;
pub mod registry;
pub mod rules;
pub mod service;
pub mod store;

pub use detector::{ContextChangeDetector, DetectorThresholds};
pub use domain::{
    ActivityType, ContextSnapshot, Coordinate, EventPayload, Meal, MealSchedule, MealTime,
    NotificationEvent, Place, PlaceQuery, PreferenceProfile, Recommendation, TimePeriod,
    ValidationError, Weather, WeatherReport,
};
pub use ports::{
    FoodClassifier, PlaceProvider, PortError, PortResult, PreferenceStore, PushChannel,
    WeatherProvider,
};
pub use recommend::{RecommendError, RecommendationEngine, RecommendationSet, WeatherReading};
pub use registry::{ConnectionId, ConnectionRegistry};
pub use service::{NotificationCenter, ServiceError};
