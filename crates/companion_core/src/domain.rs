//! crates/companion_core/src/domain.rs
//!
//! Defines the core data structures for the companion engine: coordinates,
//! preference profiles, context snapshots, notification events and
//! recommendations. Every constructor that accepts outside input validates it,
//! so a value of one of these types is always well-formed.

use chrono::{DateTime, Utc};
use serde::{
    de::{self, MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};
use std::{collections::HashSet, fmt, str::FromStr};
use uuid::Uuid;

//=========================================================================================
// Validation Errors
//=========================================================================================

/// Raised when outside input does not describe a valid domain value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Latitude {0} must be between -90 and 90")]
    Latitude(f64),
    #[error("Longitude {0} must be between -180 and 180")]
    Longitude(f64),
    #[error("Invalid meal type: {0}. Must be one of breakfast, lunch, dinner")]
    UnknownMeal(String),
    #[error("Meal {0} is configured more than once")]
    DuplicateMeal(String),
    #[error("Invalid time format for {meal}: {value}. Use HH:MM format")]
    MealTime { meal: String, value: String },
    #[error("activity_type must be either \"indoor\" or \"outdoor\", got {0:?}")]
    ActivityType(String),
    #[error("weather must be one of: sunny, cloudy, rainy, snowy; got {0:?}")]
    Weather(String),
    #[error("Hour {0} must be between 0 and 23")]
    Hour(u32),
    #[error("user_id must not be empty")]
    EmptyUserId,
}

//=========================================================================================
// Coordinates
//=========================================================================================

/// A validated latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = ValidationError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::Latitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// For compile-time constants that are known to be in range.
    pub(crate) const fn new_unchecked(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

//=========================================================================================
// Enumerations
//=========================================================================================

/// The four normalized weather conditions the engine reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    Sunny,
    Cloudy,
    Rainy,
    Snowy,
}

impl Weather {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sunny => "sunny",
            Self::Cloudy => "cloudy",
            Self::Rainy => "rainy",
            Self::Snowy => "snowy",
        }
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weather {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sunny" => Ok(Self::Sunny),
            "cloudy" => Ok(Self::Cloudy),
            "rainy" => Ok(Self::Rainy),
            "snowy" => Ok(Self::Snowy),
            other => Err(ValidationError::Weather(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Indoor,
    Outdoor,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Indoor => "indoor",
            Self::Outdoor => "outdoor",
        }
    }
}

impl FromStr for ActivityType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "indoor" => Ok(Self::Indoor),
            "outdoor" => Ok(Self::Outdoor),
            other => Err(ValidationError::ActivityType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Meal {
    Breakfast,
    Lunch,
    Dinner,
}

impl Meal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
        }
    }

    /// Capitalized form used in notification titles.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Breakfast => "Breakfast",
            Self::Lunch => "Lunch",
            Self::Dinner => "Dinner",
        }
    }
}

impl FromStr for Meal {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            other => Err(ValidationError::UnknownMeal(other.to_string())),
        }
    }
}

/// One of the five fixed buckets partitioning the 24-hour clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePeriod {
    EarlyMorning,
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimePeriod {
    pub const ALL: [TimePeriod; 5] = [
        Self::EarlyMorning,
        Self::Morning,
        Self::Afternoon,
        Self::Evening,
        Self::Night,
    ];

    /// Human-readable label, e.g. "Early Morning".
    pub fn label(&self) -> &'static str {
        match self {
            Self::EarlyMorning => "Early Morning",
            Self::Morning => "Morning",
            Self::Afternoon => "Afternoon",
            Self::Evening => "Evening",
            Self::Night => "Night",
        }
    }

    /// Key into the activity category tables. The afternoon bucket is keyed `noon`.
    pub fn category_key(&self) -> &'static str {
        match self {
            Self::EarlyMorning => "early_morning",
            Self::Morning => "morning",
            Self::Afternoon => "noon",
            Self::Evening => "evening",
            Self::Night => "night",
        }
    }
}

//=========================================================================================
// Meal Schedule
//=========================================================================================

/// A 24-hour `HH:MM` wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MealTime {
    pub hour: u8,
    pub minute: u8,
}

impl MealTime {
    fn parse(meal: &str, value: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::MealTime {
            meal: meal.to_string(),
            value: value.to_string(),
        };
        let (hour, minute) = value.split_once(':').ok_or_else(invalid)?;
        let hour: u8 = hour.trim().parse().map_err(|_| invalid())?;
        let minute: u8 = minute.trim().parse().map_err(|_| invalid())?;
        if hour > 23 || minute > 59 {
            return Err(invalid());
        }
        Ok(Self { hour, minute })
    }
}

impl fmt::Display for MealTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// The configured meals of a profile in declaration order.
///
/// Order is significant: when two meals match the same hour the first one
/// declared wins, so the schedule keeps the order in which the client sent the
/// keys instead of sorting them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MealSchedule(Vec<(Meal, MealTime)>);

impl MealSchedule {
    pub fn new(entries: Vec<(Meal, MealTime)>) -> Result<Self, ValidationError> {
        let mut seen = HashSet::new();
        for (meal, _) in &entries {
            if !seen.insert(*meal) {
                return Err(ValidationError::DuplicateMeal(meal.as_str().to_string()));
            }
        }
        Ok(Self(entries))
    }

    /// Parses `(meal name, "HH:MM")` pairs, preserving their order.
    pub fn parse<I, K, V>(pairs: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let entries = pairs
            .into_iter()
            .map(|(meal, time)| {
                let meal_name = meal.as_ref();
                let parsed_meal = meal_name.parse::<Meal>()?;
                let parsed_time = MealTime::parse(meal_name, time.as_ref())?;
                Ok((parsed_meal, parsed_time))
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;
        Self::new(entries)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Meal, MealTime)> {
        self.0.iter()
    }

    pub fn get(&self, meal: Meal) -> Option<MealTime> {
        self.0.iter().find(|(m, _)| *m == meal).map(|(_, time)| *time)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl Serialize for MealSchedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (meal, time) in &self.0 {
            map.serialize_entry(meal.as_str(), &time.to_string())?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MealSchedule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScheduleVisitor;

        impl<'de> Visitor<'de> for ScheduleVisitor {
            type Value = MealSchedule;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of meal names to HH:MM times")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut pairs: Vec<(String, String)> = Vec::new();
                while let Some((meal, time)) = access.next_entry::<String, String>()? {
                    pairs.push((meal, time));
                }
                MealSchedule::parse(pairs).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_map(ScheduleVisitor)
    }
}

//=========================================================================================
// Preference Profile
//=========================================================================================

/// A user's activity and dining preferences. Owned by the preference store;
/// the engine only ever reads a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceProfile {
    pub user_id: String,
    pub activity_type: ActivityType,
    pub meal_times: MealSchedule,
    pub preferred_cuisines: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl PreferenceProfile {
    pub fn new(
        user_id: impl Into<String>,
        activity_type: ActivityType,
        meal_times: MealSchedule,
        preferred_cuisines: Vec<String>,
    ) -> Result<Self, ValidationError> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            return Err(ValidationError::EmptyUserId);
        }
        let mut seen = HashSet::new();
        let preferred_cuisines = preferred_cuisines
            .into_iter()
            .filter(|c| seen.insert(c.clone()))
            .collect();
        Ok(Self {
            user_id,
            activity_type,
            meal_times,
            preferred_cuisines,
            updated_at: Utc::now(),
        })
    }

    /// Lists what differs between `previous` and `self` in user-facing terms.
    pub fn changes_from(&self, previous: &PreferenceProfile) -> Vec<String> {
        let mut changes = Vec::new();
        if self.activity_type != previous.activity_type {
            changes.push(format!(
                "activity preference changed to {}",
                self.activity_type.as_str()
            ));
        }
        if self.meal_times != previous.meal_times {
            changes.push("meal times updated".to_string());
        }
        let current: HashSet<&String> = self.preferred_cuisines.iter().collect();
        let before: HashSet<&String> = previous.preferred_cuisines.iter().collect();
        if current != before {
            changes.push("cuisine preferences updated".to_string());
        }
        changes
    }
}

//=========================================================================================
// Context
//=========================================================================================

/// A user's situational context. Every field is optional: an update may carry
/// only a location, only an hour, and so on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub location: Option<Coordinate>,
    pub weather: Option<Weather>,
    pub temperature_c: Option<i32>,
    pub hour_of_day: Option<u8>,
}

impl ContextSnapshot {
    pub fn with_location(mut self, location: Coordinate) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_weather(mut self, weather: Weather, temperature_c: i32) -> Self {
        self.weather = Some(weather);
        self.temperature_c = Some(temperature_c);
        self
    }

    pub fn with_hour(mut self, hour: u8) -> Self {
        self.hour_of_day = Some(hour);
        self
    }
}

//=========================================================================================
// Notification Events
//=========================================================================================

/// An immutable notification generated from a context change or a preference
/// update. Serializes to the push-channel schema `{type, title, message, timestamp, ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// The type-specific part of a notification; its variant is the event `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    LocationChange {
        distance_moved_km: f64,
    },
    TimePeriodChange {
        old_period: TimePeriod,
        new_period: TimePeriod,
    },
    MealTime {
        meal_type: Meal,
    },
    WeatherChange {
        old_weather: Weather,
        new_weather: Weather,
        activity_suggestion: String,
    },
    TemperatureChange {
        old_temperature_c: i32,
        new_temperature_c: i32,
    },
    PreferencesUpdated {
        changes: Vec<String>,
    },
    ConnectionEstablished,
}

impl EventPayload {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::LocationChange { .. } => "location_change",
            Self::TimePeriodChange { .. } => "time_period_change",
            Self::MealTime { .. } => "meal_time",
            Self::WeatherChange { .. } => "weather_change",
            Self::TemperatureChange { .. } => "temperature_change",
            Self::PreferencesUpdated { .. } => "preferences_updated",
            Self::ConnectionEstablished => "connection_established",
        }
    }
}

impl NotificationEvent {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        payload: EventPayload,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            message: message.into(),
            created_at: Utc::now(),
            payload,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.payload.type_name()
    }

    pub fn connection_established() -> Self {
        Self::new(
            "Connected",
            "You will receive notifications about context changes.",
            EventPayload::ConnectionEstablished,
        )
    }

    pub fn preferences_updated(changes: Vec<String>) -> Self {
        let message = format!(
            "Your recommendations will now reflect your updated preferences: {}.",
            changes.join(", ")
        );
        Self::new(
            "Preferences Updated",
            message,
            EventPayload::PreferencesUpdated { changes },
        )
    }
}

//=========================================================================================
// External Signals and Recommendations
//=========================================================================================

/// Current conditions at a coordinate, normalized from the weather provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub weather: Weather,
    pub temperature_c: i32,
    pub description: Option<String>,
    pub humidity: Option<u8>,
    pub wind_speed: Option<f64>,
}

impl WeatherReport {
    pub fn new(weather: Weather, temperature_c: i32) -> Self {
        Self {
            weather,
            temperature_c,
            description: None,
            humidity: None,
            wind_speed: None,
        }
    }
}

/// A place-search request against the place provider.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceQuery {
    pub center: Coordinate,
    pub terms: Vec<String>,
    pub radius_meters: u32,
    pub limit: usize,
}

/// A point of interest as returned by the place provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub address: String,
    pub coordinate: Option<Coordinate>,
    pub categories: Vec<String>,
    pub rating: Option<f32>,
}

/// A ranked suggestion. Derived on every request, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub name: String,
    pub category: String,
    pub description: String,
    pub address: String,
    pub reason: String,
    pub distance_meters: Option<u32>,
    pub rating: Option<f32>,
    pub coordinate: Option<Coordinate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_rejects_out_of_range_values() {
        assert_eq!(
            Coordinate::new(91.0, 0.0),
            Err(ValidationError::Latitude(91.0))
        );
        assert_eq!(
            Coordinate::new(0.0, -180.5),
            Err(ValidationError::Longitude(-180.5))
        );
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn coordinate_deserialization_validates_ranges() {
        let ok: Coordinate =
            serde_json::from_str(r#"{"latitude": 45.5, "longitude": -73.5}"#).unwrap();
        assert_eq!(ok.latitude(), 45.5);
        let out_of_range = r#"{"latitude": 120, "longitude": 0}"#;
        assert!(serde_json::from_str::<Coordinate>(out_of_range).is_err());
    }

    #[test]
    fn meal_schedule_keeps_declaration_order() {
        let schedule: MealSchedule =
            serde_json::from_str(r#"{"lunch": "12:00", "breakfast": "08:30"}"#).unwrap();
        let meals: Vec<Meal> = schedule.iter().map(|(meal, _)| *meal).collect();
        assert_eq!(meals, vec![Meal::Lunch, Meal::Breakfast]);
        assert_eq!(
            serde_json::to_string(&schedule).unwrap(),
            r#"{"lunch":"12:00","breakfast":"08:30"}"#
        );
    }

    #[test]
    fn meal_schedule_rejects_unknown_meals_and_bad_times() {
        assert_eq!(
            MealSchedule::parse([("brunch", "11:00")]),
            Err(ValidationError::UnknownMeal("brunch".to_string()))
        );
        for bad in ["24:00", "12:60", "noon", "12", "12:xx"] {
            assert!(
                MealSchedule::parse([("lunch", bad)]).is_err(),
                "{bad} should be rejected"
            );
        }
        assert!(MealSchedule::parse([("lunch", "12:00"), ("lunch", "13:00")]).is_err());
    }

    #[test]
    fn profile_requires_user_id_and_dedupes_cuisines() {
        assert_eq!(
            PreferenceProfile::new(" ", ActivityType::Indoor, MealSchedule::default(), vec![]),
            Err(ValidationError::EmptyUserId)
        );
        let profile = PreferenceProfile::new(
            "u1",
            ActivityType::Indoor,
            MealSchedule::default(),
            vec!["Italian".into(), "Thai".into(), "Italian".into()],
        )
        .unwrap();
        assert_eq!(profile.preferred_cuisines, vec!["Italian", "Thai"]);
    }

    #[test]
    fn profile_changes_ignore_cuisine_order() {
        let before = PreferenceProfile::new(
            "u1",
            ActivityType::Indoor,
            MealSchedule::default(),
            vec!["Italian".into(), "Thai".into()],
        )
        .unwrap();
        let mut after = before.clone();
        after.preferred_cuisines = vec!["Thai".into(), "Italian".into()];
        assert!(after.changes_from(&before).is_empty());

        after.activity_type = ActivityType::Outdoor;
        after.meal_times = MealSchedule::parse([("dinner", "19:00")]).unwrap();
        assert_eq!(
            after.changes_from(&before),
            vec![
                "activity preference changed to outdoor".to_string(),
                "meal times updated".to_string(),
            ]
        );
    }

    #[test]
    fn events_serialize_with_type_tag_and_timestamp() {
        let event = NotificationEvent::new(
            "Weather Update",
            "Rain",
            EventPayload::WeatherChange {
                old_weather: Weather::Sunny,
                new_weather: Weather::Rainy,
                activity_suggestion: "indoor".into(),
            },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "weather_change");
        assert_eq!(json["title"], "Weather Update");
        assert_eq!(json["old_weather"], "sunny");
        assert!(json.get("timestamp").is_some());

        let back: NotificationEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
