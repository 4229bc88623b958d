//! Static rule tables: cuisine search terms, per-meal generic terms, activity
//! categories by time period, weather-sensitive keywords and the weather
//! transition messages. Kept as data so the classifier and the engine can be
//! tested against them directly.

use crate::domain::{ActivityType, Meal, TimePeriod, Weather};

pub const OUTDOOR_MIN_TEMP_C: i32 = -25;
pub const OUTDOOR_MAX_TEMP_C: i32 = 38;

/// Cuisine label as offered to the user, and the search term it maps to.
pub const CUISINE_SEARCH_TERMS: &[(&str, &str)] = &[
    ("Italian", "italian restaurant"),
    ("Burgers", "burger restaurant"),
    ("Pizza", "pizza restaurant"),
    ("Asian", "asian restaurant"),
    ("French", "french restaurant"),
    ("Mexican", "mexican restaurant"),
    ("Cafe", "cafe coffee shop"),
    ("Chinese", "chinese restaurant"),
    ("Japanese", "japanese restaurant sushi"),
    ("Indian", "indian restaurant"),
    ("Thai", "thai restaurant"),
    ("Korean", "korean restaurant"),
    ("Mediterranean", "mediterranean restaurant"),
    ("Vietnamese", "vietnamese restaurant"),
    ("Greek", "greek restaurant"),
    ("Seafood", "seafood restaurant"),
    ("Steakhouse", "steakhouse"),
];

pub fn cuisine_search_term(cuisine: &str) -> Option<&'static str> {
    CUISINE_SEARCH_TERMS
        .iter()
        .find(|(label, _)| *label == cuisine)
        .map(|(_, term)| *term)
}

/// Generic terms searched for a meal regardless of cuisine preferences.
pub fn meal_search_terms(meal: Meal) -> &'static [&'static str] {
    match meal {
        Meal::Breakfast => &[
            "breakfast restaurant",
            "cafe",
            "coffee shop",
            "brunch restaurant",
            "bakery",
            "breakfast diner",
        ],
        Meal::Lunch => &[
            "lunch restaurant",
            "restaurant",
            "bistro",
            "cafe",
            "fast food",
            "deli",
        ],
        Meal::Dinner => &[
            "dinner restaurant",
            "restaurant",
            "fine dining",
            "steakhouse",
            "gastropub",
        ],
    }
}

/// Activity categories searched for an activity type during a time period.
pub fn activity_categories(activity: ActivityType, period: TimePeriod) -> &'static [&'static str] {
    match (activity, period) {
        (ActivityType::Indoor, TimePeriod::EarlyMorning) => &[
            "gym",
            "fitness center",
            "yoga studio",
        ],
        (ActivityType::Indoor, TimePeriod::Morning) => &[
            "museum",
            "art gallery",
            "library",
            "bookstore",
            "shopping mall",
            "aquarium",
        ],
        (ActivityType::Indoor, TimePeriod::Afternoon) => &[
            "arcade",
            "amusement center",
            "bowling alley",
            "shopping mall",
            "movie theater",
            "museum",
            "art gallery",
            "aquarium",
            "spa",
        ],
        (ActivityType::Indoor, TimePeriod::Evening) => &[
            "bowling alley",
            "movie theater",
            "arcade",
            "casino",
            "shopping mall",
            "gym",
            "spa",
        ],
        (ActivityType::Indoor, TimePeriod::Night) => &[
            "night club",
            "casino",
            "movie theater",
            "bar",
        ],
        (ActivityType::Outdoor, TimePeriod::EarlyMorning) => &[
            "park",
            "hiking trail",
            "nature preserve",
            "garden",
            "bike trail",
        ],
        (ActivityType::Outdoor, TimePeriod::Morning) => &[
            "tourist attraction",
            "zoo",
            "botanical garden",
            "park",
            "marina",
            "scenic viewpoint",
        ],
        (ActivityType::Outdoor, TimePeriod::Afternoon) => &[
            "beach",
            "water park",
            "theme park",
            "zoo",
            "tourist attraction",
            "stadium",
            "sports complex",
            "marina",
            "playground",
        ],
        (ActivityType::Outdoor, TimePeriod::Evening) => &[
            "park",
            "tourist attraction",
            "stadium",
            "sports complex",
            "marina",
            "theme park",
        ],
        (ActivityType::Outdoor, TimePeriod::Night) => &["night club", "casino"],
    }
}

pub const WATER_ACTIVITIES: &[&str] = &["beach", "water park", "marina", "boat rental"];
pub const COLD_WEATHER_ACTIVITIES: &[&str] = &["ice skating", "ski area", "sledding"];
pub const RAIN_SENSITIVE_ACTIVITIES: &[&str] =
    &["hiking trail", "park", "playground", "sports complex", "stadium"];
pub const COVERED_MARKERS: &[&str] = &["mall", "market", "covered", "indoor"];

/// Keywords that make a search hit acceptable as a meal venue.
pub const MEAL_VENUE_KEYWORDS: &[&str] = &[
    "restaurant",
    "cafe",
    "food",
    "dining",
    "bakery",
    "bistro",
    "eatery",
    "coffee",
];

/// Keywords that disqualify a search hit from being an activity.
pub const FOOD_VENUE_KEYWORDS: &[&str] = &[
    "restaurant",
    "cafe",
    "dining",
    "cuisine",
    "bistro",
    "eatery",
    "food",
];

/// Message and follow-up suggestion for a weather change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherTransition {
    pub message: String,
    pub suggestion: &'static str,
}

const WEATHER_TRANSITIONS: &[(Weather, Weather, &str, &str)] = &[
    (
        Weather::Sunny,
        Weather::Rainy,
        "Weather changed to rainy. Consider indoor activities.",
        "indoor",
    ),
    (
        Weather::Sunny,
        Weather::Snowy,
        "Snow has started! Winter activities are now available.",
        "winter_sports",
    ),
    (
        Weather::Rainy,
        Weather::Sunny,
        "Rain has stopped! Great time for outdoor activities.",
        "outdoor",
    ),
    (
        Weather::Snowy,
        Weather::Sunny,
        "Snow has cleared. Enjoy outdoor activities!",
        "outdoor",
    ),
    (
        Weather::Cloudy,
        Weather::Sunny,
        "Sun is out! Perfect for outdoor exploration.",
        "outdoor",
    ),
    (
        Weather::Sunny,
        Weather::Cloudy,
        "Weather is now cloudy but still good for activities.",
        "outdoor",
    ),
];

/// Looks up the transition message, falling back to a generic one for pairs
/// the table does not list.
pub fn weather_transition(old: Weather, new: Weather) -> WeatherTransition {
    WEATHER_TRANSITIONS
        .iter()
        .find(|(from, to, _, _)| *from == old && *to == new)
        .map(|(_, _, message, suggestion)| WeatherTransition {
            message: (*message).to_string(),
            suggestion,
        })
        .unwrap_or_else(|| WeatherTransition {
            message: format!("Weather changed from {old} to {new}."),
            suggestion: "check_recommendations",
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuisine_lookup_is_exact_match() {
        assert_eq!(cuisine_search_term("Japanese"), Some("japanese restaurant sushi"));
        assert_eq!(cuisine_search_term("japanese"), None);
        assert_eq!(cuisine_search_term("Martian"), None);
    }

    #[test]
    fn every_period_has_categories_for_both_activity_types() {
        for period in TimePeriod::ALL {
            assert!(!activity_categories(ActivityType::Indoor, period).is_empty());
            assert!(!activity_categories(ActivityType::Outdoor, period).is_empty());
        }
    }

    #[test]
    fn listed_transition_uses_table_message() {
        let t = weather_transition(Weather::Sunny, Weather::Rainy);
        assert_eq!(t.message, "Weather changed to rainy. Consider indoor activities.");
        assert_eq!(t.suggestion, "indoor");
    }

    #[test]
    fn unlisted_transition_falls_back() {
        let t = weather_transition(Weather::Rainy, Weather::Snowy);
        assert_eq!(t.message, "Weather changed from rainy to snowy.");
        assert_eq!(t.suggestion, "check_recommendations");
    }
}
