//! Pure context classification: time-of-day buckets, meal matching, outdoor
//! suitability, and the weather rules that narrow activity categories.

use crate::{
    domain::{ActivityType, Meal, MealSchedule, Place, TimePeriod, Weather},
    ports::FoodClassifier,
    rules::{
        activity_categories, COLD_WEATHER_ACTIVITIES, COVERED_MARKERS, FOOD_VENUE_KEYWORDS,
        MEAL_VENUE_KEYWORDS, OUTDOOR_MAX_TEMP_C, OUTDOOR_MIN_TEMP_C, RAIN_SENSITIVE_ACTIVITIES,
        WATER_ACTIVITIES,
    },
};

/// Buckets an hour of the day. Hours above 23 are treated modulo 24.
pub fn time_period(hour: u8) -> TimePeriod {
    match hour % 24 {
        5..=7 => TimePeriod::EarlyMorning,
        8..=11 => TimePeriod::Morning,
        12..=16 => TimePeriod::Afternoon,
        17..=20 => TimePeriod::Evening,
        _ => TimePeriod::Night,
    }
}

/// The first configured meal whose hour is within one hour of `hour`.
pub fn meal_match(hour: u8, schedule: &MealSchedule) -> Option<Meal> {
    schedule
        .iter()
        .find(|(_, time)| (i16::from(hour) - i16::from(time.hour)).abs() <= 1)
        .map(|(meal, _)| *meal)
}

pub fn is_outdoor_suitable(weather: Weather, temperature_c: i32) -> bool {
    if !(OUTDOOR_MIN_TEMP_C..=OUTDOOR_MAX_TEMP_C).contains(&temperature_c) {
        return false;
    }
    !(weather == Weather::Rainy && temperature_c < 10)
}

fn mentions_any(label: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| label.contains(k))
}

/// Drops categories that make no sense in the given weather. Never returns an
/// empty list: if every candidate would be dropped, the input is returned.
pub fn weather_activity_filter<'a>(
    candidates: &[&'a str],
    weather: Weather,
    temperature_c: i32,
) -> Vec<&'a str> {
    let filtered: Vec<&'a str> = candidates
        .iter()
        .copied()
        .filter(|category| {
            let label = category.to_lowercase();
            if weather == Weather::Snowy || temperature_c < -5 {
                mentions_any(&label, COLD_WEATHER_ACTIVITIES)
                    || !mentions_any(&label, WATER_ACTIVITIES)
            } else if weather == Weather::Rainy {
                mentions_any(&label, COVERED_MARKERS)
                    || !mentions_any(&label, RAIN_SENSITIVE_ACTIVITIES)
            } else if temperature_c < 10 {
                !mentions_any(&label, WATER_ACTIVITIES)
            } else {
                true
            }
        })
        .collect();

    if filtered.is_empty() {
        candidates.to_vec()
    } else {
        filtered
    }
}

/// The activity categories chosen for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityPlan {
    pub categories: Vec<&'static str>,
    /// Outdoor was requested but the weather ruled it out.
    pub indoor_substituted: bool,
}

pub fn activity_plan(
    activity: ActivityType,
    period: TimePeriod,
    weather: Weather,
    temperature_c: i32,
) -> ActivityPlan {
    match activity {
        ActivityType::Indoor => ActivityPlan {
            categories: activity_categories(ActivityType::Indoor, period).to_vec(),
            indoor_substituted: false,
        },
        ActivityType::Outdoor if !is_outdoor_suitable(weather, temperature_c) => ActivityPlan {
            categories: activity_categories(ActivityType::Indoor, period).to_vec(),
            indoor_substituted: true,
        },
        ActivityType::Outdoor => ActivityPlan {
            categories: weather_activity_filter(
                activity_categories(ActivityType::Outdoor, period),
                weather,
                temperature_c,
            ),
            indoor_substituted: false,
        },
    }
}

/// Keyword matching over a place's name and categories.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordFoodClassifier;

impl KeywordFoodClassifier {
    fn matches(place: &Place, keywords: &[&str]) -> bool {
        let categories = place.categories.join(" ").to_lowercase();
        let name = place.name.to_lowercase();
        keywords
            .iter()
            .any(|k| categories.contains(k) || name.contains(k))
    }
}

impl FoodClassifier for KeywordFoodClassifier {
    fn is_meal_venue(&self, place: &Place) -> bool {
        Self::matches(place, MEAL_VENUE_KEYWORDS)
    }

    fn is_food_venue(&self, place: &Place) -> bool {
        Self::matches(place, FOOD_VENUE_KEYWORDS)
    }
}
