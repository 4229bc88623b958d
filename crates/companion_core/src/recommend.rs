//! crates/companion_core/src/recommend.rs
//!
//! The recommendation engine. Combines a user's preferences with live weather
//! and nearby places: meal venues first when the hour matches a configured
//! meal, then activities for the time of day, filtered by the weather.
//!
//! Every provider call is bounded by a timeout. A failed place query only
//! empties that query's results, and a failed weather lookup falls back to the
//! last reading (or a fixed default). The request as a whole only fails when
//! both kinds of provider fail.

use std::{collections::HashSet, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    classifier::{
        activity_plan, is_outdoor_suitable, meal_match, time_period, KeywordFoodClassifier,
    },
    domain::{
        ActivityType, Coordinate, Meal, Place, PlaceQuery, PreferenceProfile, Recommendation,
        TimePeriod, Weather, WeatherReport,
    },
    geo::distance_meters,
    ports::{FoodClassifier, PlaceProvider, PortError, PortResult, WeatherProvider},
    rules::{cuisine_search_term, meal_search_terms},
};

pub const MAX_RECOMMENDATIONS: usize = 10;
pub const MAX_MEAL_RECOMMENDATIONS: usize = 8;
pub const SEARCH_RADIUS_METERS: u32 = 5000;
pub const SEARCH_LIMIT: usize = 30;
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Used when the weather provider has never answered.
pub fn fallback_weather() -> WeatherReport {
    WeatherReport {
        weather: Weather::Cloudy,
        temperature_c: 15,
        description: Some("weather unavailable, using fallback".to_string()),
        humidity: None,
        wind_speed: None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecommendError {
    #[error("Recommendations unavailable: {0}")]
    Unavailable(String),
}

/// A weather report and whether it came from the provider or a fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub report: WeatherReport,
    pub fallback: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    Skipped,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct RecommendationSet {
    pub recommendations: Vec<Recommendation>,
    pub meal: Option<Meal>,
    pub period: TimePeriod,
    pub activity_categories: Vec<&'static str>,
    pub indoor_substituted: bool,
    pub meal_query: QueryOutcome,
    pub activity_query: QueryOutcome,
}

impl RecommendationSet {
    /// True when at least one place query was issued and every one failed.
    pub fn places_unavailable(&self) -> bool {
        let issued: Vec<QueryOutcome> = [self.meal_query, self.activity_query]
            .into_iter()
            .filter(|q| *q != QueryOutcome::Skipped)
            .collect();
        !issued.is_empty() && issued.iter().all(|q| *q == QueryOutcome::Failed)
    }
}

/// Search terms for a meal: preferred cuisines first, then the meal's generic terms.
pub fn meal_query_terms(profile: &PreferenceProfile, meal: Meal) -> Vec<String> {
    let mut seen = HashSet::new();
    profile
        .preferred_cuisines
        .iter()
        .filter_map(|cuisine| cuisine_search_term(cuisine))
        .chain(meal_search_terms(meal).iter().copied())
        .filter(|term| seen.insert(*term))
        .map(str::to_string)
        .collect()
}

pub struct RecommendationEngine {
    weather: Arc<dyn WeatherProvider>,
    places: Arc<dyn PlaceProvider>,
    food: Arc<dyn FoodClassifier>,
    call_timeout: Duration,
    last_weather: Mutex<Option<WeatherReport>>,
}

impl RecommendationEngine {
    pub fn new(
        weather: Arc<dyn WeatherProvider>,
        places: Arc<dyn PlaceProvider>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            weather,
            places,
            food: Arc::new(KeywordFoodClassifier),
            call_timeout,
            last_weather: Mutex::new(None),
        }
    }

    pub fn with_food_classifier(mut self, food: Arc<dyn FoodClassifier>) -> Self {
        self.food = food;
        self
    }

    /// Current weather, falling back to the last good reading or the fixed
    /// default when the provider errors or times out.
    pub async fn current_weather(&self, at: Coordinate) -> WeatherReading {
        let result = match tokio::time::timeout(self.call_timeout, self.weather.current(at)).await {
            Ok(result) => result,
            Err(_) => Err(PortError::Timeout(format!(
                "weather lookup exceeded {:?}",
                self.call_timeout
            ))),
        };

        match result {
            Ok(report) => {
                *self.last_weather.lock().await = Some(report.clone());
                WeatherReading {
                    report,
                    fallback: false,
                }
            }
            Err(e) => {
                let report = self
                    .last_weather
                    .lock()
                    .await
                    .clone()
                    .unwrap_or_else(fallback_weather);
                warn!(
                    error = %e,
                    weather = %report.weather,
                    "Weather lookup failed; using fallback."
                );
                WeatherReading {
                    report,
                    fallback: true,
                }
            }
        }
    }

    async fn search(&self, query: &PlaceQuery) -> PortResult<Vec<Place>> {
        match tokio::time::timeout(self.call_timeout, self.places.search(query)).await {
            Ok(result) => result,
            Err(_) => Err(PortError::Timeout(format!(
                "place search exceeded {:?}",
                self.call_timeout
            ))),
        }
    }

    /// Recommendations for a known weather report.
    pub async fn recommend(
        &self,
        profile: &PreferenceProfile,
        location: Coordinate,
        hour: u8,
        weather: &WeatherReport,
    ) -> RecommendationSet {
        let meal = meal_match(hour, &profile.meal_times);
        let (meal_results, meal_query) = self.meal_stage(profile, location, meal).await;
        self.activity_stage(profile, location, hour, weather, meal, meal_results, meal_query)
            .await
    }

    /// Recommendations with live weather, unless `weather_override` is given.
    /// The weather lookup and the meal search run concurrently.
    pub async fn recommend_live(
        &self,
        profile: &PreferenceProfile,
        location: Coordinate,
        hour: u8,
        weather_override: Option<WeatherReport>,
    ) -> Result<(RecommendationSet, WeatherReading), RecommendError> {
        let meal = meal_match(hour, &profile.meal_times);
        let weather = async {
            match weather_override {
                Some(report) => WeatherReading {
                    report,
                    fallback: false,
                },
                None => self.current_weather(location).await,
            }
        };
        let ((meal_results, meal_query), reading) =
            futures::join!(self.meal_stage(profile, location, meal), weather);

        let set = self
            .activity_stage(
                profile,
                location,
                hour,
                &reading.report,
                meal,
                meal_results,
                meal_query,
            )
            .await;

        if reading.fallback && set.places_unavailable() {
            return Err(RecommendError::Unavailable(
                "weather and place providers are both failing".to_string(),
            ));
        }
        Ok((set, reading))
    }

    async fn meal_stage(
        &self,
        profile: &PreferenceProfile,
        location: Coordinate,
        meal: Option<Meal>,
    ) -> (Vec<Recommendation>, QueryOutcome) {
        let Some(meal) = meal else {
            return (Vec::new(), QueryOutcome::Skipped);
        };
        info!(user_id = %profile.user_id, meal = meal.as_str(), "Meal time detected.");

        let query = PlaceQuery {
            center: location,
            terms: meal_query_terms(profile, meal),
            radius_meters: SEARCH_RADIUS_METERS,
            limit: SEARCH_LIMIT,
        };
        let places = match self.search(&query).await {
            Ok(places) => places,
            Err(e) => {
                warn!(error = %e, meal = meal.as_str(), "Restaurant search failed.");
                return (Vec::new(), QueryOutcome::Failed);
            }
        };

        let cuisines = if profile.preferred_cuisines.is_empty() {
            "Various".to_string()
        } else {
            profile.preferred_cuisines.join(", ")
        };
        let reason = format!("Perfect for {} - {} cuisine", meal.as_str(), cuisines);

        let mut seen: HashSet<(&str, &str)> = HashSet::new();
        let results = places
            .iter()
            .filter(|place| self.food.is_meal_venue(place))
            .filter(|place| seen.insert((place.name.as_str(), place.address.as_str())))
            .take(MAX_MEAL_RECOMMENDATIONS)
            .map(|place| {
                to_recommendation(place, "restaurant".to_string(), reason.clone(), location)
            })
            .collect();
        (results, QueryOutcome::Succeeded)
    }

    #[allow(clippy::too_many_arguments)]
    async fn activity_stage(
        &self,
        profile: &PreferenceProfile,
        location: Coordinate,
        hour: u8,
        weather: &WeatherReport,
        meal: Option<Meal>,
        mut recommendations: Vec<Recommendation>,
        meal_query: QueryOutcome,
    ) -> RecommendationSet {
        let period = time_period(hour);
        let plan = activity_plan(
            profile.activity_type,
            period,
            weather.weather,
            weather.temperature_c,
        );
        if plan.indoor_substituted {
            info!(
                weather = %weather.weather,
                temperature_c = weather.temperature_c,
                "Weather not suitable for outdoor; suggesting indoor alternatives."
            );
        }

        let mut activity_query = QueryOutcome::Skipped;
        let wants_activities = meal.is_none() || recommendations.len() < MAX_RECOMMENDATIONS;
        if wants_activities && !plan.categories.is_empty() {
            let query = PlaceQuery {
                center: location,
                terms: plan.categories.iter().map(|c| c.to_string()).collect(),
                radius_meters: SEARCH_RADIUS_METERS,
                limit: SEARCH_LIMIT,
            };
            match self.search(&query).await {
                Ok(places) => {
                    activity_query = QueryOutcome::Succeeded;
                    let reason = activity_reason(profile.activity_type, period, weather);
                    let mut seen: HashSet<(String, String)> = recommendations
                        .iter()
                        .map(|r| (r.name.clone(), r.address.clone()))
                        .collect();
                    for place in places {
                        if recommendations.len() >= MAX_RECOMMENDATIONS {
                            break;
                        }
                        if self.food.is_food_venue(&place)
                            || !seen.insert((place.name.clone(), place.address.clone()))
                        {
                            continue;
                        }
                        let category = place
                            .categories
                            .first()
                            .cloned()
                            .unwrap_or_else(|| "activity".to_string());
                        recommendations.push(to_recommendation(
                            &place,
                            category,
                            reason.clone(),
                            location,
                        ));
                    }
                }
                Err(e) => {
                    warn!(error = %e, period = period.label(), "Activity search failed.");
                    activity_query = QueryOutcome::Failed;
                }
            }
        }

        let restaurants = recommendations
            .iter()
            .filter(|r| r.category == "restaurant")
            .count();
        info!(
            user_id = %profile.user_id,
            total = recommendations.len(),
            restaurants,
            activities = recommendations.len() - restaurants,
            "Recommendations generated."
        );

        RecommendationSet {
            recommendations,
            meal,
            period,
            activity_categories: plan.categories,
            indoor_substituted: plan.indoor_substituted,
            meal_query,
            activity_query,
        }
    }
}

fn activity_reason(activity: ActivityType, period: TimePeriod, weather: &WeatherReport) -> String {
    let mut reason = format!("{} {} activities", period.label(), activity.as_str());
    if activity == ActivityType::Outdoor {
        if is_outdoor_suitable(weather.weather, weather.temperature_c) {
            reason.push_str(&format!(
                " (weather: {}, {}°C)",
                weather.weather, weather.temperature_c
            ));
        } else {
            reason.push_str(" (showing indoor alternatives due to weather)");
        }
    }
    reason
}

fn to_recommendation(
    place: &Place,
    category: String,
    reason: String,
    origin: Coordinate,
) -> Recommendation {
    Recommendation {
        name: place.name.clone(),
        category,
        description: place
            .categories
            .iter()
            .take(3)
            .cloned()
            .collect::<Vec<_>>()
            .join(", "),
        address: place.address.clone(),
        reason,
        distance_meters: place.coordinate.map(|at| distance_meters(origin, at)),
        rating: place.rating,
        coordinate: place.coordinate,
    }
}
