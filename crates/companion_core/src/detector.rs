//! Diffing two context snapshots into notification events.
//!
//! The detector is pure: it never touches stored state. Loading the previous
//! snapshot, replacing it and recording the events is the job of
//! [`crate::service::NotificationCenter::apply`].

use crate::{
    classifier::{meal_match, time_period},
    domain::{ContextSnapshot, EventPayload, MealSchedule, NotificationEvent},
    geo::distance_km,
    rules::weather_transition,
};

pub const DEFAULT_LOCATION_THRESHOLD_KM: f64 = 0.25;
pub const DEFAULT_TEMPERATURE_THRESHOLD_C: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorThresholds {
    /// A move must be strictly farther than this to notify.
    pub location_km: f64,
    /// A temperature swing of at least this many degrees notifies.
    pub temperature_c: i32,
}

impl Default for DetectorThresholds {
    fn default() -> Self {
        Self {
            location_km: DEFAULT_LOCATION_THRESHOLD_KM,
            temperature_c: DEFAULT_TEMPERATURE_THRESHOLD_C,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContextChangeDetector {
    thresholds: DetectorThresholds,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl ContextChangeDetector {
    pub fn new(thresholds: DetectorThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> DetectorThresholds {
        self.thresholds
    }

    /// Compares `new` against `old`. Each check only fires when the field is
    /// present in both snapshots. Events come out in a fixed order: location,
    /// time period, meal, weather, temperature.
    pub fn diff(
        &self,
        old: &ContextSnapshot,
        new: &ContextSnapshot,
        meal_times: &MealSchedule,
    ) -> Vec<NotificationEvent> {
        let mut events = Vec::new();

        if let (Some(from), Some(to)) = (old.location, new.location) {
            let moved = distance_km(from, to);
            if moved > self.thresholds.location_km {
                let rounded = round2(moved);
                events.push(NotificationEvent::new(
                    "Location Changed",
                    format!("You've moved {rounded:.2} km. Check out nearby recommendations!"),
                    EventPayload::LocationChange {
                        distance_moved_km: rounded,
                    },
                ));
            }
        }

        if let (Some(old_hour), Some(new_hour)) = (old.hour_of_day, new.hour_of_day) {
            let old_period = time_period(old_hour);
            let new_period = time_period(new_hour);
            if old_period != new_period {
                events.push(NotificationEvent::new(
                    format!("{} Activities Available", new_period.label()),
                    format!(
                        "It's now {}! Discover activities for this time of day.",
                        new_period.label().to_lowercase()
                    ),
                    EventPayload::TimePeriodChange {
                        old_period,
                        new_period,
                    },
                ));
            }

            // Fires on entering a meal window, and again on moving forward onto
            // the meal's own hour. Leaving a window, or stepping back into the
            // meal hour from later in the window, is silent.
            let old_meal = meal_match(old_hour, meal_times);
            if let Some(meal) = meal_match(new_hour, meal_times) {
                let meal_hour = meal_times.get(meal).map(|time| time.hour);
                let arrived = meal_hour == Some(new_hour) && old_hour < new_hour;
                if old_meal != Some(meal) || arrived {
                    events.push(NotificationEvent::new(
                        format!("Time for {}!", meal.title()),
                        format!(
                            "Check out restaurant recommendations for {} nearby.",
                            meal.as_str()
                        ),
                        EventPayload::MealTime { meal_type: meal },
                    ));
                }
            }
        }

        if let (Some(old_weather), Some(new_weather)) = (old.weather, new.weather) {
            if old_weather != new_weather {
                let transition = weather_transition(old_weather, new_weather);
                events.push(NotificationEvent::new(
                    "Weather Update",
                    transition.message,
                    EventPayload::WeatherChange {
                        old_weather,
                        new_weather,
                        activity_suggestion: transition.suggestion.to_string(),
                    },
                ));
            }
        }

        if let (Some(old_temp), Some(new_temp)) = (old.temperature_c, new.temperature_c) {
            if (new_temp - old_temp).abs() >= self.thresholds.temperature_c {
                events.push(NotificationEvent::new(
                    "Temperature Changed",
                    format!("Temperature changed from {old_temp}°C to {new_temp}°C."),
                    EventPayload::TemperatureChange {
                        old_temperature_c: old_temp,
                        new_temperature_c: new_temp,
                    },
                ));
            }
        }

        events
    }
}
