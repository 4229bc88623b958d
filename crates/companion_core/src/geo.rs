//! Great-circle distance and the service area the companion is tuned for.

use crate::domain::Coordinate;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two coordinates on a sphere of radius 6371 km.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lon1) = (a.latitude().to_radians(), a.longitude().to_radians());
    let (lat2, lon2) = (b.latitude().to_radians(), b.longitude().to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push h a hair outside [0, 1] for antipodal points.
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Distance in whole meters, as reported on recommendations.
pub fn distance_meters(a: Coordinate, b: Coordinate) -> u32 {
    (distance_km(a, b) * 1000.0).round() as u32
}

/// A rectangular region the recommendations are curated for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceArea {
    pub name: &'static str,
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
    pub center_latitude: f64,
    pub center_longitude: f64,
}

impl ServiceArea {
    pub const MONTREAL: ServiceArea = ServiceArea {
        name: "Montreal",
        min_latitude: 45.4,
        max_latitude: 45.7,
        min_longitude: -73.9,
        max_longitude: -73.4,
        center_latitude: 45.5017,
        center_longitude: -73.5673,
    };

    pub fn contains(&self, at: Coordinate) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&at.latitude())
            && (self.min_longitude..=self.max_longitude).contains(&at.longitude())
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new_unchecked(self.center_latitude, self.center_longitude)
    }

    pub fn distance_from_center_km(&self, at: Coordinate) -> f64 {
        distance_km(at, self.center())
    }
}
