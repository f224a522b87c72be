use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A resolved point on the globe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinates {
    pub lat: f64,
    pub lng: f64,
}

impl GeoCoordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance to `other` in kilometers (Haversine formula)
    pub fn distance_km(&self, other: &GeoCoordinates) -> f64 {
        let dlat = (other.lat - self.lat).to_radians();
        let dlng = (other.lng - self.lng).to_radians();

        let a = (dlat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (dlng / 2.0).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_KM * c
    }

    /// Round to city-level precision (2 decimal places ≈ 1km) for privacy
    pub fn coarsened(&self) -> Self {
        Self {
            lat: (self.lat * 100.0).round() / 100.0,
            lng: (self.lng * 100.0).round() / 100.0,
        }
    }
}

/// The searching user's own geocoded location, used as the distance origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeLocation {
    pub place_name: String,
    pub coordinates: GeoCoordinates,
}

impl HomeLocation {
    pub fn new(place_name: impl Into<String>, coordinates: GeoCoordinates) -> Self {
        Self {
            place_name: place_name.into(),
            coordinates,
        }
    }
}
