//! Geospatial primitives: geodetic points, great-circle distance and
//! radius query validation
//!
//! Distances are haversine over a mean earth radius. The same formula is
//! inlined in the PostgreSQL predicates so both storage backends agree on
//! what "within radius" means; at the 100 km scale a planar approximation
//! would be off by kilometers.

use serde::{Deserialize, Serialize};

use crate::error::{TravelsError, TravelsResult};

/// Mean earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Largest radius a nearby-request query may use, in kilometers
pub const MAX_RADIUS_KM: f64 = 100.0;

/// A geodetic point, SRID 4326 axis order (longitude first)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Great-circle distance to another point, in kilometers
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlng = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);

        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }

    /// Distance in meters, as exposed on API responses
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        self.distance_km(other) * 1000.0
    }
}

/// Raw geospatial query parameters as they arrive from the caller
///
/// Coordinates are kept optional so that validation can name every missing
/// field at once instead of failing on the first.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct GeoQuery {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<f64>,
}

impl GeoQuery {
    /// Validate into a point and a radius bounded to `[0, MAX_RADIUS_KM]`
    ///
    /// The radius defaults to the maximum when absent.
    pub fn validate(&self) -> TravelsResult<(GeoPoint, f64)> {
        let point = match (self.longitude, self.latitude) {
            (Some(longitude), Some(latitude)) => GeoPoint::new(longitude, latitude),
            (longitude, latitude) => {
                let mut fields = Vec::new();
                if latitude.is_none() {
                    fields.push("latitude");
                }
                if longitude.is_none() {
                    fields.push("longitude");
                }
                return Err(TravelsError::validation(
                    "Missing required coordinates",
                    fields,
                ));
            }
        };

        let radius = self.radius.unwrap_or(MAX_RADIUS_KM);
        if !(0.0..=MAX_RADIUS_KM).contains(&radius) {
            return Err(TravelsError::validation(
                format!("Radius must be between 0 and {} km", MAX_RADIUS_KM),
                vec!["radius"],
            ));
        }

        Ok((point, radius))
    }
}
