//! Ride request entity

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

/// Status of a ride request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestTravelStatus {
    /// Not yet claimed by any driver
    Pending,
    /// Claimed; a travel exists for it
    Taken,
}

impl RequestTravelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestTravelStatus::Pending => "pending",
            RequestTravelStatus::Taken => "taken",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestTravelStatus::Pending),
            "taken" => Some(RequestTravelStatus::Taken),
            _ => None,
        }
    }
}

/// A rider's open request for transportation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestTravel {
    pub id: i64,
    pub rider_id: Uuid,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub status: RequestTravelStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RequestTravel {
    /// A request past its deadline is never matchable, swept or not
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Geodesic origin-to-destination distance in meters (informational)
    pub fn distance_m(&self) -> f64 {
        self.origin.distance_m(&self.destination)
    }
}

/// Creation payload handed to the store
#[derive(Debug, Clone)]
pub struct NewRequestTravel {
    pub rider_id: Uuid,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NewRequestTravel {
    /// Build a pending request expiring `ttl_minutes` after `now`
    pub fn new(
        rider_id: Uuid,
        origin: GeoPoint,
        destination: GeoPoint,
        now: DateTime<Utc>,
        ttl_minutes: i64,
    ) -> Self {
        Self {
            rider_id,
            origin,
            destination,
            created_at: now,
            expires_at: now + Duration::minutes(ttl_minutes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_expiry_deadline() {
        let now = Utc::now();
        let new = NewRequestTravel::new(
            Uuid::new_v4(),
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(1.0, 1.0),
            now,
            30,
        );
        assert_eq!(new.expires_at, now + Duration::minutes(30));
    }

    #[test]
    fn test_is_expired_at_exact_deadline() {
        let now = Utc::now();
        let request = RequestTravel {
            id: 1,
            rider_id: Uuid::new_v4(),
            origin: GeoPoint::new(0.0, 0.0),
            destination: GeoPoint::new(0.0, 0.0),
            status: RequestTravelStatus::Pending,
            created_at: now - Duration::minutes(30),
            expires_at: now,
        };
        assert!(request.is_expired(now));
        assert!(!request.is_expired(now - Duration::seconds(1)));
    }
}
