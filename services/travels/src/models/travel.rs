//! Travel and confirmation entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

/// Lifecycle state of a travel; `Cancelled` and `Done` are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelStatus {
    InCourse,
    Cancelled,
    Done,
}

impl TravelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelStatus::InCourse => "in_course",
            TravelStatus::Cancelled => "cancelled",
            TravelStatus::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_course" => Some(TravelStatus::InCourse),
            "cancelled" => Some(TravelStatus::Cancelled),
            "done" => Some(TravelStatus::Done),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TravelStatus::Cancelled | TravelStatus::Done)
    }
}

/// An active or completed travel
///
/// Rider, driver, vehicle and originating request are held by reference and
/// may be severed later; origin and destination are a snapshot taken from
/// the request at claim time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Travel {
    pub id: i64,
    pub rider_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub request_travel_id: Option<i64>,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub taken_at: DateTime<Utc>,
    pub status: TravelStatus,
}

impl Travel {
    pub fn distance_m(&self) -> f64 {
        self.origin.distance_m(&self.destination)
    }
}

/// Dual-confirmation record for a travel, created lazily on the first
/// confirmation; at most one exists per travel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationTravel {
    pub id: i64,
    pub travel_id: i64,
    pub rider_confirmed: bool,
    pub driver_confirmed: bool,
    pub created_at: DateTime<Utc>,
}

impl ConfirmationTravel {
    /// Both parties have confirmed; the travel is done
    pub fn is_complete(&self) -> bool {
        self.rider_confirmed && self.driver_confirmed
    }
}

/// Which side of the travel is confirming completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmingParty {
    Rider,
    Driver,
}
