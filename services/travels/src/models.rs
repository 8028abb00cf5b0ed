//! API models for request and response payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

pub mod registry;
pub mod request_travel;
pub mod travel;

use registry::Vehicle;
use request_travel::{RequestTravel, RequestTravelStatus};
use travel::{ConfirmationTravel, Travel, TravelStatus};

/// Request to open a new ride request
#[derive(Debug, Deserialize)]
pub struct CreateRequestTravelRequest {
    pub user_id: Uuid,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
}

/// Request for a driver to take a pending ride request
///
/// Coordinates stay optional so validation can name the missing fields.
#[derive(Debug, Deserialize)]
pub struct TakeRequestTravelRequest {
    pub user_id: Uuid,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub vehicle_id: Uuid,
}

/// Request body for cancel and finish actions
#[derive(Debug, Deserialize)]
pub struct TravelActionRequest {
    pub user_id: Uuid,
}

/// Query parameters for the nearby pending-request listing
#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub user_id: Uuid,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<f64>,
}

/// Query parameters for a rider's own request listing
#[derive(Debug, Deserialize)]
pub struct MineQuery {
    pub user_id: Uuid,
    pub status: Option<RequestTravelStatus>,
}

/// Query parameters for owner-scoped operations
#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub user_id: Uuid,
}

/// Request to register a vehicle for the calling user's driver record
#[derive(Debug, Deserialize)]
pub struct CreateVehicleRequest {
    pub user_id: Uuid,
    pub plate_number: String,
    pub model: String,
    pub year: i32,
    pub color: String,
}

/// Response for ride request operations
#[derive(Debug, Serialize)]
pub struct RequestTravelResponse {
    pub id: i64,
    pub user: Uuid,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub status: RequestTravelStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub distance_meters: f64,
}

impl From<RequestTravel> for RequestTravelResponse {
    fn from(request: RequestTravel) -> Self {
        let distance_meters = request.distance_m();
        Self {
            id: request.id,
            user: request.rider_id,
            origin: request.origin,
            destination: request.destination,
            status: request.status,
            created_at: request.created_at,
            expires_at: request.expires_at,
            distance_meters,
        }
    }
}

/// Response for travel operations
#[derive(Debug, Serialize)]
pub struct TravelResponse {
    pub id: i64,
    pub user: Option<Uuid>,
    pub driver: Option<Uuid>,
    pub vehicle: Option<Uuid>,
    pub request_travel: Option<i64>,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub taken_at: DateTime<Utc>,
    pub status: TravelStatus,
    pub distance_meters: f64,
}

impl From<Travel> for TravelResponse {
    fn from(travel: Travel) -> Self {
        let distance_meters = travel.distance_m();
        Self {
            id: travel.id,
            user: travel.rider_id,
            driver: travel.driver_id,
            vehicle: travel.vehicle_id,
            request_travel: travel.request_travel_id,
            origin: travel.origin,
            destination: travel.destination,
            taken_at: travel.taken_at,
            status: travel.status,
            distance_meters,
        }
    }
}

/// Response for vehicle registration
#[derive(Debug, Serialize)]
pub struct VehicleResponse {
    pub id: Uuid,
    pub driver: Uuid,
    pub plate_number: String,
    pub model: String,
    pub year: i32,
    pub color: String,
}

impl From<Vehicle> for VehicleResponse {
    fn from(vehicle: Vehicle) -> Self {
        Self {
            id: vehicle.id,
            driver: vehicle.driver_id,
            plate_number: vehicle.plate_number,
            model: vehicle.model,
            year: vehicle.year,
            color: vehicle.color,
        }
    }
}

/// Response for confirmation operations
#[derive(Debug, Serialize)]
pub struct ConfirmationTravelResponse {
    pub id: i64,
    pub travel: i64,
    pub rider_confirmed: bool,
    pub driver_confirmed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ConfirmationTravel> for ConfirmationTravelResponse {
    fn from(confirmation: ConfirmationTravel) -> Self {
        Self {
            id: confirmation.id,
            travel: confirmation.travel_id,
            rider_confirmed: confirmation.rider_confirmed,
            driver_confirmed: confirmation.driver_confirmed,
            created_at: confirmation.created_at,
        }
    }
}
