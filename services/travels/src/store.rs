//! Storage layer traits
//!
//! The matching engine, the lifecycle and the sweeper talk to storage
//! through these traits only. The PostgreSQL backend carries the
//! transactional guarantees in production; the memory backend provides the
//! same semantics in-process for tests and local development.
//!
//! The multi-row transitions (`take_request`, `confirm_travel`) live here
//! rather than in the engines because their atomicity must come from the
//! storage layer: several service instances can share one database, so
//! row-level locking, not process-level locking, gates the single winner.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::TravelsResult;
use crate::geo::GeoPoint;
use crate::models::registry::{Driver, NewVehicle, User, Vehicle};
use crate::models::request_travel::{NewRequestTravel, RequestTravel, RequestTravelStatus};
use crate::models::travel::{ConfirmationTravel, ConfirmingParty, Travel};

pub mod memory;
pub mod postgres;

/// CRUD and query surface over ride requests
#[async_trait]
pub trait RequestTravelStore: Send + Sync {
    /// Persist a new pending request
    async fn create_request(&self, new: NewRequestTravel) -> TravelsResult<RequestTravel>;

    /// Fetch a request by id; `RequestTravelNotFound` if absent
    async fn get_request(&self, id: i64) -> TravelsResult<RequestTravel>;

    /// Delete a request only if it is owned by `rider_id`
    ///
    /// An owner mismatch reports `RequestTravelNotFound`, indistinguishable
    /// from a missing row, so existence never leaks to non-owners.
    async fn delete_request_by_owner(&self, id: i64, rider_id: Uuid) -> TravelsResult<()>;

    /// All pending, unexpired requests whose origin lies within
    /// `radius_km` of `point`
    ///
    /// The radius is clamped to `[0, MAX_RADIUS_KM]` by every backend, so
    /// callers bypassing the query validation still cannot widen the search.
    async fn list_pending_near(
        &self,
        point: GeoPoint,
        radius_km: f64,
        now: DateTime<Utc>,
    ) -> TravelsResult<Vec<RequestTravel>>;

    /// All requests owned by `rider_id`, optionally filtered by status
    async fn list_by_owner(
        &self,
        rider_id: Uuid,
        status: Option<RequestTravelStatus>,
    ) -> TravelsResult<Vec<RequestTravel>>;

    /// Delete every pending request whose deadline has passed; returns the
    /// number of rows removed. Taken requests are never touched.
    async fn delete_expired_pending(&self, now: DateTime<Utc>) -> TravelsResult<u64>;
}

/// Travel lifecycle storage, including the atomic claim
#[async_trait]
pub trait TravelStore: Send + Sync {
    /// Atomically claim a pending request for `driver` and create the
    /// travel snapshot
    ///
    /// Exactly one concurrent claim per request can succeed. A request that
    /// is missing, expired, already taken or farther than the matching
    /// radius from `driver_location` reports `RequestTravelNotFound`; a
    /// request owned by the driver's own user reports
    /// `DriverCannotTakeOwnRequest`; a storage failure after the row is
    /// locked reports `DriverCannotTakeRequest` with no partial effect.
    async fn take_request(
        &self,
        request_id: i64,
        driver: &Driver,
        vehicle_id: Uuid,
        driver_location: GeoPoint,
        now: DateTime<Utc>,
    ) -> TravelsResult<Travel>;

    /// Fetch a travel by id; `TravelNotFound` if absent
    async fn get_travel(&self, id: i64) -> TravelsResult<Travel>;

    /// Transition an in-course travel to cancelled
    ///
    /// The update is conditional on the current status, so a concurrent
    /// transition folds into `CannotCancelThisTravel`.
    async fn cancel_travel(&self, id: i64) -> TravelsResult<Travel>;

    /// Record one party's completion confirmation
    ///
    /// Gets or creates the confirmation record, sets the party's flag, and
    /// in the same transaction flips the travel to done when both flags are
    /// true. Re-confirming an already-set flag is a no-op.
    async fn confirm_travel(
        &self,
        travel_id: i64,
        party: ConfirmingParty,
    ) -> TravelsResult<ConfirmationTravel>;
}

/// Resolution surface over the identity and driver/vehicle collaborators
#[async_trait]
pub trait Registry: Send + Sync {
    /// Resolve a user; `UserNotFound` if absent
    async fn resolve_user(&self, id: Uuid) -> TravelsResult<User>;

    /// Resolve a driver record by its id; `DriverNotFound` if absent
    async fn resolve_driver(&self, id: Uuid) -> TravelsResult<Driver>;

    /// Resolve the driver record owned by `user_id`; `DriverNotFound` if
    /// the user has none
    async fn resolve_driver_by_user(&self, user_id: Uuid) -> TravelsResult<Driver>;

    /// Resolve a vehicle; `VehicleNotFound` if absent
    async fn resolve_vehicle(&self, id: Uuid) -> TravelsResult<Vehicle>;

    /// Register a vehicle, enforcing the per-driver cap as a typed
    /// precondition of the write
    async fn create_vehicle(&self, new: NewVehicle) -> TravelsResult<Vehicle>;
}
