//! In-process storage backend
//!
//! Implements the same semantics as the PostgreSQL backend with every
//! operation executed under a single mutex, which makes each transition
//! atomic within the process. Used by the integration tests and for local
//! development without a database.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{TravelsError, TravelsResult};
use crate::geo::{GeoPoint, MAX_RADIUS_KM};
use crate::models::registry::{Driver, NewVehicle, User, Vehicle};
use crate::models::request_travel::{NewRequestTravel, RequestTravel, RequestTravelStatus};
use crate::models::travel::{ConfirmationTravel, ConfirmingParty, Travel, TravelStatus};
use crate::store::{Registry, RequestTravelStore, TravelStore};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    drivers: HashMap<Uuid, Driver>,
    vehicles: HashMap<Uuid, Vehicle>,
    requests: HashMap<i64, RequestTravel>,
    travels: HashMap<i64, Travel>,
    // keyed by travel id; at most one confirmation per travel
    confirmations: HashMap<i64, ConfirmationTravel>,
    next_request_id: i64,
    next_travel_id: i64,
    next_confirmation_id: i64,
}

/// Memory-backed store for requests, travels and the registry
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store mutex poisoned")
    }

    /// Seed a user (identity is an external collaborator in production)
    pub fn insert_user(&self, user: User) {
        self.lock().users.insert(user.id, user);
    }

    /// Seed a driver record
    pub fn insert_driver(&self, driver: Driver) {
        self.lock().drivers.insert(driver.id, driver);
    }

    /// Seed a vehicle without the registration cap check
    pub fn insert_vehicle(&self, vehicle: Vehicle) {
        self.lock().vehicles.insert(vehicle.id, vehicle);
    }

    /// Number of travels currently stored
    pub fn travel_count(&self) -> usize {
        self.lock().travels.len()
    }

    /// Number of ride requests currently stored
    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }
}

#[async_trait]
impl RequestTravelStore for MemoryStore {
    async fn create_request(&self, new: NewRequestTravel) -> TravelsResult<RequestTravel> {
        let mut inner = self.lock();
        inner.next_request_id += 1;
        let request = RequestTravel {
            id: inner.next_request_id,
            rider_id: new.rider_id,
            origin: new.origin,
            destination: new.destination,
            status: RequestTravelStatus::Pending,
            created_at: new.created_at,
            expires_at: new.expires_at,
        };
        inner.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn get_request(&self, id: i64) -> TravelsResult<RequestTravel> {
        self.lock()
            .requests
            .get(&id)
            .cloned()
            .ok_or(TravelsError::RequestTravelNotFound)
    }

    async fn delete_request_by_owner(&self, id: i64, rider_id: Uuid) -> TravelsResult<()> {
        let mut inner = self.lock();
        match inner.requests.get(&id) {
            Some(request) if request.rider_id == rider_id => {
                inner.requests.remove(&id);
                Ok(())
            }
            // Owner mismatch is indistinguishable from a missing row.
            _ => Err(TravelsError::RequestTravelNotFound),
        }
    }

    async fn list_pending_near(
        &self,
        point: GeoPoint,
        radius_km: f64,
        now: DateTime<Utc>,
    ) -> TravelsResult<Vec<RequestTravel>> {
        let radius_km = radius_km.clamp(0.0, MAX_RADIUS_KM);
        let inner = self.lock();
        let mut requests: Vec<RequestTravel> = inner
            .requests
            .values()
            .filter(|r| {
                r.status == RequestTravelStatus::Pending
                    && !r.is_expired(now)
                    && r.origin.distance_km(&point) <= radius_km
            })
            .cloned()
            .collect();
        requests.sort_by_key(|r| (r.created_at, r.id));
        Ok(requests)
    }

    async fn list_by_owner(
        &self,
        rider_id: Uuid,
        status: Option<RequestTravelStatus>,
    ) -> TravelsResult<Vec<RequestTravel>> {
        let inner = self.lock();
        let mut requests: Vec<RequestTravel> = inner
            .requests
            .values()
            .filter(|r| r.rider_id == rider_id && status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        requests.sort_by_key(|r| (r.created_at, r.id));
        Ok(requests)
    }

    async fn delete_expired_pending(&self, now: DateTime<Utc>) -> TravelsResult<u64> {
        let mut inner = self.lock();
        let before = inner.requests.len();
        inner
            .requests
            .retain(|_, r| r.status != RequestTravelStatus::Pending || !r.is_expired(now));
        Ok((before - inner.requests.len()) as u64)
    }
}

#[async_trait]
impl TravelStore for MemoryStore {
    async fn take_request(
        &self,
        request_id: i64,
        driver: &Driver,
        vehicle_id: Uuid,
        driver_location: GeoPoint,
        now: DateTime<Utc>,
    ) -> TravelsResult<Travel> {
        // The whole claim happens under one lock, mirroring the row lock
        // the PostgreSQL backend takes.
        let mut inner = self.lock();

        let eligible = inner.requests.get(&request_id).filter(|r| {
            r.status == RequestTravelStatus::Pending
                && !r.is_expired(now)
                && r.origin.distance_km(&driver_location) <= MAX_RADIUS_KM
        });
        let Some(request) = eligible else {
            return Err(TravelsError::RequestTravelNotFound);
        };
        if request.rider_id == driver.user_id {
            return Err(TravelsError::DriverCannotTakeOwnRequest);
        }
        let (rider_id, origin, destination) =
            (request.rider_id, request.origin, request.destination);

        if let Some(request) = inner.requests.get_mut(&request_id) {
            request.status = RequestTravelStatus::Taken;
        }

        inner.next_travel_id += 1;
        let travel = Travel {
            id: inner.next_travel_id,
            rider_id: Some(rider_id),
            driver_id: Some(driver.id),
            vehicle_id: Some(vehicle_id),
            request_travel_id: Some(request_id),
            origin,
            destination,
            taken_at: now,
            status: TravelStatus::InCourse,
        };
        inner.travels.insert(travel.id, travel.clone());
        Ok(travel)
    }

    async fn get_travel(&self, id: i64) -> TravelsResult<Travel> {
        self.lock()
            .travels
            .get(&id)
            .cloned()
            .ok_or(TravelsError::TravelNotFound)
    }

    async fn cancel_travel(&self, id: i64) -> TravelsResult<Travel> {
        let mut inner = self.lock();
        match inner.travels.get_mut(&id) {
            Some(travel) if travel.status == TravelStatus::InCourse => {
                travel.status = TravelStatus::Cancelled;
                Ok(travel.clone())
            }
            _ => Err(TravelsError::CannotCancelThisTravel),
        }
    }

    async fn confirm_travel(
        &self,
        travel_id: i64,
        party: ConfirmingParty,
    ) -> TravelsResult<ConfirmationTravel> {
        let mut inner = self.lock();

        match inner.travels.get(&travel_id) {
            None => return Err(TravelsError::TravelNotFound),
            Some(travel) if travel.status != TravelStatus::InCourse => {
                return Err(TravelsError::CannotFinishThisTravel);
            }
            Some(_) => {}
        }

        inner.next_confirmation_id += 1;
        let next_id = inner.next_confirmation_id;
        let confirmation = inner
            .confirmations
            .entry(travel_id)
            .or_insert_with(|| ConfirmationTravel {
                id: next_id,
                travel_id,
                rider_confirmed: false,
                driver_confirmed: false,
                created_at: Utc::now(),
            });

        match party {
            ConfirmingParty::Rider => confirmation.rider_confirmed = true,
            ConfirmingParty::Driver => confirmation.driver_confirmed = true,
        }
        let confirmation = confirmation.clone();

        // Same logical update: both flags true flips the travel to done.
        if confirmation.is_complete()
            && let Some(travel) = inner.travels.get_mut(&travel_id)
        {
            travel.status = TravelStatus::Done;
        }

        Ok(confirmation)
    }
}

#[async_trait]
impl Registry for MemoryStore {
    async fn resolve_user(&self, id: Uuid) -> TravelsResult<User> {
        self.lock()
            .users
            .get(&id)
            .cloned()
            .ok_or(TravelsError::UserNotFound)
    }

    async fn resolve_driver(&self, id: Uuid) -> TravelsResult<Driver> {
        self.lock()
            .drivers
            .get(&id)
            .cloned()
            .ok_or(TravelsError::DriverNotFound)
    }

    async fn resolve_driver_by_user(&self, user_id: Uuid) -> TravelsResult<Driver> {
        self.lock()
            .drivers
            .values()
            .find(|d| d.user_id == user_id)
            .cloned()
            .ok_or(TravelsError::DriverNotFound)
    }

    async fn resolve_vehicle(&self, id: Uuid) -> TravelsResult<Vehicle> {
        self.lock()
            .vehicles
            .get(&id)
            .cloned()
            .ok_or(TravelsError::VehicleNotFound)
    }

    async fn create_vehicle(&self, new: NewVehicle) -> TravelsResult<Vehicle> {
        let mut inner = self.lock();
        if !inner.drivers.contains_key(&new.driver_id) {
            return Err(TravelsError::DriverNotFound);
        }
        let owned = inner
            .vehicles
            .values()
            .filter(|v| v.driver_id == new.driver_id)
            .count();
        if owned >= Driver::MAX_VEHICLES {
            return Err(TravelsError::TooManyVehicles);
        }

        let vehicle = Vehicle {
            id: Uuid::new_v4(),
            driver_id: new.driver_id,
            plate_number: new.plate_number,
            model: new.model,
            year: new.year,
            color: new.color,
        };
        inner.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }
}
