//! Matching engine: converts a pending ride request into an active travel
//!
//! Validation happens in a fixed order and every failure is terminal with
//! no partial effect: driver, driver activity, vehicle, vehicle ownership,
//! then the storage-level atomic claim. Eligibility failures on the request
//! itself (missing, expired, taken, out of range) all surface as
//! `RequestTravelNotFound` so ineligible drivers learn nothing about the
//! request.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{TravelsError, TravelsResult};
use crate::geo::GeoPoint;
use crate::models::travel::Travel;
use crate::notifier::{Notification, Notifier};
use crate::store::{Registry, TravelStore};

/// Engine behind the "take" operation
#[derive(Clone)]
pub struct MatchingEngine {
    registry: Arc<dyn Registry>,
    travels: Arc<dyn TravelStore>,
    notifier: Arc<dyn Notifier>,
}

impl MatchingEngine {
    pub fn new(
        registry: Arc<dyn Registry>,
        travels: Arc<dyn TravelStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            registry,
            travels,
            notifier,
        }
    }

    /// Claim the request for the driver behind `driver_user_id`
    ///
    /// On success the request is taken, the travel snapshot exists and the
    /// rider is notified (fire and forget).
    pub async fn take(
        &self,
        request_id: i64,
        driver_user_id: Uuid,
        driver_location: GeoPoint,
        vehicle_id: Uuid,
    ) -> TravelsResult<Travel> {
        let driver = self.registry.resolve_driver_by_user(driver_user_id).await?;
        if !driver.is_active {
            return Err(TravelsError::DriverNotActive);
        }

        let vehicle = self.registry.resolve_vehicle(vehicle_id).await?;
        if vehicle.driver_id != driver.id {
            return Err(TravelsError::InvalidVehicle);
        }

        let travel = self
            .travels
            .take_request(request_id, &driver, vehicle.id, driver_location, Utc::now())
            .await?;

        info!(
            "Driver {} took request travel {} as travel {}",
            driver.id, request_id, travel.id
        );
        self.notify_rider(&travel, driver.user_id).await;

        Ok(travel)
    }

    async fn notify_rider(&self, travel: &Travel, driver_user_id: Uuid) {
        let Some(rider_id) = travel.rider_id else {
            return;
        };
        let rider = match self.registry.resolve_user(rider_id).await {
            Ok(rider) => rider,
            Err(err) => {
                warn!("Skipping take notification for travel {}: {}", travel.id, err);
                return;
            }
        };
        let driver_name = match self.registry.resolve_user(driver_user_id).await {
            Ok(user) => user.full_name,
            Err(_) => "a driver".to_string(),
        };

        self.notifier.enqueue(Notification {
            subject: "Your travel request has been taken!".to_string(),
            body: format!(
                "Your travel request has been taken by {}, the travel id is {}",
                driver_name, travel.id
            ),
            recipients: vec![rider.email],
        });
    }
}
