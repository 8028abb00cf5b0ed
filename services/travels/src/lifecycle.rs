//! Travel lifecycle: cancellation and the dual-confirmation finish
//!
//! ```text
//! InCourse --cancel--> Cancelled            (terminal)
//! InCourse --finish (both confirm)--> Done  (terminal)
//! ```
//!
//! Either party may cancel or confirm. The acting user is resolved before
//! authorization so a missing user surfaces as `UserNotFound`, distinctly
//! from a mere authorization failure; a user without a driver record is
//! simply not authorized, never an error.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{TravelsError, TravelsResult};
use crate::models::registry::User;
use crate::models::travel::{ConfirmationTravel, ConfirmingParty, Travel, TravelStatus};
use crate::notifier::{Notification, Notifier};
use crate::store::{Registry, TravelStore};

/// State machine driver for active travels
#[derive(Clone)]
pub struct TravelLifecycle {
    registry: Arc<dyn Registry>,
    travels: Arc<dyn TravelStore>,
    notifier: Arc<dyn Notifier>,
}

impl TravelLifecycle {
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

    /// Cancel an in-course travel on behalf of its rider or driver
    pub async fn cancel(&self, travel_id: i64, acting_user_id: Uuid) -> TravelsResult<Travel> {
        let travel = self.travels.get_travel(travel_id).await?;
        if travel.status != TravelStatus::InCourse {
            return Err(TravelsError::CannotCancelThisTravel);
        }

        let user = self.registry.resolve_user(acting_user_id).await?;
        if self.acting_party(&travel, &user).await?.is_none() {
            return Err(TravelsError::CannotCancelThisTravel);
        }

        let travel = self.travels.cancel_travel(travel_id).await?;
        info!("Travel {} cancelled by user {}", travel.id, user.id);

        self.notify_parties(
            &travel,
            "Your travel has been cancelled!",
            format!("Your travel has been cancelled by {}", user.full_name),
        )
        .await;

        Ok(travel)
    }

    /// Record the acting party's completion confirmation
    ///
    /// The travel becomes done in the same logical update that sets the
    /// second flag. Re-confirming as the same party is a no-op; once the
    /// travel is done (or cancelled) further calls are rejected.
    pub async fn finish(
        &self,
        travel_id: i64,
        acting_user_id: Uuid,
    ) -> TravelsResult<ConfirmationTravel> {
        let travel = self.travels.get_travel(travel_id).await?;
        if travel.status != TravelStatus::InCourse {
            return Err(TravelsError::CannotFinishThisTravel);
        }

        let user = self.registry.resolve_user(acting_user_id).await?;
        let Some(party) = self.acting_party(&travel, &user).await? else {
            return Err(TravelsError::CannotFinishThisTravel);
        };

        let confirmation = self.travels.confirm_travel(travel_id, party).await?;
        info!(
            "Travel {} confirmed by user {} ({} complete)",
            travel_id,
            user.id,
            if confirmation.is_complete() { "now" } else { "not yet" }
        );

        let body = if confirmation.is_complete() {
            format!(
                "Your travel has been confirmed by {}. Travel is done.",
                user.full_name
            )
        } else {
            format!("Your travel has been confirmed by {}.", user.full_name)
        };
        self.notify_parties(&travel, "Your travel has been confirmed!", body)
            .await;

        Ok(confirmation)
    }

    /// Which side of the travel the user acts for, if any
    async fn acting_party(
        &self,
        travel: &Travel,
        user: &User,
    ) -> TravelsResult<Option<ConfirmingParty>> {
        if travel.rider_id == Some(user.id) {
            return Ok(Some(ConfirmingParty::Rider));
        }
        match self.registry.resolve_driver_by_user(user.id).await {
            Ok(driver) if travel.driver_id == Some(driver.id) => {
                Ok(Some(ConfirmingParty::Driver))
            }
            Ok(_) | Err(TravelsError::DriverNotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Enqueue a notification to the travel's rider and driver, best effort
    async fn notify_parties(&self, travel: &Travel, subject: &str, body: String) {
        let mut recipients = Vec::new();

        if let Some(rider_id) = travel.rider_id {
            match self.registry.resolve_user(rider_id).await {
                Ok(rider) => recipients.push(rider.email),
                Err(err) => warn!("Cannot resolve rider of travel {}: {}", travel.id, err),
            }
        }
        if let Some(driver_id) = travel.driver_id {
            match self.driver_email(driver_id).await {
                Ok(email) => recipients.push(email),
                Err(err) => warn!("Cannot resolve driver of travel {}: {}", travel.id, err),
            }
        }

        if recipients.is_empty() {
            return;
        }
        self.notifier.enqueue(Notification {
            subject: subject.to_string(),
            body,
            recipients,
        });
    }

    async fn driver_email(&self, driver_id: Uuid) -> TravelsResult<String> {
        let driver = self.registry.resolve_driver(driver_id).await?;
        let user = self.registry.resolve_user(driver.user_id).await?;
        Ok(user.email)
    }
}
