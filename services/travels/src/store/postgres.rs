//! PostgreSQL storage backend
//!
//! All multi-row transitions run inside a single transaction with the
//! contended row locked (`SELECT ... FOR UPDATE`), so the at-most-one-winner
//! guarantee holds across service instances sharing the database. The
//! nearby predicate inlines the same haversine formula used in `geo`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{TravelsError, TravelsResult};
use crate::geo::{GeoPoint, MAX_RADIUS_KM};
use crate::models::registry::{Driver, NewVehicle, User, Vehicle};
use crate::models::request_travel::{NewRequestTravel, RequestTravel, RequestTravelStatus};
use crate::models::travel::{ConfirmationTravel, ConfirmingParty, Travel, TravelStatus};
use crate::store::{Registry, RequestTravelStore, TravelStore};

const REQUEST_COLUMNS: &str =
    "id, rider_id, origin_lng, origin_lat, destination_lng, destination_lat, \
     status, created_at, expires_at";

const TRAVEL_COLUMNS: &str =
    "id, rider_id, driver_id, vehicle_id, request_travel_id, \
     origin_lng, origin_lat, destination_lng, destination_lat, taken_at, status";

/// Haversine distance in kilometers from ($2 latitude, $3 longitude) to the
/// stored origin, matching `GeoPoint::distance_km`.
const ORIGIN_DISTANCE_KM_SQL: &str = "2 * 6371.0088 * asin(sqrt(\
     pow(sin(radians(origin_lat - $2) / 2), 2)\
     + cos(radians($2)) * cos(radians(origin_lat))\
     * pow(sin(radians(origin_lng - $3) / 2), 2)))";

/// PostgreSQL-backed store for requests, travels and the registry
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode_request_status(s: &str) -> Result<RequestTravelStatus, sqlx::Error> {
    RequestTravelStatus::parse(s)
        .ok_or_else(|| sqlx::Error::Decode(format!("unknown request status '{}'", s).into()))
}

fn decode_travel_status(s: &str) -> Result<TravelStatus, sqlx::Error> {
    TravelStatus::parse(s)
        .ok_or_else(|| sqlx::Error::Decode(format!("unknown travel status '{}'", s).into()))
}

fn request_from_row(row: &PgRow) -> Result<RequestTravel, sqlx::Error> {
    let status: String = row.get("status");
    Ok(RequestTravel {
        id: row.get("id"),
        rider_id: row.get("rider_id"),
        origin: GeoPoint::new(row.get("origin_lng"), row.get("origin_lat")),
        destination: GeoPoint::new(row.get("destination_lng"), row.get("destination_lat")),
        status: decode_request_status(&status)?,
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
    })
}

fn travel_from_row(row: &PgRow) -> Result<Travel, sqlx::Error> {
    let status: String = row.get("status");
    Ok(Travel {
        id: row.get("id"),
        rider_id: row.get("rider_id"),
        driver_id: row.get("driver_id"),
        vehicle_id: row.get("vehicle_id"),
        request_travel_id: row.get("request_travel_id"),
        origin: GeoPoint::new(row.get("origin_lng"), row.get("origin_lat")),
        destination: GeoPoint::new(row.get("destination_lng"), row.get("destination_lat")),
        taken_at: row.get("taken_at"),
        status: decode_travel_status(&status)?,
    })
}

fn confirmation_from_row(row: &PgRow) -> ConfirmationTravel {
    ConfirmationTravel {
        id: row.get("id"),
        travel_id: row.get("travel_id"),
        rider_confirmed: row.get("rider_confirmed"),
        driver_confirmed: row.get("driver_confirmed"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl RequestTravelStore for PgStore {
    async fn create_request(&self, new: NewRequestTravel) -> TravelsResult<RequestTravel> {
        let row = sqlx::query(&format!(
            "INSERT INTO request_travels \
             (rider_id, origin_lng, origin_lat, destination_lng, destination_lat, \
              status, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7) \
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(new.rider_id)
        .bind(new.origin.longitude)
        .bind(new.origin.latitude)
        .bind(new.destination.longitude)
        .bind(new.destination.latitude)
        .bind(new.created_at)
        .bind(new.expires_at)
        .fetch_one(&self.pool)
        .await?;

        let request = request_from_row(&row)?;
        info!("Created request travel {}", request.id);
        Ok(request)
    }

    async fn get_request(&self, id: i64) -> TravelsResult<RequestTravel> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM request_travels WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(request_from_row(&row)?),
            None => Err(TravelsError::RequestTravelNotFound),
        }
    }

    async fn delete_request_by_owner(&self, id: i64, rider_id: Uuid) -> TravelsResult<()> {
        let result = sqlx::query("DELETE FROM request_travels WHERE id = $1 AND rider_id = $2")
            .bind(id)
            .bind(rider_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(TravelsError::RequestTravelNotFound);
        }
        Ok(())
    }

    async fn list_pending_near(
        &self,
        point: GeoPoint,
        radius_km: f64,
        now: DateTime<Utc>,
    ) -> TravelsResult<Vec<RequestTravel>> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM request_travels \
             WHERE status = 'pending' AND expires_at > $1 \
             AND {ORIGIN_DISTANCE_KM_SQL} <= $4 \
             ORDER BY created_at"
        ))
        .bind(now)
        .bind(point.latitude)
        .bind(point.longitude)
        .bind(radius_km.clamp(0.0, MAX_RADIUS_KM))
        .fetch_all(&self.pool)
        .await?;

        let mut requests = Vec::with_capacity(rows.len());
        for row in &rows {
            requests.push(request_from_row(row)?);
        }
        Ok(requests)
    }

    async fn list_by_owner(
        &self,
        rider_id: Uuid,
        status: Option<RequestTravelStatus>,
    ) -> TravelsResult<Vec<RequestTravel>> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "SELECT {REQUEST_COLUMNS} FROM request_travels \
                     WHERE rider_id = $1 AND status = $2 ORDER BY created_at"
                ))
                .bind(rider_id)
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {REQUEST_COLUMNS} FROM request_travels \
                     WHERE rider_id = $1 ORDER BY created_at"
                ))
                .bind(rider_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut requests = Vec::with_capacity(rows.len());
        for row in &rows {
            requests.push(request_from_row(row)?);
        }
        Ok(requests)
    }

    async fn delete_expired_pending(&self, now: DateTime<Utc>) -> TravelsResult<u64> {
        let result = sqlx::query(
            "DELETE FROM request_travels WHERE status = 'pending' AND expires_at <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl TravelStore for PgStore {
    async fn take_request(
        &self,
        request_id: i64,
        driver: &Driver,
        vehicle_id: Uuid,
        driver_location: GeoPoint,
        now: DateTime<Utc>,
    ) -> TravelsResult<Travel> {
        let mut tx = self.pool.begin().await?;

        // Lock the row while it still satisfies the eligibility predicate.
        // A concurrent winner flips the status before our lock is granted,
        // so the re-evaluated predicate returns no row.
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM request_travels \
             WHERE id = $1 AND status = 'pending' AND expires_at > $2 \
             FOR UPDATE"
        ))
        .bind(request_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Err(TravelsError::RequestTravelNotFound);
        };
        let request = request_from_row(&row)?;

        if request.origin.distance_km(&driver_location) > MAX_RADIUS_KM {
            return Err(TravelsError::RequestTravelNotFound);
        }
        if request.rider_id == driver.user_id {
            return Err(TravelsError::DriverCannotTakeOwnRequest);
        }

        let claim = async {
            sqlx::query("UPDATE request_travels SET status = 'taken' WHERE id = $1")
                .bind(request_id)
                .execute(&mut *tx)
                .await?;

            let row = sqlx::query(&format!(
                "INSERT INTO travels \
                 (rider_id, driver_id, vehicle_id, request_travel_id, \
                  origin_lng, origin_lat, destination_lng, destination_lat, \
                  taken_at, status) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'in_course') \
                 RETURNING {TRAVEL_COLUMNS}"
            ))
            .bind(request.rider_id)
            .bind(driver.id)
            .bind(vehicle_id)
            .bind(request_id)
            .bind(request.origin.longitude)
            .bind(request.origin.latitude)
            .bind(request.destination.longitude)
            .bind(request.destination.latitude)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

            let travel = travel_from_row(&row)?;
            tx.commit().await?;
            Ok::<Travel, sqlx::Error>(travel)
        };

        claim.await.map_err(|err| {
            warn!(
                "Claim of request travel {} by driver {} failed: {}",
                request_id, driver.id, err
            );
            TravelsError::DriverCannotTakeRequest
        })
    }

    async fn get_travel(&self, id: i64) -> TravelsResult<Travel> {
        let row = sqlx::query(&format!("SELECT {TRAVEL_COLUMNS} FROM travels WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(travel_from_row(&row)?),
            None => Err(TravelsError::TravelNotFound),
        }
    }

    async fn cancel_travel(&self, id: i64) -> TravelsResult<Travel> {
        let row = sqlx::query(&format!(
            "UPDATE travels SET status = 'cancelled' \
             WHERE id = $1 AND status = 'in_course' \
             RETURNING {TRAVEL_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(travel_from_row(&row)?),
            None => Err(TravelsError::CannotCancelThisTravel),
        }
    }

    async fn confirm_travel(
        &self,
        travel_id: i64,
        party: ConfirmingParty,
    ) -> TravelsResult<ConfirmationTravel> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT status FROM travels WHERE id = $1 FOR UPDATE")
            .bind(travel_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            return Err(TravelsError::TravelNotFound);
        };
        let status: String = row.get("status");
        if decode_travel_status(&status)? != TravelStatus::InCourse {
            return Err(TravelsError::CannotFinishThisTravel);
        }

        let (rider_confirmed, driver_confirmed) = match party {
            ConfirmingParty::Rider => (true, false),
            ConfirmingParty::Driver => (false, true),
        };

        // Get-or-create and flag flip as one upsert; OR-ing keeps flags
        // already set by the other party and makes re-confirmation a no-op.
        let row = sqlx::query(
            "INSERT INTO confirmation_travels \
             (travel_id, rider_confirmed, driver_confirmed, created_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (travel_id) DO UPDATE SET \
               rider_confirmed = confirmation_travels.rider_confirmed OR EXCLUDED.rider_confirmed, \
               driver_confirmed = confirmation_travels.driver_confirmed OR EXCLUDED.driver_confirmed \
             RETURNING id, travel_id, rider_confirmed, driver_confirmed, created_at",
        )
        .bind(travel_id)
        .bind(rider_confirmed)
        .bind(driver_confirmed)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        let confirmation = confirmation_from_row(&row);

        if confirmation.is_complete() {
            sqlx::query("UPDATE travels SET status = 'done' WHERE id = $1")
                .bind(travel_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(confirmation)
    }
}

#[async_trait]
impl Registry for PgStore {
    async fn resolve_user(&self, id: Uuid) -> TravelsResult<User> {
        let row = sqlx::query("SELECT id, email, full_name, is_active FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(User {
                id: row.get("id"),
                email: row.get("email"),
                full_name: row.get("full_name"),
                is_active: row.get("is_active"),
            }),
            None => Err(TravelsError::UserNotFound),
        }
    }

    async fn resolve_driver(&self, id: Uuid) -> TravelsResult<Driver> {
        let row = sqlx::query("SELECT id, user_id, is_active FROM drivers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Driver {
                id: row.get("id"),
                user_id: row.get("user_id"),
                is_active: row.get("is_active"),
            }),
            None => Err(TravelsError::DriverNotFound),
        }
    }

    async fn resolve_driver_by_user(&self, user_id: Uuid) -> TravelsResult<Driver> {
        let row = sqlx::query("SELECT id, user_id, is_active FROM drivers WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Driver {
                id: row.get("id"),
                user_id: row.get("user_id"),
                is_active: row.get("is_active"),
            }),
            None => Err(TravelsError::DriverNotFound),
        }
    }

    async fn resolve_vehicle(&self, id: Uuid) -> TravelsResult<Vehicle> {
        let row = sqlx::query(
            "SELECT id, driver_id, plate_number, model, year, color FROM vehicles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(vehicle_from_row(&row)),
            None => Err(TravelsError::VehicleNotFound),
        }
    }

    async fn create_vehicle(&self, new: NewVehicle) -> TravelsResult<Vehicle> {
        let mut tx = self.pool.begin().await?;

        // Lock the driver row so concurrent registrations serialize on the
        // cap check.
        let driver = sqlx::query("SELECT id FROM drivers WHERE id = $1 FOR UPDATE")
            .bind(new.driver_id)
            .fetch_optional(&mut *tx)
            .await?;
        if driver.is_none() {
            return Err(TravelsError::DriverNotFound);
        }

        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM vehicles WHERE driver_id = $1")
            .bind(new.driver_id)
            .fetch_one(&mut *tx)
            .await?;
        if count as usize >= Driver::MAX_VEHICLES {
            return Err(TravelsError::TooManyVehicles);
        }

        let row = sqlx::query(
            "INSERT INTO vehicles (id, driver_id, plate_number, model, year, color) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, driver_id, plate_number, model, year, color",
        )
        .bind(Uuid::new_v4())
        .bind(new.driver_id)
        .bind(&new.plate_number)
        .bind(&new.model)
        .bind(new.year)
        .bind(&new.color)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(vehicle_from_row(&row))
    }
}

fn vehicle_from_row(row: &PgRow) -> Vehicle {
    Vehicle {
        id: row.get("id"),
        driver_id: row.get("driver_id"),
        plate_number: row.get("plate_number"),
        model: row.get("model"),
        year: row.get("year"),
        color: row.get("color"),
    }
}
