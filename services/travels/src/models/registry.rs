//! Collaborator entities: users, drivers and vehicles
//!
//! Identity and the driver/vehicle registry are owned by external
//! collaborators; this service only resolves them and enforces the
//! vehicle-count precondition on registration.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user as provided by the identity collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub is_active: bool,
}

/// A driver record owned by the registry collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub user_id: Uuid,
    pub is_active: bool,
}

impl Driver {
    /// A driver may register at most this many vehicles
    pub const MAX_VEHICLES: usize = 2;
}

/// A vehicle registered to a driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub plate_number: String,
    pub model: String,
    pub year: i32,
    pub color: String,
}

/// Vehicle registration payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewVehicle {
    pub driver_id: Uuid,
    pub plate_number: String,
    pub model: String,
    pub year: i32,
    pub color: String,
}
