//! Shared fixtures for the travels integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use travels::{
    config::TravelsConfig,
    geo::GeoPoint,
    lifecycle::TravelLifecycle,
    matching::MatchingEngine,
    models::registry::{Driver, User, Vehicle},
    models::request_travel::{NewRequestTravel, RequestTravel},
    notifier::{Notification, Notifier},
    state::AppState,
    store::{Registry, RequestTravelStore, TravelStore, memory::MemoryStore},
    sweeper::ExpirySweeper,
};

/// Notifier that records enqueued notifications instead of delivering them
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent().into_iter().map(|n| n.subject).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn enqueue(&self, notification: Notification) {
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
    }
}

/// Fully wired service over the memory backend
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub matching: MatchingEngine,
    pub lifecycle: TravelLifecycle,
    pub sweeper: ExpirySweeper,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());

    let registry: Arc<dyn Registry> = store.clone();
    let travels: Arc<dyn TravelStore> = store.clone();
    let requests: Arc<dyn RequestTravelStore> = store.clone();
    let notifier_dyn: Arc<dyn Notifier> = notifier.clone();

    TestApp {
        matching: MatchingEngine::new(registry.clone(), travels.clone(), notifier_dyn.clone()),
        lifecycle: TravelLifecycle::new(registry, travels, notifier_dyn),
        sweeper: ExpirySweeper::new(requests),
        store,
        notifier,
    }
}

/// Handler state over the same memory wiring, for driving routes directly
pub fn app_state(app: &TestApp) -> AppState {
    AppState {
        requests: app.store.clone(),
        travels: app.store.clone(),
        registry: app.store.clone(),
        matching: app.matching.clone(),
        lifecycle: app.lifecycle.clone(),
        config: TravelsConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            sweep_schedule: "0 */5 * * * *".to_string(),
            mailer_url: "http://localhost:8025/send".to_string(),
            request_ttl_minutes: 30,
        },
    }
}

pub fn rider(store: &MemoryStore, email: &str) -> User {
    let user = User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        full_name: "Test Rider".to_string(),
        is_active: true,
    };
    store.insert_user(user.clone());
    user
}

/// Seed a driver (with backing user and one vehicle); `active` controls the
/// driver record's activity flag
pub fn driver(store: &MemoryStore, email: &str, active: bool) -> (User, Driver, Vehicle) {
    let user = User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        full_name: "Test Driver".to_string(),
        is_active: true,
    };
    let driver = Driver {
        id: Uuid::new_v4(),
        user_id: user.id,
        is_active: active,
    };
    let vehicle = Vehicle {
        id: Uuid::new_v4(),
        driver_id: driver.id,
        plate_number: "ABC-123".to_string(),
        model: "Model 3".to_string(),
        year: 2020,
        color: "blue".to_string(),
    };
    store.insert_user(user.clone());
    store.insert_driver(driver.clone());
    store.insert_vehicle(vehicle.clone());
    (user, driver, vehicle)
}

pub fn active_driver(store: &MemoryStore, email: &str) -> (User, Driver, Vehicle) {
    driver(store, email, true)
}

pub fn origin() -> GeoPoint {
    GeoPoint::new(0.0, 0.0)
}

/// Create a pending request at `point` expiring 30 minutes from now
pub async fn pending_request(
    store: &Arc<MemoryStore>,
    rider_id: Uuid,
    point: GeoPoint,
) -> RequestTravel {
    request_created_at(store, rider_id, point, Utc::now()).await
}

/// Create a pending request with a 30 minute lifetime counted from `created`
pub async fn request_created_at(
    store: &Arc<MemoryStore>,
    rider_id: Uuid,
    point: GeoPoint,
    created: DateTime<Utc>,
) -> RequestTravel {
    store
        .create_request(NewRequestTravel::new(rider_id, point, point, created, 30))
        .await
        .expect("creating a request should succeed")
}
