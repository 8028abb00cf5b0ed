//! Expiry sweep: only expired pending requests are ever deleted

mod support;

use chrono::{Duration, Utc};

use travels::error::TravelsError;
use travels::store::RequestTravelStore;

use support::{active_driver, origin, pending_request, request_created_at, rider, test_app};

#[tokio::test]
async fn test_sweep_deletes_only_expired_pending_requests() {
    let app = test_app();
    let rider = rider(&app.store, "rider@example.com");
    let now = Utc::now();

    for minutes_ago in [31, 45, 120] {
        request_created_at(
            &app.store,
            rider.id,
            origin(),
            now - Duration::minutes(minutes_ago),
        )
        .await;
    }
    let fresh = pending_request(&app.store, rider.id, origin()).await;

    let deleted = app
        .sweeper
        .sweep_expired(Utc::now())
        .await
        .expect("sweep should succeed");
    assert_eq!(deleted, 3);
    assert_eq!(app.store.request_count(), 1);

    let survivor = app
        .store
        .get_request(fresh.id)
        .await
        .expect("fresh request should survive");
    assert_eq!(survivor.id, fresh.id);
}

#[tokio::test]
async fn test_sweep_never_touches_taken_requests() {
    let app = test_app();
    let rider = rider(&app.store, "rider@example.com");
    let (driver_user, _, vehicle) = active_driver(&app.store, "driver@example.com");
    let request = pending_request(&app.store, rider.id, origin()).await;

    app.matching
        .take(request.id, driver_user.id, origin(), vehicle.id)
        .await
        .expect("take should succeed");

    // Sweep well past the request's deadline.
    let deleted = app
        .sweeper
        .sweep_expired(Utc::now() + Duration::hours(2))
        .await
        .expect("sweep should succeed");
    assert_eq!(deleted, 0);
    assert_eq!(app.store.request_count(), 1);
}

#[tokio::test]
async fn test_sweep_on_empty_store_deletes_nothing() {
    let app = test_app();

    let deleted = app
        .sweeper
        .sweep_expired(Utc::now())
        .await
        .expect("sweep should succeed");
    assert_eq!(deleted, 0);
}

#[tokio::test]
async fn test_expired_request_is_unmatchable_even_before_the_sweep() {
    let app = test_app();
    let rider = rider(&app.store, "rider@example.com");
    let (driver_user, _, vehicle) = active_driver(&app.store, "driver@example.com");
    let request = request_created_at(
        &app.store,
        rider.id,
        origin(),
        Utc::now() - Duration::minutes(31),
    )
    .await;

    // Still physically present, yet not takeable.
    assert_eq!(app.store.request_count(), 1);
    let err = app
        .matching
        .take(request.id, driver_user.id, origin(), vehicle.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TravelsError::RequestTravelNotFound));

    // And not visible to nearby listings.
    let nearby = app
        .store
        .list_pending_near(origin(), 100.0, Utc::now())
        .await
        .expect("listing should succeed");
    assert!(nearby.is_empty());
}
