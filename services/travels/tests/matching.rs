//! Taking a pending ride request: validation order, eligibility folds and
//! the at-most-one-winner guarantee

mod support;

use chrono::{Duration, Utc};
use uuid::Uuid;

use travels::error::TravelsError;
use travels::geo::GeoPoint;
use travels::models::request_travel::RequestTravelStatus;
use travels::models::travel::TravelStatus;
use travels::store::RequestTravelStore;

use support::{active_driver, driver, origin, pending_request, request_created_at, rider, test_app};

#[tokio::test]
async fn test_take_creates_travel_and_marks_request_taken() {
    let app = test_app();
    let rider = rider(&app.store, "rider@example.com");
    let (driver_user, driver, vehicle) = active_driver(&app.store, "driver@example.com");
    let request = pending_request(&app.store, rider.id, origin()).await;

    let travel = app
        .matching
        .take(request.id, driver_user.id, origin(), vehicle.id)
        .await
        .expect("take should succeed");

    assert_eq!(travel.status, TravelStatus::InCourse);
    assert_eq!(travel.rider_id, Some(rider.id));
    assert_eq!(travel.driver_id, Some(driver.id));
    assert_eq!(travel.vehicle_id, Some(vehicle.id));
    assert_eq!(travel.request_travel_id, Some(request.id));
    assert_eq!(travel.origin, request.origin);
    assert_eq!(travel.destination, request.destination);

    let request = app
        .store
        .get_request(request.id)
        .await
        .expect("request should still exist");
    assert_eq!(request.status, RequestTravelStatus::Taken);

    // The rider hears about it.
    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Your travel request has been taken!");
    assert_eq!(sent[0].recipients, vec![rider.email]);
}

#[tokio::test]
async fn test_driver_cannot_take_own_request() {
    let app = test_app();
    let (driver_user, _, vehicle) = active_driver(&app.store, "driver@example.com");
    let request = pending_request(&app.store, driver_user.id, origin()).await;

    let err = app
        .matching
        .take(request.id, driver_user.id, origin(), vehicle.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TravelsError::DriverCannotTakeOwnRequest));

    // Nothing was claimed.
    let request = app.store.get_request(request.id).await.unwrap();
    assert_eq!(request.status, RequestTravelStatus::Pending);
    assert_eq!(app.store.travel_count(), 0);
}

#[tokio::test]
async fn test_expired_request_is_not_takeable() {
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

    let err = app
        .matching
        .take(request.id, driver_user.id, origin(), vehicle.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TravelsError::RequestTravelNotFound));
}

#[tokio::test]
async fn test_out_of_range_request_is_not_takeable() {
    let app = test_app();
    let rider = rider(&app.store, "rider@example.com");
    let (driver_user, _, vehicle) = active_driver(&app.store, "driver@example.com");
    let request = pending_request(&app.store, rider.id, origin()).await;

    // About 111 km away, past the 100 km cap.
    let err = app
        .matching
        .take(request.id, driver_user.id, GeoPoint::new(1.0, 0.0), vehicle.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TravelsError::RequestTravelNotFound));
}

#[tokio::test]
async fn test_taken_request_is_not_takeable_again() {
    let app = test_app();
    let rider = rider(&app.store, "rider@example.com");
    let (first_user, _, first_vehicle) = active_driver(&app.store, "first@example.com");
    let (second_user, _, second_vehicle) = active_driver(&app.store, "second@example.com");
    let request = pending_request(&app.store, rider.id, origin()).await;

    app.matching
        .take(request.id, first_user.id, origin(), first_vehicle.id)
        .await
        .expect("first take should succeed");

    let err = app
        .matching
        .take(request.id, second_user.id, origin(), second_vehicle.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TravelsError::RequestTravelNotFound));
    assert_eq!(app.store.travel_count(), 1);
}

#[tokio::test]
async fn test_take_requires_driver_record() {
    let app = test_app();
    let rider = rider(&app.store, "rider@example.com");
    let not_a_driver = support::rider(&app.store, "pedestrian@example.com");
    let request = pending_request(&app.store, rider.id, origin()).await;

    let err = app
        .matching
        .take(request.id, not_a_driver.id, origin(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, TravelsError::DriverNotFound));
}

#[tokio::test]
async fn test_take_requires_active_driver() {
    let app = test_app();
    let rider = rider(&app.store, "rider@example.com");
    let (driver_user, _, vehicle) = driver(&app.store, "inactive@example.com", false);
    let request = pending_request(&app.store, rider.id, origin()).await;

    let err = app
        .matching
        .take(request.id, driver_user.id, origin(), vehicle.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TravelsError::DriverNotActive));
}

#[tokio::test]
async fn test_take_requires_known_vehicle() {
    let app = test_app();
    let rider = rider(&app.store, "rider@example.com");
    let (driver_user, _, _) = active_driver(&app.store, "driver@example.com");
    let request = pending_request(&app.store, rider.id, origin()).await;

    let err = app
        .matching
        .take(request.id, driver_user.id, origin(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, TravelsError::VehicleNotFound));
}

#[tokio::test]
async fn test_take_rejects_someone_elses_vehicle() {
    let app = test_app();
    let rider = rider(&app.store, "rider@example.com");
    let (driver_user, _, _) = active_driver(&app.store, "driver@example.com");
    let (_, _, other_vehicle) = active_driver(&app.store, "other@example.com");
    let request = pending_request(&app.store, rider.id, origin()).await;

    let err = app
        .matching
        .take(request.id, driver_user.id, origin(), other_vehicle.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TravelsError::InvalidVehicle));

    let request = app.store.get_request(request.id).await.unwrap();
    assert_eq!(request.status, RequestTravelStatus::Pending);
}

#[tokio::test]
async fn test_concurrent_takes_have_exactly_one_winner() {
    let app = test_app();
    let rider = rider(&app.store, "rider@example.com");
    let request = pending_request(&app.store, rider.id, origin()).await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let (driver_user, _, vehicle) =
            active_driver(&app.store, &format!("driver{}@example.com", i));
        let matching = app.matching.clone();
        let request_id = request.id;
        handles.push(tokio::spawn(async move {
            matching
                .take(request_id, driver_user.id, origin(), vehicle.id)
                .await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await.expect("task should not panic") {
            Ok(travel) => {
                winners += 1;
                assert_eq!(travel.request_travel_id, Some(request.id));
            }
            Err(err) => assert!(matches!(err, TravelsError::RequestTravelNotFound)),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(app.store.travel_count(), 1);

    let request = app.store.get_request(request.id).await.unwrap();
    assert_eq!(request.status, RequestTravelStatus::Taken);
}
