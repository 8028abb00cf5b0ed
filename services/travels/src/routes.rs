//! Travels service routes

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use chrono::Utc;
use serde_json::json;

use crate::{
    error::{TravelsError, TravelsResult},
    geo::GeoQuery,
    models::{
        ConfirmationTravelResponse, CreateRequestTravelRequest, CreateVehicleRequest, MineQuery,
        NearbyQuery, OwnerQuery, RequestTravelResponse, TakeRequestTravelRequest,
        TravelActionRequest, TravelResponse, VehicleResponse, registry::NewVehicle,
        request_travel::NewRequestTravel,
    },
    state::AppState,
};

/// Create the router for the travels service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/request-travels", post(create_request_travel))
        .route("/request-travels/nearby", get(list_nearby_request_travels))
        .route("/request-travels/mine", get(list_my_request_travels))
        .route("/request-travels/:id", get(get_request_travel))
        .route("/request-travels/:id", delete(delete_request_travel))
        .route("/request-travels/:id/take", post(take_request_travel))
        .route("/vehicles", post(create_vehicle))
        .route("/travels/:id", get(get_travel))
        .route("/travels/:id/cancel", post(cancel_travel))
        .route("/travels/:id/finish", post(finish_travel))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "travels-service"
    }))
}

/// Open a new ride request for the calling rider
pub async fn create_request_travel(
    State(state): State<AppState>,
    Json(payload): Json<CreateRequestTravelRequest>,
) -> TravelsResult<impl IntoResponse> {
    let rider = state.registry.resolve_user(payload.user_id).await?;

    let new = NewRequestTravel::new(
        rider.id,
        payload.origin,
        payload.destination,
        Utc::now(),
        state.config.request_ttl_minutes,
    );
    let request = state.requests.create_request(new).await?;

    Ok((
        StatusCode::CREATED,
        Json(RequestTravelResponse::from(request)),
    ))
}

/// Pending requests near the calling driver
///
/// Only active drivers may browse; everyone else gets a 403 without
/// learning whether any requests exist.
pub async fn list_nearby_request_travels(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> TravelsResult<impl IntoResponse> {
    match state.registry.resolve_driver_by_user(query.user_id).await {
        Ok(driver) if driver.is_active => {}
        Ok(_) | Err(TravelsError::DriverNotFound) => {
            return Err(TravelsError::DriverNotActive);
        }
        Err(err) => return Err(err),
    }

    let geo = GeoQuery {
        latitude: query.latitude,
        longitude: query.longitude,
        radius: query.radius,
    };
    let (point, radius_km) = geo.validate()?;

    let requests = state
        .requests
        .list_pending_near(point, radius_km, Utc::now())
        .await?;

    let responses: Vec<RequestTravelResponse> = requests
        .into_iter()
        .map(RequestTravelResponse::from)
        .collect();
    Ok(Json(responses))
}

/// The calling rider's own requests, optionally filtered by status
pub async fn list_my_request_travels(
    State(state): State<AppState>,
    Query(query): Query<MineQuery>,
) -> TravelsResult<impl IntoResponse> {
    let requests = state
        .requests
        .list_by_owner(query.user_id, query.status)
        .await?;

    let responses: Vec<RequestTravelResponse> = requests
        .into_iter()
        .map(RequestTravelResponse::from)
        .collect();
    Ok(Json(responses))
}

/// Get a ride request by ID
pub async fn get_request_travel(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> TravelsResult<impl IntoResponse> {
    let request = state.requests.get_request(id).await?;

    Ok(Json(RequestTravelResponse::from(request)))
}

/// Delete a ride request, owner-scoped
pub async fn delete_request_travel(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<OwnerQuery>,
) -> TravelsResult<impl IntoResponse> {
    state
        .requests
        .delete_request_by_owner(id, query.user_id)
        .await?;

    Ok(Json(json!({ "message": "Request travel deleted successfully" })))
}

/// Take a pending ride request as the calling driver
pub async fn take_request_travel(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<TakeRequestTravelRequest>,
) -> TravelsResult<impl IntoResponse> {
    let geo = GeoQuery {
        latitude: payload.latitude,
        longitude: payload.longitude,
        radius: None,
    };
    let (location, _) = geo.validate()?;

    let travel = state
        .matching
        .take(id, payload.user_id, location, payload.vehicle_id)
        .await?;

    Ok(Json(TravelResponse::from(travel)))
}

/// Register a vehicle for the calling user's driver record
///
/// Drivers are capped at two vehicles.
pub async fn create_vehicle(
    State(state): State<AppState>,
    Json(payload): Json<CreateVehicleRequest>,
) -> TravelsResult<impl IntoResponse> {
    let driver = state
        .registry
        .resolve_driver_by_user(payload.user_id)
        .await?;

    let vehicle = state
        .registry
        .create_vehicle(NewVehicle {
            driver_id: driver.id,
            plate_number: payload.plate_number,
            model: payload.model,
            year: payload.year,
            color: payload.color,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(VehicleResponse::from(vehicle))))
}

/// Get a travel by ID
pub async fn get_travel(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> TravelsResult<impl IntoResponse> {
    let travel = state.travels.get_travel(id).await?;

    Ok(Json(TravelResponse::from(travel)))
}

/// Cancel an in-course travel as one of its parties
pub async fn cancel_travel(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<TravelActionRequest>,
) -> TravelsResult<impl IntoResponse> {
    let travel = state.lifecycle.cancel(id, payload.user_id).await?;

    Ok(Json(TravelResponse::from(travel)))
}

/// Confirm completion of a travel as one of its parties
pub async fn finish_travel(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<TravelActionRequest>,
) -> TravelsResult<impl IntoResponse> {
    let confirmation = state.lifecycle.finish(id, payload.user_id).await?;

    Ok(Json(ConfirmationTravelResponse::from(confirmation)))
}
