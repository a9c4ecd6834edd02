use crate::models::flight::{
    Flight, FlightCreateRequest, FlightListResponse, FlightUpdateRequest, PassengerListResponse,
};
use crate::services::flight_service::FlightService;
use crate::utils::error::AppError;
use crate::utils::jwt::AuthenticatedUser;
use rocket::serde::json::{json, Json, Value};
use rocket::State;
use rocket_okapi::openapi;

/// List all flights
#[openapi(tag = "Flights")]
#[get("/flights")]
pub async fn list_flights(
    flight_service: &State<FlightService>,
) -> Result<Json<FlightListResponse>, AppError> {
    let flights = flight_service.list_flights().await?;
    Ok(Json(flights))
}

/// Get a single flight
#[openapi(tag = "Flights")]
#[get("/flights/<flight_id>")]
pub async fn get_flight(
    flight_id: i64,
    flight_service: &State<FlightService>,
) -> Result<Json<Flight>, AppError> {
    let flight = flight_service.get_flight(flight_id).await?;
    Ok(Json(flight))
}

/// Create a flight (manager or admin)
#[openapi(tag = "Flights")]
#[post("/flights", format = "json", data = "<request>")]
pub async fn create_flight(
    request: Json<FlightCreateRequest>,
    auth: AuthenticatedUser,
    flight_service: &State<FlightService>,
) -> Result<Json<Flight>, AppError> {
    let flight = flight_service
        .create_flight(auth.role, request.into_inner())
        .await?;
    Ok(Json(flight))
}

/// Update a flight (manager or admin)
#[openapi(tag = "Flights")]
#[put("/flights/<flight_id>", format = "json", data = "<request>")]
pub async fn update_flight(
    flight_id: i64,
    request: Json<FlightUpdateRequest>,
    auth: AuthenticatedUser,
    flight_service: &State<FlightService>,
) -> Result<Json<Flight>, AppError> {
    let flight = flight_service
        .update_flight(auth.role, flight_id, request.into_inner())
        .await?;
    Ok(Json(flight))
}

/// Delete a flight (manager or admin, only without tickets)
#[openapi(tag = "Flights")]
#[delete("/flights/<flight_id>")]
pub async fn delete_flight(
    flight_id: i64,
    auth: AuthenticatedUser,
    flight_service: &State<FlightService>,
) -> Result<Json<Value>, AppError> {
    flight_service.delete_flight(auth.role, flight_id).await?;
    Ok(Json(json!({ "status": "deleted" })))
}

/// Passenger manifest for a flight (manager or admin)
#[openapi(tag = "Flights")]
#[get("/flights/<flight_id>/passengers")]
pub async fn passengers(
    flight_id: i64,
    auth: AuthenticatedUser,
    flight_service: &State<FlightService>,
) -> Result<Json<PassengerListResponse>, AppError> {
    let manifest = flight_service.passengers(auth.role, flight_id).await?;
    Ok(Json(manifest))
}
