use crate::models::ticket::{Ticket, TicketBookingRequest, TicketListResponse};
use crate::services::ticket_service::TicketService;
use crate::utils::error::AppError;
use crate::utils::jwt::AuthenticatedUser;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;

/// Buy a ticket directly (seat reservation + issuance in one step)
#[openapi(tag = "Tickets")]
#[post("/tickets/buy", format = "json", data = "<request>")]
pub async fn buy_ticket(
    request: Json<TicketBookingRequest>,
    auth: AuthenticatedUser,
    ticket_service: &State<TicketService>,
) -> Result<Json<Ticket>, AppError> {
    let ticket = ticket_service
        .buy(auth.user_id, request.into_inner().flight_id)
        .await?;
    Ok(Json(ticket))
}

/// Cancel a ticket; refunds the seat when 24h or more before departure
#[openapi(tag = "Tickets")]
#[post("/tickets/<ticket_id>/cancel")]
pub async fn cancel_ticket(
    ticket_id: i64,
    auth: AuthenticatedUser,
    ticket_service: &State<TicketService>,
) -> Result<Json<Ticket>, AppError> {
    let ticket = ticket_service
        .cancel_ticket(auth.user_id, auth.role, ticket_id)
        .await?;
    Ok(Json(ticket))
}

/// Get one ticket (own, or any for admin)
#[openapi(tag = "Tickets")]
#[get("/tickets/<ticket_id>")]
pub async fn get_ticket(
    ticket_id: i64,
    auth: AuthenticatedUser,
    ticket_service: &State<TicketService>,
) -> Result<Json<Ticket>, AppError> {
    let ticket = ticket_service
        .get_ticket(auth.user_id, auth.role, ticket_id)
        .await?;
    Ok(Json(ticket))
}

/// List tickets (own, or all for admin)
#[openapi(tag = "Tickets")]
#[get("/tickets")]
pub async fn list_tickets(
    auth: AuthenticatedUser,
    ticket_service: &State<TicketService>,
) -> Result<Json<TicketListResponse>, AppError> {
    let tickets = ticket_service.list_tickets(auth.user_id, auth.role).await?;
    Ok(Json(tickets))
}
