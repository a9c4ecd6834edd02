use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

// One ticket permanently represents one seat-unit consumed from a flight.
#[derive(Debug, Clone, Serialize, JsonSchema, sqlx::FromRow)]
pub struct Ticket {
    pub id: i64,
    pub user_id: i64,
    pub flight_id: i64,
    pub confirmation_id: String,
    pub status: TicketStatus,
    pub price_cents: i64,
    pub booked_at: DateTime<Utc>,
}

// Transitions are one-way: booked -> refunded, booked -> canceled.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, EnumString,
    sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TicketStatus {
    Booked,
    Refunded,
    Canceled,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TicketBookingRequest {
    pub flight_id: i64,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct TicketListResponse {
    pub tickets: Vec<Ticket>,
}
