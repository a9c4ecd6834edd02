use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, JsonSchema, sqlx::FromRow)]
pub struct Flight {
    pub id: i64,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub price_cents: i64,
    pub total_seats: i32,
    pub available_seats: i32,
}

impl Flight {
    pub fn has_departed(&self, now: DateTime<Utc>) -> bool {
        self.departure_time <= now
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct FlightCreateRequest {
    #[validate(length(min = 1, max = 10))]
    pub flight_number: String,
    #[validate(length(min = 1, max = 100))]
    pub origin: String,
    #[validate(length(min = 1, max = 100))]
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    #[validate(range(min = 0))]
    pub price_cents: i64,
    #[validate(range(min = 0))]
    pub total_seats: i32,
}

// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct FlightUpdateRequest {
    pub flight_number: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub price_cents: Option<i64>,
    pub total_seats: Option<i32>,
}

impl FlightUpdateRequest {
    // Fields frozen while a flight has booked tickets: changing any of
    // them would reprice or resize inventory that money already moved on.
    pub fn touches_protected_fields(&self, flight: &Flight) -> bool {
        self.departure_time
            .is_some_and(|t| t != flight.departure_time)
            || self.arrival_time.is_some_and(|t| t != flight.arrival_time)
            || self.price_cents.is_some_and(|p| p != flight.price_cents)
            || self.total_seats.is_some_and(|s| s != flight.total_seats)
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct FlightListResponse {
    pub flights: Vec<Flight>,
}

// One row of the passenger manifest exposed to manager/admin callers.
#[derive(Debug, Serialize, JsonSchema, sqlx::FromRow)]
pub struct PassengerDetail {
    pub ticket_id: i64,
    pub confirmation_id: String,
    pub username: String,
    pub status: crate::models::ticket::TicketStatus,
    pub price_cents: i64,
    pub booked_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct PassengerListResponse {
    pub flight_id: i64,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub count: usize,
    pub revenue_cents: i64,
    pub tickets: Vec<PassengerDetail>,
}
