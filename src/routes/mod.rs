pub mod flight_route;
pub mod payment_route;
pub mod ticket_route;
pub mod user_route;
