pub mod flight;
pub mod payment;
pub mod ticket;
pub mod user;
