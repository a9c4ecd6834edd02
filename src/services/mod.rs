pub mod flight_service;
pub mod gateway;
pub mod payment_service;
pub mod ticket_service;
pub mod user_service;

// Bounded retries for transactions that read before they write and can
// lose a snapshot race under WAL. Exhaustion surfaces as
// ContentionTimeout, never as a hang.
pub(crate) const MAX_TX_RETRIES: usize = 3;
