use crate::models::flight::Flight;
use crate::models::ticket::{Ticket, TicketListResponse, TicketStatus};
use crate::models::user::Role;
use crate::services::flight_service::FlightService;
use crate::services::MAX_TX_RETRIES;
use crate::utils::confirmation::generate_confirmation_id;
use crate::utils::error::{AppError, AppResult};
use chrono::{DateTime, Duration, Utc};
use log::warn;
use sqlx::{SqliteConnection, SqlitePool};

// Collision retries for confirmation codes. Five failed draws against a
// 32^10 space means something is badly wrong with the RNG or the table.
const MAX_CONFIRMATION_ATTEMPTS: usize = 5;

// Cancellations at least this far from departure refund the seat back to
// inventory; closer ones forfeit it. Fixed policy, not per-flight.
const REFUND_CUTOFF_HOURS: i64 = 24;

#[derive(Clone)]
pub struct TicketService {
    pool: SqlitePool,
    flight_service: FlightService,
}

impl TicketService {
    pub fn new(pool: SqlitePool) -> Self {
        TicketService {
            flight_service: FlightService::new(pool.clone()),
            pool,
        }
    }

    // Direct-buy path: seat reservation and ticket issuance are one
    // transaction. Any failure after the reservation rolls everything
    // back, so a seat can never leak without a ticket.
    pub async fn buy(&self, user_id: i64, flight_id: i64) -> AppResult<Ticket> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let flight = self
            .flight_service
            .reserve_seat(&mut *tx, flight_id, now)
            .await?;

        let ticket = self
            .issue_ticket(&mut *tx, user_id, flight.id, flight.price_cents, now)
            .await?;

        tx.commit().await?;
        Ok(ticket)
    }

    // Ledger entry point, shared by the direct-buy path and payment
    // settlement. Runs inside the caller's transaction; the price is the
    // caller's snapshot and is never recomputed from the flight.
    pub async fn issue_ticket(
        &self,
        conn: &mut SqliteConnection,
        user_id: i64,
        flight_id: i64,
        price_cents: i64,
        now: DateTime<Utc>,
    ) -> AppResult<Ticket> {
        let confirmation_id = self.unique_confirmation_id(&mut *conn).await?;

        let ticket = sqlx::query_as::<_, Ticket>(
            "INSERT INTO ticket (user_id, flight_id, confirmation_id, status, price_cents, booked_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(user_id)
        .bind(flight_id)
        .bind(&confirmation_id)
        .bind(TicketStatus::Booked)
        .bind(price_cents)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        Ok(ticket)
    }

    async fn unique_confirmation_id(&self, conn: &mut SqliteConnection) -> AppResult<String> {
        for _ in 0..MAX_CONFIRMATION_ATTEMPTS {
            let candidate = generate_confirmation_id();
            let taken: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM ticket WHERE confirmation_id = ?)",
            )
            .bind(&candidate)
            .fetch_one(&mut *conn)
            .await?;

            if !taken {
                return Ok(candidate);
            }
        }

        warn!("confirmation id generation exhausted after {MAX_CONFIRMATION_ATTEMPTS} attempts");
        Err(AppError::GenerationExhausted(
            "Could not generate a unique confirmation id".into(),
        ))
    }

    pub async fn cancel_ticket(
        &self,
        user_id: i64,
        role: Role,
        ticket_id: i64,
    ) -> AppResult<Ticket> {
        let mut retries = 0;
        loop {
            let now = Utc::now();
            match self.try_cancel_ticket(user_id, role, ticket_id, now).await {
                Err(e) if e.is_retryable() && retries < MAX_TX_RETRIES => retries += 1,
                other => return other,
            }
        }
    }

    async fn try_cancel_ticket(
        &self,
        user_id: i64,
        role: Role,
        ticket_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<Ticket> {
        let mut tx = self.pool.begin().await?;

        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM ticket WHERE id = ?")
            .bind(ticket_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Ticket not found".into()))?;

        // Other users' tickets are invisible, not forbidden.
        if ticket.user_id != user_id && !role.can_view_all_bookings() {
            return Err(AppError::NotFound("Ticket not found".into()));
        }
        if ticket.status != TicketStatus::Booked {
            return Err(AppError::Conflict(
                "Ticket is already canceled or refunded".into(),
            ));
        }

        let flight = sqlx::query_as::<_, Flight>("SELECT * FROM flight WHERE id = ?")
            .bind(ticket.flight_id)
            .fetch_one(&mut *tx)
            .await?;

        if flight.has_departed(now) {
            return Err(AppError::Conflict(
                "Flight has already departed, cancellation is not possible".into(),
            ));
        }

        let refundable = flight.departure_time - now >= Duration::hours(REFUND_CUTOFF_HOURS);
        let new_status = if refundable {
            TicketStatus::Refunded
        } else {
            TicketStatus::Canceled
        };

        let updated = sqlx::query("UPDATE ticket SET status = ? WHERE id = ? AND status = ?")
            .bind(new_status)
            .bind(ticket.id)
            .bind(TicketStatus::Booked)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if updated == 0 {
            // A concurrent cancellation won the race.
            return Err(AppError::Conflict(
                "Ticket is already canceled or refunded".into(),
            ));
        }

        if refundable {
            self.flight_service.release_seat(&mut *tx, flight.id).await?;
        }

        tx.commit().await?;

        Ok(Ticket {
            status: new_status,
            ..ticket
        })
    }

    pub async fn get_ticket(&self, user_id: i64, role: Role, ticket_id: i64) -> AppResult<Ticket> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM ticket WHERE id = ?")
            .bind(ticket_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Ticket not found".into()))?;

        if ticket.user_id != user_id && !role.can_view_all_bookings() {
            return Err(AppError::NotFound("Ticket not found".into()));
        }

        Ok(ticket)
    }

    pub async fn list_tickets(&self, user_id: i64, role: Role) -> AppResult<TicketListResponse> {
        let tickets = if role.can_view_all_bookings() {
            sqlx::query_as::<_, Ticket>("SELECT * FROM ticket ORDER BY booked_at DESC")
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query_as::<_, Ticket>(
                "SELECT * FROM ticket WHERE user_id = ? ORDER BY booked_at DESC",
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(TicketListResponse { tickets })
    }
}
