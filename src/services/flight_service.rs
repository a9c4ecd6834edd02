use crate::models::flight::{
    Flight, FlightCreateRequest, FlightListResponse, FlightUpdateRequest, PassengerDetail,
    PassengerListResponse,
};
use crate::models::ticket::TicketStatus;
use crate::models::user::Role;
use crate::services::MAX_TX_RETRIES;
use crate::utils::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use validator::Validate;

#[derive(Clone)]
pub struct FlightService {
    pool: SqlitePool,
}

impl FlightService {
    pub fn new(pool: SqlitePool) -> Self {
        FlightService { pool }
    }

    // Take one seat off the flight, inside the caller's transaction.
    // The guarded decrement runs first so the transaction owns the store's
    // write lock before anything is decided; rolling back undoes it.
    pub async fn reserve_seat(
        &self,
        conn: &mut SqliteConnection,
        flight_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<Flight> {
        let reserved = sqlx::query(
            "UPDATE flight SET available_seats = available_seats - 1
             WHERE id = ? AND available_seats > 0",
        )
        .bind(flight_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        let flight = sqlx::query_as::<_, Flight>("SELECT * FROM flight WHERE id = ?")
            .bind(flight_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Flight not found".into()))?;

        if flight.has_departed(now) {
            // Caller rolls the transaction back, which returns the seat.
            return Err(AppError::Conflict("Flight has already departed".into()));
        }
        if reserved == 0 {
            return Err(AppError::Conflict("No seats available".into()));
        }

        Ok(flight)
    }

    // Give one seat back, never past total_seats. Idempotent at the
    // ceiling; each call must match one prior reservation.
    pub async fn release_seat(
        &self,
        conn: &mut SqliteConnection,
        flight_id: i64,
    ) -> AppResult<()> {
        let released = sqlx::query(
            "UPDATE flight SET available_seats = MIN(available_seats + 1, total_seats)
             WHERE id = ?",
        )
        .bind(flight_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if released == 0 {
            return Err(AppError::NotFound("Flight not found".into()));
        }

        Ok(())
    }

    pub async fn create_flight(
        &self,
        role: Role,
        request: FlightCreateRequest,
    ) -> AppResult<Flight> {
        if !role.can_manage_flights() {
            return Err(AppError::AuthError(
                "Only managers or admins can create flights".into(),
            ));
        }
        request
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        if request.arrival_time <= request.departure_time {
            return Err(AppError::ValidationError(
                "Arrival time must be after departure time".into(),
            ));
        }

        let flight = sqlx::query_as::<_, Flight>(
            "INSERT INTO flight
                (flight_number, origin, destination, departure_time, arrival_time,
                 price_cents, total_seats, available_seats)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(&request.flight_number)
        .bind(&request.origin)
        .bind(&request.destination)
        .bind(request.departure_time)
        .bind(request.arrival_time)
        .bind(request.price_cents)
        .bind(request.total_seats)
        .bind(request.total_seats)
        .fetch_one(&self.pool)
        .await?;

        Ok(flight)
    }

    pub async fn update_flight(
        &self,
        role: Role,
        flight_id: i64,
        request: FlightUpdateRequest,
    ) -> AppResult<Flight> {
        if !role.can_manage_flights() {
            return Err(AppError::AuthError(
                "Only managers or admins can update flights".into(),
            ));
        }

        let mut retries = 0;
        loop {
            match self.try_update_flight(flight_id, &request).await {
                Err(e) if e.is_retryable() && retries < MAX_TX_RETRIES => retries += 1,
                other => return other,
            }
        }
    }

    async fn try_update_flight(
        &self,
        flight_id: i64,
        request: &FlightUpdateRequest,
    ) -> AppResult<Flight> {
        let mut tx = self.pool.begin().await?;

        let flight = sqlx::query_as::<_, Flight>("SELECT * FROM flight WHERE id = ?")
            .bind(flight_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Flight not found".into()))?;

        let has_bookings: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM ticket WHERE flight_id = ? AND status = ?)",
        )
        .bind(flight_id)
        .bind(TicketStatus::Booked)
        .fetch_one(&mut *tx)
        .await?;

        if has_bookings && request.touches_protected_fields(&flight) {
            return Err(AppError::Conflict(
                "Cannot change departure, arrival, price or seats: flight has active bookings"
                    .into(),
            ));
        }

        // Resizing keeps the consumed seat count (sold tickets plus held
        // intents) constant; the flight can never shrink below it.
        let total_seats = request.total_seats.unwrap_or(flight.total_seats);
        let consumed = flight.total_seats - flight.available_seats;
        if total_seats < consumed {
            return Err(AppError::Conflict(
                "Cannot shrink flight below seats already sold or held".into(),
            ));
        }
        let available_seats = total_seats - consumed;

        let updated = sqlx::query_as::<_, Flight>(
            "UPDATE flight SET
                flight_number = ?, origin = ?, destination = ?,
                departure_time = ?, arrival_time = ?, price_cents = ?,
                total_seats = ?, available_seats = ?
             WHERE id = ?
             RETURNING *",
        )
        .bind(request.flight_number.as_ref().unwrap_or(&flight.flight_number))
        .bind(request.origin.as_ref().unwrap_or(&flight.origin))
        .bind(request.destination.as_ref().unwrap_or(&flight.destination))
        .bind(request.departure_time.unwrap_or(flight.departure_time))
        .bind(request.arrival_time.unwrap_or(flight.arrival_time))
        .bind(request.price_cents.unwrap_or(flight.price_cents))
        .bind(total_seats)
        .bind(available_seats)
        .bind(flight_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn delete_flight(&self, role: Role, flight_id: i64) -> AppResult<()> {
        if !role.can_manage_flights() {
            return Err(AppError::AuthError(
                "Only managers or admins can delete flights".into(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM flight WHERE id = ?)")
            .bind(flight_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(AppError::NotFound("Flight not found".into()));
        }

        // Tickets of any status pin the flight: refunded and canceled ones
        // are still financial records referencing it.
        let has_tickets: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM ticket WHERE flight_id = ?)")
                .bind(flight_id)
                .fetch_one(&mut *tx)
                .await?;
        if has_tickets {
            return Err(AppError::Conflict(
                "Cannot delete flight: tickets reference it".into(),
            ));
        }

        let has_payments: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM payment WHERE flight_id = ?)")
                .bind(flight_id)
                .fetch_one(&mut *tx)
                .await?;
        if has_payments {
            return Err(AppError::Conflict(
                "Cannot delete flight: payment intents reference it".into(),
            ));
        }

        sqlx::query("DELETE FROM flight WHERE id = ?")
            .bind(flight_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_flight(&self, flight_id: i64) -> AppResult<Flight> {
        sqlx::query_as::<_, Flight>("SELECT * FROM flight WHERE id = ?")
            .bind(flight_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Flight not found".into()))
    }

    pub async fn list_flights(&self) -> AppResult<FlightListResponse> {
        let flights =
            sqlx::query_as::<_, Flight>("SELECT * FROM flight ORDER BY departure_time DESC")
                .fetch_all(&self.pool)
                .await?;

        Ok(FlightListResponse { flights })
    }

    // Passenger manifest for receipt rendering and check-in collaborators.
    pub async fn passengers(&self, role: Role, flight_id: i64) -> AppResult<PassengerListResponse> {
        if !role.can_manage_flights() {
            return Err(AppError::AuthError(
                "Only managers or admins can list passengers".into(),
            ));
        }

        let flight = self.get_flight(flight_id).await?;

        let tickets = sqlx::query_as::<_, PassengerDetail>(
            "SELECT t.id AS ticket_id, t.confirmation_id, u.username, t.status,
                    t.price_cents, t.booked_at
             FROM ticket t
             INNER JOIN user u ON u.id = t.user_id
             WHERE t.flight_id = ?
             ORDER BY t.booked_at DESC",
        )
        .bind(flight_id)
        .fetch_all(&self.pool)
        .await?;

        let revenue_cents = tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Booked)
            .map(|t| t.price_cents)
            .sum();

        Ok(PassengerListResponse {
            flight_id: flight.id,
            flight_number: flight.flight_number,
            origin: flight.origin,
            destination: flight.destination,
            count: tickets.len(),
            revenue_cents,
            tickets,
        })
    }
}
