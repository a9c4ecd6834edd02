use crate::models::flight::Flight;
use crate::models::payment::{
    Payment, PaymentIntentRequest, PaymentListResponse, PaymentStatus, SettlementOutcome,
    SettlementResult,
};
use crate::models::user::Role;
use crate::services::flight_service::FlightService;
use crate::services::gateway::{MockGateway, PaymentGateway};
use crate::services::ticket_service::TicketService;
use crate::services::MAX_TX_RETRIES;
use crate::utils::error::{AppError, AppResult};
use chrono::{DateTime, Duration, Utc};
use log::info;
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use validator::Validate;

// A pending intent holds its seat for this long before the expiry sweep
// may reclaim it.
const HOLD_WINDOW_MINUTES: i64 = 15;

#[derive(Clone)]
pub struct PaymentService {
    pool: SqlitePool,
    flight_service: FlightService,
    ticket_service: TicketService,
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentService {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_gateway(pool, Arc::new(MockGateway))
    }

    pub fn with_gateway(pool: SqlitePool, gateway: Arc<dyn PaymentGateway>) -> Self {
        PaymentService {
            flight_service: FlightService::new(pool.clone()),
            ticket_service: TicketService::new(pool.clone()),
            pool,
            gateway,
        }
    }

    // Create a pending intent and hold one seat for it. Retried client
    // requests with the same idempotency key get the original intent back
    // and never hold a second seat.
    pub async fn create_intent(
        &self,
        user_id: i64,
        request: PaymentIntentRequest,
    ) -> AppResult<Payment> {
        request
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let mut retries = 0;
        loop {
            let now = Utc::now();
            match self.try_create_intent(user_id, &request, now).await {
                Err(e) if e.is_retryable() && retries < MAX_TX_RETRIES => retries += 1,
                Err(AppError::Conflict(msg)) => {
                    // Either a duplicate key lost the insert race, or the
                    // flight itself rejected the hold. Only the former has
                    // an intent to hand back.
                    if let Some(existing) = self
                        .find_by_idempotency_key(user_id, &request.idempotency_key)
                        .await?
                    {
                        return Ok(existing);
                    }
                    return Err(AppError::Conflict(msg));
                }
                other => return other,
            }
        }
    }

    async fn try_create_intent(
        &self,
        user_id: i64,
        request: &PaymentIntentRequest,
        now: DateTime<Utc>,
    ) -> AppResult<Payment> {
        // Fast path for retried requests.
        if let Some(existing) = self
            .find_by_idempotency_key(user_id, &request.idempotency_key)
            .await?
        {
            return Ok(existing);
        }

        let mut tx = self.pool.begin().await?;

        let flight = self
            .flight_service
            .reserve_seat(&mut *tx, request.flight_id, now)
            .await?;

        // Re-check under the lock: a concurrent duplicate that committed
        // after the fast path must win. Rolling back returns the seat this
        // transaction just held, so inventory is only decremented once.
        if let Some(existing) = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payment WHERE user_id = ? AND idempotency_key = ?",
        )
        .bind(user_id)
        .bind(&request.idempotency_key)
        .fetch_optional(&mut *tx)
        .await?
        {
            tx.rollback().await?;
            return Ok(existing);
        }

        let payment = sqlx::query_as::<_, Payment>(
            "INSERT INTO payment
                (user_id, flight_id, amount_cents, currency, provider, provider_intent_id,
                 idempotency_key, status, created_at, updated_at, expires_at)
             VALUES (?, ?, ?, 'USD', ?, ?, ?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(user_id)
        .bind(flight.id)
        .bind(flight.price_cents)
        .bind(self.gateway.provider_name())
        .bind(self.gateway.new_intent_id())
        .bind(&request.idempotency_key)
        .bind(PaymentStatus::Pending)
        .bind(now)
        .bind(now)
        .bind(now + Duration::minutes(HOLD_WINDOW_MINUTES))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(payment)
    }

    // Terminal resolution of an intent, driven by the provider webhook or
    // the mock capture. Safe against duplicate delivery: settling anything
    // that is no longer pending reports the current status and changes
    // nothing.
    pub async fn settle(
        &self,
        provider_intent_id: &str,
        outcome: SettlementOutcome,
    ) -> AppResult<SettlementResult> {
        let mut retries = 0;
        loop {
            let now = Utc::now();
            match self.try_settle(provider_intent_id, outcome, now).await {
                Err(e) if e.is_retryable() && retries < MAX_TX_RETRIES => retries += 1,
                other => return other,
            }
        }
    }

    async fn try_settle(
        &self,
        provider_intent_id: &str,
        outcome: SettlementOutcome,
        now: DateTime<Utc>,
    ) -> AppResult<SettlementResult> {
        let mut tx = self.pool.begin().await?;

        let payment =
            sqlx::query_as::<_, Payment>("SELECT * FROM payment WHERE provider_intent_id = ?")
                .bind(provider_intent_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Payment intent not found".into()))?;

        if payment.status == PaymentStatus::Paid {
            return Ok(SettlementResult {
                status: PaymentStatus::Paid,
                detail: "Already paid".into(),
                ticket_id: payment.ticket_id,
            });
        }
        if payment.status.is_terminal() {
            return Ok(SettlementResult {
                status: payment.status,
                detail: format!("Intent is {}, event ignored", payment.status),
                ticket_id: payment.ticket_id,
            });
        }

        match outcome {
            SettlementOutcome::Succeeded => {
                let flight = sqlx::query_as::<_, Flight>("SELECT * FROM flight WHERE id = ?")
                    .bind(payment.flight_id)
                    .fetch_one(&mut *tx)
                    .await?;

                if flight.has_departed(now) {
                    // Late-arriving success for a hold that overlapped
                    // departure: no ticket, the seat goes back.
                    self.transition(&mut *tx, payment.id, PaymentStatus::Canceled, None, now)
                        .await?;
                    self.flight_service.release_seat(&mut *tx, flight.id).await?;
                    tx.commit().await?;

                    return Ok(SettlementResult {
                        status: PaymentStatus::Canceled,
                        detail: "Flight already departed, payment canceled and seat released"
                            .into(),
                        ticket_id: None,
                    });
                }

                let ticket = self
                    .ticket_service
                    .issue_ticket(
                        &mut *tx,
                        payment.user_id,
                        payment.flight_id,
                        payment.amount_cents,
                        now,
                    )
                    .await?;

                self.transition(&mut *tx, payment.id, PaymentStatus::Paid, Some(ticket.id), now)
                    .await?;
                tx.commit().await?;

                Ok(SettlementResult {
                    status: PaymentStatus::Paid,
                    detail: "Payment captured, ticket issued".into(),
                    ticket_id: Some(ticket.id),
                })
            }
            SettlementOutcome::Failed => {
                // A ticket is only ever linked on success, so this always
                // releases today; kept as a guard should that change.
                if payment.ticket_id.is_none() {
                    self.flight_service
                        .release_seat(&mut *tx, payment.flight_id)
                        .await?;
                }

                self.transition(&mut *tx, payment.id, PaymentStatus::Failed, None, now)
                    .await?;
                tx.commit().await?;

                Ok(SettlementResult {
                    status: PaymentStatus::Failed,
                    detail: "Payment failed, seat released".into(),
                    ticket_id: None,
                })
            }
        }
    }

    // Compare-and-swap out of pending. Losing the swap means another
    // settlement got there first; the caller's transaction must not
    // commit, and the retry loop will re-read the terminal state.
    async fn transition(
        &self,
        conn: &mut SqliteConnection,
        payment_id: i64,
        status: PaymentStatus,
        ticket_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let updated = sqlx::query(
            "UPDATE payment SET status = ?, ticket_id = COALESCE(?, ticket_id), updated_at = ?
             WHERE id = ? AND status = ?",
        )
        .bind(status)
        .bind(ticket_id)
        .bind(now)
        .bind(payment_id)
        .bind(PaymentStatus::Pending)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(AppError::ContentionTimeout(
                "Payment was settled concurrently".into(),
            ));
        }

        Ok(())
    }

    // Reclaim the seat of one overdue pending intent. Idempotent: the
    // guarded update makes repeated calls (sweep and lazy checks alike)
    // release at most one seat per intent.
    pub async fn expire_if_due(&self, payment_id: i64, now: DateTime<Utc>) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let expired = sqlx::query(
            "UPDATE payment SET status = ?, updated_at = ?
             WHERE id = ? AND status = ? AND expires_at <= ?",
        )
        .bind(PaymentStatus::Expired)
        .bind(now)
        .bind(payment_id)
        .bind(PaymentStatus::Pending)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if expired == 1 {
            let flight_id: i64 = sqlx::query_scalar("SELECT flight_id FROM payment WHERE id = ?")
                .bind(payment_id)
                .fetch_one(&mut *tx)
                .await?;
            self.flight_service.release_seat(&mut *tx, flight_id).await?;
        }

        tx.commit().await?;
        Ok(expired == 1)
    }

    // Sweep every overdue pending intent. Meant for a periodic task or an
    // operator trigger; each intent expires in its own transaction so one
    // contended row cannot wedge the whole sweep.
    pub async fn expire_due_intents(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let due: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM payment WHERE status = ? AND expires_at <= ?")
                .bind(PaymentStatus::Pending)
                .bind(now)
                .fetch_all(&self.pool)
                .await?;

        let mut expired = 0;
        for payment_id in due {
            if self.expire_if_due(payment_id, now).await? {
                expired += 1;
            }
        }

        if expired > 0 {
            info!("expired {expired} overdue payment intents");
        }

        Ok(expired)
    }

    // Test capture without an external provider: resolve the payment the
    // caller can see, then drive the normal settlement path.
    pub async fn mock_capture(
        &self,
        user_id: i64,
        role: Role,
        payment_id: i64,
        outcome: Option<SettlementOutcome>,
    ) -> AppResult<SettlementResult> {
        let payment = self.get_payment(user_id, role, payment_id).await?;
        self.settle(
            &payment.provider_intent_id,
            outcome.unwrap_or(SettlementOutcome::Succeeded),
        )
        .await
    }

    pub async fn get_payment(
        &self,
        user_id: i64,
        role: Role,
        payment_id: i64,
    ) -> AppResult<Payment> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payment WHERE id = ?")
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment not found".into()))?;

        if payment.user_id != user_id && !role.can_view_all_bookings() {
            return Err(AppError::NotFound("Payment not found".into()));
        }

        Ok(payment)
    }

    pub async fn list_payments(&self, user_id: i64, role: Role) -> AppResult<PaymentListResponse> {
        let payments = if role.can_view_all_bookings() {
            sqlx::query_as::<_, Payment>("SELECT * FROM payment ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query_as::<_, Payment>(
                "SELECT * FROM payment WHERE user_id = ? ORDER BY created_at DESC",
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(PaymentListResponse { payments })
    }

    async fn find_by_idempotency_key(
        &self,
        user_id: i64,
        idempotency_key: &str,
    ) -> AppResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payment WHERE user_id = ? AND idempotency_key = ?",
        )
        .bind(user_id)
        .bind(idempotency_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }
}
