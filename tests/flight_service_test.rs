use async_trait::async_trait;
use chrono::{Duration, Utc};
use ctor::dtor;
use flight_ticketing_system::{
    models::flight::{FlightCreateRequest, FlightUpdateRequest},
    models::payment::PaymentIntentRequest,
    models::ticket::TicketStatus,
    models::user::Role,
    services::{
        flight_service::FlightService, payment_service::PaymentService,
        ticket_service::TicketService, user_service::UserService,
    },
    utils::error::AppError,
};
use sqlx::sqlite::SqlitePool as Pool;
use test_context::{test_context, AsyncTestContext};

mod common {
    pub mod test_utils;
}
use common::test_utils::{available_seats, register_test_user, seed_flight, TestDb};

struct FlightServiceContext {
    pool: Pool,
    flight_service: FlightService,
    ticket_service: TicketService,
    payment_service: PaymentService,
    user_service: UserService,
}

#[dtor]
fn cleanup() {
    if let Err(e) = TestDb::cleanup_database_sync() {
        eprintln!("Failed to cleanup test database: {}", e);
    }
}

#[async_trait]
impl AsyncTestContext for FlightServiceContext {
    async fn setup() -> Self {
        let pool = TestDb::get_instance(file!())
            .await
            .expect("Failed to get test database instance");

        FlightServiceContext {
            flight_service: FlightService::new(pool.clone()),
            ticket_service: TicketService::new(pool.clone()),
            payment_service: PaymentService::new(pool.clone()),
            user_service: UserService::new(pool.clone()),
            pool,
        }
    }

    async fn teardown(self) {
        let _ = sqlx::query("SELECT 1").execute(&self.pool).await;
    }
}

fn create_request(flight_number: &str, total_seats: i32) -> FlightCreateRequest {
    let departure = Utc::now() + Duration::days(15);
    FlightCreateRequest {
        flight_number: flight_number.to_string(),
        origin: "Toronto".to_string(),
        destination: "Berlin".to_string(),
        departure_time: departure,
        arrival_time: departure + Duration::hours(8),
        price_cents: 32_000,
        total_seats,
    }
}

#[test_context(FlightServiceContext)]
#[tokio::test]
async fn test_create_flight_requires_manager(ctx: &FlightServiceContext) -> Result<(), AppError> {
    let denied = ctx
        .flight_service
        .create_flight(Role::User, create_request("FL100", 10))
        .await;
    assert!(matches!(denied, Err(AppError::AuthError(_))));

    let flight = ctx
        .flight_service
        .create_flight(Role::Manager, create_request("FL100", 10))
        .await?;

    assert_eq!(flight.total_seats, 10);
    // A new flight starts fully available.
    assert_eq!(flight.available_seats, 10);

    Ok(())
}

#[test_context(FlightServiceContext)]
#[tokio::test]
async fn test_create_flight_rejects_inverted_times(
    ctx: &FlightServiceContext,
) -> Result<(), AppError> {
    let mut request = create_request("FL101", 10);
    request.arrival_time = request.departure_time - Duration::hours(1);

    let result = ctx.flight_service.create_flight(Role::Admin, request).await;

    assert!(matches!(result, Err(AppError::ValidationError(_))));
    Ok(())
}

#[test_context(FlightServiceContext)]
#[tokio::test]
async fn test_update_protected_fields_blocked_by_bookings(
    ctx: &FlightServiceContext,
) -> Result<(), AppError> {
    let departure = Utc::now() + Duration::days(15);
    let flight_id = seed_flight(&ctx.pool, "FL102", 5, 32_000, departure).await?;
    let user_id = register_test_user(&ctx.user_service, "protected_buyer", Role::User).await?;

    ctx.ticket_service.buy(user_id, flight_id).await?;

    // Price changes are frozen while a booked ticket exists.
    let price_change = ctx
        .flight_service
        .update_flight(
            Role::Manager,
            flight_id,
            FlightUpdateRequest {
                price_cents: Some(40_000),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(price_change, Err(AppError::Conflict(_))));

    let departure_change = ctx
        .flight_service
        .update_flight(
            Role::Manager,
            flight_id,
            FlightUpdateRequest {
                departure_time: Some(departure + Duration::hours(2)),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(departure_change, Err(AppError::Conflict(_))));

    // Cosmetic fields stay editable.
    let renamed = ctx
        .flight_service
        .update_flight(
            Role::Manager,
            flight_id,
            FlightUpdateRequest {
                origin: Some("Ottawa".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(renamed.origin, "Ottawa");

    Ok(())
}

#[test_context(FlightServiceContext)]
#[tokio::test]
async fn test_update_price_allowed_without_bookings(
    ctx: &FlightServiceContext,
) -> Result<(), AppError> {
    let departure = Utc::now() + Duration::days(15);
    let flight_id = seed_flight(&ctx.pool, "FL103", 5, 32_000, departure).await?;

    let updated = ctx
        .flight_service
        .update_flight(
            Role::Manager,
            flight_id,
            FlightUpdateRequest {
                price_cents: Some(28_000),
                ..Default::default()
            },
        )
        .await?;

    assert_eq!(updated.price_cents, 28_000);
    Ok(())
}

#[test_context(FlightServiceContext)]
#[tokio::test]
async fn test_resize_keeps_consumed_seats(ctx: &FlightServiceContext) -> Result<(), AppError> {
    let departure = Utc::now() + Duration::days(15);
    let flight_id = seed_flight(&ctx.pool, "FL104", 5, 32_000, departure).await?;
    let user_id = register_test_user(&ctx.user_service, "resize_holder", Role::User).await?;

    // A pending hold consumes a seat but is not a booked ticket, so
    // resizing is still allowed; it must respect the hold.
    ctx.payment_service
        .create_intent(
            user_id,
            PaymentIntentRequest {
                flight_id,
                idempotency_key: "fl104-key".to_string(),
            },
        )
        .await?;
    assert_eq!(available_seats(&ctx.pool, flight_id).await?, 4);

    let shrunk_too_far = ctx
        .flight_service
        .update_flight(
            Role::Manager,
            flight_id,
            FlightUpdateRequest {
                total_seats: Some(0),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(shrunk_too_far, Err(AppError::Conflict(_))));

    let shrunk = ctx
        .flight_service
        .update_flight(
            Role::Manager,
            flight_id,
            FlightUpdateRequest {
                total_seats: Some(2),
                ..Default::default()
            },
        )
        .await?;

    assert_eq!(shrunk.total_seats, 2);
    assert_eq!(shrunk.available_seats, 1);

    Ok(())
}

#[test_context(FlightServiceContext)]
#[tokio::test]
async fn test_delete_blocked_by_any_ticket(ctx: &FlightServiceContext) -> Result<(), AppError> {
    let departure = Utc::now() + Duration::days(15);
    let flight_id = seed_flight(&ctx.pool, "FL105", 5, 32_000, departure).await?;
    let user_id = register_test_user(&ctx.user_service, "delete_blocker", Role::User).await?;

    let ticket = ctx.ticket_service.buy(user_id, flight_id).await?;

    let denied = ctx.flight_service.delete_flight(Role::Admin, flight_id).await;
    assert!(matches!(denied, Err(AppError::Conflict(_))));

    // A refunded ticket still pins the flight.
    ctx.ticket_service
        .cancel_ticket(user_id, Role::User, ticket.id)
        .await?;
    let still_denied = ctx.flight_service.delete_flight(Role::Admin, flight_id).await;
    assert!(matches!(still_denied, Err(AppError::Conflict(_))));

    Ok(())
}

#[test_context(FlightServiceContext)]
#[tokio::test]
async fn test_delete_empty_flight(ctx: &FlightServiceContext) -> Result<(), AppError> {
    let departure = Utc::now() + Duration::days(15);
    let flight_id = seed_flight(&ctx.pool, "FL106", 5, 32_000, departure).await?;

    ctx.flight_service
        .delete_flight(Role::Manager, flight_id)
        .await?;

    let lookup = ctx.flight_service.get_flight(flight_id).await;
    assert!(matches!(lookup, Err(AppError::NotFound(_))));

    Ok(())
}

#[test_context(FlightServiceContext)]
#[tokio::test]
async fn test_release_seat_capped_at_total(ctx: &FlightServiceContext) -> Result<(), AppError> {
    let departure = Utc::now() + Duration::days(15);
    let flight_id = seed_flight(&ctx.pool, "FL107", 3, 32_000, departure).await?;

    // Releasing into a full flight must not push past total_seats.
    let mut conn = ctx.pool.acquire().await?;
    ctx.flight_service.release_seat(&mut *conn, flight_id).await?;

    assert_eq!(available_seats(&ctx.pool, flight_id).await?, 3);
    Ok(())
}

#[test_context(FlightServiceContext)]
#[tokio::test]
async fn test_passenger_manifest(ctx: &FlightServiceContext) -> Result<(), AppError> {
    let departure = Utc::now() + Duration::days(15);
    let flight_id = seed_flight(&ctx.pool, "FL108", 5, 32_000, departure).await?;
    let alice = register_test_user(&ctx.user_service, "manifest_alice", Role::User).await?;
    let bob = register_test_user(&ctx.user_service, "manifest_bob", Role::User).await?;

    ctx.ticket_service.buy(alice, flight_id).await?;
    let bobs_ticket = ctx.ticket_service.buy(bob, flight_id).await?;
    ctx.ticket_service
        .cancel_ticket(bob, Role::User, bobs_ticket.id)
        .await?;

    let denied = ctx.flight_service.passengers(Role::User, flight_id).await;
    assert!(matches!(denied, Err(AppError::AuthError(_))));

    let manifest = ctx.flight_service.passengers(Role::Manager, flight_id).await?;

    assert_eq!(manifest.count, 2);
    // Only booked tickets count toward revenue.
    assert_eq!(manifest.revenue_cents, 32_000);
    assert!(manifest
        .tickets
        .iter()
        .any(|t| t.username == "manifest_alice" && t.status == TicketStatus::Booked));
    assert!(manifest
        .tickets
        .iter()
        .any(|t| t.username == "manifest_bob" && t.status == TicketStatus::Refunded));

    Ok(())
}

#[test_context(FlightServiceContext)]
#[tokio::test]
async fn test_get_unknown_flight(ctx: &FlightServiceContext) -> Result<(), AppError> {
    let lookup = ctx.flight_service.get_flight(424_242).await;
    assert!(matches!(lookup, Err(AppError::NotFound(_))));
    Ok(())
}
