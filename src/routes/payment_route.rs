use crate::models::payment::{
    ExpirySweepResponse, MockCaptureRequest, Payment, PaymentIntentRequest, PaymentListResponse,
    SettlementResult, WebhookRequest,
};
use crate::services::payment_service::PaymentService;
use crate::utils::error::AppError;
use crate::utils::jwt::AuthenticatedUser;
use chrono::Utc;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;

/// Create a payment intent and hold one seat for it
#[openapi(tag = "Payments")]
#[post("/payments/create-intent", format = "json", data = "<request>")]
pub async fn create_intent(
    request: Json<PaymentIntentRequest>,
    auth: AuthenticatedUser,
    payment_service: &State<PaymentService>,
) -> Result<Json<Payment>, AppError> {
    let payment = payment_service
        .create_intent(auth.user_id, request.into_inner())
        .await?;
    Ok(Json(payment))
}

/// Provider webhook: settle an intent as succeeded or failed.
/// Unauthenticated; the provider intent id is the shared secret.
#[openapi(tag = "Payments")]
#[post("/payments/webhook", format = "json", data = "<request>")]
pub async fn webhook(
    request: Json<WebhookRequest>,
    payment_service: &State<PaymentService>,
) -> Result<Json<SettlementResult>, AppError> {
    let request = request.into_inner();
    let result = payment_service
        .settle(&request.provider_intent_id, request.outcome)
        .await?;
    Ok(Json(result))
}

/// Mock capture: settle one of your intents without an external provider
#[openapi(tag = "Payments")]
#[post("/payments/<payment_id>/mock-capture", format = "json", data = "<request>")]
pub async fn mock_capture(
    payment_id: i64,
    request: Json<MockCaptureRequest>,
    auth: AuthenticatedUser,
    payment_service: &State<PaymentService>,
) -> Result<Json<SettlementResult>, AppError> {
    let result = payment_service
        .mock_capture(
            auth.user_id,
            auth.role,
            payment_id,
            request.into_inner().outcome,
        )
        .await?;
    Ok(Json(result))
}

/// Expire overdue pending intents and release their held seats
#[openapi(tag = "Payments")]
#[post("/payments/expire-due")]
pub async fn expire_due(
    auth: AuthenticatedUser,
    payment_service: &State<PaymentService>,
) -> Result<Json<ExpirySweepResponse>, AppError> {
    if !auth.role.can_run_expiry_sweep() {
        return Err(AppError::AuthError(
            "Only managers or admins can run the expiry sweep".into(),
        ));
    }
    let expired = payment_service.expire_due_intents(Utc::now()).await?;
    Ok(Json(ExpirySweepResponse { expired }))
}

/// Get one payment (own, or any for admin)
#[openapi(tag = "Payments")]
#[get("/payments/<payment_id>")]
pub async fn get_payment(
    payment_id: i64,
    auth: AuthenticatedUser,
    payment_service: &State<PaymentService>,
) -> Result<Json<Payment>, AppError> {
    let payment = payment_service
        .get_payment(auth.user_id, auth.role, payment_id)
        .await?;
    Ok(Json(payment))
}

/// List payments (own, or all for admin)
#[openapi(tag = "Payments")]
#[get("/payments")]
pub async fn list_payments(
    auth: AuthenticatedUser,
    payment_service: &State<PaymentService>,
) -> Result<Json<PaymentListResponse>, AppError> {
    let payments = payment_service
        .list_payments(auth.user_id, auth.role)
        .await?;
    Ok(Json(payments))
}
