use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use validator::Validate;

// A payment holds exactly one seat while pending. Leaving pending either
// issues a ticket (paid) or gives the seat back (failed/canceled/expired).
#[derive(Debug, Clone, Serialize, JsonSchema, sqlx::FromRow)]
pub struct Payment {
    pub id: i64,
    pub user_id: i64,
    pub flight_id: i64,
    pub ticket_id: Option<i64>,
    pub amount_cents: i64,
    pub currency: String,
    pub provider: String,
    pub provider_intent_id: String,
    pub idempotency_key: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, EnumString,
    sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Canceled,
    Expired,
}

impl PaymentStatus {
    // Every status except pending is absorbing.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SettlementOutcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct PaymentIntentRequest {
    pub flight_id: i64,
    #[validate(length(min = 1, max = 64))]
    pub idempotency_key: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct WebhookRequest {
    pub provider_intent_id: String,
    pub outcome: SettlementOutcome,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MockCaptureRequest {
    pub outcome: Option<SettlementOutcome>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SettlementResult {
    pub status: PaymentStatus,
    pub detail: String,
    pub ticket_id: Option<i64>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct PaymentListResponse {
    pub payments: Vec<Payment>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ExpirySweepResponse {
    pub expired: u64,
}
