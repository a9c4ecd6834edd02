use uuid::Uuid;

// Provider seam. Settlement logic never talks to a provider directly; it
// only consumes the correlation ids minted here, so a real gateway can
// replace the mock without touching the orchestrator.
pub trait PaymentGateway: Send + Sync {
    fn provider_name(&self) -> &'static str;

    // External-facing correlation id for a new intent.
    fn new_intent_id(&self) -> String;
}

pub struct MockGateway;

impl PaymentGateway for MockGateway {
    fn provider_name(&self) -> &'static str {
        "mock"
    }

    fn new_intent_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
