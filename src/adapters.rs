//! Side-channel collaborators wired in by `main`.
//!
//! Object storage, identity and payment processing belong to external
//! services; until one is configured the placeholders here fail softly so the
//! core keeps working.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::events::PrintRequestEvent;
use crate::domain::value_objects::Identity;
use crate::ports::{
    CheckoutSession, EventPublisher, IdentityProvider, ObjectStorage, PaymentError, PaymentGateway, SessionRequest,
    SideChannelError,
};

/// Publishes print request events as JSON on `<prefix>.print_requests.<kind>`.
pub struct NatsEventPublisher {
    client: async_nats::Client,
    prefix: String,
}

impl NatsEventPublisher {
    pub fn new(client: async_nats::Client, prefix: impl Into<String>) -> Self {
        Self { client, prefix: prefix.into() }
    }

    pub fn subject(&self, event: &PrintRequestEvent) -> String {
        format!("{}.print_requests.{}", self.prefix, event.kind())
    }
}

#[async_trait]
impl EventPublisher for NatsEventPublisher {
    async fn publish(&self, event: &PrintRequestEvent) -> Result<(), SideChannelError> {
        let payload = serde_json::to_vec(event).map_err(|e| SideChannelError(e.to_string()))?;
        self.client
            .publish(self.subject(event), payload.into())
            .await
            .map_err(|e| SideChannelError(e.to_string()))
    }
}

/// Event sink used when NATS is not configured.
#[derive(Default)]
pub struct LogEventPublisher;

#[async_trait]
impl EventPublisher for LogEventPublisher {
    async fn publish(&self, event: &PrintRequestEvent) -> Result<(), SideChannelError> {
        debug!(kind = event.kind(), ?event, "print request event");
        Ok(())
    }
}

#[derive(Default)]
pub struct UnconfiguredObjectStorage;

#[async_trait]
impl ObjectStorage for UnconfiguredObjectStorage {
    async fn delete_object(&self, key: &str) -> Result<(), SideChannelError> {
        warn!(key, "object storage not configured; object left in place");
        Err(SideChannelError("object storage not configured".to_string()))
    }
}

/// Identity provider that knows nobody; creation falls back to placeholders.
#[derive(Default)]
pub struct AnonymousIdentityProvider;

#[async_trait]
impl IdentityProvider for AnonymousIdentityProvider {
    async fn resolve_user(&self, user_id: &str) -> Result<Identity, SideChannelError> {
        Err(SideChannelError(format!("no identity provider configured for {user_id}")))
    }
}

#[derive(Default)]
pub struct UnconfiguredPaymentGateway;

#[async_trait]
impl PaymentGateway for UnconfiguredPaymentGateway {
    async fn create_session(&self, request: SessionRequest) -> Result<CheckoutSession, PaymentError> {
        warn!(amount_total = request.amount_total(), currency = %request.currency, "payment processor not configured");
        Err(PaymentError("payment processor not configured".to_string()))
    }
}
