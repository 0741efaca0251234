//! Collaborator interfaces.
//!
//! The reconciler and checkout only talk to the outside world through these
//! traits:
//! - Print request persistence
//! - Catalog lookups
//! - Object storage (model files)
//! - Identity provider
//! - Event publishing
//! - Payment processor checkout sessions

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::{PrintRequest, Product};
use crate::domain::events::PrintRequestEvent;
use crate::domain::value_objects::Identity;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Print request not found: {0}")]
    NotFound(Uuid),

    #[error("Version conflict on {request_id}: expected {expected}, found {actual}")]
    VersionConflict { request_id: Uuid, expected: u64, actual: u64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Which requests the speculative-duplicate sweep removes: every request of
/// `user_id` other than `keep` that has neither a model nor a configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SweepFilter { pub user_id: String, pub keep: Uuid }

impl SweepFilter {
    pub fn matches(&self, record: &PrintRequest) -> bool {
        record.user_id() == self.user_id && record.request_id() != self.keep && record.is_empty()
    }
}

/// Persistence for print request documents.
///
/// `save` is compare-and-set on `record.version()`: a new record has version
/// 0 and must not exist yet. On success the stored version is returned.
#[async_trait]
pub trait PrintRequestStore: Send + Sync {
    async fn find_one(&self, request_id: Uuid, user_id: &str) -> StoreResult<Option<PrintRequest>>;

    /// Admin lookup regardless of owner.
    async fn find_by_id(&self, request_id: Uuid) -> StoreResult<Option<PrintRequest>>;

    async fn save(&self, record: &PrintRequest) -> StoreResult<u64>;

    /// Returns whether a record was removed.
    async fn delete_one(&self, request_id: Uuid, user_id: &str) -> StoreResult<bool>;

    /// Returns the number of records removed.
    async fn delete_many(&self, filter: &SweepFilter) -> StoreResult<u64>;
}

#[derive(Debug, thiserror::Error)]
#[error("Catalog error: {0}")]
pub struct CatalogError(pub String);

#[async_trait]
pub trait Catalog: Send + Sync {
    /// Current price of the custom print catalog entry.
    async fn custom_print_base_price(&self) -> std::result::Result<Decimal, CatalogError>;

    async fn product(&self, product_id: &str) -> std::result::Result<Option<Product>, CatalogError>;
}

#[derive(Debug, thiserror::Error)]
#[error("Side channel error: {0}")]
pub struct SideChannelError(pub String);

/// Binary asset storage. Deletes are best-effort.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn delete_object(&self, key: &str) -> std::result::Result<(), SideChannelError>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve_user(&self, user_id: &str) -> std::result::Result<Identity, SideChannelError>;
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &PrintRequestEvent) -> std::result::Result<(), SideChannelError>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionLine { pub name: String, pub unit_amount: i64, pub quantity: u32 }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRequest {
    pub currency: String,
    pub lines: Vec<SessionLine>,
    pub customer_email: Option<String>,
    pub metadata: serde_json::Value,
}

impl SessionRequest {
    pub fn amount_total(&self) -> i64 { self.lines.iter().map(|l| l.unit_amount * i64::from(l.quantity)).sum() }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession { pub id: String, pub url: String, pub amount_total: i64, pub currency: String }

#[derive(Debug, thiserror::Error)]
#[error("Payment processor error: {0}")]
pub struct PaymentError(pub String);

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_session(&self, request: SessionRequest) -> std::result::Result<CheckoutSession, PaymentError>;
}
