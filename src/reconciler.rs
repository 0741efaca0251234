//! Print request lifecycle service.
//!
//! Every mutation runs the reconciliation rule from
//! [`PrintRequest::settle`] and is persisted with a single compare-and-set
//! write, under a per-request lock. Side channels (object storage, identity,
//! events, the duplicate sweep) are best-effort: their failures are logged and
//! never fail the primary operation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::adapters::{AnonymousIdentityProvider, LogEventPublisher, UnconfiguredObjectStorage};
use crate::config::DEFAULT_CURRENCY;
use crate::domain::aggregates::{
    Delivery, DeliveryOption, ModelFile, PackageDimensions, PricingPatch, PrintConfiguration, PrintRequest,
    PrintStatus, Settlement,
};
use crate::domain::events::PrintRequestEvent;
use crate::domain::value_objects::{Identity, Money};
use crate::ports::{Catalog, EventPublisher, IdentityProvider, ObjectStorage, PrintRequestStore, SweepFilter};
use crate::pricing::is_singpost;
use crate::shipping;
use crate::{PrintShopError, Result};

/// Client-side changes to a print request. Every field is optional.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct PrintRequestPatch {
    #[serde(default)] pub model_file: Option<ModelFile>,
    #[serde(default)] pub print_configuration: Option<PrintConfiguration>,
    #[serde(default)] pub status: Option<PrintStatus>,
    #[serde(default)] pub note: Option<String>,
    #[serde(default)] pub pricing: Option<PricingPatch>,
}

/// Admin quote for a print request.
#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
pub struct QuoteRequest {
    #[validate(custom = "non_negative")]
    pub amount: Decimal,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub note: Option<String>,
    #[validate(custom = "positive_package")]
    pub dimensions: PackageDimensions,
    #[validate(length(min = 1, message = "at least one delivery option is required"))]
    pub delivery_types: Vec<DeliveryOption>,
    #[serde(default)]
    pub destination_country: Option<String>,
}

fn non_negative(amount: &Decimal) -> std::result::Result<(), ValidationError> {
    if amount.is_sign_negative() { return Err(ValidationError::new("amount must not be negative")); }
    Ok(())
}

fn positive_package(dims: &PackageDimensions) -> std::result::Result<(), ValidationError> {
    if dims.mm().iter().chain([&dims.weight]).any(|v| !(*v > 0.0)) {
        return Err(ValidationError::new("length, width, height and weight must be positive"));
    }
    Ok(())
}

pub fn parse_request_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| PrintShopError::InvalidIdentifier(raw.to_string()))
}

pub struct PrintRequestReconciler {
    store: Arc<dyn PrintRequestStore>,
    catalog: Arc<dyn Catalog>,
    storage: Arc<dyn ObjectStorage>,
    identity: Arc<dyn IdentityProvider>,
    events: Arc<dyn EventPublisher>,
    currency: String,
    locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl PrintRequestReconciler {
    pub fn new(store: Arc<dyn PrintRequestStore>, catalog: Arc<dyn Catalog>) -> Self {
        Self {
            store, catalog,
            storage: Arc::new(UnconfiguredObjectStorage),
            identity: Arc::new(AnonymousIdentityProvider),
            events: Arc::new(LogEventPublisher),
            currency: DEFAULT_CURRENCY.to_string(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn ObjectStorage>) -> Self { self.storage = storage; self }
    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self { self.identity = identity; self }
    pub fn with_events(mut self, events: Arc<dyn EventPublisher>) -> Self { self.events = events; self }
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self { self.currency = currency.into(); self }

    pub fn currency(&self) -> &str { &self.currency }

    /// Creates a request with a fresh id.
    pub async fn create(&self, user_id: &str, identity: Option<Identity>) -> Result<PrintRequest> {
        let request_id = Uuid::now_v7();
        let _guard = self.lock(request_id).await;
        let mut record = self.new_record(request_id, user_id, identity).await;
        self.persist(&mut record).await?;
        info!(%request_id, user_id, "print request created");
        self.publish(PrintRequestEvent::Created { request_id, user_id: user_id.to_string() }).await;
        Ok(record)
    }

    /// Returns the caller's request, creating it under the supplied id when it
    /// does not exist yet. An existing record is reconciled before returning.
    pub async fn get_or_lazy_create(&self, request_id: &str, user_id: &str) -> Result<PrintRequest> {
        let request_id = parse_request_id(request_id)?;
        let _guard = self.lock(request_id).await;

        match self.store.find_one(request_id, user_id).await? {
            Some(mut record) => {
                let settlement = record.settle(record.status(), None, None);
                if settlement.recorded {
                    self.persist(&mut record).await?;
                    self.announce(&record, settlement).await;
                }
                Ok(record)
            }
            None => {
                let mut record = self.lazy_record(request_id, user_id).await?;
                self.persist(&mut record).await?;
                info!(%request_id, user_id, "print request lazily created");
                self.publish(PrintRequestEvent::Created { request_id, user_id: user_id.to_string() }).await;
                Ok(record)
            }
        }
    }

    /// Merges client changes, reconciles, persists and then sweeps the
    /// user's other empty requests.
    pub async fn apply_update(&self, request_id: &str, user_id: &str, patch: PrintRequestPatch) -> Result<PrintRequest> {
        if patch.status == Some(PrintStatus::Cancelled) {
            return Err(PrintShopError::Validation("cancellation is an admin action".to_string()));
        }
        let request_id = parse_request_id(request_id)?;
        let record = {
            let _guard = self.lock(request_id).await;
            let (mut record, created) = match self.store.find_one(request_id, user_id).await? {
                Some(record) => (record, false),
                None => (self.lazy_record(request_id, user_id).await?, true),
            };
            if record.status() == PrintStatus::Cancelled && patch.status.is_some() {
                return Err(PrintShopError::Validation("request is cancelled".to_string()));
            }

            let before = record.status();
            if let Some(model) = patch.model_file { record.attach_model(model); }
            if let Some(config) = patch.print_configuration { record.save_configuration(config); }
            if let Some(pricing) = patch.pricing { record.apply_pricing(pricing); }
            let settlement = record.settle(before, patch.status, patch.note);

            self.persist(&mut record).await?;
            if created {
                self.publish(PrintRequestEvent::Created { request_id, user_id: user_id.to_string() }).await;
            }
            self.announce(&record, settlement).await;
            record
        };

        self.sweep(user_id, request_id).await;
        Ok(record)
    }

    /// Removes the caller's request and, best-effort, its stored model.
    pub async fn delete(&self, request_id: Uuid, user_id: &str) -> Result<()> {
        {
            let _guard = self.lock(request_id).await;
            let record = self.store.find_one(request_id, user_id).await?.ok_or(PrintShopError::NotFound)?;
            if !self.store.delete_one(request_id, user_id).await? {
                return Err(PrintShopError::NotFound);
            }
            info!(%request_id, user_id, "print request deleted");

            if let Some(key) = record.model_file().and_then(|m| m.storage_key.as_deref()).filter(|k| !k.is_empty()) {
                if let Err(e) = self.storage.delete_object(key).await {
                    warn!(%request_id, key, error = %e, "failed to delete stored model");
                }
            }
            self.publish(PrintRequestEvent::Deleted { request_id, user_id: user_id.to_string() }).await;
        }
        self.forget_lock(request_id);
        Ok(())
    }

    /// Admin: attach a quote and move the request to at least `quoted`.
    pub async fn quote(&self, request_id: Uuid, quote: QuoteRequest) -> Result<PrintRequest> {
        quote.validate().map_err(|e| PrintShopError::Validation(e.to_string()))?;
        let _guard = self.lock(request_id).await;
        let mut record = self.store.find_by_id(request_id).await?.ok_or(PrintShopError::NotFound)?;
        if record.status() == PrintStatus::Cancelled {
            return Err(PrintShopError::Validation("cancelled request cannot be quoted".to_string()));
        }

        let zone = shipping::zone_of(quote.destination_country.as_deref());
        let options: Vec<DeliveryOption> = quote
            .delivery_types
            .into_iter()
            .map(|mut option| {
                if option.custom_price.is_none() && is_singpost(&option.kind) {
                    option.price = shipping::rate(zone, quote.dimensions.weight, quote.dimensions.mm(), true).or_zero();
                }
                option
            })
            .collect();
        let delivery_fee = options.first().map_or(Decimal::ZERO, DeliveryOption::effective_price);

        let before = record.status();
        let target = match (before.rank(), PrintStatus::Quoted.rank()) {
            (Some(current), Some(quoted)) if current >= quoted => before,
            _ => PrintStatus::Quoted,
        };
        let history_note = quote.note.clone().unwrap_or_else(|| format!("Quote issued: {}", Money::new(quote.amount, record.currency())));
        record.record_quote(quote.amount, quote.dimensions, Delivery { delivery_types: options }, delivery_fee, quote.note);
        let settlement = record.settle(before, Some(target), Some(history_note));

        self.persist(&mut record).await?;
        info!(%request_id, print_fee = %record.print_fee(), delivery_fee = %record.delivery_fee(), "print request quoted");
        self.publish(PrintRequestEvent::Quoted {
            request_id,
            print_fee: record.print_fee(),
            delivery_fee: record.delivery_fee(),
            total_amount: record.total_amount(),
        }).await;
        self.announce(&record, settlement).await;
        Ok(record)
    }

    /// Admin: terminal cancellation, bypassing rank comparisons.
    pub async fn cancel(&self, request_id: Uuid, note: Option<String>) -> Result<PrintRequest> {
        let _guard = self.lock(request_id).await;
        let mut record = self.store.find_by_id(request_id).await?.ok_or(PrintShopError::NotFound)?;
        if record.status() == PrintStatus::Cancelled {
            return Ok(record);
        }
        let settlement = record.cancel(note);
        self.persist(&mut record).await?;
        info!(%request_id, from = %settlement.from, "print request cancelled");
        self.publish(PrintRequestEvent::Cancelled { request_id }).await;
        Ok(record)
    }

    /// Admin: explicit status for fulfilment (paid, printing, shipped, ...).
    pub async fn admin_set_status(&self, request_id: Uuid, status: PrintStatus, note: Option<String>) -> Result<PrintRequest> {
        if status == PrintStatus::Cancelled {
            return Err(PrintShopError::Validation("use cancel to cancel a request".to_string()));
        }
        let _guard = self.lock(request_id).await;
        let mut record = self.store.find_by_id(request_id).await?.ok_or(PrintShopError::NotFound)?;
        if record.status() == PrintStatus::Cancelled {
            return Err(PrintShopError::Validation("request is cancelled".to_string()));
        }
        let settlement = record.settle(record.status(), Some(status), note);
        self.persist(&mut record).await?;
        self.announce(&record, settlement).await;
        Ok(record)
    }

    async fn new_record(&self, request_id: Uuid, user_id: &str, identity: Option<Identity>) -> PrintRequest {
        let base_price = self.catalog.custom_print_base_price().await.unwrap_or(Decimal::ZERO);
        let identity = match identity {
            Some(identity) => identity,
            None => match self.identity.resolve_user(user_id).await {
                Ok(identity) => identity,
                Err(e) => {
                    warn!(user_id, error = %e, "identity lookup failed; using placeholders");
                    Identity::placeholder()
                }
            },
        };
        PrintRequest::create(request_id, user_id, identity, base_price, &self.currency)
    }

    /// A fresh record for an id the caller supplied. Ids owned by another
    /// user are reported as missing rather than shadowed.
    async fn lazy_record(&self, request_id: Uuid, user_id: &str) -> Result<PrintRequest> {
        if self.store.find_by_id(request_id).await?.is_some() {
            return Err(PrintShopError::NotFound);
        }
        Ok(self.new_record(request_id, user_id, None).await)
    }

    async fn persist(&self, record: &mut PrintRequest) -> Result<()> {
        let version = self.store.save(record).await?;
        record.set_version(version);
        Ok(())
    }

    async fn sweep(&self, user_id: &str, keep: Uuid) {
        let filter = SweepFilter { user_id: user_id.to_string(), keep };
        match self.store.delete_many(&filter).await {
            Ok(0) => {}
            Ok(removed) => {
                info!(user_id, removed, "swept empty print requests");
                self.publish(PrintRequestEvent::Swept { user_id: user_id.to_string(), removed }).await;
            }
            Err(e) => warn!(user_id, error = %e, "duplicate sweep failed"),
        }
    }

    async fn announce(&self, record: &PrintRequest, settlement: Settlement) {
        if !settlement.changed() {
            return;
        }
        info!(
            request_id = %record.request_id(),
            from = %settlement.from,
            to = %settlement.to,
            auto_corrected = settlement.auto_corrected,
            "print request status changed"
        );
        self.publish(PrintRequestEvent::StatusChanged {
            request_id: record.request_id(),
            from: settlement.from,
            to: settlement.to,
            auto_corrected: settlement.auto_corrected,
        }).await;
    }

    async fn publish(&self, event: PrintRequestEvent) {
        if let Err(e) = self.events.publish(&event).await {
            warn!(kind = event.kind(), error = %e, "failed to publish print request event");
        }
    }

    async fn lock(&self, request_id: Uuid) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.retain(|id, m| *id == request_id || Arc::strong_count(m) > 1);
            locks.entry(request_id).or_default().clone()
        };
        mutex.lock_owned().await
    }

    fn forget_lock(&self, request_id: Uuid) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks.get(&request_id).is_some_and(|m| Arc::strong_count(m) == 1) {
            locks.remove(&request_id);
        }
    }
}
