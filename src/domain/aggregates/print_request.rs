//! Print Request Aggregate
//!
//! A customer's custom 3D-print job. The recorded status may never lag behind
//! the data actually present on the record: an uploaded model implies at least
//! `pending_config`, a saved configuration at least `configured`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::value_objects::Identity;

pub const NOTE_CREATED: &str = "Print request created";
pub const NOTE_MODEL_UPLOADED: &str = "Model uploaded, awaiting configuration";
pub const NOTE_CONFIGURED: &str = "Print configuration saved";
pub const NOTE_AUTO_RECONCILED: &str = "Auto-reconciled status based on uploaded model/configuration";

/// Lifecycle states. Declaration order of the first ten variants is the rank;
/// `Cancelled` is terminal and sits outside the rank sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintStatus {
    PendingUpload,
    PendingConfig,
    Configured,
    Quoted,
    PaymentPending,
    Paid,
    Printing,
    Printed,
    Shipped,
    Delivered,
    Cancelled,
}

impl PrintStatus {
    pub const LIFECYCLE: [PrintStatus; 10] = [
        Self::PendingUpload, Self::PendingConfig, Self::Configured, Self::Quoted, Self::PaymentPending,
        Self::Paid, Self::Printing, Self::Printed, Self::Shipped, Self::Delivered,
    ];

    /// Position in the lifecycle; `None` for `Cancelled`.
    pub fn rank(self) -> Option<usize> { Self::LIFECYCLE.iter().position(|s| *s == self) }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingUpload => "pending_upload",
            Self::PendingConfig => "pending_config",
            Self::Configured => "configured",
            Self::Quoted => "quoted",
            Self::PaymentPending => "payment_pending",
            Self::Paid => "paid",
            Self::Printing => "printing",
            Self::Printed => "printed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    fn default_note(self) -> Option<&'static str> {
        match self {
            Self::PendingConfig => Some(NOTE_MODEL_UPLOADED),
            Self::Configured => Some(NOTE_CONFIGURED),
            _ => None,
        }
    }
}

impl fmt::Display for PrintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub struct UnknownStatus(pub String);
impl std::error::Error for UnknownStatus {}
impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Unknown status: {}", self.0) }
}

impl FromStr for PrintStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::LIFECYCLE.iter().copied().chain([Self::Cancelled])
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry { pub status: PrintStatus, pub timestamp: DateTime<Utc>, pub note: String }

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    #[serde(default)] pub original_name: Option<String>,
    #[serde(default)] pub storage_key: Option<String>,
    #[serde(default)] pub storage_url: Option<String>,
    #[serde(default)] pub file_size: Option<u64>,
    #[serde(default)] pub uploaded_at: Option<DateTime<Utc>>,
}

impl ModelFile {
    pub fn is_uploaded(&self) -> bool { present(&self.storage_key) && present(&self.original_name) }
}

fn present(value: &Option<String>) -> bool { value.as_deref().is_some_and(|v| !v.trim().is_empty()) }

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PrintConfiguration {
    #[serde(default)] pub is_configured: bool,
    #[serde(default)] pub print_settings: serde_json::Value,
    #[serde(default)] pub mesh_colors: serde_json::Value,
    #[serde(default)] pub configured_at: Option<DateTime<Utc>>,
}

/// Package size in millimetres and weight in kilograms, as quoted by an admin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageDimensions { pub length: f64, pub width: f64, pub height: f64, pub weight: f64 }

impl PackageDimensions {
    pub fn mm(&self) -> [f64; 3] { [self.length, self.width, self.height] }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryOption {
    #[serde(rename = "type")] pub kind: String,
    #[serde(default)] pub price: Decimal,
    #[serde(default)] pub custom_price: Option<Decimal>,
    #[serde(default)] pub custom_description: Option<String>,
    #[serde(default)] pub pickup_location: Option<String>,
    #[serde(default)] pub delivery_type_config_id: Option<String>,
}

impl DeliveryOption {
    pub fn effective_price(&self) -> Decimal { self.custom_price.unwrap_or(self.price) }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Delivery { #[serde(default)] pub delivery_types: Vec<DeliveryOption> }

/// Independently optional pricing fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingPatch {
    pub base_price: Option<Decimal>,
    pub print_fee: Option<Decimal>,
    pub delivery_fee: Option<Decimal>,
    pub total_amount: Option<Decimal>,
    pub currency: Option<String>,
}

/// Outcome of running the reconciliation rule once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settlement { pub from: PrintStatus, pub to: PrintStatus, pub auto_corrected: bool, pub recorded: bool }

impl Settlement {
    pub fn changed(&self) -> bool { self.from != self.to }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrintRequest {
    request_id: Uuid,
    user_id: String,
    user_email: String,
    user_name: String,
    status: PrintStatus,
    status_history: Vec<StatusEntry>,
    model_file: Option<ModelFile>,
    print_configuration: Option<PrintConfiguration>,
    dimensions: Option<PackageDimensions>,
    delivery: Delivery,
    base_price: Decimal,
    print_fee: Decimal,
    delivery_fee: Decimal,
    total_amount: Decimal,
    currency: String,
    admin_note: Option<String>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PrintRequest {
    pub fn create(request_id: Uuid, user_id: impl Into<String>, identity: Identity, base_price: Decimal, currency: &str) -> Self {
        let now = Utc::now();
        Self {
            request_id, user_id: user_id.into(), user_email: identity.email, user_name: identity.display_name,
            status: PrintStatus::PendingUpload,
            status_history: vec![StatusEntry { status: PrintStatus::PendingUpload, timestamp: now, note: NOTE_CREATED.to_string() }],
            model_file: None, print_configuration: None, dimensions: None, delivery: Delivery::default(),
            base_price, print_fee: Decimal::ZERO, delivery_fee: Decimal::ZERO, total_amount: base_price,
            currency: currency.to_string(), admin_note: None, version: 0, created_at: now, updated_at: now,
        }
    }

    pub fn request_id(&self) -> Uuid { self.request_id }
    pub fn user_id(&self) -> &str { &self.user_id }
    pub fn user_email(&self) -> &str { &self.user_email }
    pub fn user_name(&self) -> &str { &self.user_name }
    pub fn status(&self) -> PrintStatus { self.status }
    pub fn status_history(&self) -> &[StatusEntry] { &self.status_history }
    pub fn model_file(&self) -> Option<&ModelFile> { self.model_file.as_ref() }
    pub fn print_configuration(&self) -> Option<&PrintConfiguration> { self.print_configuration.as_ref() }
    pub fn dimensions(&self) -> Option<&PackageDimensions> { self.dimensions.as_ref() }
    pub fn delivery(&self) -> &Delivery { &self.delivery }
    pub fn base_price(&self) -> Decimal { self.base_price }
    pub fn print_fee(&self) -> Decimal { self.print_fee }
    pub fn delivery_fee(&self) -> Decimal { self.delivery_fee }
    pub fn total_amount(&self) -> Decimal { self.total_amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn admin_note(&self) -> Option<&str> { self.admin_note.as_deref() }
    pub fn version(&self) -> u64 { self.version }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn has_model(&self) -> bool { self.model_file.as_ref().is_some_and(ModelFile::is_uploaded) }
    pub fn is_configured(&self) -> bool { self.print_configuration.as_ref().is_some_and(|c| c.is_configured) }
    /// Neither a model nor a completed configuration: a speculative request.
    pub fn is_empty(&self) -> bool { !self.has_model() && !self.is_configured() }

    /// Lowest status the present data allows.
    pub fn minimum_status(&self) -> PrintStatus {
        if self.is_configured() { PrintStatus::Configured }
        else if self.has_model() { PrintStatus::PendingConfig }
        else { PrintStatus::PendingUpload }
    }

    pub fn attach_model(&mut self, mut model: ModelFile) {
        if model.uploaded_at.is_none() { model.uploaded_at = Some(Utc::now()); }
        self.model_file = Some(model);
        self.touch();
    }

    pub fn save_configuration(&mut self, mut config: PrintConfiguration) {
        if config.is_configured && config.configured_at.is_none() { config.configured_at = Some(Utc::now()); }
        self.print_configuration = Some(config);
        self.touch();
    }

    pub fn apply_pricing(&mut self, patch: PricingPatch) {
        if let Some(v) = patch.base_price { self.base_price = v; }
        if let Some(v) = patch.print_fee { self.print_fee = v; }
        if let Some(v) = patch.delivery_fee { self.delivery_fee = v; }
        if let Some(v) = patch.total_amount { self.total_amount = v; }
        if let Some(c) = patch.currency { self.currency = c; }
        self.touch();
    }

    /// Records an admin quote. Status is left to [`PrintRequest::settle`].
    pub fn record_quote(&mut self, print_fee: Decimal, dimensions: PackageDimensions, delivery: Delivery, delivery_fee: Decimal, note: Option<String>) {
        self.print_fee = print_fee;
        self.dimensions = Some(dimensions);
        self.delivery = delivery;
        self.delivery_fee = delivery_fee;
        self.total_amount = self.base_price + print_fee + delivery_fee;
        self.admin_note = note;
        self.touch();
    }

    /// Applies the reconciliation rule.
    ///
    /// `before` is the status observed before the current mutation began and
    /// `requested` an explicit status from the caller, if any. Data presence can
    /// only raise the status; only `requested` may lower it, and even then the
    /// floor derived from the data still applies. `Cancelled` has no floor.
    pub fn settle(&mut self, before: PrintStatus, requested: Option<PrintStatus>, note: Option<String>) -> Settlement {
        if let Some(status) = requested { self.status = status; }

        let mut auto_corrected = false;
        let minimum = self.minimum_status();
        if let (Some(current), Some(floor)) = (self.status.rank(), minimum.rank()) {
            if current < floor {
                self.status = minimum;
                auto_corrected = true;
            }
        }

        let recorded = self.status != before || requested.is_some();
        if recorded {
            let note = self.status.default_note().map(str::to_string)
                .or_else(|| note.filter(|n| !n.trim().is_empty()))
                .or_else(|| auto_corrected.then(|| NOTE_AUTO_RECONCILED.to_string()))
                .unwrap_or_else(|| format!("Status changed to {}", self.status));
            self.status_history.push(StatusEntry { status: self.status, timestamp: Utc::now(), note });
            self.touch();
        }
        Settlement { from: before, to: self.status, auto_corrected, recorded }
    }

    /// Administrative override into the terminal `Cancelled` state.
    pub fn cancel(&mut self, note: Option<String>) -> Settlement {
        let before = self.status;
        let note = note.filter(|n| !n.trim().is_empty()).unwrap_or_else(|| "Cancelled by admin".to_string());
        self.settle(before, Some(PrintStatus::Cancelled), Some(note))
    }

    pub(crate) fn set_version(&mut self, version: u64) { self.version = version; }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PrintRequest {
        PrintRequest::create(Uuid::new_v4(), "user-1", Identity::placeholder(), Decimal::new(5, 0), "SGD")
    }

    fn model() -> ModelFile {
        ModelFile { original_name: Some("benchy.stl".into()), storage_key: Some("models/benchy.stl".into()), ..Default::default() }
    }

    fn configured() -> PrintConfiguration { PrintConfiguration { is_configured: true, ..Default::default() } }

    #[test]
    fn test_rank_order() {
        let ranks: Vec<usize> = PrintStatus::LIFECYCLE.iter().filter_map(|s| s.rank()).collect();
        assert_eq!(ranks, (0..10).collect::<Vec<_>>());
        assert_eq!(PrintStatus::Cancelled.rank(), None);
        assert_eq!("payment_pending".parse::<PrintStatus>().unwrap(), PrintStatus::PaymentPending);
        assert!("bogus".parse::<PrintStatus>().is_err());
    }

    #[test]
    fn test_minimum_status() {
        let mut r = request();
        assert_eq!(r.minimum_status(), PrintStatus::PendingUpload);
        r.attach_model(ModelFile { original_name: Some("a.stl".into()), storage_key: None, ..Default::default() });
        assert_eq!(r.minimum_status(), PrintStatus::PendingUpload);
        r.attach_model(model());
        assert_eq!(r.minimum_status(), PrintStatus::PendingConfig);
        r.save_configuration(configured());
        assert_eq!(r.minimum_status(), PrintStatus::Configured);
    }

    #[test]
    fn test_upload_then_configure() {
        let mut r = request();
        assert_eq!(r.status(), PrintStatus::PendingUpload);

        let before = r.status();
        r.attach_model(model());
        let s = r.settle(before, None, None);
        assert!(s.auto_corrected && s.recorded);
        assert_eq!(r.status(), PrintStatus::PendingConfig);
        assert_eq!(r.status_history().len(), 2);
        assert_eq!(r.status_history()[1].note, NOTE_MODEL_UPLOADED);

        let before = r.status();
        r.save_configuration(configured());
        r.settle(before, None, None);
        assert_eq!(r.status(), PrintStatus::Configured);
        assert_eq!(r.status_history().len(), 3);
        assert_eq!(r.status_history().last().unwrap().note, NOTE_CONFIGURED);
    }

    #[test]
    fn test_settle_is_idempotent_without_explicit_status() {
        let mut r = request();
        r.attach_model(model());
        r.settle(PrintStatus::PendingUpload, None, None);
        let history = r.status_history().len();
        r.attach_model(model());
        let s = r.settle(r.status(), None, None);
        assert!(!s.recorded);
        assert_eq!(r.status_history().len(), history);
    }

    #[test]
    fn test_explicit_status_is_floored_by_data() {
        let mut r = request();
        r.save_configuration(configured());
        r.settle(PrintStatus::PendingUpload, Some(PrintStatus::Paid), None);
        assert_eq!(r.status(), PrintStatus::Paid);

        // An explicit lower status is honoured down to the data floor.
        let s = r.settle(r.status(), Some(PrintStatus::PendingUpload), None);
        assert_eq!(r.status(), PrintStatus::Configured);
        assert!(s.auto_corrected);
    }

    #[test]
    fn test_status_default_note_wins_over_caller_note() {
        let mut r = request();
        r.attach_model(model());
        r.settle(PrintStatus::PendingUpload, None, Some("client note".into()));
        assert_eq!(r.status_history().last().unwrap().note, NOTE_MODEL_UPLOADED);

        r.settle(r.status(), Some(PrintStatus::Quoted), Some("client note".into()));
        assert_eq!(r.status_history().last().unwrap().note, "client note");
    }

    #[test]
    fn test_data_never_lowers_status() {
        let mut r = request();
        r.settle(r.status(), Some(PrintStatus::Quoted), Some("quoted".into()));
        r.attach_model(model());
        r.settle(PrintStatus::Quoted, None, None);
        assert_eq!(r.status(), PrintStatus::Quoted);
    }

    #[test]
    fn test_cancel_is_not_resurrected_by_data() {
        let mut r = request();
        r.cancel(None);
        assert_eq!(r.status(), PrintStatus::Cancelled);
        r.save_configuration(configured());
        let s = r.settle(r.status(), None, None);
        assert_eq!(r.status(), PrintStatus::Cancelled);
        assert!(!s.recorded);
    }

    #[test]
    fn test_explicit_status_without_note_records_generic_note() {
        let mut r = request();
        r.settle(r.status(), Some(PrintStatus::PendingUpload), None);
        assert_eq!(r.status_history().last().unwrap().note, "Status changed to pending_upload");
    }

    #[test]
    fn test_record_quote_totals() {
        let mut r = request();
        r.record_quote(Decimal::new(20, 0), PackageDimensions::default(), Delivery::default(), Decimal::new(350, 2), Some("ok".into()));
        assert_eq!(r.total_amount(), Decimal::new(2850, 2));
        assert_eq!(r.admin_note(), Some("ok"));
    }
}
