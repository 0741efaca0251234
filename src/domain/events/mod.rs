//! Domain events
use crate::domain::aggregates::PrintStatus;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrintRequestEvent {
    Created { request_id: Uuid, user_id: String },
    StatusChanged { request_id: Uuid, from: PrintStatus, to: PrintStatus, auto_corrected: bool },
    Quoted { request_id: Uuid, print_fee: Decimal, delivery_fee: Decimal, total_amount: Decimal },
    Cancelled { request_id: Uuid },
    Deleted { request_id: Uuid, user_id: String },
    Swept { user_id: String, removed: u64 },
}

impl PrintRequestEvent {
    /// Subject suffix used when publishing.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::StatusChanged { .. } => "status_changed",
            Self::Quoted { .. } => "quoted",
            Self::Cancelled { .. } => "cancelled",
            Self::Deleted { .. } => "deleted",
            Self::Swept { .. } => "swept",
        }
    }
}
