//! OpenSASE Print Shop
//!
//! Custom 3D-print request lifecycle and delivery pricing for the OpenSASE
//! storefront.
//!
//! ## Features
//! - Print request status reconciliation (status never lags the uploaded data)
//! - SingPost delivery rate engine
//! - Cart line-item breakdown shared by the cart view and checkout
//! - Admin quoting, cancellation and fulfilment progression

pub mod adapters;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod http;
pub mod ports;
pub mod pricing;
pub mod reconciler;
pub mod shipping;
pub mod store;

use thiserror::Error;

pub use checkout::CheckoutService;
pub use reconciler::PrintRequestReconciler;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum PrintShopError {
    #[error("request not found")]
    NotFound,

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Payment error: {0}")]
    Payment(String),
}

impl From<ports::StoreError> for PrintShopError {
    fn from(e: ports::StoreError) -> Self {
        match e {
            ports::StoreError::NotFound(_) => Self::NotFound,
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<ports::PaymentError> for PrintShopError {
    fn from(e: ports::PaymentError) -> Self { Self::Payment(e.0) }
}

pub type Result<T> = std::result::Result<T, PrintShopError>;
