//! Cart lines and their priced breakdown

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::Address;

/// One product line in a customer's cart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartEntry {
    pub product_id: String,
    pub quantity: u32,
    #[serde(default)] pub chosen_delivery_type: Option<String>,
}

/// Priced view of a cart line, derived fresh for every request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItemBreakdown {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub price: Decimal,
    pub chosen_delivery_type: Option<String>,
    pub royalty_fee: Decimal,
    pub singpost_fee: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    pub currency: String,
}

/// A cart priced for a destination.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartBreakdown {
    pub destination: Address,
    pub items: Vec<CartItemBreakdown>,
    pub grand_total: Decimal,
    pub currency: String,
}
