//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{Dimensions, Money};

/// Catalog id of the product whose price seeds every custom print request.
pub const CUSTOM_PRINT_PRODUCT_ID: &str = "custom-print-request";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    id: String,
    name: String,
    price: Money,
    #[serde(default)] discount: Option<Discount>,
    #[serde(default)] weight_kg: f64,
    #[serde(default)] dimensions_cm: Dimensions,
    #[serde(default)] delivery_types: Vec<DeliveryTypeConfig>,
    #[serde(default)] status: ProductStatus,
}

/// A sale price, active when flagged and inside its optional window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub discounted_price: Decimal,
    #[serde(default)] pub active: bool,
    #[serde(default)] pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)] pub ends_at: Option<DateTime<Utc>>,
}

impl Discount {
    pub fn applies_at(&self, now: DateTime<Utc>) -> bool {
        self.active
            && self.starts_at.map_or(true, |s| s <= now)
            && self.ends_at.map_or(true, |e| now <= e)
    }
}

/// Delivery type offered for a product, with its configured royalty fee.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryTypeConfig {
    #[serde(rename = "type")] pub kind: String,
    #[serde(default)] pub royalty_fee: Option<Decimal>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus { Draft, #[default] Active, Archived }

impl Product {
    pub fn create(id: impl Into<String>, name: impl Into<String>, price: Money) -> Self {
        Self {
            id: id.into(), name: name.into(), price, discount: None, weight_kg: 0.0,
            dimensions_cm: Dimensions::default(), delivery_types: vec![], status: ProductStatus::Active,
        }
    }

    pub fn with_discount(mut self, discount: Discount) -> Self { self.discount = Some(discount); self }
    pub fn with_package(mut self, weight_kg: f64, dimensions_cm: Dimensions) -> Self {
        self.weight_kg = weight_kg;
        self.dimensions_cm = dimensions_cm;
        self
    }
    pub fn with_delivery_type(mut self, kind: impl Into<String>, royalty_fee: Option<Decimal>) -> Self {
        self.delivery_types.push(DeliveryTypeConfig { kind: kind.into(), royalty_fee });
        self
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn price(&self) -> &Money { &self.price }
    pub fn weight_kg(&self) -> f64 { self.weight_kg }
    pub fn dimensions_cm(&self) -> &Dimensions { &self.dimensions_cm }
    pub fn status(&self) -> &ProductStatus { &self.status }
    pub fn is_available(&self) -> bool { self.status == ProductStatus::Active }

    /// Discounted price when a discount applies at `now`, else the list price.
    pub fn unit_price_at(&self, now: DateTime<Utc>) -> Money {
        match &self.discount {
            Some(d) if d.applies_at(now) => Money::new(d.discounted_price, self.price.currency()),
            _ => self.price.clone(),
        }
    }

    pub fn delivery_type(&self, kind: &str) -> Option<&DeliveryTypeConfig> {
        self.delivery_types.iter().find(|d| d.kind.eq_ignore_ascii_case(kind.trim()))
    }
}
