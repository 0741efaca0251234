//! Line-item pricing shared by the cart breakdown and checkout.
//!
//! Both paths must go through [`price_cart`] so a customer is charged exactly
//! what the breakdown showed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::aggregates::{CartBreakdown, CartEntry, CartItemBreakdown, Product};
use crate::domain::value_objects::Address;
use crate::ports::Catalog;
use crate::shipping::{self, SINGPOST};
use crate::{PrintShopError, Result};

pub fn is_singpost(delivery_type: &str) -> bool { delivery_type.trim().eq_ignore_ascii_case(SINGPOST) }

/// Prices one cart line for a destination.
pub fn compose_line_item(entry: &CartEntry, product: &Product, destination: &Address) -> CartItemBreakdown {
    compose_line_item_at(entry, product, destination, Utc::now())
}

/// [`compose_line_item`] with discounts evaluated at `now`.
pub fn compose_line_item_at(entry: &CartEntry, product: &Product, destination: &Address, now: DateTime<Utc>) -> CartItemBreakdown {
    let unit_price = product.unit_price_at(now).rounded();
    let chosen = entry.chosen_delivery_type.as_deref();

    let royalty_fee = chosen
        .and_then(|kind| product.delivery_type(kind))
        .and_then(|config| config.royalty_fee)
        .unwrap_or(Decimal::ZERO)
        .round_dp(2);

    let singpost_fee = match chosen {
        Some(kind) if is_singpost(kind) => {
            let zone = shipping::zone_of(destination.country.as_deref());
            let dims_mm = product.dimensions_cm().cm_to_mm().as_array();
            shipping::rate(zone, product.weight_kg(), dims_mm, true).or_zero()
        }
        _ => Decimal::ZERO,
    };

    let delivery_fee = royalty_fee + singpost_fee;
    let total = unit_price.multiply(entry.quantity).amount() + delivery_fee;

    CartItemBreakdown {
        product_id: product.id().to_string(),
        name: product.name().to_string(),
        quantity: entry.quantity,
        price: unit_price.amount(),
        chosen_delivery_type: entry.chosen_delivery_type.clone(),
        royalty_fee,
        singpost_fee,
        delivery_fee,
        total,
        currency: unit_price.currency().to_string(),
    }
}

/// Resolves every entry against the catalog and prices it.
pub async fn price_cart(catalog: &dyn Catalog, entries: &[CartEntry], destination: &Address, currency: &str) -> Result<CartBreakdown> {
    let now = Utc::now();
    let mut items = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.quantity == 0 {
            return Err(PrintShopError::Validation(format!("quantity for {} must be at least 1", entry.product_id)));
        }
        let product = catalog
            .product(&entry.product_id)
            .await
            .map_err(|e| PrintShopError::Storage(e.to_string()))?
            .filter(Product::is_available)
            .ok_or_else(|| PrintShopError::Validation(format!("unknown product {}", entry.product_id)))?;
        items.push(compose_line_item_at(entry, &product, destination, now));
    }

    if let Some(other) = items.iter().find(|i| i.currency != currency) {
        return Err(PrintShopError::Validation(format!("product {} is priced in {}", other.product_id, other.currency)));
    }
    let grand_total = items.iter().map(|i| i.total).sum();
    Ok(CartBreakdown { destination: destination.clone(), items, grand_total, currency: currency.to_string() })
}
