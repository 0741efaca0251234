//! In-memory catalog.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::domain::aggregates::{Product, CUSTOM_PRINT_PRODUCT_ID};
use crate::domain::value_objects::Money;
use crate::ports::{Catalog, CatalogError};

#[derive(Default)]
pub struct MemoryCatalog {
    products: RwLock<HashMap<String, Product>>,
    unavailable: RwLock<bool>,
}

impl MemoryCatalog {
    /// Catalog seeded with the custom print entry at `base_price`.
    pub fn new(base_price: Decimal, currency: &str) -> Self {
        let custom = Product::create(CUSTOM_PRINT_PRODUCT_ID, "Custom 3D Print Request", Money::new(base_price, currency));
        Self { products: RwLock::new(HashMap::from([(custom.id().to_string(), custom)])), unavailable: RwLock::new(false) }
    }

    pub async fn insert(&self, product: Product) {
        self.products.write().await.insert(product.id().to_string(), product);
    }

    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn custom_print_base_price(&self) -> Result<Decimal, CatalogError> {
        self.product(CUSTOM_PRINT_PRODUCT_ID)
            .await?
            .map(|p| p.price().amount())
            .ok_or_else(|| CatalogError(format!("product {CUSTOM_PRINT_PRODUCT_ID} missing")))
    }

    async fn product(&self, product_id: &str) -> Result<Option<Product>, CatalogError> {
        if *self.unavailable.read().await {
            return Err(CatalogError("catalog unavailable".to_string()));
        }
        Ok(self.products.read().await.get(product_id).cloned())
    }
}
