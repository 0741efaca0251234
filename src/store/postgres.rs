//! PostgreSQL storage. Print requests and products are kept as JSONB
//! documents; the columns beside them exist for ownership scoping, the
//! optimistic version check and the duplicate sweep.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::domain::aggregates::{PrintRequest, Product, CUSTOM_PRINT_PRODUCT_ID};
use crate::ports::{Catalog, CatalogError, PrintRequestStore, StoreError, StoreResult, SweepFilter};

pub struct PgPrintRequestStore {
    pool: PgPool,
}

impl PgPrintRequestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn current_version(&self, request_id: Uuid) -> StoreResult<u64> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT version FROM print_requests WHERE request_id = $1")
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map_or(0, |(v,)| v.max(0) as u64))
    }
}

fn hydrate((Json(mut record), version): (Json<PrintRequest>, i64)) -> PrintRequest {
    record.set_version(version.max(0) as u64);
    record
}

#[async_trait]
impl PrintRequestStore for PgPrintRequestStore {
    async fn find_one(&self, request_id: Uuid, user_id: &str) -> StoreResult<Option<PrintRequest>> {
        let row: Option<(Json<PrintRequest>, i64)> =
            sqlx::query_as("SELECT document, version FROM print_requests WHERE request_id = $1 AND user_id = $2")
                .bind(request_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(hydrate))
    }

    async fn find_by_id(&self, request_id: Uuid) -> StoreResult<Option<PrintRequest>> {
        let row: Option<(Json<PrintRequest>, i64)> =
            sqlx::query_as("SELECT document, version FROM print_requests WHERE request_id = $1")
                .bind(request_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(hydrate))
    }

    async fn save(&self, record: &PrintRequest) -> StoreResult<u64> {
        let next = record.version() + 1;
        let result = if record.version() == 0 {
            sqlx::query("INSERT INTO print_requests (request_id, user_id, version, has_model, is_configured, document, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7) ON CONFLICT (request_id) DO NOTHING")
                .bind(record.request_id()).bind(record.user_id()).bind(next as i64)
                .bind(record.has_model()).bind(record.is_configured()).bind(Json(record)).bind(Utc::now())
                .execute(&self.pool).await?
        } else {
            sqlx::query("UPDATE print_requests SET version = $3, has_model = $4, is_configured = $5, document = $6, updated_at = $7 WHERE request_id = $1 AND user_id = $2 AND version = $8")
                .bind(record.request_id()).bind(record.user_id()).bind(next as i64)
                .bind(record.has_model()).bind(record.is_configured()).bind(Json(record)).bind(Utc::now())
                .bind(record.version() as i64)
                .execute(&self.pool).await?
        };

        if result.rows_affected() == 0 {
            let actual = self.current_version(record.request_id()).await?;
            return Err(StoreError::VersionConflict { request_id: record.request_id(), expected: record.version(), actual });
        }
        debug!(request_id = %record.request_id(), version = next, "print request saved");
        Ok(next)
    }

    async fn delete_one(&self, request_id: Uuid, user_id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM print_requests WHERE request_id = $1 AND user_id = $2")
            .bind(request_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_many(&self, filter: &SweepFilter) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM print_requests WHERE user_id = $1 AND request_id <> $2 AND NOT has_model AND NOT is_configured")
            .bind(&filter.user_id)
            .bind(filter.keep)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn custom_print_base_price(&self) -> Result<Decimal, CatalogError> {
        self.product(CUSTOM_PRINT_PRODUCT_ID)
            .await?
            .map(|p| p.price().amount())
            .ok_or_else(|| CatalogError(format!("product {CUSTOM_PRINT_PRODUCT_ID} missing")))
    }

    async fn product(&self, product_id: &str) -> Result<Option<Product>, CatalogError> {
        let row: Option<(Json<Product>,)> = sqlx::query_as("SELECT document FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CatalogError(e.to_string()))?;
        Ok(row.map(|(Json(p),)| p))
    }
}
