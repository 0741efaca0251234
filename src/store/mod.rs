//! Storage implementations.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::config::AppConfig;
use crate::ports::{Catalog, PrintRequestStore, StoreResult};

pub mod catalog;
pub mod memory;
pub mod postgres;

pub use catalog::MemoryCatalog;
pub use memory::MemoryPrintRequestStore;
pub use postgres::{PgCatalog, PgPrintRequestStore};

/// Initialize storage based on configuration.
///
/// With a `DATABASE_URL` both the print request store and the catalog are
/// backed by Postgres (migrations are applied first). Without one, an
/// in-memory store and a catalog holding only the configured base price.
pub async fn init_storage(config: &AppConfig) -> StoreResult<(Arc<dyn PrintRequestStore>, Arc<dyn Catalog>)> {
    match &config.database_url {
        Some(url) => {
            info!("Storage: postgres");
            let pool = PgPoolOptions::new().max_connections(config.max_connections).connect(url).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            Ok((Arc::new(PgPrintRequestStore::new(pool.clone())), Arc::new(PgCatalog::new(pool))))
        }
        None => {
            info!("Storage: in-memory (DATABASE_URL not set)");
            Ok((
                Arc::new(MemoryPrintRequestStore::new()),
                Arc::new(MemoryCatalog::new(config.custom_print_base_price, &config.currency)),
            ))
        }
    }
}
