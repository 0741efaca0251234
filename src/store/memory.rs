//! In-memory print request store, used when no database is configured and in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::aggregates::PrintRequest;
use crate::ports::{PrintRequestStore, StoreError, StoreResult, SweepFilter};

#[derive(Default)]
pub struct MemoryPrintRequestStore {
    records: RwLock<HashMap<Uuid, PrintRequest>>,
    fail_on_save: RwLock<bool>,
    fail_on_sweep: RwLock<bool>,
}

impl MemoryPrintRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_save(&self, fail: bool) {
        *self.fail_on_save.write().await = fail;
    }

    pub async fn set_fail_on_sweep(&self, fail: bool) {
        *self.fail_on_sweep.write().await = fail;
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl PrintRequestStore for MemoryPrintRequestStore {
    async fn find_one(&self, request_id: Uuid, user_id: &str) -> StoreResult<Option<PrintRequest>> {
        Ok(self
            .records
            .read()
            .await
            .get(&request_id)
            .filter(|r| r.user_id() == user_id)
            .cloned())
    }

    async fn find_by_id(&self, request_id: Uuid) -> StoreResult<Option<PrintRequest>> {
        Ok(self.records.read().await.get(&request_id).cloned())
    }

    async fn save(&self, record: &PrintRequest) -> StoreResult<u64> {
        if *self.fail_on_save.read().await {
            return Err(StoreError::Unavailable("save disabled".to_string()));
        }
        let mut records = self.records.write().await;
        let actual = records.get(&record.request_id()).map_or(0, PrintRequest::version);
        if actual != record.version() {
            return Err(StoreError::VersionConflict {
                request_id: record.request_id(),
                expected: record.version(),
                actual,
            });
        }
        let mut stored = record.clone();
        stored.set_version(record.version() + 1);
        records.insert(record.request_id(), stored);
        Ok(record.version() + 1)
    }

    async fn delete_one(&self, request_id: Uuid, user_id: &str) -> StoreResult<bool> {
        let mut records = self.records.write().await;
        match records.get(&request_id) {
            Some(r) if r.user_id() == user_id => Ok(records.remove(&request_id).is_some()),
            _ => Ok(false),
        }
    }

    async fn delete_many(&self, filter: &SweepFilter) -> StoreResult<u64> {
        if *self.fail_on_sweep.read().await {
            return Err(StoreError::Unavailable("sweep disabled".to_string()));
        }
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| !filter.matches(r));
        Ok((before - records.len()) as u64)
    }
}
