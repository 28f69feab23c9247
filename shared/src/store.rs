//! Record store abstraction and backend selection.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::{Config, StoreBackend};
use crate::db::{create_pool, PgRecordStore};
use crate::models::CalendarRecord;
use crate::rest::RestRecordStore;
use crate::secrets::resolve_store_credential;
use crate::{Error, Result};

/// Row client for the calendar record table.
///
/// `get` returns `Ok(None)` when no row exists for `id`. `upsert` replaces
/// the whole row.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<CalendarRecord>>;
    async fn upsert(&self, id: &str, record: &CalendarRecord) -> Result<()>;
}

/// In-process record store for tests and local runs.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    rows: RwLock<HashMap<String, CalendarRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, id: &str) -> Result<Option<CalendarRecord>> {
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn upsert(&self, id: &str, record: &CalendarRecord) -> Result<()> {
        self.rows
            .write()
            .await
            .insert(id.to_string(), record.clone());
        Ok(())
    }
}

/// Build the store selected by the configured URL.
pub async fn connect(config: &Config) -> Result<Arc<dyn RecordStore>> {
    let backend = config.backend()?;
    info!(?backend, table = %config.table, "Connecting record store");

    match backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryRecordStore::new())),
        StoreBackend::Postgres => {
            let password = resolve_store_credential(&config.store_credential).await?;
            let pool = create_pool(&config.store_url, password.as_deref()).await?;
            Ok(Arc::new(PgRecordStore::new(pool, &config.table)))
        }
        StoreBackend::Rest => {
            let key = resolve_store_credential(&config.store_credential)
                .await?
                .ok_or_else(|| Error::Config("Store credential required".to_string()))?;
            Ok(Arc::new(RestRecordStore::new(
                &config.store_url,
                &key,
                &config.table,
            )?))
        }
    }
}
