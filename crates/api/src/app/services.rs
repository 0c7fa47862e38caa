//! Service wiring: picks the store backend and builds the adjuster on top of it.

use std::sync::Arc;

use stockroom_infra::{
    AdjusterConfig, InMemoryInventoryStore, InventoryStore, PostgresInventoryStore, StockAdjuster,
    StoreError,
};

use crate::config::AppConfig;

pub type SharedStore = Arc<dyn InventoryStore>;

/// Everything the HTTP handlers need, shared behind an `Arc`.
pub struct AppServices {
    store: SharedStore,
    adjuster: StockAdjuster<SharedStore>,
}

impl AppServices {
    pub fn new(store: SharedStore, adjuster_config: AdjusterConfig) -> Self {
        Self {
            adjuster: StockAdjuster::new(store.clone(), adjuster_config),
            store,
        }
    }

    pub fn store(&self) -> &dyn InventoryStore {
        self.store.as_ref()
    }

    pub fn adjuster(&self) -> &StockAdjuster<SharedStore> {
        &self.adjuster
    }
}

/// Connect to Postgres when `DATABASE_URL` is set, otherwise fall back to a
/// seeded in-memory store.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, StoreError> {
    let store: SharedStore = match &config.database_url {
        Some(url) => {
            let store = PostgresInventoryStore::connect(url).await?;
            store.migrate().await?;
            tracing::info!("using postgres inventory store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory inventory store");
            Arc::new(seeded_in_memory_store()?)
        }
    };

    Ok(AppServices::new(store, config.adjuster))
}

/// In-memory store with one row of each reference table, so items can be created.
fn seeded_in_memory_store() -> Result<InMemoryInventoryStore, StoreError> {
    let store = InMemoryInventoryStore::new();
    store.add_category("General")?;
    store.add_brand("Unbranded")?;
    store.add_location("Main store")?;
    Ok(store)
}
