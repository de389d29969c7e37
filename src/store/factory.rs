use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{DiseaseStore, MemoryStore, MongoStore};
use crate::config_manager::{StoreConfig, StoreKind};

/// Factory for creating the configured store backend
pub struct StoreFactory;

impl StoreFactory {
    /// Build the store selected by `store_config.backend`.
    ///
    /// The MongoDB backend is connected (with backoff) before this returns,
    /// so a store handed out here has answered at least one ping.
    pub async fn create_store(
        store_config: &StoreConfig,
        call_timeout: Duration,
    ) -> Result<Arc<dyn DiseaseStore>> {
        info!("Initializing disease store: {:?}", store_config.backend);

        match store_config.backend {
            StoreKind::Mongo => {
                let mongo = store_config.mongo.as_ref().ok_or_else(|| {
                    anyhow::anyhow!("store_config.mongo is required for the mongo backend")
                })?;
                let store =
                    MongoStore::connect_with_backoff(mongo, &store_config.reconnect, call_timeout)
                        .await?;
                Ok(Arc::new(store))
            }
            StoreKind::Memory => {
                let memory = store_config.memory.clone().unwrap_or_default();
                let store = MemoryStore::load_dir(&memory.data_path())?;
                Ok(Arc::new(store))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_manager::store::MemoryConfig;

    #[tokio::test]
    async fn builds_memory_store_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("cowAndBuffalo.json"),
            r#"[{"_id": "1", "Disease Name": "Milk Fever"}]"#,
        )
        .unwrap();
        let config = StoreConfig {
            backend: StoreKind::Memory,
            mongo: None,
            memory: Some(MemoryConfig {
                data_dir: dir.path().to_string_lossy().into_owned(),
            }),
            reconnect: Default::default(),
        };
        let store = StoreFactory::create_store(&config, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(store.backend_name(), "memory");
        assert_eq!(store.count("cowAndBuffalo").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn mongo_backend_requires_section() {
        let config = StoreConfig {
            backend: StoreKind::Mongo,
            mongo: None,
            memory: None,
            reconnect: Default::default(),
        };
        assert!(StoreFactory::create_store(&config, Duration::from_secs(1))
            .await
            .is_err());
    }
}
