use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::CollectionCatalog;
use crate::config_manager::Config;
use crate::error::{ApiError, LookupError};
use crate::gateway::DiseaseGateway;
use crate::resolver::DiseaseResolver;
use crate::store::DiseaseStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn DiseaseStore>,
    pub gateway: Arc<DiseaseGateway>,
    pub resolver: Arc<DiseaseResolver>,
}

impl AppState {
    /// Build the lookup services over a connected store. The collection
    /// table is checked against what the store actually holds.
    pub async fn new(config: Config, store: Arc<dyn DiseaseStore>) -> anyhow::Result<Self> {
        let mut catalog = CollectionCatalog::with_entries(&config.catalog_config);

        let populated: HashSet<String> = store.collection_names().await?.into_iter().collect();
        let removed = catalog.retain_populated(&populated);
        if !removed.is_empty() {
            warn!(
                removed = ?removed,
                "Collections missing from the store; those languages fall back to English"
            );
        }
        info!(
            backend = store.backend_name(),
            collections = catalog.collections().len(),
            "Collection table ready"
        );

        Ok(Self::with_catalog(config, store, catalog))
    }

    /// Build without consulting the store for populated collections.
    pub fn with_catalog(
        config: Config,
        store: Arc<dyn DiseaseStore>,
        catalog: CollectionCatalog,
    ) -> Self {
        let system = &config.system_config;
        let catalog = Arc::new(catalog);
        let gateway = Arc::new(DiseaseGateway::new(
            store.clone(),
            catalog.clone(),
            system.request_timeout(),
            system.fallback_scan_limit,
        ));
        let resolver = Arc::new(DiseaseResolver::new(
            store.clone(),
            catalog,
            system.request_timeout(),
        ));

        Self {
            config: Arc::new(config),
            store,
            gateway,
            resolver,
        }
    }

    /// Map a lookup failure to its HTTP form under the current
    /// production setting.
    pub fn api_error(&self, err: LookupError) -> ApiError {
        ApiError::from_lookup(err, self.config.system_config.production)
    }
}
