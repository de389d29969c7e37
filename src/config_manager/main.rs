use serde::{Deserialize, Serialize};

use crate::catalog::CatalogEntry;
use crate::config_manager::store::StoreConfig;
use crate::config_manager::system::SystemConfig;

/// Main configuration for the application (JSON-LD, JSON or YAML)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub system_config: SystemConfig,

    #[serde(default)]
    pub store_config: StoreConfig,

    /// Extra or replacement rows for the collection table.
    #[serde(default)]
    pub catalog_config: Vec<CatalogEntry>,
}

impl Config {
    /// Load configuration from a file, with `${VAR}` substitution and
    /// `VETLOOKUP__*` environment overrides.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        use crate::config_manager::utils::{read_config_value, validate_config, ENV_PREFIX};
        let json_value = read_config_value(path)?;
        let config = validate_config(&json_value, ENV_PREFIX)?;
        config
            .system_config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid system_config in {}: {}", path, e))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Category;
    use crate::config_manager::store::StoreKind;
    use crate::language::Language;

    #[test]
    fn loads_jsonld_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf.jsonld");
        std::fs::write(
            &path,
            r#"{
                "@context": {"@vocab": "https://vet-lookup.example.org/config#"},
                "system_config": {"port": 6000, "production": true},
                "store_config": {"backend": "memory", "memory": {"data_dir": "corpus"}},
                "catalog_config": [
                    {"category": "PoultryBirds", "language": "te", "collection": "PoultryBirdsTelugu"}
                ]
            }"#,
        )
        .unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.system_config.port, 6000);
        assert!(config.system_config.production);
        assert_eq!(config.system_config.fallback_scan_limit, 500);
        assert_eq!(config.store_config.backend, StoreKind::Memory);
        assert_eq!(config.store_config.memory.unwrap().data_dir, "corpus");
        assert_eq!(config.catalog_config.len(), 1);
        assert_eq!(config.catalog_config[0].category, Category::PoultryBirds);
        assert_eq!(config.catalog_config[0].language, Language::Telugu);
    }

    #[test]
    fn rejects_invalid_system_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf.yaml");
        std::fs::write(&path, "system_config:\n  fallback_scan_limit: 0\n").unwrap();
        assert!(Config::load(path.to_str().unwrap()).is_err());
    }
}
