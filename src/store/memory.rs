use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use super::interface::{DiseaseStore, StoreError};
use crate::config_manager::utils::load_text_file_with_guess_encoding;
use crate::models::fields::{self, Document};

/// Corpus held in memory, one `Vec` per collection in file order.
///
/// Loaded from a directory of `<collection>.json` files, each holding a JSON
/// array of documents in the same layout as the database export.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    collections: HashMap<String, Vec<Document>>,
    unavailable: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_collection(mut self, name: &str, documents: Vec<Value>) -> Self {
        self.insert_collection(name, documents);
        self
    }

    /// Add a collection; entries that are not JSON objects are skipped.
    pub fn insert_collection(&mut self, name: &str, documents: Vec<Value>) {
        let docs: Vec<Document> = documents
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                other => {
                    warn!(collection = name, "Skipping non-object document: {}", other);
                    None
                }
            })
            .collect();
        self.collections.insert(name.to_string(), docs);
    }

    /// Load every `*.json` file in `dir`; the file stem is the collection name.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut store = Self::new();
        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read corpus directory {}", dir.display()))?;

        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = load_text_file_with_guess_encoding(&path)?;
            let value: Value = serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in {}", path.display()))?;
            let Value::Array(documents) = value else {
                anyhow::bail!("{} must contain a JSON array of documents", path.display());
            };
            debug!(collection = name, documents = documents.len(), "Loaded collection");
            store.insert_collection(name, documents);
        }

        info!(
            collections = store.collections.len(),
            dir = %dir.display(),
            "Loaded in-memory corpus"
        );
        Ok(store)
    }

    /// Make every call against `collection` fail as if the backend were down.
    #[cfg(test)]
    pub fn mark_unavailable(mut self, collection: &str) -> Self {
        self.unavailable.insert(collection.to_string());
        self
    }

    fn documents(&self, collection: &str) -> Result<&[Document], StoreError> {
        if self.unavailable.contains(collection) {
            return Err(StoreError::Unavailable(format!(
                "collection {} is offline",
                collection
            )));
        }
        // A missing collection reads as empty, the same as MongoDB.
        Ok(self
            .collections
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }
}

#[async_trait]
impl DiseaseStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn collection_names(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self.collections.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        Ok(self.documents(collection)?.len() as u64)
    }

    async fn find_matching(
        &self,
        collection: &str,
        keys: &[&str],
        needle: &str,
    ) -> Result<Vec<Document>, StoreError> {
        let needle = needle.to_lowercase();
        Ok(self
            .documents(collection)?
            .iter()
            .filter(|doc| {
                keys.iter()
                    .filter_map(|k| doc.get(*k))
                    .any(|v| fields::value_contains(v, &needle))
            })
            .cloned()
            .collect())
    }

    async fn scan(
        &self,
        collection: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Document>, StoreError> {
        let docs = self.documents(collection)?;
        let take = limit.unwrap_or(docs.len());
        Ok(docs.iter().take(take).cloned().collect())
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .documents(collection)?
            .iter()
            .find(|doc| fields::document_id(doc).as_deref() == Some(id))
            .cloned())
    }

    async fn find_by_index(
        &self,
        collection: &str,
        index: i64,
    ) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .documents(collection)?
            .iter()
            .filter(|doc| fields::document_index(doc) == Some(index))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> MemoryStore {
        MemoryStore::new().with_collection(
            "cowAndBuffalo",
            vec![
                json!({"_id": "1", "index": 1, "Disease Name": "Milk Fever", "Symptoms": "cold ears"}),
                json!({"_id": "2", "index": "2", "Disease name": "Bloat", "Symptoms": ["Swollen belly", "FEVER"]}),
                json!("not a document"),
            ],
        )
    }

    #[tokio::test]
    async fn matching_is_case_insensitive_and_literal() {
        let store = store();
        let keys = ["Disease Name", "Disease name", "Symptoms"];
        let hits = store.find_matching("cowAndBuffalo", &keys, "fever").await.unwrap();
        assert_eq!(hits.len(), 2);
        let hits = store.find_matching("cowAndBuffalo", &keys, "f.ver").await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn index_lookup_coerces_strings() {
        let store = store();
        let hits = store.find_by_index("cowAndBuffalo", 2).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(fields::document_id(&hits[0]).as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn missing_collection_is_empty() {
        let store = store();
        assert_eq!(store.count("PoultryBirds").await.unwrap(), 0);
        assert_eq!(store.count("cowAndBuffalo").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn offline_collection_errors() {
        let store = store().mark_unavailable("cowAndBuffalo");
        let err = store.scan("cowAndBuffalo", None).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn loads_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("SheepGoat.json"),
            r#"[{"_id": "s1", "Disease Name": "Goat Pox"}]"#,
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let store = MemoryStore::load_dir(dir.path()).unwrap();
        assert_eq!(store.collections.len(), 1);
        assert_eq!(store.collections["SheepGoat"].len(), 1);
    }

    #[test]
    fn rejects_non_array_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("SheepGoat.json"), r#"{"_id": "s1"}"#).unwrap();
        assert!(MemoryStore::load_dir(dir.path()).is_err());
    }
}
