//! Disease Store Gateway: query in, deduplicated normalized records out.
//!
//! The gateway owns collection selection (through the catalog), literal
//! substring matching with a bounded full-text fallback, and per-collection
//! name dedup. A search over several collections is best-effort: a failing
//! collection is logged and skipped, and only a search where every
//! collection failed is reported as an error.

use base64::Engine;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::catalog::{CategoryFilter, CollectionCatalog};
use crate::error::LookupError;
use crate::language::{detect_language, Language};
use crate::models::fields::{document_contains, SEARCH_FIELDS};
use crate::models::{DiseaseRecord, DiseaseSummary};
use crate::store::{DiseaseStore, StoreError};
use crate::utils::names::dedup_key;
use crate::utils::timeout::with_deadline;

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub category: CategoryFilter,
    /// Explicit language; detected from the query script when `None`.
    pub language: Option<Language>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<DiseaseRecord>,
    pub detected_language: Language,
    pub searched_collections: Vec<String>,
    /// Collections whose hits came from the full-text fallback scan.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fallback_collections: Vec<String>,
    /// Collections skipped because the store failed for them.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_collections: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    pub collections: BTreeMap<String, u64>,
    pub total_diseases: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unavailable: Vec<String>,
}

/// An image decoded from its stored base64 payload.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub image_name: Option<String>,
    pub bytes: Vec<u8>,
}

pub struct DiseaseGateway {
    store: Arc<dyn DiseaseStore>,
    catalog: Arc<CollectionCatalog>,
    call_timeout: Duration,
    fallback_scan_limit: usize,
}

impl DiseaseGateway {
    pub fn new(
        store: Arc<dyn DiseaseStore>,
        catalog: Arc<CollectionCatalog>,
        call_timeout: Duration,
        fallback_scan_limit: usize,
    ) -> Self {
        Self {
            store,
            catalog,
            call_timeout,
            fallback_scan_limit,
        }
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, LookupError> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(LookupError::InvalidRequest(
                "Query parameter is required".to_string(),
            ));
        }

        let language = request.language.unwrap_or_else(|| detect_language(query));
        let collections = self.catalog.select(request.category, language);
        info!(
            query,
            language = %language,
            collections = ?collections,
            "Searching diseases"
        );

        let mut results = Vec::new();
        let mut fallback_collections = Vec::new();
        let mut failed_collections = Vec::new();
        let mut last_error = None;

        for collection in &collections {
            match self.search_collection(collection, query).await {
                Ok((records, used_fallback)) => {
                    debug!(collection = %collection, hits = records.len(), used_fallback, "Collection searched");
                    if used_fallback && !records.is_empty() {
                        fallback_collections.push(collection.clone());
                    }
                    results.extend(records);
                }
                Err(e) => {
                    warn!(collection = %collection, "Skipping collection: {}", e);
                    failed_collections.push(collection.clone());
                    last_error = Some(e);
                }
            }
        }

        if failed_collections.len() == collections.len() {
            if let Some(err) = last_error {
                return Err(err.into());
            }
        }

        info!(query, results = results.len(), "Search finished");
        Ok(SearchResponse {
            results,
            detected_language: language,
            searched_collections: collections,
            fallback_collections,
            failed_collections,
        })
    }

    /// Hits for one collection, deduped by normalized name, first seen wins.
    async fn search_collection(
        &self,
        collection: &str,
        query: &str,
    ) -> Result<(Vec<DiseaseRecord>, bool), StoreError> {
        let mut documents = with_deadline(
            self.call_timeout,
            self.store.find_matching(collection, &SEARCH_FIELDS, query),
        )
        .await?;

        let used_fallback = documents.is_empty();
        if used_fallback {
            let candidates = with_deadline(
                self.call_timeout,
                self.store.scan(collection, Some(self.fallback_scan_limit)),
            )
            .await?;
            let needle = query.to_lowercase();
            documents = candidates
                .into_iter()
                .filter(|doc| document_contains(doc, &needle))
                .collect();
        }

        let mut seen = HashSet::new();
        let records = documents
            .iter()
            .filter_map(|doc| DiseaseRecord::from_document(collection, doc))
            .filter(|record| seen.insert(dedup_key(&record.name)))
            .collect();
        Ok((records, used_fallback))
    }

    /// Summaries of every usable record in one collection.
    pub async fn list(&self, collection: &str) -> Result<Vec<DiseaseSummary>, LookupError> {
        self.ensure_known(collection)?;
        let documents = with_deadline(self.call_timeout, self.store.scan(collection, None)).await?;
        let summaries: Vec<DiseaseSummary> = documents
            .iter()
            .filter_map(|doc| DiseaseRecord::from_document(collection, doc))
            .map(|record| record.summary())
            .collect();
        info!(collection, count = summaries.len(), "Listed diseases");
        Ok(summaries)
    }

    /// Full record by id.
    pub async fn get(&self, collection: &str, id: &str) -> Result<DiseaseRecord, LookupError> {
        self.ensure_known(collection)?;
        let document = with_deadline(self.call_timeout, self.store.find_by_id(collection, id))
            .await?
            .ok_or_else(|| LookupError::NotFound("Disease not found".to_string()))?;
        DiseaseRecord::from_document(collection, &document).ok_or_else(|| {
            warn!(collection, id, "Stored disease has no name");
            LookupError::NotFound("Disease not found".to_string())
        })
    }

    /// Records in `collection` that carry at least one image.
    pub async fn with_images(&self, collection: &str) -> Result<Vec<DiseaseRecord>, LookupError> {
        self.ensure_known(collection)?;
        let documents = with_deadline(self.call_timeout, self.store.scan(collection, None)).await?;
        Ok(documents
            .iter()
            .filter_map(|doc| DiseaseRecord::from_document(collection, doc))
            .filter(|record| !record.images.is_empty())
            .collect())
    }

    /// Decoded bytes of one image of one record.
    pub async fn image(
        &self,
        collection: &str,
        disease_id: &str,
        image_id: &str,
    ) -> Result<ImagePayload, LookupError> {
        let record = self.get(collection, disease_id).await?;
        let image = record
            .image(image_id)
            .ok_or_else(|| LookupError::NotFound("Image not found".to_string()))?;
        let data = image
            .image_data
            .as_deref()
            .ok_or_else(|| LookupError::NotFound("Image not found".to_string()))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data.trim())
            .map_err(|e| {
                LookupError::Internal(format!(
                    "Image {} of {} in {} is not valid base64: {}",
                    image_id, disease_id, collection, e
                ))
            })?;
        Ok(ImagePayload {
            image_name: image.image_name.clone(),
            bytes,
        })
    }

    /// Document counts for every catalogued collection. Collections the store
    /// cannot count are listed as unavailable.
    pub async fn stats(&self) -> Result<CollectionStats, LookupError> {
        let names = self.catalog.collections();
        let mut collections = BTreeMap::new();
        let mut unavailable = Vec::new();
        let mut last_error = None;

        for name in &names {
            match with_deadline(self.call_timeout, self.store.count(name)).await {
                Ok(count) => {
                    collections.insert(name.to_string(), count);
                }
                Err(e) => {
                    warn!(collection = name, "Count failed: {}", e);
                    unavailable.push(name.to_string());
                    last_error = Some(e);
                }
            }
        }

        if collections.is_empty() {
            if let Some(err) = last_error {
                return Err(err.into());
            }
        }

        Ok(CollectionStats {
            total_diseases: collections.values().sum(),
            collections,
            unavailable,
        })
    }

    fn ensure_known(&self, collection: &str) -> Result<(), LookupError> {
        if self.catalog.contains(collection) {
            Ok(())
        } else {
            Err(LookupError::InvalidRequest(format!(
                "Unknown collection: {}",
                collection
            )))
        }
    }
}
