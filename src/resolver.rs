//! Cross-language resolution: find the record in another language's
//! collection that describes the same disease as a known record.
//!
//! Records are linked by their shared `index` when the source has one.
//! Without an index, a record addressed by id is looked up under the same id
//! in the target collection, and the name path (normalized exact match, then
//! containment) is the last resort.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::catalog::{Category, CollectionCatalog};
use crate::error::LookupError;
use crate::language::Language;
use crate::models::DiseaseRecord;
use crate::store::DiseaseStore;
use crate::utils::names::{compare_names, NameMatch};
use crate::utils::timeout::with_deadline;

/// How the source record is identified.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRef {
    Id(String),
    Index(i64),
    Name(String),
}

#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub category: Category,
    pub source_language: Language,
    pub source: SourceRef,
    pub target_language: Language,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchedBy {
    Index,
    /// Same `_id` in the target collection.
    Id,
    ExactName,
    NameContains,
}

#[derive(Debug, Clone)]
pub enum Resolution {
    /// Equivalent record found in the target collection.
    Translated {
        record: DiseaseRecord,
        matched_by: MatchedBy,
        source_collection: String,
    },
    /// Source and target map to the same collection; the record is returned
    /// as is.
    SameCollection { record: DiseaseRecord },
    /// Nothing in the target collection matches. `fallback` is the source
    /// record when it could be loaded.
    NotTranslated {
        target_collection: String,
        language: Language,
        fallback: Option<DiseaseRecord>,
    },
}

impl Resolution {
    pub fn is_translated(&self) -> bool {
        matches!(self, Resolution::Translated { .. })
    }
}

pub struct DiseaseResolver {
    store: Arc<dyn DiseaseStore>,
    catalog: Arc<CollectionCatalog>,
    call_timeout: Duration,
}

impl DiseaseResolver {
    pub fn new(
        store: Arc<dyn DiseaseStore>,
        catalog: Arc<CollectionCatalog>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            store,
            catalog,
            call_timeout,
        }
    }

    /// Resolve a record addressed by its stored collection name and id.
    pub async fn translate(
        &self,
        collection: &str,
        id: &str,
        target_language: Language,
    ) -> Result<Resolution, LookupError> {
        let (category, source_language) = self.catalog.locate(collection).ok_or_else(|| {
            LookupError::InvalidRequest(format!("Unknown collection: {}", collection))
        })?;
        self.resolve(&ResolveRequest {
            category,
            source_language,
            source: SourceRef::Id(id.to_string()),
            target_language,
        })
        .await
    }

    pub async fn resolve(&self, request: &ResolveRequest) -> Result<Resolution, LookupError> {
        let source_collection = self.collection(request.category, request.source_language)?;
        let target_collection = self.collection(request.category, request.target_language)?;
        info!(
            source = %source_collection,
            target = %target_collection,
            source_ref = ?request.source,
            "Resolving disease"
        );

        let source_record = self.load_source(&source_collection, &request.source).await?;

        if source_collection == target_collection {
            if let Some(record) = source_record {
                debug!(collection = %target_collection, "No translation needed");
                return Ok(Resolution::SameCollection { record });
            }
        }

        let index = match &request.source {
            SourceRef::Index(index) => Some(*index),
            SourceRef::Id(_) => source_record.as_ref().and_then(|r| r.index),
            SourceRef::Name(_) => None,
        };
        let name = match &request.source {
            SourceRef::Name(name) => Some(name.clone()),
            _ => source_record.as_ref().map(|r| r.name.clone()),
        };

        let found = match index {
            Some(index) => self
                .match_index(&target_collection, index)
                .await?
                .map(|record| (record, MatchedBy::Index)),
            None => {
                let by_id = match &request.source {
                    SourceRef::Id(id) => self.match_id(&target_collection, id).await?,
                    _ => None,
                };
                match (by_id, name) {
                    (Some(record), _) => Some((record, MatchedBy::Id)),
                    (None, Some(name)) => self.match_name(&target_collection, &name).await?,
                    (None, None) => None,
                }
            }
        };

        Ok(match found {
            Some((record, _)) if source_collection == target_collection => {
                Resolution::SameCollection { record }
            }
            Some((record, matched_by)) => {
                info!(target = %target_collection, id = %record.id, ?matched_by, "Resolved disease");
                Resolution::Translated {
                    record,
                    matched_by,
                    source_collection,
                }
            }
            None => {
                info!(target = %target_collection, "No equivalent record in target language");
                Resolution::NotTranslated {
                    target_collection,
                    language: request.target_language,
                    fallback: source_record,
                }
            }
        })
    }

    fn collection(&self, category: Category, language: Language) -> Result<String, LookupError> {
        self.catalog
            .collection_for(category, language)
            .map(str::to_string)
            .ok_or_else(|| {
                LookupError::InvalidRequest(format!(
                    "No collection for {} in {}",
                    category, language
                ))
            })
    }

    /// The source record, when the reference lets us load one. An unknown id
    /// is an error; an index with no source record is not.
    async fn load_source(
        &self,
        collection: &str,
        source: &SourceRef,
    ) -> Result<Option<DiseaseRecord>, LookupError> {
        match source {
            SourceRef::Id(id) => {
                let document =
                    with_deadline(self.call_timeout, self.store.find_by_id(collection, id))
                        .await?
                        .ok_or_else(|| LookupError::NotFound("Disease not found".to_string()))?;
                let record = DiseaseRecord::from_document(collection, &document)
                    .ok_or_else(|| LookupError::NotFound("Disease not found".to_string()))?;
                Ok(Some(record))
            }
            SourceRef::Index(index) => self.match_index(collection, *index).await,
            SourceRef::Name(_) => Ok(None),
        }
    }

    /// The record stored under the same id in `collection`.
    async fn match_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<DiseaseRecord>, LookupError> {
        let document =
            with_deadline(self.call_timeout, self.store.find_by_id(collection, id)).await?;
        Ok(document.and_then(|doc| DiseaseRecord::from_document(collection, &doc)))
    }

    /// Every record sharing `index`, merged into one.
    async fn match_index(
        &self,
        collection: &str,
        index: i64,
    ) -> Result<Option<DiseaseRecord>, LookupError> {
        let documents =
            with_deadline(self.call_timeout, self.store.find_by_index(collection, index)).await?;
        let records: Vec<DiseaseRecord> = documents
            .iter()
            .filter_map(|doc| DiseaseRecord::from_document(collection, doc))
            .collect();
        if records.len() > 1 {
            debug!(collection, index, matches = records.len(), "Merging records sharing index");
        }
        Ok(DiseaseRecord::merge(records))
    }

    /// Exact normalized name matches (merged) win over the first containment
    /// match.
    async fn match_name(
        &self,
        collection: &str,
        name: &str,
    ) -> Result<Option<(DiseaseRecord, MatchedBy)>, LookupError> {
        let documents = with_deadline(self.call_timeout, self.store.scan(collection, None)).await?;
        let mut exact = Vec::new();
        let mut contained = None;
        for record in documents
            .iter()
            .filter_map(|doc| DiseaseRecord::from_document(collection, doc))
        {
            match compare_names(&record.name, name) {
                Some(NameMatch::Exact) => exact.push(record),
                Some(NameMatch::Contains) if contained.is_none() => contained = Some(record),
                _ => {}
            }
        }

        if let Some(record) = DiseaseRecord::merge(exact) {
            return Ok(Some((record, MatchedBy::ExactName)));
        }
        Ok(contained.map(|record| (record, MatchedBy::NameContains)))
    }
}
