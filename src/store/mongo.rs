use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document as BsonDocument};
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::options::{ClientOptions, FindOptions};
use mongodb::{Client, Collection, Database};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

use super::interface::{DiseaseStore, StoreError};
use crate::config_manager::{MongoConfig, ReconnectionPolicy};
use crate::models::fields::{Document, ID_KEY, INDEX_KEYS};

/// MongoDB-backed store. Collections are read as raw documents; nothing is
/// mapped through a schema because key spelling varies between collections.
#[derive(Debug, Clone)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    pub async fn connect(config: &MongoConfig, selection_timeout: Duration) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(&config.uri).await.map_err(map_error)?;
        options.app_name = Some(config.app_name.clone());
        options.server_selection_timeout = Some(selection_timeout);

        let client = Client::with_options(options).map_err(map_error)?;
        let store = Self {
            database: client.database(&config.database),
        };
        store.ping().await?;
        Ok(store)
    }

    /// Connect at startup, retrying with exponential backoff until the
    /// policy's retry budget is spent.
    pub async fn connect_with_backoff(
        config: &MongoConfig,
        policy: &ReconnectionPolicy,
        selection_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let mut attempt = 0;
        loop {
            match Self::connect(config, selection_timeout).await {
                Ok(store) => {
                    info!(database = %config.database, attempt, "Connected to MongoDB");
                    return Ok(store);
                }
                Err(e) if attempt < policy.max_retries => {
                    let delay = policy.delay_for(attempt);
                    warn!(attempt, ?delay, "MongoDB connection failed: {}", e);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn collection(&self, name: &str) -> Collection<BsonDocument> {
        self.database.collection(name)
    }

    async fn find(
        &self,
        collection: &str,
        filter: BsonDocument,
        options: Option<FindOptions>,
    ) -> Result<Vec<Document>, StoreError> {
        let cursor = self
            .collection(collection)
            .find(filter, options)
            .await
            .map_err(map_error)?;
        let docs: Vec<BsonDocument> = cursor.try_collect().await.map_err(map_error)?;
        Ok(docs.into_iter().filter_map(to_json_document).collect())
    }
}

fn map_error(err: MongoError) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) => {
            StoreError::Unavailable(err.to_string())
        }
        _ => StoreError::Backend(err.to_string()),
    }
}

/// Relaxed extended JSON with object ids flattened to their hex string.
fn to_json_document(doc: BsonDocument) -> Option<Document> {
    match Bson::Document(doc).into_relaxed_extjson() {
        Value::Object(mut map) => {
            let oid_hex = map
                .get(ID_KEY)
                .and_then(|id| id.get("$oid"))
                .and_then(Value::as_str)
                .map(str::to_string);
            if let Some(hex) = oid_hex {
                map.insert(ID_KEY.to_string(), Value::String(hex));
            }
            Some(map)
        }
        _ => None,
    }
}

fn literal_pattern_filter(keys: &[&str], needle: &str) -> BsonDocument {
    let pattern = regex::escape(needle);
    let clauses: Vec<BsonDocument> = keys
        .iter()
        .map(|key| {
            let mut clause = BsonDocument::new();
            clause.insert(*key, doc! { "$regex": pattern.clone(), "$options": "i" });
            clause
        })
        .collect();
    doc! { "$or": clauses }
}

fn index_filter(index: i64) -> BsonDocument {
    let clauses: Vec<BsonDocument> = INDEX_KEYS
        .iter()
        .flat_map(|key| {
            let mut numeric = BsonDocument::new();
            numeric.insert(*key, index);
            let mut text = BsonDocument::new();
            text.insert(*key, index.to_string());
            [numeric, text]
        })
        .collect();
    doc! { "$or": clauses }
}

fn id_filter(id: &str) -> BsonDocument {
    let mut candidates = vec![Bson::String(id.to_string())];
    if let Ok(oid) = ObjectId::parse_str(id) {
        candidates.push(Bson::ObjectId(oid));
    }
    doc! { "_id": { "$in": candidates } }
}

#[async_trait]
impl DiseaseStore for MongoStore {
    fn backend_name(&self) -> &'static str {
        "mongo"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(map_error)?;
        Ok(())
    }

    async fn collection_names(&self) -> Result<Vec<String>, StoreError> {
        self.database
            .list_collection_names(None)
            .await
            .map_err(map_error)
    }

    async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        self.collection(collection)
            .count_documents(doc! {}, None)
            .await
            .map_err(map_error)
    }

    async fn find_matching(
        &self,
        collection: &str,
        keys: &[&str],
        needle: &str,
    ) -> Result<Vec<Document>, StoreError> {
        self.find(collection, literal_pattern_filter(keys, needle), None).await
    }

    async fn scan(
        &self,
        collection: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Document>, StoreError> {
        let options = limit.map(|n| {
            FindOptions::builder()
                .limit(i64::try_from(n).unwrap_or(i64::MAX))
                .build()
        });
        self.find(collection, doc! {}, options).await
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let found = self
            .collection(collection)
            .find_one(id_filter(id), None)
            .await
            .map_err(map_error)?;
        Ok(found.and_then(to_json_document))
    }

    async fn find_by_index(
        &self,
        collection: &str,
        index: i64,
    ) -> Result<Vec<Document>, StoreError> {
        self.find(collection, index_filter(index), None).await
    }
}
