use async_trait::async_trait;
use std::time::Duration;

use crate::models::fields::Document;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether the caller should treat this as "try again later".
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout(_))
    }
}

/// Read-only access to the disease corpus, addressed by collection name.
/// Documents come back as JSON maps with the stored field names intact.
#[async_trait]
pub trait DiseaseStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Round-trip to the backend.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Names of the collections that exist in the backend.
    async fn collection_names(&self) -> Result<Vec<String>, StoreError>;

    async fn count(&self, collection: &str) -> Result<u64, StoreError>;

    /// Documents where any of `fields` case-insensitively contains `needle`
    /// as a literal substring. String arrays match on any element.
    ///
    /// The memory backend walks arrays at any depth. MongoDB's `$regex`
    /// reaches only one array level, so strings inside nested arrays are
    /// matched there only through the gateway's fallback scan.
    async fn find_matching(
        &self,
        collection: &str,
        fields: &[&str],
        needle: &str,
    ) -> Result<Vec<Document>, StoreError>;

    /// Documents in store order, optionally capped.
    async fn scan(&self, collection: &str, limit: Option<usize>)
        -> Result<Vec<Document>, StoreError>;

    /// Document whose `_id`, in string form, equals `id`.
    async fn find_by_id(&self, collection: &str, id: &str)
        -> Result<Option<Document>, StoreError>;

    /// Documents whose `index` equals `index`, numeric strings included.
    ///
    /// The memory backend accepts every form `coerce_index` does (`"4.0"`,
    /// `" 4 "`, extended JSON numbers). MongoDB matches only the integer and
    /// its exact decimal string (`4`, `"4"`).
    async fn find_by_index(&self, collection: &str, index: i64)
        -> Result<Vec<Document>, StoreError>;
}
