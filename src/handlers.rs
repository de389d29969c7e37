//! HTTP handlers. Each one parses its parameters, calls the gateway or
//! resolver, and shapes the JSON body; all failures go out as [`ApiError`].

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::catalog::{Category, CategoryFilter};
use crate::error::{ApiError, LookupError};
use crate::gateway::SearchRequest;
use crate::language::Language;
use crate::resolver::{ResolveRequest, Resolution, SourceRef};
use crate::state::AppState;
use crate::utils::timeout::with_deadline;

/// Images are served as immutable for a year.
const IMAGE_CACHE_CONTROL: &str = "public, max-age=31536000";

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub category: Option<String>,
    /// Older clients send the category as `collection`.
    pub collection: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveQuery {
    pub category: Option<String>,
    pub index: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub source_language: Option<String>,
    pub target_language: Option<String>,
}

fn parse_language(raw: Option<&str>) -> Result<Option<Language>, LookupError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(code) => code.parse().map(Some).map_err(LookupError::InvalidRequest),
    }
}

fn required_language(raw: Option<&str>, name: &str) -> Result<Language, LookupError> {
    parse_language(raw)?
        .ok_or_else(|| LookupError::InvalidRequest(format!("{} is required", name)))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let timeout = state.config.system_config.request_timeout();
    let reachable = with_deadline(timeout, state.store.ping()).await.is_ok();
    Json(json!({
        "status": "ok",
        "store": state.store.backend_name(),
        "storeReachable": reachable,
        "version": state.config.system_config.conf_version,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// `GET /api/search?query=&category=&language=`
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    let request = build_search_request(params).map_err(|e| state.api_error(e))?;
    let response = state
        .gateway
        .search(&request)
        .await
        .map_err(|e| state.api_error(e))?;

    let mut body = serde_json::to_value(&response)
        .map_err(|e| state.api_error(LookupError::Internal(e.to_string())))?;
    if let Value::Object(map) = &mut body {
        map.insert("success".to_string(), Value::Bool(true));
        map.insert("count".to_string(), json!(response.results.len()));
    }
    Ok(Json(body))
}

fn build_search_request(params: SearchQuery) -> Result<SearchRequest, LookupError> {
    let category = params.category.or(params.collection);
    Ok(SearchRequest {
        query: params.query.unwrap_or_default(),
        category: CategoryFilter::parse(category.as_deref()).map_err(LookupError::InvalidRequest)?,
        language: parse_language(params.language.as_deref())?,
    })
}

/// `GET /api/resolve?category=&index=&targetLanguage=&sourceLanguage=`
///
/// `id` or `name` may stand in for `index`.
pub async fn resolve(
    State(state): State<AppState>,
    Query(params): Query<ResolveQuery>,
) -> Result<Response, ApiError> {
    let request = build_resolve_request(params).map_err(|e| state.api_error(e))?;
    let resolution = state
        .resolver
        .resolve(&request)
        .await
        .map_err(|e| state.api_error(e))?;
    debug!(translated = resolution.is_translated(), "Resolution ready");
    Ok(resolution_response(resolution))
}

fn build_resolve_request(params: ResolveQuery) -> Result<ResolveRequest, LookupError> {
    let category: Category = params
        .category
        .as_deref()
        .ok_or_else(|| LookupError::InvalidRequest("category is required".to_string()))?
        .parse()
        .map_err(LookupError::InvalidRequest)?;

    let source = if let Some(raw) = params.index.as_deref() {
        let index = raw.trim().parse::<i64>().map_err(|_| {
            LookupError::InvalidRequest(format!("index must be an integer, got {:?}", raw))
        })?;
        SourceRef::Index(index)
    } else if let Some(id) = params.id.filter(|s| !s.trim().is_empty()) {
        SourceRef::Id(id)
    } else if let Some(name) = params.name.filter(|s| !s.trim().is_empty()) {
        SourceRef::Name(name)
    } else {
        return Err(LookupError::InvalidRequest(
            "one of index, id or name is required".to_string(),
        ));
    };

    Ok(ResolveRequest {
        category,
        source_language: parse_language(params.source_language.as_deref())?.unwrap_or_default(),
        source,
        target_language: required_language(params.target_language.as_deref(), "targetLanguage")?,
    })
}

/// `GET /api/translate-disease/:collection/:id/:targetLanguage`
pub async fn translate_disease(
    State(state): State<AppState>,
    Path((collection, id, target_language)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let target = required_language(Some(target_language.as_str()), "targetLanguage")
        .map_err(|e| state.api_error(e))?;
    let resolution = state
        .resolver
        .translate(&collection, &id, target)
        .await
        .map_err(|e| state.api_error(e))?;
    Ok(resolution_response(resolution))
}

fn resolution_response(resolution: Resolution) -> Response {
    match resolution {
        Resolution::Translated {
            record,
            matched_by,
            source_collection,
        } => Json(json!({
            "success": true,
            "translated": true,
            "matchedBy": matched_by,
            "sourceCollection": source_collection,
            "targetCollection": record.collection,
            "disease": record,
        }))
        .into_response(),
        Resolution::SameCollection { record } => Json(json!({
            "success": true,
            "translated": false,
            "message": "No translation needed",
            "targetCollection": record.collection,
            "disease": record,
        }))
        .into_response(),
        Resolution::NotTranslated {
            target_collection,
            language,
            fallback,
        } => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "success": false,
                "translated": false,
                "availableInLanguage": false,
                "error": {
                    "code": "NOT_TRANSLATED",
                    "message": format!("Disease is not available in {}", language),
                },
                "targetCollection": target_collection,
                "language": language,
                "fallback": fallback,
            })),
        )
            .into_response(),
    }
}

/// `GET /api/disease/:collection/:id`
pub async fn get_disease(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let record = state
        .gateway
        .get(&collection, &id)
        .await
        .map_err(|e| state.api_error(e))?;
    Ok(Json(json!({ "success": true, "disease": record })))
}

/// `GET /api/diseases/:collection`
pub async fn list_diseases(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let diseases = state
        .gateway
        .list(&collection)
        .await
        .map_err(|e| state.api_error(e))?;
    Ok(Json(json!({
        "success": true,
        "collection": collection,
        "count": diseases.len(),
        "diseases": diseases,
    })))
}

/// `GET /api/diseases-with-images/:collection`
pub async fn diseases_with_images(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let diseases = state
        .gateway
        .with_images(&collection)
        .await
        .map_err(|e| state.api_error(e))?;
    Ok(Json(json!({
        "success": true,
        "collection": collection,
        "count": diseases.len(),
        "diseases": diseases,
    })))
}

/// `GET /api/image/:collection/:diseaseId/:imageId`
pub async fn get_image(
    State(state): State<AppState>,
    Path((collection, disease_id, image_id)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let image = state
        .gateway
        .image(&collection, &disease_id, &image_id)
        .await
        .map_err(|e| state.api_error(e))?;
    debug!(collection, disease_id, image_id, bytes = image.bytes.len(), "Serving image");

    let content_type = match image.image_name.as_deref() {
        Some(name) if name.to_lowercase().ends_with(".png") => "image/png",
        _ => "image/jpeg",
    };
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, IMAGE_CACHE_CONTROL),
        ],
        image.bytes,
    )
        .into_response())
}

/// `GET /api/stats`
pub async fn stats(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let stats = state.gateway.stats().await.map_err(|e| state.api_error(e))?;
    Ok(Json(json!({
        "success": true,
        "message": "Database connection successful",
        "backend": state.store.backend_name(),
        "languages": Language::supported_codes(),
        "stats": stats,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_accepts_collection_alias() {
        let request = build_search_request(SearchQuery {
            query: Some("fever".into()),
            collection: Some("PoultryBirds".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(request.category, CategoryFilter::Only(Category::PoultryBirds));
        assert_eq!(request.language, None);
    }

    #[test]
    fn search_rejects_unknown_language() {
        let err = build_search_request(SearchQuery {
            query: Some("fever".into()),
            language: Some("fr".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, LookupError::InvalidRequest(_)));
    }

    #[test]
    fn resolve_prefers_index_over_id() {
        let request = build_resolve_request(ResolveQuery {
            category: Some("SheepGoat".into()),
            index: Some(" 4 ".into()),
            id: Some("abc".into()),
            target_language: Some("ta".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(request.source, SourceRef::Index(4));
        assert_eq!(request.source_language, Language::English);
        assert_eq!(request.target_language, Language::Tamil);
    }

    #[test]
    fn resolve_requires_target_and_source() {
        assert!(build_resolve_request(ResolveQuery {
            category: Some("SheepGoat".into()),
            index: Some("4".into()),
            ..Default::default()
        })
        .is_err());
        assert!(build_resolve_request(ResolveQuery {
            category: Some("SheepGoat".into()),
            target_language: Some("hi".into()),
            ..Default::default()
        })
        .is_err());
        assert!(build_resolve_request(ResolveQuery {
            category: Some("SheepGoat".into()),
            index: Some("four".into()),
            target_language: Some("hi".into()),
            ..Default::default()
        })
        .is_err());
    }
}
