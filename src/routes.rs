use axum::{routing::get, Router};

use crate::handlers;
use crate::state::AppState;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/api/health", get(handlers::health))
        .route("/api/stats", get(handlers::stats))
        // Lookup
        .route("/api/search", get(handlers::search))
        .route("/api/resolve", get(handlers::resolve))
        .route(
            "/api/translate-disease/:collection/:id/:target_language",
            get(handlers::translate_disease),
        )
        // Records
        .route("/api/disease/:collection/:id", get(handlers::get_disease))
        .route("/api/diseases/:collection", get(handlers::list_diseases))
        .route(
            "/api/diseases-with-images/:collection",
            get(handlers::diseases_with_images),
        )
        .route(
            "/api/image/:collection/:disease_id/:image_id",
            get(handlers::get_image),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CollectionCatalog;
    use crate::config_manager::Config;
    use crate::store::MemoryStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(store: MemoryStore) -> Router {
        let state = AppState::with_catalog(
            Config::default(),
            Arc::new(store),
            CollectionCatalog::standard(),
        );
        create_routes().with_state(state)
    }

    fn corpus() -> MemoryStore {
        MemoryStore::new()
            .with_collection(
                "cowAndBuffalo",
                vec![
                    json!({"_id": "c1", "index": 1, "Disease Name": "Milk Fever", "Symptoms": "Cold ears"}),
                    json!({"_id": "c2", "index": 2, "Disease Name": "Three Day Sickness", "Symptoms": "High fever"}),
                ],
            )
            .with_collection(
                "cowAndBuffaloHindi",
                vec![json!({"_id": "h1", "index": 1, "Disease Name": "दुग्ध ज्वर"})],
            )
            .with_collection(
                "PoultryBirds",
                vec![json!({"_id": "p4", "index": 4, "Disease Name": "Ranikhet"})],
            )
            .with_collection(
                "imagesheepandgoat",
                vec![json!({
                    "_id": "i1",
                    "disease_name": "Goat Pox",
                    "images": [{"image_id": "a", "image_name": "a.jpg", "image_data": "aGVsbG8="}]
                })],
            )
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn health_reports_backend() {
        let (status, json) = get_json(app(corpus()), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["store"], "memory");
        assert_eq!(json["storeReachable"], true);
    }

    #[tokio::test]
    async fn search_returns_results_and_language() {
        let (status, json) = get_json(
            app(corpus()),
            "/api/search?query=fever&category=cowAndBuffalo",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["detectedLanguage"], "en");
        assert_eq!(json["searchedCollections"], json!(["cowAndBuffalo"]));
        assert_eq!(json["count"], 2);
        assert_eq!(json["results"][0]["name"], "Milk Fever");
    }

    #[tokio::test]
    async fn search_without_query_is_400() {
        let (status, json) = get_json(app(corpus()), "/api/search?category=all").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn search_with_every_collection_down_is_503() {
        let store = corpus().mark_unavailable("cowAndBuffalo");
        let response = app(store)
            .oneshot(
                Request::builder()
                    .uri("/api/search?query=fever&collection=cowAndBuffalo")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().contains_key("Retry-After"));
    }

    #[tokio::test]
    async fn translate_disease_finds_hindi_record() {
        let (status, json) = get_json(
            app(corpus()),
            "/api/translate-disease/cowAndBuffalo/c1/hi",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["translated"], true);
        assert_eq!(json["matchedBy"], "index");
        assert_eq!(json["targetCollection"], "cowAndBuffaloHindi");
        assert_eq!(json["disease"]["_id"], "h1");
    }

    #[tokio::test]
    async fn translate_to_same_collection_is_passthrough() {
        let (status, json) =
            get_json(app(corpus()), "/api/translate-disease/cowAndBuffalo/c2/en").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["translated"], false);
        assert_eq!(json["disease"]["_id"], "c2");
    }

    #[tokio::test]
    async fn resolve_missing_index_is_not_translated() {
        let (status, json) = get_json(
            app(corpus()),
            "/api/resolve?category=PoultryBirds&index=4&targetLanguage=ta",
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "NOT_TRANSLATED");
        assert_eq!(json["availableInLanguage"], false);
        assert_eq!(json["targetCollection"], "PoultryBirdsTamil");
        assert_eq!(json["fallback"]["name"], "Ranikhet");
    }

    #[tokio::test]
    async fn unknown_disease_is_404() {
        let (status, json) = get_json(app(corpus()), "/api/disease/cowAndBuffalo/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn lists_and_stats() {
        let (status, json) = get_json(app(corpus()), "/api/diseases/cowAndBuffalo").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 2);

        let (status, json) = get_json(app(corpus()), "/api/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["stats"]["totalDiseases"], 5);
        assert_eq!(json["stats"]["collections"]["PoultryBirds"], 1);
    }

    #[tokio::test]
    async fn image_is_served_with_cache_headers() {
        let (status, json) =
            get_json(app(corpus()), "/api/diseases-with-images/imagesheepandgoat").await;
        assert_eq!(status, StatusCode::OK);
        let url = json["diseases"][0]["images"][0]["image_url"]
            .as_str()
            .unwrap()
            .to_string();
        assert_eq!(url, "/api/image/imagesheepandgoat/i1/a");

        let response = app(corpus())
            .oneshot(Request::builder().uri(url).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "image/jpeg");
        assert_eq!(
            response.headers()["cache-control"],
            "public, max-age=31536000"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"hello");
    }
}
