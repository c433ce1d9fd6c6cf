use async_trait::async_trait;
use axum::routing::post as post_route;
use axum::{Json, Router};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;

use catalog_core::request::{RequestDefaults, EMPTY_IMPORT_MESSAGE, MISSING_QUERY_MESSAGE};
use catalog_core::traits::{Embedder, ProductStore, RetrievalOracle};
use catalog_core::types::{FuzzyQuery, HybridQuery, LexicalQuery, ScoredResult, SemanticQuery};
use catalog_core::{Result, SearchError};
use catalog_embed::{FakeEmbedder, OpenAiEmbedder};
use catalog_hybrid::SearchService;
use catalog_server::{app_router, AppState};
use catalog_store::{CatalogHandles, MemoryCatalog, SeedData};

const DIM: usize = 32;

async fn seeded_catalog() -> Arc<MemoryCatalog> {
    let catalog = MemoryCatalog::from_seed(SeedData::default(), DIM).expect("catalog");
    catalog.add_supplier("s-rossi", "Rossi Distribuzione").await;
    let products = vec![
        json!({"id": "p1", "description": "Vino rosso toscano Chianti classico", "supplier_id": "s-rossi", "price": 14.0}),
        json!({"id": "p2", "description": "Vino rosso toscano Morellino", "price": 11.0}),
        json!({"id": "p3", "description": "Vino rosso toscano Brunello", "supplier_id": "s-rossi", "price": 45.0}),
        json!({"id": "p4", "description": "Pasta di semola spaghetti", "supplier_id": "s-rossi", "price": 1.5}),
        json!({"id": "p5", "description": "Pasta integrale penne", "price": 1.9}),
        json!({"id": "p6", "description": "Vino bianco toscano Vermentino", "price": 9.0}),
    ];
    catalog.insert_products(&products).await.expect("insert");
    let pending = catalog.pending_embeddings(100).await.expect("pending");
    let texts: Vec<String> = pending.iter().map(|p| p.text.clone()).collect();
    let vectors = FakeEmbedder::new(DIM).embed_batch(&texts).await.expect("embed");
    let pairs: Vec<_> = pending.into_iter().map(|p| p.id).zip(vectors).collect();
    catalog.store_embeddings(&pairs).await.expect("store");
    Arc::new(catalog)
}

async fn spawn_with(embedder: Arc<dyn Embedder>) -> String {
    let handles = CatalogHandles::from_shared(seeded_catalog().await);
    serve(SearchService::new(handles.oracle, handles.suppliers, embedder), handles.products).await
}

async fn serve(search: SearchService, products: Arc<dyn ProductStore>) -> String {
    let state = AppState::new(search, products, RequestDefaults::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move { axum::serve(listener, app_router(state)).await.expect("serve") });
    format!("http://{addr}")
}

async fn spawn() -> String { spawn_with(Arc::new(FakeEmbedder::new(DIM))).await }

async fn post(base: &str, path: &str, body: Value) -> (StatusCode, Value) {
    let resp = reqwest::Client::new().post(format!("{base}{path}")).json(&body).send().await.expect("request");
    let status = resp.status();
    (status, resp.json().await.expect("json body"))
}

fn result_ids(body: &Value) -> Vec<String> {
    body["results"].as_array().expect("results").iter().map(|r| r["id"].as_str().expect("id").to_string()).collect()
}

#[tokio::test]
async fn fts_search_is_ranked_and_capped() {
    let base = spawn().await;
    let (status, body) = post(&base, "/search", json!({"query": "vino rosso toscano", "mode": "fts", "limit": 2})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["query"], "vino rosso toscano");
    assert_eq!(body["mode"], "fts");
    let results = body["results"].as_array().expect("results");
    assert_eq!(body["count"].as_u64(), Some(results.len() as u64));
    assert_eq!(results.len(), 2);
    let scores: Vec<f64> = results.iter().map(|r| r["score"].as_f64().expect("score")).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]), "{scores:?}");
    assert!(results[0]["description"].as_str().is_some());
}

#[tokio::test]
async fn hybrid_without_credential_is_configuration_error() {
    let base = spawn_with(Arc::new(OpenAiEmbedder::new(None))).await;
    let (status, body) = post(&base, "/hybrid-search", json!({"query": "colazione dolce"})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().expect("error").contains("OPENAI_API_KEY"), "{body}");

    // lexical modes do not need the provider
    let (status, _) = post(&base, "/search", json!({"query": "pasta"})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn empty_import_is_rejected() {
    let base = spawn().await;
    let (status, body) = post(&base, "/import", json!({"products": []})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": EMPTY_IMPORT_MESSAGE}));
}

#[tokio::test]
async fn unknown_supplier_searches_unfiltered() {
    let base = spawn().await;
    let (s1, with_unknown) = post(&base, "/search", json!({"query": "pasta", "supplier": "nonexistent-xyz"})).await;
    let (s2, without) = post(&base, "/search", json!({"query": "pasta"})).await;
    assert_eq!((s1, s2), (StatusCode::OK, StatusCode::OK));
    assert_eq!(with_unknown["results"], without["results"]);
    assert_eq!(result_ids(&without).len(), 2);

    let (_, rossi) = post(&base, "/search", json!({"query": "pasta", "supplier": "rossi"})).await;
    assert_eq!(result_ids(&rossi), vec!["p4"]);
}

#[tokio::test]
async fn validation_failures_are_400() {
    let base = spawn().await;
    let (status, body) = post(&base, "/search", json!({"limit": 5})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], MISSING_QUERY_MESSAGE);

    for bad in [
        json!({"query": "pasta", "mode": "vector"}),
        json!({"query": "pasta", "price_min": 10, "price_max": 1}),
        json!({"query": "pasta", "unexpected": true}),
    ] {
        let (status, body) = post(&base, "/search", bad).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert!(body["error"].is_string());
    }

    let resp = reqwest::Client::new()
        .post(format!("{base}/search"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_post_is_405() {
    let base = spawn().await;
    for path in ["/search", "/hybrid-search", "/import"] {
        let resp = reqwest::get(format!("{base}{path}")).await.expect("request");
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body: Value = resp.json().await.expect("json");
        assert_eq!(body, json!({"error": "POST only"}));
    }
}

#[tokio::test]
async fn zero_lexical_weight_equals_semantic_mode() {
    let base = spawn().await;
    let (_, semantic) = post(&base, "/search", json!({"query": "vino toscano", "mode": "semantic", "limit": 4})).await;
    let (_, hybrid) = post(
        &base,
        "/search",
        json!({"query": "vino toscano", "mode": "hybrid", "fts_weight": 0, "semantic_weight": 1, "limit": 4}),
    )
    .await;
    assert_eq!(hybrid["mode"], "hybrid");
    assert_eq!(result_ids(&semantic), result_ids(&hybrid));
    assert_eq!(result_ids(&semantic).len(), 4);
}

#[tokio::test]
async fn hybrid_endpoint_returns_unique_results() {
    let base = spawn().await;
    let (status, body) = post(&base, "/hybrid-search", json!({"query": "vino rosso", "limit": 5})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "hybrid");
    let mut ids = result_ids(&body);
    let n = ids.len();
    assert!(n <= 5 && n > 0);
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), n);
}

#[tokio::test]
async fn import_then_search() {
    let base = spawn().await;
    let (status, body) = post(&base, "/import", json!({"products": [{"id": "n1", "description": "Farina di castagne"}]})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body, json!({"inserted": 1, "total_sent": 1}));

    let (_, found) = post(&base, "/search", json!({"query": "castagne"})).await;
    assert_eq!(result_ids(&found), vec!["n1"]);

    let (status, body) = post(&base, "/import", json!({"products": [{"id": "n1", "description": "again"}]})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().expect("error").contains("duplicate key"));
    assert_eq!(body["details"]["code"], "23505");
}

#[tokio::test]
async fn health_reports_ok() {
    let base = spawn().await;
    let body: Value = reqwest::get(format!("{base}/health")).await.expect("request").json().await.expect("json");
    assert_eq!(body, json!({"status": "ok", "service": "catalog-server"}));
}

/// An oracle whose every channel either errors or panics.
struct BrokenOracle { panics: bool }

impl BrokenOracle {
    fn fail(&self) -> Result<Vec<ScoredResult>> {
        if self.panics { panic!("index state corrupted") }
        Err(SearchError::retrieval("function search_products_fts(text) does not exist"))
    }
}

#[async_trait]
impl RetrievalOracle for BrokenOracle {
    async fn search_lexical(&self, _: &LexicalQuery<'_>) -> Result<Vec<ScoredResult>> { self.fail() }
    async fn search_fuzzy(&self, _: &FuzzyQuery<'_>) -> Result<Vec<ScoredResult>> { self.fail() }
    async fn search_semantic(&self, _: &SemanticQuery<'_>) -> Result<Vec<ScoredResult>> { self.fail() }
    async fn search_hybrid(&self, _: &HybridQuery<'_>) -> Result<Vec<ScoredResult>> { self.fail() }
}

async fn spawn_broken(panics: bool) -> String {
    let handles = CatalogHandles::from_shared(seeded_catalog().await);
    let search = SearchService::new(Arc::new(BrokenOracle { panics }), handles.suppliers, Arc::new(FakeEmbedder::new(DIM)));
    serve(search, handles.products).await
}

#[tokio::test]
async fn retrieval_failure_is_bad_request() {
    let base = spawn_broken(false).await;
    for (path, body) in [
        ("/search", json!({"query": "pasta", "mode": "fts"})),
        ("/search", json!({"query": "pasta", "mode": "semantic"})),
        ("/hybrid-search", json!({"query": "pasta"})),
    ] {
        let (status, body) = post(&base, path, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}: {body}");
        assert!(body["error"].as_str().expect("error").contains("does not exist"), "{body}");
    }
}

#[tokio::test]
async fn handler_panic_is_internal_error_envelope() {
    let base = spawn_broken(true).await;
    let (status, body) = post(&base, "/search", json!({"query": "pasta"})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Internal server error"}));

    // the server keeps serving after a panic
    let resp = reqwest::get(format!("{base}/health")).await.expect("health");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn provider_failure_is_bad_gateway() {
    let provider = Router::new().route(
        "/v1/embeddings",
        post_route(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": {"message": "overloaded"}}))) }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move { axum::serve(listener, provider).await.expect("serve") });

    let embedder = OpenAiEmbedder::new(Some("sk-test".into()))
        .with_endpoint(format!("http://{addr}/v1/embeddings"))
        .with_dimensions(DIM);
    let base = spawn_with(Arc::new(embedder)).await;
    let (status, body) = post(&base, "/hybrid-search", json!({"query": "vino rosso"})).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY, "{body}");
    assert!(body["error"].as_str().expect("error").contains("overloaded"), "{body}");
}
