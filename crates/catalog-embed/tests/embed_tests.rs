use axum::{http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};

use catalog_core::config::EmbeddingSettings;
use catalog_core::SearchError;
use catalog_embed::openai::MISSING_KEY_MESSAGE;
use catalog_embed::{get_default_embedder, Embedder, FakeEmbedder, OpenAiEmbedder};

async fn mock_provider(status: StatusCode, body: Value) -> String {
    let app = Router::new().route("/v1/embeddings", post(move || async move { (status, Json(body)) }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve") });
    format!("http://{addr}/v1/embeddings")
}

#[tokio::test]
async fn fake_embedder_shapes_and_determinism() {
    // Force fake embedder to avoid any network call
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");
    let settings = EmbeddingSettings { dimensions: 64, ..EmbeddingSettings::default() };

    let embedder = get_default_embedder(&settings);
    let texts = vec!["olio extravergine".to_string(), "olio extravergine".to_string()];
    let embs = embedder.embed_batch(&texts).await.expect("embed_batch");
    let (v1, v2) = (embs[0].as_slice(), embs[1].as_slice());

    assert_eq!(v1.len(), 64, "embedding dim follows settings");
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[tokio::test]
async fn fake_embedder_handles_empty_text() {
    let v = FakeEmbedder::new(8).embed("").await.expect("embed");
    assert_eq!(v.dim(), 8);
    assert!(v.as_slice().iter().all(|x| *x == 0.0));
}

#[tokio::test]
async fn missing_key_is_auth_failure() {
    let embedder = OpenAiEmbedder::new(None);
    match embedder.embed("pasta").await {
        Err(SearchError::ProviderAuth(msg)) => assert_eq!(msg, MISSING_KEY_MESSAGE),
        other => panic!("expected auth failure, got {other:?}"),
    }
    // Blank keys count as missing.
    assert!(!OpenAiEmbedder::new(Some("  ".into())).has_credential());
}

#[tokio::test]
async fn rejected_key_is_auth_failure() {
    let url = mock_provider(StatusCode::UNAUTHORIZED, json!({"error": {"message": "Incorrect API key"}})).await;
    let embedder = OpenAiEmbedder::new(Some("sk-bad".into())).with_endpoint(url);
    let err = embedder.embed("pasta").await.expect_err("401");
    assert!(matches!(err, SearchError::ProviderAuth(ref m) if m.contains("Incorrect API key")), "{err:?}");
}

#[tokio::test]
async fn provider_error_is_upstream_failure() {
    let url = mock_provider(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": {"message": "overloaded"}})).await;
    let embedder = OpenAiEmbedder::new(Some("sk-test".into())).with_endpoint(url);
    match embedder.embed("pasta").await {
        Err(SearchError::ProviderUpstream(msg)) => {
            assert!(msg.starts_with("OpenAI embedding failed"), "{msg}");
            assert!(msg.contains("overloaded"), "{msg}");
        }
        other => panic!("expected upstream failure, got {other:?}"),
    }
}

#[tokio::test]
async fn response_is_reordered_by_index() {
    let body = json!({"data": [
        {"index": 1, "embedding": [0.0, 1.0, 0.0]},
        {"index": 0, "embedding": [1.0, 0.0, 0.0]}
    ]});
    let url = mock_provider(StatusCode::OK, body).await;
    let embedder = OpenAiEmbedder::new(Some("sk-test".into())).with_endpoint(url).with_dimensions(3);
    let out = embedder.embed_batch(&["a".to_string(), "b".to_string()]).await.expect("batch");
    assert_eq!(out[0].as_slice(), &[1.0, 0.0, 0.0]);
    assert_eq!(out[1].as_slice(), &[0.0, 1.0, 0.0]);
}

#[tokio::test]
async fn wrong_dimension_is_upstream_failure() {
    let url = mock_provider(StatusCode::OK, json!({"data": [{"index": 0, "embedding": [1.0, 2.0]}]})).await;
    let embedder = OpenAiEmbedder::new(Some("sk-test".into())).with_endpoint(url);
    let err = embedder.embed("pasta").await.expect_err("dimension");
    assert!(matches!(err, SearchError::ProviderUpstream(_)));
}
