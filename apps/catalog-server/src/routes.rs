use std::any::Any;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use catalog_core::request::{parse_import, SearchRequest};
use catalog_core::SearchError;

use crate::error::{error_response, ApiError};
use crate::response::{ImportResponse, SearchResponse};
use crate::state::AppState;

const IMPORT_BODY_LIMIT: usize = 32 * 1024 * 1024;

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers(AnyOrigin);

    Router::new()
        .route("/health", get(health))
        .route("/search", post(search).fallback(method_not_allowed))
        .route("/hybrid-search", post(hybrid_search).fallback(method_not_allowed))
        .route("/import", post(import).fallback(method_not_allowed).layer(DefaultBodyLimit::max(IMPORT_BODY_LIMIT)))
        .fallback(not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status":"ok","service":"catalog-server"}))
}

async fn search(State(state): State<AppState>, body: Result<Bytes, BytesRejection>) -> Result<Json<SearchResponse>, ApiError> {
    let body = body.map_err(unreadable_body)?;
    let request = SearchRequest::parse_search(&body, &state.defaults)?;
    let outcome = state.search.search(&request).await?;
    Ok(Json(outcome.into()))
}

async fn hybrid_search(State(state): State<AppState>, body: Result<Bytes, BytesRejection>) -> Result<Json<SearchResponse>, ApiError> {
    let body = body.map_err(unreadable_body)?;
    let request = SearchRequest::parse_hybrid(&body, &state.defaults)?;
    let outcome = state.search.search(&request).await?;
    Ok(Json(outcome.into()))
}

async fn import(State(state): State<AppState>, body: Result<Bytes, BytesRejection>) -> Result<Json<ImportResponse>, ApiError> {
    let body = body.map_err(unreadable_body)?;
    let products = parse_import(&body)?;
    let inserted = state.products.insert_products(&products).await?;
    info!(inserted, total_sent = products.len(), "import completed");
    Ok(Json(ImportResponse { inserted, total_sent: products.len() }))
}

async fn method_not_allowed() -> Response { error_response(StatusCode::METHOD_NOT_ALLOWED, "POST only") }

async fn not_found() -> Response { error_response(StatusCode::NOT_FOUND, "Not found") }

fn unreadable_body(rejection: BytesRejection) -> ApiError {
    ApiError(SearchError::validation(format!("Invalid request body: {}", rejection.body_text())))
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| payload.downcast_ref::<&str>().map(|s| (*s).to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());
    error!(%detail, "handler panicked");
    ApiError(SearchError::Unexpected("Internal server error".to_string())).into_response()
}
