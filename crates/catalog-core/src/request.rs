//! Query normalizer: closed request schemas, defaults and validation.
//!
//! Bodies are parsed fail-closed: unknown fields, wrong JSON types and
//! malformed JSON are validation errors rather than silent defaults.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, SearchError};
use crate::types::{FusionWeights, PriceRange, SearchMode, DEFAULT_LIMIT};

pub const MISSING_QUERY_MESSAGE: &str = "Provide a 'query' field";
pub const EMPTY_IMPORT_MESSAGE: &str = "Provide a non-empty 'products' array";
pub const DEFAULT_MAX_LIMIT: usize = 100;

/// Body of `POST /search`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchBody {
    pub query: Option<String>,
    pub supplier: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub limit: Option<i64>,
    pub mode: Option<String>,
    pub fts_weight: Option<f64>,
    pub semantic_weight: Option<f64>,
}

/// Body of `POST /hybrid-search`; there is no mode, it always fuses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HybridSearchBody {
    pub query: Option<String>,
    pub supplier: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub limit: Option<i64>,
    pub fts_weight: Option<f64>,
    pub semantic_weight: Option<f64>,
}

/// Defaults and bounds applied while normalizing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestDefaults {
    pub limit: usize,
    pub max_limit: usize,
    pub weights: FusionWeights,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self { limit: DEFAULT_LIMIT, max_limit: DEFAULT_MAX_LIMIT, weights: FusionWeights::default() }
    }
}

/// A validated, fully defaulted search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub supplier: Option<String>,
    pub price: PriceRange,
    pub limit: usize,
    pub mode: SearchMode,
    pub weights: FusionWeights,
}

impl SearchRequest {
    pub fn parse_search(body: &[u8], defaults: &RequestDefaults) -> Result<Self> {
        Self::from_search_body(parse_body(body)?, defaults)
    }

    pub fn parse_hybrid(body: &[u8], defaults: &RequestDefaults) -> Result<Self> {
        Self::from_hybrid_body(parse_body(body)?, defaults)
    }

    pub fn from_search_body(body: SearchBody, defaults: &RequestDefaults) -> Result<Self> {
        let mode = match body.mode.as_deref() {
            None => SearchMode::default(),
            Some(raw) => SearchMode::parse(raw).ok_or_else(|| {
                SearchError::validation(format!(
                    "Unsupported mode '{raw}'; expected one of fts, fuzzy, semantic, hybrid"
                ))
            })?,
        };
        Self::build(
            Fields {
                query: body.query,
                supplier: body.supplier,
                price_min: body.price_min,
                price_max: body.price_max,
                limit: body.limit,
                fts_weight: body.fts_weight,
                semantic_weight: body.semantic_weight,
            },
            mode,
            defaults,
        )
    }

    pub fn from_hybrid_body(body: HybridSearchBody, defaults: &RequestDefaults) -> Result<Self> {
        Self::build(
            Fields {
                query: body.query,
                supplier: body.supplier,
                price_min: body.price_min,
                price_max: body.price_max,
                limit: body.limit,
                fts_weight: body.fts_weight,
                semantic_weight: body.semantic_weight,
            },
            SearchMode::Hybrid,
            defaults,
        )
    }

    fn build(fields: Fields, mode: SearchMode, defaults: &RequestDefaults) -> Result<Self> {
        let query = match fields.query {
            Some(q) if !q.trim().is_empty() => q,
            _ => return Err(SearchError::validation(MISSING_QUERY_MESSAGE)),
        };
        let supplier = fields.supplier.filter(|s| !s.trim().is_empty());

        let price_min = non_negative("price_min", fields.price_min)?;
        let price_max = non_negative("price_max", fields.price_max)?;
        if let (Some(min), Some(max)) = (price_min, price_max) {
            if min > max {
                return Err(SearchError::validation(format!(
                    "'price_min' ({min}) must not exceed 'price_max' ({max})"
                )));
            }
        }

        let limit = match fields.limit {
            None => defaults.limit,
            Some(n) if n < 1 => return Err(SearchError::validation("'limit' must be a positive integer")),
            Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
        };
        if limit > defaults.max_limit {
            return Err(SearchError::validation(format!(
                "'limit' must not exceed {}",
                defaults.max_limit
            )));
        }

        let weights = FusionWeights::new(
            weight("fts_weight", fields.fts_weight)?.unwrap_or(defaults.weights.fts),
            weight("semantic_weight", fields.semantic_weight)?.unwrap_or(defaults.weights.semantic),
        );

        Ok(Self { query, supplier, price: PriceRange::new(price_min, price_max), limit, mode, weights })
    }
}

struct Fields {
    query: Option<String>,
    supplier: Option<String>,
    price_min: Option<f64>,
    price_max: Option<f64>,
    limit: Option<i64>,
    fts_weight: Option<f64>,
    semantic_weight: Option<f64>,
}

/// Parse the body of `POST /import` into its product records.
pub fn parse_import(body: &[u8]) -> Result<Vec<Value>> {
    let mut body: Value = parse_body(body)?;
    match body.get_mut("products").map(Value::take) {
        Some(Value::Array(products)) if !products.is_empty() => Ok(products),
        _ => Err(SearchError::validation(EMPTY_IMPORT_MESSAGE)),
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| SearchError::validation(format!("Invalid request body: {e}")))
}

fn non_negative(field: &str, value: Option<f64>) -> Result<Option<f64>> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => {
            Err(SearchError::validation(format!("'{field}' must be a non-negative number")))
        }
        other => Ok(other),
    }
}

/// Weights are fused as `f32`; a value must survive the narrowing unchanged
/// in sign and finiteness so a zero weight means exactly "skip the channel".
fn weight(field: &str, value: Option<f64>) -> Result<Option<f32>> {
    let Some(wide) = non_negative(field, value)? else { return Ok(None) };
    #[allow(clippy::cast_possible_truncation)]
    let narrow = wide as f32;
    if !narrow.is_finite() || (narrow == 0.0 && wide != 0.0) {
        return Err(SearchError::validation(format!("'{field}' is out of range")));
    }
    Ok(Some(narrow))
}
