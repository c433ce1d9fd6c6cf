//! Request-scoped domain types shared by the oracles, the fusion engine and
//! the HTTP surface.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

use crate::error::{Result, SearchError};

pub type ProductId = String;
pub type Attributes = Map<String, Value>;

pub const DEFAULT_LIMIT: usize = 20;
pub const DEFAULT_FTS_WEIGHT: f32 = 0.4;
pub const DEFAULT_SEMANTIC_WEIGHT: f32 = 0.6;
/// Minimum trigram similarity admitted by the fuzzy oracle.
pub const DEFAULT_FUZZY_THRESHOLD: f32 = 0.15;

/// Row fields accepted as the relevance score, in order of preference.
pub const SCORE_FIELDS: [&str; 4] = ["score", "combined_score", "similarity", "rank"];

/// Opaque supplier identity (a UUID in the Postgres schema).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplierId(String);

impl SupplierId {
    pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for SupplierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Outcome of supplier resolution. An unmatched name is `Unfiltered`, never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SupplierFilter {
    #[default]
    Unfiltered,
    Supplier(SupplierId),
}

impl SupplierFilter {
    pub fn supplier_id(&self) -> Option<&SupplierId> {
        match self {
            Self::Unfiltered => None,
            Self::Supplier(id) => Some(id),
        }
    }


    /// Whether a product owned by `supplier_id` passes this filter.
    pub fn admits(&self, supplier_id: Option<&str>) -> bool {
        match self {
            Self::Unfiltered => true,
            Self::Supplier(id) => supplier_id == Some(id.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Fts,
    Fuzzy,
    Semantic,
    Hybrid,
}

impl SearchMode {
    pub const ALL: [SearchMode; 4] = [Self::Fts, Self::Fuzzy, Self::Semantic, Self::Hybrid];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fts => "fts",
            Self::Fuzzy => "fuzzy",
            Self::Semantic => "semantic",
            Self::Hybrid => "hybrid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == value)
    }

    /// Modes that need a query embedding before retrieval.
    pub fn needs_embedding(&self) -> bool { matches!(self, Self::Semantic | Self::Hybrid) }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Inclusive price bounds. A product without a price never passes a bounded range.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self { Self { min, max } }

    pub fn is_unbounded(&self) -> bool { self.min.is_none() && self.max.is_none() }

    pub fn contains(&self, price: Option<f64>) -> bool {
        if self.is_unbounded() { return true; }
        let Some(price) = price else { return false };
        self.min.map_or(true, |min| price >= min) && self.max.map_or(true, |max| price <= max)
    }
}

/// Free, non-negative channel multipliers. They are not required to sum to 1,
/// and a weight of exactly zero removes its channel from the fusion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub fts: f32,
    pub semantic: f32,
}

impl FusionWeights {
    pub fn new(fts: f32, semantic: f32) -> Self { Self { fts, semantic } }
    pub fn lexical_only() -> Self { Self::new(1.0, 0.0) }
    pub fn semantic_only() -> Self { Self::new(0.0, 1.0) }
}

impl Default for FusionWeights {
    fn default() -> Self { Self::new(DEFAULT_FTS_WEIGHT, DEFAULT_SEMANTIC_WEIGHT) }
}

/// Query embedding. Produced once per request and consumed by one oracle call.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    pub fn new(values: Vec<f32>) -> Self { Self(values) }
    pub fn dim(&self) -> usize { self.0.len() }
    pub fn as_slice(&self) -> &[f32] { &self.0 }

    /// Text form accepted by the pgvector `vector` input function, e.g. `[0.1,0.2]`.
    pub fn to_pgvector_literal(&self) -> String {
        let parts: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        format!("[{}]", parts.join(","))
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(values: Vec<f32>) -> Self { Self(values) }
}

/// One retrieved product. Only `id` and `score` are interpreted; the rest of
/// the record travels through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredResult {
    pub id: ProductId,
    pub score: f32,
    pub attributes: Attributes,
}

impl ScoredResult {
    pub fn new(id: impl Into<ProductId>, score: f32, mut attributes: Attributes) -> Self {
        attributes.remove("id");
        attributes.remove("score");
        Self { id: id.into(), score, attributes }
    }

    /// Convert an oracle row (a JSON object) into a result.
    ///
    /// Identity comes from `id`; the score is the first numeric field listed
    /// in [`SCORE_FIELDS`], or 0 when the row carries none.
    pub fn from_row(row: Value) -> Result<Self> {
        let Value::Object(mut attributes) = row else {
            return Err(SearchError::retrieval("retrieval row is not a JSON object"));
        };
        let id = match attributes.remove("id") {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(SearchError::retrieval("retrieval row has no 'id'")),
        };
        let score = SCORE_FIELDS
            .iter()
            .find_map(|field| attributes.get(*field).and_then(Value::as_f64))
            .unwrap_or(0.0) as f32;
        Ok(Self::new(id, score, attributes))
    }
}

impl Serialize for ScoredResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.attributes.len() + 2))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("score", &self.score)?;
        for (key, value) in &self.attributes {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Final ordered result list: at most `limit` entries, unique product ids.
///
/// The input order is trusted as the ranking; duplicates keep their first
/// (best ranked) occurrence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedResultSet {
    results: Vec<ScoredResult>,
}

impl RankedResultSet {
    pub fn from_ranked<I>(ranked: I, limit: usize) -> Self
    where
        I: IntoIterator<Item = ScoredResult>,
    {
        let mut seen = HashSet::new();
        let results = ranked
            .into_iter()
            .filter(|r| seen.insert(r.id.clone()))
            .take(limit)
            .collect();
        Self { results }
    }

    pub fn len(&self) -> usize { self.results.len() }
    pub fn is_empty(&self) -> bool { self.results.is_empty() }
    pub fn iter(&self) -> std::slice::Iter<'_, ScoredResult> { self.results.iter() }
    pub fn as_slice(&self) -> &[ScoredResult] { &self.results }
    pub fn into_vec(self) -> Vec<ScoredResult> { self.results }
    pub fn ids(&self) -> Vec<&str> { self.results.iter().map(|r| r.id.as_str()).collect() }
}

impl Serialize for RankedResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.results.serialize(serializer)
    }
}

/// Lexical (full-text) oracle request.
#[derive(Debug, Clone, Copy)]
pub struct LexicalQuery<'a> {
    pub text: &'a str,
    pub supplier: &'a SupplierFilter,
    pub price: PriceRange,
    pub limit: usize,
}

/// Fuzzy oracle request. Takes no supplier or price filters.
#[derive(Debug, Clone, Copy)]
pub struct FuzzyQuery<'a> {
    pub text: &'a str,
    pub threshold: f32,
    pub limit: usize,
}

/// Vector-similarity oracle request.
#[derive(Debug, Clone, Copy)]
pub struct SemanticQuery<'a> {
    pub embedding: &'a EmbeddingVector,
    pub supplier: &'a SupplierFilter,
    pub price: PriceRange,
    pub limit: usize,
}

/// Combined retrieval request: the oracle returns results already fused as
/// `fts * lexical + semantic * semantic_score` over normalized channel scores.
#[derive(Debug, Clone, Copy)]
pub struct HybridQuery<'a> {
    pub text: &'a str,
    pub embedding: &'a EmbeddingVector,
    pub supplier: &'a SupplierFilter,
    pub price: PriceRange,
    pub weights: FusionWeights,
    pub limit: usize,
}

/// A product still waiting for its description embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEmbedding {
    pub id: ProductId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
}
