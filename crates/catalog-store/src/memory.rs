//! In-process catalog: Tantivy for the lexical channel, trigram similarity
//! for fuzzy matching, brute-force cosine for the semantic channel and
//! two-call fusion for hybrid. Used for local development and tests.

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

use catalog_core::traits::{ProductStore, RetrievalOracle, SupplierDirectory};
use catalog_core::types::{
    Attributes, EmbeddingVector, FuzzyQuery, HybridQuery, LexicalQuery, PendingEmbedding, PriceRange, ProductId, ScoredResult,
    SemanticQuery, Supplier, SupplierFilter, SupplierId,
};
use catalog_core::{Result, SearchError};
use catalog_hybrid::fuse;
use catalog_text::{similarity, ProductTextIndex};
use catalog_vector::VectorIndex;

/// Seed file layout: `{"suppliers": [{"id", "name"}], "products": [...]}`.
#[derive(Debug, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub suppliers: Vec<Supplier>,
    #[serde(default)]
    pub products: Vec<Value>,
}

struct StoredProduct {
    id: ProductId,
    description: String,
    supplier_id: Option<String>,
    price: Option<f64>,
    attributes: Attributes,
    has_embedding: bool,
}

impl StoredProduct {
    fn passes(&self, supplier: &SupplierFilter, price: PriceRange) -> bool {
        supplier.admits(self.supplier_id.as_deref()) && price.contains(self.price)
    }

    fn scored(&self, score: f32) -> ScoredResult { ScoredResult::new(self.id.clone(), score, self.attributes.clone()) }
}

struct State {
    products: Vec<StoredProduct>,
    positions: HashMap<ProductId, usize>,
    suppliers: Vec<Supplier>,
    text: ProductTextIndex,
    vectors: VectorIndex,
}

pub struct MemoryCatalog {
    dim: usize,
    state: RwLock<State>,
}

fn insert_error(message: impl Into<String>, code: &str) -> SearchError {
    SearchError::Insert { message: message.into(), details: Some(json!({ "code": code })) }
}

impl State {
    fn lexical(&self, text: &str, supplier: &SupplierFilter, price: PriceRange, limit: usize) -> Result<Vec<ScoredResult>> {
        let hits = self.text.search_all(text).map_err(|e| SearchError::retrieval(format!("full-text search failed: {e}")))?;
        Ok(hits
            .into_iter()
            .filter_map(|(id, score)| self.positions.get(&id).map(|&pos| (&self.products[pos], score)))
            .filter(|(p, _)| p.passes(supplier, price))
            .take(limit)
            .map(|(p, score)| p.scored(score))
            .collect())
    }

    fn semantic(&self, embedding: &EmbeddingVector, supplier: &SupplierFilter, price: PriceRange, limit: usize) -> Result<Vec<ScoredResult>> {
        let admit = |id: &str| self.positions.get(id).is_some_and(|&pos| self.products[pos].passes(supplier, price));
        let hits = self
            .vectors
            .search(embedding.as_slice(), limit, admit)
            .map_err(|e| SearchError::retrieval(e.to_string()))?;
        Ok(hits
            .into_iter()
            .filter_map(|(id, score)| self.positions.get(&id).map(|&pos| self.products[pos].scored(score)))
            .collect())
    }

    /// Validate the whole batch first so a bad record stores nothing.
    fn insert(&mut self, dim: usize, products: &[Value]) -> Result<usize> {
        let mut staged = Vec::with_capacity(products.len());
        let mut batch_ids = HashSet::new();
        for (i, product) in products.iter().enumerate() {
            let Some(obj) = product.as_object() else {
                return Err(insert_error(format!("product #{i} is not a JSON object"), "22023"));
            };
            let id = match obj.get("id") {
                None | Some(Value::Null) => uuid::Uuid::new_v4().to_string(),
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                Some(_) => return Err(insert_error(format!("product #{i}: 'id' must be a string"), "22P02")),
            };
            if self.positions.contains_key(&id) || !batch_ids.insert(id.clone()) {
                return Err(insert_error(
                    format!("duplicate key value violates unique constraint \"products_pkey\" (id={id})"),
                    "23505",
                ));
            }
            let Some(description) = obj.get("description").and_then(Value::as_str) else {
                return Err(insert_error(format!("product #{i}: 'description' must be a string"), "23502"));
            };
            let supplier_id = match obj.get("supplier_id") {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(_) => return Err(insert_error(format!("product #{i}: 'supplier_id' must be a string"), "22P02")),
            };
            let price = match obj.get("price") {
                None | Some(Value::Null) => None,
                Some(Value::Number(n)) => n.as_f64(),
                Some(_) => return Err(insert_error(format!("product #{i}: 'price' must be a number"), "22P02")),
            };
            let embedding = match obj.get("embedding") {
                None | Some(Value::Null) => None,
                Some(Value::Array(values)) => {
                    let vector: Option<Vec<f32>> = values.iter().map(|v| v.as_f64().map(|x| x as f32)).collect();
                    match vector {
                        Some(v) if v.len() == dim => Some(v),
                        Some(v) => {
                            return Err(insert_error(format!("expected {dim} dimensions, not {}", v.len()), "22000"));
                        }
                        None => return Err(insert_error(format!("product #{i}: 'embedding' must be numeric"), "22P02")),
                    }
                }
                Some(_) => return Err(insert_error(format!("product #{i}: 'embedding' must be an array"), "22P02")),
            };
            let mut attributes = obj.clone();
            attributes.remove("embedding");
            staged.push((
                StoredProduct {
                    id,
                    description: description.to_string(),
                    supplier_id,
                    price,
                    attributes,
                    has_embedding: embedding.is_some(),
                },
                embedding,
            ));
        }

        self.text
            .upsert(staged.iter().map(|(p, _)| (p.id.as_str(), p.description.as_str())))
            .map_err(|e| insert_error(format!("indexing failed: {e}"), "XX000"))?;
        let count = staged.len();
        for (product, embedding) in staged {
            if let Some(vector) = embedding {
                self.vectors.upsert(&product.id, vector).map_err(|e| insert_error(e.to_string(), "22000"))?;
            }
            self.positions.insert(product.id.clone(), self.products.len());
            self.products.push(product);
        }
        Ok(count)
    }
}

impl MemoryCatalog {
    pub fn new(dim: usize) -> anyhow::Result<Self> {
        let state = State {
            products: Vec::new(),
            positions: HashMap::new(),
            suppliers: Vec::new(),
            text: ProductTextIndex::new()?,
            vectors: VectorIndex::new(dim),
        };
        Ok(Self { dim, state: RwLock::new(state) })
    }

    pub fn from_seed(seed: SeedData, dim: usize) -> anyhow::Result<Self> {
        let mut catalog = Self::new(dim)?;
        let state = catalog.state.get_mut();
        state.suppliers = seed.suppliers;
        let inserted = state.insert(dim, &seed.products)?;
        info!(suppliers = state.suppliers.len(), products = inserted, "memory catalog seeded");
        Ok(catalog)
    }

    pub fn from_seed_file(path: &Path, dim: usize) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading seed file {}", path.display()))?;
        let seed: SeedData = serde_json::from_str(&raw).with_context(|| format!("parsing seed file {}", path.display()))?;
        Self::from_seed(seed, dim)
    }

    pub async fn add_supplier(&self, id: impl Into<String>, name: impl Into<String>) {
        self.state.write().await.suppliers.push(Supplier { id: SupplierId::new(id), name: name.into() });
    }

    pub async fn product_count(&self) -> usize { self.state.read().await.products.len() }

    fn check_dim(&self, embedding: &EmbeddingVector) -> Result<()> {
        if embedding.dim() == self.dim { return Ok(()); }
        Err(SearchError::retrieval(format!("different vector dimensions {} and {}", self.dim, embedding.dim())))
    }
}

#[async_trait]
impl SupplierDirectory for MemoryCatalog {
    async fn find_supplier(&self, fragment: &str) -> Result<Option<SupplierId>> {
        let needle = fragment.to_lowercase();
        let state = self.state.read().await;
        Ok(state.suppliers.iter().find(|s| s.name.to_lowercase().contains(&needle)).map(|s| s.id.clone()))
    }

    async fn list_suppliers(&self) -> Result<Vec<Supplier>> {
        let mut suppliers = self.state.read().await.suppliers.clone();
        suppliers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(suppliers)
    }
}

#[async_trait]
impl RetrievalOracle for MemoryCatalog {
    async fn search_lexical(&self, q: &LexicalQuery<'_>) -> Result<Vec<ScoredResult>> {
        self.state.read().await.lexical(q.text, q.supplier, q.price, q.limit)
    }

    /// Trigram similarity against the description; no supplier or price filter.
    async fn search_fuzzy(&self, q: &FuzzyQuery<'_>) -> Result<Vec<ScoredResult>> {
        let state = self.state.read().await;
        let mut scored: Vec<(usize, f32)> = state
            .products
            .iter()
            .enumerate()
            .map(|(i, p)| (i, similarity(&p.description, q.text)))
            .filter(|(_, s)| *s > q.threshold)
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(q.limit);
        Ok(scored.into_iter().map(|(i, s)| state.products[i].scored(s)).collect())
    }

    async fn search_semantic(&self, q: &SemanticQuery<'_>) -> Result<Vec<ScoredResult>> {
        self.check_dim(q.embedding)?;
        self.state.read().await.semantic(q.embedding, q.supplier, q.price, q.limit)
    }

    /// Two independent channel calls fused in process. Each channel fetches
    /// twice the limit so fusion has room to reorder.
    async fn search_hybrid(&self, q: &HybridQuery<'_>) -> Result<Vec<ScoredResult>> {
        let fetch = q.limit.saturating_mul(2);
        let state = self.state.read().await;
        let lexical = if q.weights.fts > 0.0 { state.lexical(q.text, q.supplier, q.price, fetch)? } else { Vec::new() };
        let semantic = if q.weights.semantic > 0.0 {
            self.check_dim(q.embedding)?;
            state.semantic(q.embedding, q.supplier, q.price, fetch)?
        } else {
            Vec::new()
        };
        debug!(lexical = lexical.len(), semantic = semantic.len(), fts = q.weights.fts, sem = q.weights.semantic, "hybrid channels");
        Ok(fuse(lexical, semantic, q.weights, q.limit).into_vec())
    }
}

#[async_trait]
impl ProductStore for MemoryCatalog {
    async fn insert_products(&self, products: &[Value]) -> Result<usize> {
        let inserted = self.state.write().await.insert(self.dim, products)?;
        debug!(inserted, "inserted products");
        Ok(inserted)
    }

    async fn pending_embeddings(&self, limit: usize) -> Result<Vec<PendingEmbedding>> {
        let state = self.state.read().await;
        Ok(state
            .products
            .iter()
            .filter(|p| !p.has_embedding)
            .take(limit)
            .map(|p| PendingEmbedding { id: p.id.clone(), text: p.description.clone() })
            .collect())
    }

    async fn count_pending_embeddings(&self) -> Result<usize> {
        Ok(self.state.read().await.products.iter().filter(|p| !p.has_embedding).count())
    }

    async fn store_embeddings(&self, embeddings: &[(ProductId, EmbeddingVector)]) -> Result<usize> {
        for (_, embedding) in embeddings { self.check_dim(embedding)?; }
        let mut state = self.state.write().await;
        let mut updated = 0;
        for (id, embedding) in embeddings {
            let Some(&pos) = state.positions.get(id) else { continue };
            state.vectors.upsert(id, embedding.as_slice().to_vec()).map_err(|e| SearchError::retrieval(e.to_string()))?;
            state.products[pos].has_embedding = true;
            updated += 1;
        }
        Ok(updated)
    }
}
