use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::{
    EmbeddingVector, FuzzyQuery, HybridQuery, LexicalQuery, PendingEmbedding, ProductId,
    ScoredResult, SemanticQuery, Supplier, SupplierId,
};

/// Text → vector adapter. One attempt per call; retry policies wrap this trait.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<EmbeddingVector>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Supplier name lookup.
#[async_trait]
pub trait SupplierDirectory: Send + Sync {
    /// Case-insensitive substring match on the supplier name; at most one id.
    async fn find_supplier(&self, fragment: &str) -> Result<Option<SupplierId>>;

    /// Every known supplier, by name. Directories that cannot enumerate return none.
    async fn list_suppliers(&self) -> Result<Vec<Supplier>> { Ok(Vec::new()) }
}

/// The scoring oracles. Each returns `(product, score)` rows ranked best first.
#[async_trait]
pub trait RetrievalOracle: Send + Sync {
    async fn search_lexical(&self, query: &LexicalQuery<'_>) -> Result<Vec<ScoredResult>>;
    async fn search_fuzzy(&self, query: &FuzzyQuery<'_>) -> Result<Vec<ScoredResult>>;
    async fn search_semantic(&self, query: &SemanticQuery<'_>) -> Result<Vec<ScoredResult>>;
    async fn search_hybrid(&self, query: &HybridQuery<'_>) -> Result<Vec<ScoredResult>>;
}

/// Write side of the record store: bulk import and embedding backfill.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Insert product records; returns how many rows were stored.
    async fn insert_products(&self, products: &[Value]) -> Result<usize>;
    /// Products whose description has no embedding yet, oldest first.
    async fn pending_embeddings(&self, limit: usize) -> Result<Vec<PendingEmbedding>>;
    async fn count_pending_embeddings(&self) -> Result<usize>;
    async fn store_embeddings(&self, embeddings: &[(ProductId, EmbeddingVector)]) -> Result<usize>;
}
