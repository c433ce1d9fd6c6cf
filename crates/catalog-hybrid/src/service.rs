use std::sync::Arc;
use tracing::{debug, info};

use catalog_core::request::SearchRequest;
use catalog_core::traits::{Embedder, RetrievalOracle, SupplierDirectory};
use catalog_core::types::{
    FuzzyQuery, HybridQuery, LexicalQuery, RankedResultSet, ScoredResult, SearchMode, SemanticQuery, DEFAULT_FUZZY_THRESHOLD,
};
use catalog_core::Result;

use crate::resolver::SupplierResolver;

/// Result of one search: the echoed query, the mode that ran and the ranked list.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub query: String,
    pub mode: SearchMode,
    pub results: RankedResultSet,
}

impl SearchOutcome {
    pub fn count(&self) -> usize { self.results.len() }
}

/// Mode router. `fts` and `fuzzy` go straight to their oracle; `semantic` and
/// `hybrid` resolve the supplier and embed the query concurrently first.
pub struct SearchService {
    oracle: Arc<dyn RetrievalOracle>,
    resolver: SupplierResolver,
    embedder: Arc<dyn Embedder>,
    fuzzy_threshold: f32,
}

impl SearchService {
    pub fn new(oracle: Arc<dyn RetrievalOracle>, suppliers: Arc<dyn SupplierDirectory>, embedder: Arc<dyn Embedder>) -> Self {
        Self { oracle, resolver: SupplierResolver::new(suppliers), embedder, fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD }
    }

    pub fn with_fuzzy_threshold(mut self, threshold: f32) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        debug!(mode = %request.mode, query = %request.query, supplier = ?request.supplier, "search request");
        let rows = match request.mode {
            SearchMode::Fts => self.lexical(request).await?,
            SearchMode::Fuzzy => self.fuzzy(request).await?,
            SearchMode::Semantic => self.semantic(request).await?,
            SearchMode::Hybrid => self.hybrid(request).await?,
        };
        let fetched = rows.len();
        let results = RankedResultSet::from_ranked(rows, request.limit);
        info!(mode = %request.mode, fetched, count = results.len(), limit = request.limit, "search completed");
        Ok(SearchOutcome { query: request.query.clone(), mode: request.mode, results })
    }

    async fn lexical(&self, request: &SearchRequest) -> Result<Vec<ScoredResult>> {
        let supplier = self.resolver.resolve(request.supplier.as_deref()).await?;
        let query = LexicalQuery { text: &request.query, supplier: &supplier, price: request.price, limit: request.limit };
        self.oracle.search_lexical(&query).await
    }

    async fn fuzzy(&self, request: &SearchRequest) -> Result<Vec<ScoredResult>> {
        let query = FuzzyQuery { text: &request.query, threshold: self.fuzzy_threshold, limit: request.limit };
        self.oracle.search_fuzzy(&query).await
    }

    async fn semantic(&self, request: &SearchRequest) -> Result<Vec<ScoredResult>> {
        let (supplier, embedding) =
            tokio::try_join!(self.resolver.resolve(request.supplier.as_deref()), self.embedder.embed(&request.query))?;
        let query = SemanticQuery { embedding: &embedding, supplier: &supplier, price: request.price, limit: request.limit };
        self.oracle.search_semantic(&query).await
    }

    async fn hybrid(&self, request: &SearchRequest) -> Result<Vec<ScoredResult>> {
        let (supplier, embedding) =
            tokio::try_join!(self.resolver.resolve(request.supplier.as_deref()), self.embedder.embed(&request.query))?;
        let query = HybridQuery {
            text: &request.query,
            embedding: &embedding,
            supplier: &supplier,
            price: request.price,
            weights: request.weights,
            limit: request.limit,
        };
        self.oracle.search_hybrid(&query).await
    }
}
