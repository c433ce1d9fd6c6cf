//! Postgres backend (Supabase schema: `products`, `suppliers`, pgvector and the
//! `search_products_*` SQL functions).
//!
//! Lexical, fuzzy and hybrid scoring run inside the database functions; the
//! semantic channel queries pgvector directly.

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::collections::BTreeSet;
use tracing::debug;

use catalog_core::traits::{ProductStore, RetrievalOracle, SupplierDirectory};
use catalog_core::types::{
    EmbeddingVector, FuzzyQuery, HybridQuery, LexicalQuery, PendingEmbedding, ProductId, ScoredResult, SemanticQuery, Supplier, SupplierId,
};
use catalog_core::{Result, SearchError};

const FTS_SQL: &str = "SELECT to_jsonb(r) AS row FROM search_products_fts(\
        search_query => $1, supplier_filter => $2::text::uuid, \
        price_min => $3::float8::numeric, price_max => $4::float8::numeric, result_limit => $5::int4) AS r";

const FUZZY_SQL: &str = "SELECT to_jsonb(r) AS row FROM search_products_fuzzy(\
        search_query => $1, similarity_threshold => $2::float8, result_limit => $3::int4) AS r";

const HYBRID_SQL: &str = "SELECT to_jsonb(r) AS row FROM search_products_hybrid(\
        search_text => $1, query_embedding => $2::text::vector, supplier_filter => $3::text::uuid, \
        price_min => $4::float8::numeric, price_max => $5::float8::numeric, \
        fts_weight => $6::float8, semantic_weight => $7::float8, result_limit => $8::int4) AS r";

// cosine distance `<=>`; score = 1 - distance
const SEMANTIC_SQL: &str = "SELECT (to_jsonb(p) - 'embedding') || jsonb_build_object('score', 1 - (p.embedding <=> $1::text::vector)) AS row \
        FROM products p \
        WHERE p.embedding IS NOT NULL \
          AND ($2::text IS NULL OR p.supplier_id = $2::text::uuid) \
          AND ($3::float8 IS NULL OR p.price >= $3::float8) \
          AND ($4::float8 IS NULL OR p.price <= $4::float8) \
        ORDER BY p.embedding <=> $1::text::vector \
        LIMIT $5";

const SUPPLIER_SQL: &str = "SELECT id::text AS id FROM suppliers WHERE name ILIKE $1 ESCAPE '\\' LIMIT 1";

const SUPPLIER_LIST_SQL: &str = "SELECT id::text AS id, name FROM suppliers ORDER BY name";

const PENDING_SQL: &str = "SELECT id::text AS id, description FROM products \
        WHERE embedding IS NULL AND description IS NOT NULL ORDER BY id LIMIT $1";

const PENDING_COUNT_SQL: &str = "SELECT COUNT(*) AS n FROM products WHERE embedding IS NULL AND description IS NOT NULL";

const STORE_EMBEDDING_SQL: &str = "UPDATE products SET embedding = $1::text::vector WHERE id::text = $2";

pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub async fn connect(database_url: &str, max_connections: u32) -> std::result::Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(database_url).await?;
        Ok(Self { pool })
    }

    fn map_err(e: sqlx::Error) -> SearchError {
        match e {
            sqlx::Error::Database(db) => SearchError::Retrieval(db.message().to_string()),
            other => SearchError::Retrieval(other.to_string()),
        }
    }

    fn insert_err(e: sqlx::Error) -> SearchError {
        match e {
            sqlx::Error::Database(db) => SearchError::Insert {
                message: db.message().to_string(),
                details: Some(json!({ "code": db.code(), "constraint": db.constraint(), "table": db.table() })),
            },
            other => SearchError::Insert { message: other.to_string(), details: None },
        }
    }

    fn rows_to_results(rows: Vec<PgRow>) -> Result<Vec<ScoredResult>> {
        rows.into_iter()
            .map(|row| {
                let value: Value = row.try_get("row").map_err(Self::map_err)?;
                ScoredResult::from_row(value)
            })
            .collect()
    }
}

/// Escape `%`, `_` and `\` so the fragment matches literally inside `%...%`.
pub fn like_pattern(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len() + 2);
    out.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') { out.push('\\'); }
        out.push(c);
    }
    out.push('%');
    out
}

/// Column names usable as SQL identifiers: ASCII alphanumerics and `_` only.
pub fn sanitize_column(name: &str) -> Option<String> {
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then(|| name.to_string())
}

fn limit_param(limit: usize) -> i64 { i64::try_from(limit).unwrap_or(i64::MAX) }

#[async_trait]
impl SupplierDirectory for PgCatalog {
    async fn find_supplier(&self, fragment: &str) -> Result<Option<SupplierId>> {
        let row = sqlx::query(SUPPLIER_SQL)
            .bind(like_pattern(fragment))
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::map_err)?;
        row.map(|r| r.try_get::<String, _>("id").map(SupplierId::new)).transpose().map_err(Self::map_err)
    }

    async fn list_suppliers(&self) -> Result<Vec<Supplier>> {
        let rows = sqlx::query(SUPPLIER_LIST_SQL).fetch_all(&self.pool).await.map_err(Self::map_err)?;
        rows.iter()
            .map(|r| Ok(Supplier { id: SupplierId::new(r.try_get::<String, _>("id")?), name: r.try_get("name")? }))
            .collect::<std::result::Result<_, sqlx::Error>>()
            .map_err(Self::map_err)
    }
}

#[async_trait]
impl RetrievalOracle for PgCatalog {
    async fn search_lexical(&self, q: &LexicalQuery<'_>) -> Result<Vec<ScoredResult>> {
        let rows = sqlx::query(FTS_SQL)
            .bind(q.text)
            .bind(q.supplier.supplier_id().map(SupplierId::as_str))
            .bind(q.price.min)
            .bind(q.price.max)
            .bind(limit_param(q.limit))
            .fetch_all(&self.pool)
            .await
            .map_err(Self::map_err)?;
        debug!(rows = rows.len(), "search_products_fts");
        Self::rows_to_results(rows)
    }

    async fn search_fuzzy(&self, q: &FuzzyQuery<'_>) -> Result<Vec<ScoredResult>> {
        let rows = sqlx::query(FUZZY_SQL)
            .bind(q.text)
            .bind(f64::from(q.threshold))
            .bind(limit_param(q.limit))
            .fetch_all(&self.pool)
            .await
            .map_err(Self::map_err)?;
        debug!(rows = rows.len(), "search_products_fuzzy");
        Self::rows_to_results(rows)
    }

    async fn search_semantic(&self, q: &SemanticQuery<'_>) -> Result<Vec<ScoredResult>> {
        let rows = sqlx::query(SEMANTIC_SQL)
            .bind(q.embedding.to_pgvector_literal())
            .bind(q.supplier.supplier_id().map(SupplierId::as_str))
            .bind(q.price.min)
            .bind(q.price.max)
            .bind(limit_param(q.limit))
            .fetch_all(&self.pool)
            .await
            .map_err(Self::map_err)?;
        debug!(rows = rows.len(), "pgvector semantic search");
        Self::rows_to_results(rows)
    }

    async fn search_hybrid(&self, q: &HybridQuery<'_>) -> Result<Vec<ScoredResult>> {
        let rows = sqlx::query(HYBRID_SQL)
            .bind(q.text)
            .bind(q.embedding.to_pgvector_literal())
            .bind(q.supplier.supplier_id().map(SupplierId::as_str))
            .bind(q.price.min)
            .bind(q.price.max)
            .bind(f64::from(q.weights.fts))
            .bind(f64::from(q.weights.semantic))
            .bind(limit_param(q.limit))
            .fetch_all(&self.pool)
            .await
            .map_err(Self::map_err)?;
        debug!(rows = rows.len(), "search_products_hybrid");
        Self::rows_to_results(rows)
    }
}

#[async_trait]
impl ProductStore for PgCatalog {
    /// One statement per batch, so the batch is stored entirely or not at all.
    /// Only columns present in the batch are written; the rest take table defaults.
    async fn insert_products(&self, products: &[Value]) -> Result<usize> {
        if products.is_empty() { return Ok(0); }
        let mut columns = BTreeSet::new();
        for product in products {
            let Some(obj) = product.as_object() else {
                return Err(SearchError::insert("every product must be a JSON object"));
            };
            for key in obj.keys() {
                let column = sanitize_column(key)
                    .ok_or_else(|| SearchError::insert(format!("invalid product field name '{key}'")))?;
                columns.insert(column);
            }
        }
        if columns.is_empty() { return Err(SearchError::insert("products carry no fields")); }
        let column_list = columns.iter().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(", ");
        let sql = format!(
            "INSERT INTO products ({column_list}) \
             SELECT {column_list} FROM jsonb_populate_recordset(NULL::products, $1::jsonb) \
             RETURNING id::text"
        );
        let rows = sqlx::query(&sql)
            .bind(Value::Array(products.to_vec()))
            .fetch_all(&self.pool)
            .await
            .map_err(Self::insert_err)?;
        debug!(inserted = rows.len(), columns = columns.len(), "inserted products");
        Ok(rows.len())
    }

    async fn pending_embeddings(&self, limit: usize) -> Result<Vec<PendingEmbedding>> {
        let rows = sqlx::query(PENDING_SQL)
            .bind(limit_param(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(Self::map_err)?;
        rows.iter()
            .map(|r| Ok(PendingEmbedding { id: r.try_get("id")?, text: r.try_get("description")? }))
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(Self::map_err)
    }

    async fn count_pending_embeddings(&self) -> Result<usize> {
        let n: i64 = sqlx::query(PENDING_COUNT_SQL)
            .fetch_one(&self.pool)
            .await
            .map_err(Self::map_err)?
            .try_get("n")
            .map_err(Self::map_err)?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    async fn store_embeddings(&self, embeddings: &[(ProductId, EmbeddingVector)]) -> Result<usize> {
        let mut tx = self.pool.begin().await.map_err(Self::map_err)?;
        let mut updated = 0u64;
        for (id, embedding) in embeddings {
            updated += sqlx::query(STORE_EMBEDDING_SQL)
                .bind(embedding.to_pgvector_literal())
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(Self::map_err)?
                .rows_affected();
        }
        tx.commit().await.map_err(Self::map_err)?;
        Ok(usize::try_from(updated).unwrap_or(usize::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("Rossi"), "%Rossi%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn column_names_are_restricted() {
        assert_eq!(sanitize_column("supplier_id").as_deref(), Some("supplier_id"));
        assert!(sanitize_column("price; DROP TABLE products").is_none());
        assert!(sanitize_column("").is_none());
    }
}
