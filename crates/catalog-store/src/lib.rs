//! catalog-store
//!
//! Record store backends. `PgCatalog` talks to the production Postgres schema;
//! `MemoryCatalog` implements the same traits in process. Both serve as
//! retrieval oracle, supplier directory and product store.

use anyhow::Context;
use std::sync::Arc;
use tracing::info;

use catalog_core::config::{expand_path, Settings, StoreBackend};
use catalog_core::traits::{Embedder, ProductStore, RetrievalOracle, SupplierDirectory};

pub mod memory;
pub mod postgres;

pub use memory::{MemoryCatalog, SeedData};
pub use postgres::PgCatalog;

/// One backend seen through each of its roles.
#[derive(Clone)]
pub struct CatalogHandles {
    pub oracle: Arc<dyn RetrievalOracle>,
    pub suppliers: Arc<dyn SupplierDirectory>,
    pub products: Arc<dyn ProductStore>,
}

impl CatalogHandles {
    pub fn from_shared<T>(catalog: Arc<T>) -> Self
    where
        T: RetrievalOracle + SupplierDirectory + ProductStore + 'static,
    {
        Self { oracle: catalog.clone(), suppliers: catalog.clone(), products: catalog }
    }
}

/// Open the backend selected by `store.backend`.
pub async fn open_catalog(settings: &Settings) -> anyhow::Result<CatalogHandles> {
    let store = &settings.store;
    match store.backend {
        StoreBackend::Postgres => {
            let url = store.database_url.as_deref().context("store.database_url (or DATABASE_URL) is not set")?;
            let catalog = PgCatalog::connect(url, store.max_connections).await.context("connecting to Postgres")?;
            info!(max_connections = store.max_connections, "postgres catalog ready");
            Ok(CatalogHandles::from_shared(Arc::new(catalog)))
        }
        StoreBackend::Memory => {
            let dim = settings.embedding.dimensions;
            let catalog = match store.seed_file.as_deref() {
                Some(path) => MemoryCatalog::from_seed_file(&expand_path(path), dim)?,
                None => MemoryCatalog::new(dim)?,
            };
            info!(dim, seeded = store.seed_file.is_some(), "memory catalog ready");
            Ok(CatalogHandles::from_shared(Arc::new(catalog)))
        }
    }
}

/// Progress of one embedding backfill round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillRound {
    pub round: usize,
    pub stored: usize,
    pub total: usize,
    pub remaining: usize,
}

/// Embed products that have no embedding yet, `batch` at a time, until none
/// remain or a round stores nothing. A failed round stops the run.
pub async fn backfill_embeddings<F>(
    store: &dyn ProductStore,
    embedder: &dyn Embedder,
    batch: usize,
    mut on_round: F,
) -> catalog_core::Result<usize>
where
    F: FnMut(BackfillRound),
{
    let mut total = 0;
    let mut round = 0;
    loop {
        let pending = store.pending_embeddings(batch.max(1)).await?;
        if pending.is_empty() { break; }
        round += 1;
        let texts: Vec<String> = pending.iter().map(|p| p.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await?;
        let pairs: Vec<_> = pending.into_iter().map(|p| p.id).zip(vectors).collect();
        let stored = store.store_embeddings(&pairs).await?;
        total += stored;
        let remaining = store.count_pending_embeddings().await?;
        on_round(BackfillRound { round, stored, total, remaining });
        if remaining == 0 || stored == 0 { break; }
    }
    Ok(total)
}
