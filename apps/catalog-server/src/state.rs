use std::sync::Arc;
use tracing::{info, warn};

use catalog_core::config::{Settings, StoreBackend};
use catalog_core::request::RequestDefaults;
use catalog_core::traits::ProductStore;
use catalog_embed::get_default_embedder;
use catalog_hybrid::SearchService;
use catalog_store::{backfill_embeddings, open_catalog};

const STARTUP_BACKFILL_BATCH: usize = 100;

/// Everything a handler needs. Built once at startup; handlers only read it.
#[derive(Clone)]
pub struct AppState {
    pub search: Arc<SearchService>,
    pub products: Arc<dyn ProductStore>,
    pub defaults: RequestDefaults,
}

impl AppState {
    pub fn new(search: SearchService, products: Arc<dyn ProductStore>, defaults: RequestDefaults) -> Self {
        Self { search: Arc::new(search), products, defaults }
    }

    /// Opens the configured backend. The memory backend has nowhere to keep
    /// embeddings between runs, so seeded products are embedded here.
    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let handles = open_catalog(settings).await?;
        let embedder = get_default_embedder(&settings.embedding);
        if settings.store.backend == StoreBackend::Memory {
            match backfill_embeddings(handles.products.as_ref(), embedder.as_ref(), STARTUP_BACKFILL_BATCH, |_| {}).await {
                Ok(total) => info!(total, "embedded seeded products"),
                Err(e) => warn!(error = %e, "could not embed seeded products; semantic search will miss them"),
            }
        }
        let search = SearchService::new(handles.oracle, handles.suppliers, embedder)
            .with_fuzzy_threshold(settings.search.fuzzy_threshold);
        Ok(Self::new(search, handles.products, RequestDefaults::from(&settings.search)))
    }
}
