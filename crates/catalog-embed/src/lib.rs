//! catalog-embed
//!
//! Embedding provider adapters. `OpenAiEmbedder` is the production provider;
//! `FakeEmbedder` gives fast, deterministic vectors for development and tests
//! and is selected with `APP_USE_FAKE_EMBEDDINGS=1`.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use catalog_core::config::EmbeddingSettings;
use catalog_core::types::EmbeddingVector;
use catalog_core::Result;

pub use catalog_core::traits::Embedder;

pub mod openai;

pub use openai::OpenAiEmbedder;

/// Hashes whitespace tokens into buckets and L2-normalizes. Texts that share
/// words get a positive cosine similarity.
pub struct FakeEmbedder { dim: usize }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    pub fn embed_sync(&self, text: &str) -> EmbeddingVector {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.to_lowercase().split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        EmbeddingVector::new(v)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> { Ok(self.embed_sync(text)) }
}

pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Arc<dyn Embedder> {
    if use_fake_embeddings() {
        info!(dim = settings.dimensions, "using FakeEmbedder");
        return Arc::new(FakeEmbedder::new(settings.dimensions));
    }
    let embedder = OpenAiEmbedder::from_settings(settings);
    info!(model = %settings.model, credential = embedder.has_credential(), "using OpenAI embeddings");
    Arc::new(embedder)
}
