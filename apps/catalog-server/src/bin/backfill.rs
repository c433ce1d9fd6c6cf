use std::env;

use catalog_core::config::Config;
use catalog_embed::get_default_embedder;
use catalog_server::init_tracing;
use catalog_store::{backfill_embeddings, open_catalog};

const DEFAULT_BATCH: usize = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("warn");
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let args: Vec<String> = env::args().skip(1).collect();
    let batch = match args.iter().position(|a| a == "--batch-size") {
        Some(i) => match args.get(i + 1).and_then(|v| v.parse::<usize>().ok()).filter(|n| *n > 0) {
            Some(n) => n,
            None => { eprintln!("Error: --batch-size requires a positive number"); std::process::exit(1); }
        },
        None => DEFAULT_BATCH,
    };

    let catalog = open_catalog(&settings).await?;
    let embedder = get_default_embedder(&settings.embedding);
    println!("🧮 Embedding backfill\n====================");
    println!("Model: {} ({} dims), batch of {}", settings.embedding.model, embedder.dim(), batch);
    println!("Pending: {}\n", catalog.products.count_pending_embeddings().await?);

    let total = backfill_embeddings(catalog.products.as_ref(), embedder.as_ref(), batch, |r| {
        println!("  Round {}: +{} (total: {}, remaining: {})", r.round, r.stored, r.total, r.remaining);
    })
    .await?;
    println!("\n✅ Done! Total embeddings generated: {}", total);
    Ok(())
}
