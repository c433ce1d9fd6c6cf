use std::{env, path::PathBuf};
use indicatif::{ProgressBar, ProgressStyle};

use catalog_core::config::{expand_path, Config};
use catalog_core::data_processor::DataProcessor;
use catalog_server::init_tracing;
use catalog_store::open_catalog;

const DEFAULT_JSON_FILE: &str = "all_products.json";

fn usage_exit(msg: &str) -> ! {
    eprintln!("Error: {msg}");
    eprintln!("Usage: catalog-import [--json-file <path>] [--batch-size <n>] [--dry-run]");
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("warn");
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let args: Vec<String> = env::args().skip(1).collect();
    let mut dry_run = false; let mut json_file = None; let mut batch_size = None;
    let mut i = 0; while i < args.len() { match args[i].as_str() {
        "--dry-run" | "-n" => dry_run = true,
        "--json-file" => { i += 1; json_file = Some(args.get(i).cloned().unwrap_or_else(|| usage_exit("--json-file requires a path"))); }
        "--batch-size" => { i += 1; batch_size = Some(args.get(i).and_then(|v| v.parse::<usize>().ok()).unwrap_or_else(|| usage_exit("--batch-size requires a number"))); }
        other if !other.starts_with('-') => json_file = Some(other.to_string()),
        other => usage_exit(&format!("unknown flag {other}")) } i += 1; }

    let processor = batch_size.map_or_else(DataProcessor::new, DataProcessor::with_batch_size);
    let requested: PathBuf = expand_path(json_file.as_deref().unwrap_or(DEFAULT_JSON_FILE));
    let Some(path) = processor.resolve_products_file(&requested) else {
        eprintln!("❌ {} not found (also looked under data/)", requested.display());
        std::process::exit(1);
    };

    println!("📦 Catalog import\n================");
    println!("Source: {}", path.display());
    let products = processor.load_products(&path)?;
    println!("Loaded {} products", products.len());

    let settings = config.settings()?;
    let catalog = match open_catalog(&settings).await {
        Ok(catalog) => Some(catalog),
        Err(e) if dry_run => { println!("⚠️  Catalog unavailable ({e}); showing supplier ids"); None }
        Err(e) => return Err(e),
    };
    let suppliers = match &catalog {
        Some(c) => c.suppliers.list_suppliers().await.unwrap_or_else(|e| { println!("⚠️  Could not list suppliers: {e}"); Vec::new() }),
        None => Vec::new(),
    };
    println!("\nProducts per supplier:");
    for (supplier, count) in processor.supplier_summary(&products, &suppliers) { println!("  {supplier}: {count}"); }
    let Some(catalog) = catalog.filter(|_| !dry_run) else { println!("\n⚠️  Dry run: nothing inserted"); return Ok(()); };
    let batches = processor.batch_count(products.len());
    println!("\nInserting in {} batches of up to {}", batches, processor.batch_size());
    let pb = ProgressBar::new(products.len() as u64);
    pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} products ({percent}%) {msg}")?.progress_chars("#>-"));

    let mut inserted = 0usize; let mut failed_batches = 0usize;
    for (n, batch) in processor.batches(&products).enumerate() {
        match catalog.products.insert_products(batch).await {
            Ok(count) => inserted += count,
            Err(e) => { failed_batches += 1; pb.println(format!("❌ batch {}/{} failed: {}", n + 1, batches, e)); }
        }
        pb.inc(batch.len() as u64);
        pb.set_message(format!("batch {}/{}", n + 1, batches));
    }
    pb.finish_with_message("done");

    println!("\n📊 Inserted {} of {} products", inserted, products.len());
    if failed_batches > 0 { println!("⚠️  {} batch(es) failed", failed_batches); } else { println!("✅ Import completed successfully!"); }
    Ok(())
}
