use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::Supplier;

pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Loads product records for bulk import and splits them into insert batches.
#[derive(Debug, Clone)]
pub struct DataProcessor {
    batch_size: usize,
}

impl Default for DataProcessor {
    fn default() -> Self { Self { batch_size: DEFAULT_BATCH_SIZE } }
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_batch_size(batch_size: usize) -> Self { Self { batch_size: batch_size.max(1) } }

    pub fn batch_size(&self) -> usize { self.batch_size }

    /// Locate the products file: the path itself, or the same name under `data/`.
    pub fn resolve_products_file(&self, path: &Path) -> Option<PathBuf> {
        if path.exists() { return Some(path.to_path_buf()); }
        let alt = Path::new("data").join(path);
        if alt.exists() { Some(alt) } else { None }
    }

    /// Read a JSON array of product objects.
    pub fn load_products(&self, path: &Path) -> Result<Vec<Value>> {
        let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let parsed: Value = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        let Value::Array(products) = parsed else {
            return Err(anyhow!("{} must contain a JSON array of products", path.display()));
        };
        if let Some(pos) = products.iter().position(|p| !p.is_object()) {
            return Err(anyhow!("product #{} in {} is not a JSON object", pos, path.display()));
        }
        Ok(products)
    }

    pub fn batches<'a>(&self, products: &'a [Value]) -> std::slice::Chunks<'a, Value> { products.chunks(self.batch_size) }

    pub fn batch_count(&self, total: usize) -> usize { total.div_ceil(self.batch_size) }

    /// Products per `supplier_id`, largest group first (ties by id).
    pub fn supplier_counts(&self, products: &[Value]) -> Vec<(String, usize)> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for p in products {
            let sid = p.get("supplier_id").and_then(Value::as_str).unwrap_or("(none)").to_string();
            *counts.entry(sid).or_insert(0) += 1;
        }
        let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }

    /// `supplier_counts` with ids replaced by supplier names where known.
    pub fn supplier_summary(&self, products: &[Value], suppliers: &[Supplier]) -> Vec<(String, usize)> {
        let names: HashMap<&str, &str> = suppliers.iter().map(|s| (s.id.as_str(), s.name.as_str())).collect();
        self.supplier_counts(products)
            .into_iter()
            .map(|(id, count)| (names.get(id.as_str()).map_or(id.clone(), |n| (*n).to_string()), count))
            .collect()
    }
}
