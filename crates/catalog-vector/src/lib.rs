//! catalog-vector
//!
//! Exact (brute force) cosine similarity over product description embeddings.
//! Scores match pgvector's `1 - (a <=> b)`.

use anyhow::{bail, Result};
use std::collections::HashMap;
use tracing::debug;

pub struct VectorIndex {
    dim: usize,
    ids: Vec<String>,
    vectors: Vec<Vec<f32>>,
    positions: HashMap<String, usize>,
}

impl VectorIndex {
    pub fn new(dim: usize) -> Self { Self { dim, ids: Vec::new(), vectors: Vec::new(), positions: HashMap::new() } }

    pub fn dim(&self) -> usize { self.dim }
    pub fn len(&self) -> usize { self.ids.len() }
    pub fn is_empty(&self) -> bool { self.ids.is_empty() }
    pub fn contains(&self, id: &str) -> bool { self.positions.contains_key(id) }

    /// Insert or replace the vector stored for `id`.
    pub fn upsert(&mut self, id: &str, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dim { bail!("embedding for '{}' has dimension {}, index expects {}", id, vector.len(), self.dim); }
        match self.positions.get(id) {
            Some(&pos) => self.vectors[pos] = vector,
            None => {
                self.positions.insert(id.to_string(), self.ids.len());
                self.ids.push(id.to_string());
                self.vectors.push(vector);
            }
        }
        Ok(())
    }

    /// Top `limit` ids by cosine similarity among those `admit` accepts.
    /// Filtering happens before truncation; ties keep insertion order.
    pub fn search<F>(&self, query: &[f32], limit: usize, admit: F) -> Result<Vec<(String, f32)>>
    where
        F: Fn(&str) -> bool,
    {
        if query.len() != self.dim { bail!("query embedding has dimension {}, index expects {}", query.len(), self.dim); }
        let q_norm = norm(query);
        let mut scored: Vec<(usize, f32)> = self
            .ids
            .iter()
            .enumerate()
            .filter(|(_, id)| admit(id))
            .map(|(i, _)| (i, cosine(query, q_norm, &self.vectors[i])))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(limit);
        debug!(candidates = self.ids.len(), returned = scored.len(), "vector search");
        Ok(scored.into_iter().map(|(i, s)| (self.ids[i].clone(), s)).collect())
    }
}

fn norm(v: &[f32]) -> f32 { v.iter().map(|x| x * x).sum::<f32>().sqrt() }

fn cosine(q: &[f32], q_norm: f32, v: &[f32]) -> f32 {
    let denom = q_norm * norm(v);
    if denom <= f32::EPSILON { return 0.0; }
    q.iter().zip(v).map(|(a, b)| a * b).sum::<f32>() / denom
}
