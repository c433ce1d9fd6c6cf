use anyhow::{anyhow, Result};
use std::sync::Mutex;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Value};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::debug;

use crate::tantivy_utils::{build_schema, register_tokenizer};

const WRITER_MEMORY_BYTES: usize = 15_000_000;

/// RAM-resident full-text index keyed by product id. Re-adding an id replaces
/// the previous document.
pub struct ProductTextIndex {
	index: Index,
	reader: IndexReader,
	writer: Mutex<IndexWriter>,
	id_field: Field,
	text_field: Field,
}

impl ProductTextIndex {
	pub fn new() -> Result<Self> {
		let schema = build_schema();
		let index = Index::create_in_ram(schema.clone());
		register_tokenizer(&index);
		let id_field = schema.get_field("id")?;
		let text_field = schema.get_field("text")?;
		let writer = index.writer_with_num_threads(1, WRITER_MEMORY_BYTES)?;
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
		Ok(Self { index, reader, writer: Mutex::new(writer), id_field, text_field })
	}

	/// Index `(id, text)` pairs and make them visible to the next search.
	pub fn upsert<'a, I>(&self, docs: I) -> Result<usize>
	where
		I: IntoIterator<Item = (&'a str, &'a str)>,
	{
		let mut writer = self.writer.lock().map_err(|_| anyhow!("text index writer lock poisoned"))?;
		let mut count = 0;
		for (id, text) in docs {
			writer.delete_term(Term::from_field_text(self.id_field, id));
			writer.add_document(doc!(self.id_field => id, self.text_field => text))?;
			count += 1;
		}
		writer.commit()?;
		self.reader.reload()?;
		Ok(count)
	}

	pub fn num_docs(&self) -> u64 { self.reader.searcher().num_docs() }

	/// Ranked `(id, bm25)` pairs. Every query term must match; syntax the
	/// parser cannot read is skipped instead of failing the search.
	pub fn search(&self, query: &str, limit: usize) -> Result<Vec<(String, f32)>> {
		if limit == 0 || query.trim().is_empty() { return Ok(Vec::new()); }
		let searcher = self.reader.searcher();
		let mut qp = QueryParser::for_index(&self.index, vec![self.text_field]);
		qp.set_conjunction_by_default();
		let (q, errors) = qp.parse_query_lenient(query);
		if !errors.is_empty() { debug!(query, skipped = errors.len(), "lenient query parse"); }
		let top_docs = searcher.search(&q, &TopDocs::with_limit(limit))?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			if let Some(id) = doc.get_first(self.id_field).and_then(|v| v.as_str()) { hits.push((id.to_string(), score)); }
		}
		Ok(hits)
	}

	/// Every matching document, best first.
	pub fn search_all(&self, query: &str) -> Result<Vec<(String, f32)>> {
		let total = usize::try_from(self.num_docs()).unwrap_or(usize::MAX).max(1);
		self.search(query, total)
	}
}
