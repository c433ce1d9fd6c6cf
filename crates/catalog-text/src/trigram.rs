//! Trigram similarity with the semantics of PostgreSQL's `pg_trgm`.
//!
//! Text is lowercased and split into alphanumeric words; each word is padded
//! with two leading blanks and one trailing blank before its three-character
//! windows are taken. Similarity is the Jaccard ratio of the two trigram sets.

use std::collections::BTreeSet;

pub fn trigrams(text: &str) -> BTreeSet<String> {
	let mut out = BTreeSet::new();
	let lowered = text.to_lowercase();
	for word in lowered.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
		let padded: Vec<char> = "  ".chars().chain(word.chars()).chain(" ".chars()).collect();
		for window in padded.windows(3) { out.insert(window.iter().collect()); }
	}
	out
}

pub fn similarity(a: &str, b: &str) -> f32 {
	let (ta, tb) = (trigrams(a), trigrams(b));
	if ta.is_empty() || tb.is_empty() { return 0.0; }
	let shared = ta.intersection(&tb).count();
	let union = ta.len() + tb.len() - shared;
	shared as f32 / union as f32
}
