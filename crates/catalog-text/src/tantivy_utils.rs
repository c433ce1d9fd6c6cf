use tantivy::schema::{IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{AsciiFoldingFilter, Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

pub const ANALYZER_NAME: &str = "italian_products";

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	let _id_field = schema_builder.add_text_field("id", STRING | STORED);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(ANALYZER_NAME).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing);
	let _text_field = schema_builder.add_text_field("text", text_options);
	schema_builder.build()
}

/// Italian analyzer: stop words are dropped before stemming, accents are folded last
/// so "caffè" and "caffe" meet on the same term.
pub fn register_tokenizer(index: &Index) {
	let stop_words = vec![
		"a","ad","al","alla","alle","agli","ai","all","allo","anche","che","chi","ci","con","col","come","da","dal","dalla","dalle","dagli","dai","dallo","del","della","delle","degli","dei","dello","di","e","ed","gli","ha","hanno","ho","i","il","in","la","le","lo","ma","mi","ne","nel","nella","nelle","negli","nei","nello","non","o","per","più","quale","quando","questa","questi","questo","se","si","sono","su","sul","sulla","sulle","sugli","sui","sullo","tra","fra","un","una","uno","è",
	];
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(RemoveLongFilter::limit(40))
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.into_iter().map(|s| s.to_string())))
		.filter(Stemmer::new(Language::Italian))
		.filter(AsciiFoldingFilter)
		.build();
	index.tokenizers().register(ANALYZER_NAME, tokenizer);
}
