use tantivy::schema::{IndexRecordOption, Schema, TextFieldIndexing, TextOptions, INDEXED, STORED};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

pub const TOKENIZER_NAME: &str = "text_with_stopwords";

/// `ordinal` points back into the chunk vector held next to the index;
/// `text` is the BM25-scored body.
pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_u64_field("ordinal", INDEXED | STORED);
	let text_field_indexing = TextFieldIndexing::default()
		.set_tokenizer(TOKENIZER_NAME)
		.set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing);
	schema_builder.add_text_field("text", text_options);
	schema_builder.build()
}

pub fn register_tokenizer(index: &Index) {
	let stop_words = [
		"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
	];
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.into_iter().map(str::to_string)))
		.build();
	index.tokenizers().register(TOKENIZER_NAME, tokenizer);
}
