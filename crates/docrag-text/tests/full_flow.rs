use std::fs;

use docrag_core::config::ChunkingConfig;
use docrag_core::data_processor::DataProcessor;
use docrag_text::LexicalIndex;
use tempfile::TempDir;

#[test]
fn lexical_full_flow() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("fire.txt"), "Building a fire needs tinder, kindling and fuel.\n\nKeep the fire small.").unwrap();
    fs::write(dir.join("water.md"), "# Water\n\nBoil water for one minute before drinking.").unwrap();
    fs::write(dir.join("net.txt"), "Computer networking basics: routers and switches.").unwrap();

    let chunks = DataProcessor::new(ChunkingConfig::default()).unwrap().process_directory(dir).unwrap().chunks;
    let index = LexicalIndex::build(&chunks).expect("index");
    assert_eq!(index.len(), chunks.len());

    for (q, expected) in [("fire", "fire.txt"), ("networking", "net.txt"), ("boil water", "water.md")] {
        let results = index.query(q, 10).expect("search");
        eprintln!("q='{}' -> {} hits", q, results.len());
        assert!(!results.is_empty());
        assert!(results[0].chunk.doc_path.ends_with(expected));
        for pair in results.windows(2) { assert!(pair[0].score >= pair[1].score); }
    }
}
