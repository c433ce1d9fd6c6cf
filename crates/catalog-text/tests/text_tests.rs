use catalog_text::ProductTextIndex;

fn seeded() -> ProductTextIndex {
    let index = ProductTextIndex::new().expect("index");
    let docs = [
        ("p1", "Vino rosso toscano Chianti classico"),
        ("p2", "Vino bianco frizzante"),
        ("p3", "Caffè in grani tostatura media"),
        ("p4", "Pasta di semola di grano duro, rigatoni"),
    ];
    let n = index.upsert(docs.iter().map(|(id, text)| (*id, *text))).expect("upsert");
    assert_eq!(n, 4);
    index
}

#[test]
fn finds_stemmed_terms() {
    let index = seeded();
    // "vini" and "rossi" stem to the same roots as "vino rosso"
    let hits = index.search("vini rossi", 10).expect("search");
    eprintln!("hits={hits:?}");
    assert_eq!(hits.first().map(|h| h.0.as_str()), Some("p1"));
}

#[test]
fn all_terms_must_match() {
    let index = seeded();
    let hits = index.search("vino frizzante", 10).expect("search");
    let ids: Vec<&str> = hits.iter().map(|h| h.0.as_str()).collect();
    assert_eq!(ids, vec!["p2"]);
}

#[test]
fn accents_fold() {
    let index = seeded();
    let hits = index.search("caffe", 10).expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0, "p3");
}

#[test]
fn stop_words_and_bad_syntax_do_not_fail() {
    let index = seeded();
    assert!(index.search("di", 10).expect("stop word only").is_empty());
    let hits = index.search("pasta (rigatoni", 10).expect("lenient");
    assert!(hits.iter().any(|h| h.0 == "p4"));
    assert!(index.search("   ", 10).expect("blank").is_empty());
}

#[test]
fn upsert_replaces_existing_id() {
    let index = seeded();
    index.upsert([("p2", "Olio extravergine di oliva")]).expect("replace");
    assert_eq!(index.num_docs(), 4);
    assert!(index.search("frizzante", 10).expect("search").is_empty());
    assert_eq!(index.search("olio", 10).expect("search")[0].0, "p2");
}

#[test]
fn search_all_ignores_limit_and_ranks() {
    let index = seeded();
    let hits = index.search_all("vino").expect("search");
    assert_eq!(hits.len(), 2);
    assert!(hits[0].1 >= hits[1].1);
    assert_eq!(index.search("vino", 1).expect("search").len(), 1);
}
