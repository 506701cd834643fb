use std::fs::{self, OpenOptions};
use std::io::Write;

use corpus_core::{DocumentTokens, TokenRecord};
use corpus_engine::{latest_by_doc, read_sink, JsonlSink, SinkError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn doc(doc_id: u64, words: &[&str]) -> DocumentTokens {
    DocumentTokens {
        doc_id,
        relative_path: format!("{doc_id}.txt"),
        tokens: words.iter().map(|w| TokenRecord::new(*w, "kanji")).collect(),
    }
}

#[test]
fn appends_one_line_per_document_and_preserves_prior_output() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("out").join("tokens.jsonl");

    let mut sink = JsonlSink::open(&path, false).unwrap();
    sink.append(&doc(1, &["犬", "歩"])).unwrap();
    drop(sink);

    let mut sink = JsonlSink::open(&path, true).unwrap();
    sink.append(&doc(2, &[])).unwrap();
    assert_eq!(sink.appended(), 1);
    drop(sink);

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        r#"{"doc_id":1,"relative_path":"1.txt","tokens":[{"word":"犬","pos":"kanji"},{"word":"歩","pos":"kanji"}]}"#
    );
    assert_eq!(lines[1], r#"{"doc_id":2,"relative_path":"2.txt","tokens":[]}"#);

    let contents = read_sink(&path).unwrap();
    assert_eq!(contents.records, vec![doc(1, &["犬", "歩"]), doc(2, &[])]);
    assert!(!contents.discarded_tail);
}

#[test]
fn missing_sink_reads_as_empty() {
    let temp = TempDir::new().unwrap();
    let contents = read_sink(&temp.path().join("none.jsonl")).unwrap();
    assert!(contents.records.is_empty());
}

#[test]
fn malformed_final_line_is_discarded() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tokens.jsonl");
    let mut sink = JsonlSink::open(&path, false).unwrap();
    sink.append(&doc(1, &["犬"])).unwrap();
    drop(sink);

    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(br#"{"doc_id":2,"relative_pa"#).unwrap();
    drop(file);

    let contents = read_sink(&path).unwrap();
    assert_eq!(contents.records, vec![doc(1, &["犬"])]);
    assert!(contents.discarded_tail);
}

#[test]
fn reopening_cuts_a_torn_record_before_appending() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tokens.jsonl");
    let mut sink = JsonlSink::open(&path, false).unwrap();
    sink.append(&doc(1, &["犬"])).unwrap();
    drop(sink);

    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(br#"{"doc_id":2,"rel"#).unwrap();
    drop(file);

    let mut sink = JsonlSink::open(&path, false).unwrap();
    sink.append(&doc(2, &["歩"])).unwrap();
    drop(sink);

    let contents = read_sink(&path).unwrap();
    assert_eq!(contents.records, vec![doc(1, &["犬"]), doc(2, &["歩"])]);
    assert!(!contents.discarded_tail);
}

#[test]
fn malformed_line_in_the_middle_is_corruption() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tokens.jsonl");
    fs::write(
        &path,
        "{\"doc_id\":1,\"relative_path\":\"1.txt\",\"tokens\":[]}\nnot json\n{\"doc_id\":2,\"relative_path\":\"2.txt\",\"tokens\":[]}\n",
    )
    .unwrap();

    match read_sink(&path) {
        Err(SinkError::Corrupt { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected corruption, got {other:?}"),
    }
}

#[test]
fn latest_record_wins_per_doc() {
    let records = vec![doc(1, &["古"]), doc(2, &["犬"]), doc(1, &["新"])];
    let latest = latest_by_doc(records);
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[&1].tokens[0].word, "新");
    assert_eq!(latest[&2].to_text(" "), "犬");
}
