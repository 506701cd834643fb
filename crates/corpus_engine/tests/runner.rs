use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use corpus_core::{RowStatus, TokenRecord};
use corpus_engine::{
    latest_by_doc, load_manifest, read_sink, save_manifest, BatchRunner, DecodePolicy,
    DiscoverError, PipelineError, ProgressSink, RunConfig, RunEvent, ScriptTokenizer,
    StrategyError, Tokenizer, WordForm,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const FIXED_TIME: &str = "2024-01-01T00:00:00+00:00";

fn init_logging() {
    pipeline_logging::initialize_for_tests();
}

fn write(root: &Path, rel: &str, content: impl AsRef<[u8]>) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn config(temp: &TempDir) -> RunConfig {
    let root = temp.path().join("corpus");
    fs::create_dir_all(&root).unwrap();
    let mut config = RunConfig::new(
        root,
        temp.path().join("state").join("manifest.csv"),
        temp.path().join("state").join("tokens.jsonl"),
    );
    config.clock = Arc::new(|| FIXED_TIME.to_string());
    config
}

fn script() -> ScriptTokenizer {
    ScriptTokenizer::new(WordForm::Surface)
}

fn fails_on_x(text: Option<&str>) -> Result<Vec<TokenRecord>, StrategyError> {
    let text = text.unwrap_or_default();
    if text.contains('X') {
        return Err(StrategyError::new("text contains X"));
    }
    ScriptTokenizer::default().tokenize(Some(text))
}

#[derive(Default)]
struct CountingTokenizer {
    calls: AtomicUsize,
}

impl Tokenizer for CountingTokenizer {
    fn tokenize(&self, text: Option<&str>) -> Result<Vec<TokenRecord>, StrategyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ScriptTokenizer::default().tokenize(text)
    }
}

#[derive(Default)]
struct RecordingProgress {
    events: Mutex<Vec<RunEvent>>,
}

impl ProgressSink for RecordingProgress {
    fn emit(&self, event: RunEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[test]
fn scenario_a_text_and_empty_file_both_complete() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let config = config(&temp);
    write(&config.root, "a.txt", "犬が歩く");
    write(&config.root, "b.txt", "");

    let tokenizer = script();
    let report = BatchRunner::new(&config, &tokenizer).run().unwrap();
    assert!(report.bootstrapped);
    assert_eq!(report.discovered, 2);
    assert_eq!(report.succeeded, 2);

    let manifest = load_manifest(&config.manifest_path).unwrap();
    assert_eq!(manifest, report.manifest);
    let a = manifest.get(1).unwrap();
    let b = manifest.get(2).unwrap();
    assert_eq!((a.relative_path.as_str(), a.status), ("a.txt", RowStatus::Done));
    assert_eq!((b.relative_path.as_str(), b.status), ("b.txt", RowStatus::Done));
    assert!(a.n_tokens.unwrap() >= 1);
    assert_eq!(a.n_chars, Some(4));
    assert_eq!(a.preview, "犬が歩く");
    assert_eq!(b.n_tokens, Some(0));

    let sink = read_sink(&config.output_path).unwrap();
    assert_eq!(sink.records.len(), 2);
    assert_eq!(sink.records[0].doc_id, 1);
    assert_eq!(sink.records[0].to_text(""), "犬が歩く");
    assert_eq!(sink.records[1].doc_id, 2);
    assert!(sink.records[1].tokens.is_empty());
}

#[test]
fn scenario_b_strategy_failure_is_isolated_and_stable_on_rerun() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let config = config(&temp);
    write(&config.root, "a.txt", "ok");
    write(&config.root, "b.txt", "XX");

    let first = BatchRunner::new(&config, &fails_on_x).run().unwrap();
    assert_eq!((first.succeeded, first.failed), (1, 1));

    let check = || {
        let manifest = load_manifest(&config.manifest_path).unwrap();
        assert_eq!(manifest.get(1).unwrap().status, RowStatus::Done);
        let b = manifest.get(2).unwrap();
        assert_eq!(b.status, RowStatus::Failed);
        assert_eq!(b.error.as_deref(), Some("tokenizer error: text contains X"));
        assert_eq!(b.n_tokens, None);
        let sink = read_sink(&config.output_path).unwrap();
        assert_eq!(sink.records.len(), 1);
        assert_eq!(sink.records[0].relative_path, "a.txt");
    };
    check();

    let second = BatchRunner::new(&config, &fails_on_x).run().unwrap();
    assert!(!second.bootstrapped);
    assert_eq!(second.selected, 1);
    assert_eq!((second.succeeded, second.failed), (0, 1));
    check();
}

#[test]
fn second_run_is_a_no_op() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let config = config(&temp);
    write(&config.root, "a.txt", "犬が歩く");
    write(&config.root, "sub/b.txt", "猫が走る");

    let tokenizer = CountingTokenizer::default();
    BatchRunner::new(&config, &tokenizer).run().unwrap();
    let manifest_after_first = fs::read(&config.manifest_path).unwrap();
    let sink_after_first = fs::read(&config.output_path).unwrap();

    let report = BatchRunner::new(&config, &tokenizer).run().unwrap();
    assert_eq!(report.selected, 0);
    assert_eq!(tokenizer.calls.load(Ordering::SeqCst), 2);
    assert_eq!(fs::read(&config.manifest_path).unwrap(), manifest_after_first);
    assert_eq!(fs::read(&config.output_path).unwrap(), sink_after_first);
}

#[test]
fn unreadable_and_malformed_files_fail_alone() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let mut config = config(&temp);
    config.decode = DecodePolicy {
        strict: true,
        ..DecodePolicy::default()
    };
    write(&config.root, "a.txt", "犬");
    write(&config.root, "b.txt", b"ok \xC3\x28 broken".as_slice());
    write(&config.root, "c.txt", "歩く");
    write(&config.root, "d.txt", "猫");

    let tokenizer = script();
    let report = BatchRunner::new(&config, &tokenizer).run().unwrap();
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 1);

    let manifest = report.manifest;
    let b = manifest.get(2).unwrap();
    assert_eq!(b.status, RowStatus::Failed);
    assert!(b.error.as_deref().unwrap().starts_with("decode error:"));
    assert_eq!(read_sink(&config.output_path).unwrap().records.len(), 3);
}

#[test]
fn vanished_file_fails_then_succeeds_once_restored() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let config = config(&temp);
    write(&config.root, "a.txt", "犬");
    write(&config.root, "b.txt", "猫");

    // Seed the manifest with both rows but process nothing yet.
    let mut manifest = corpus_core::Manifest::new();
    manifest.bootstrap(["a.txt", "b.txt"], FIXED_TIME).unwrap();
    save_manifest(&manifest, &config.manifest_path).unwrap();
    fs::remove_file(config.root.join("b.txt")).unwrap();

    let tokenizer = script();
    let first = BatchRunner::new(&config, &tokenizer).run().unwrap();
    assert_eq!((first.succeeded, first.failed), (1, 1));
    let b = first.manifest.get(2).unwrap();
    assert_eq!(b.status, RowStatus::Failed);
    assert!(b.error.as_deref().unwrap().starts_with("read error:"));

    write(&config.root, "b.txt", "猫");
    let second = BatchRunner::new(&config, &tokenizer).run().unwrap();
    assert_eq!(second.selected, 1);
    assert_eq!(second.manifest.get(2).unwrap().status, RowStatus::Done);
    assert_eq!(second.manifest.get(2).unwrap().error, None);

    let records = read_sink(&config.output_path).unwrap().records;
    let ids: Vec<_> = records.iter().map(|r| r.doc_id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn failed_rows_can_be_left_alone() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let mut config = config(&temp);
    write(&config.root, "a.txt", "XX");

    BatchRunner::new(&config, &fails_on_x).run().unwrap();
    config.retry_failed = false;
    let tokenizer = CountingTokenizer::default();
    let report = BatchRunner::new(&config, &tokenizer).run().unwrap();
    assert_eq!(report.selected, 0);
    assert_eq!(tokenizer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(report.manifest.get(1).unwrap().status, RowStatus::Failed);
}

#[test]
fn panicking_strategy_fails_only_its_row() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let config = config(&temp);
    write(&config.root, "a.txt", "boom");
    write(&config.root, "b.txt", "fine");

    let flaky = |text: Option<&str>| -> Result<Vec<TokenRecord>, StrategyError> {
        if text == Some("boom") {
            panic!("engine crashed");
        }
        ScriptTokenizer::default().tokenize(text)
    };
    let report = BatchRunner::new(&config, &flaky).run().unwrap();
    assert_eq!((report.succeeded, report.failed), (1, 1));
    assert_eq!(
        report.manifest.get(1).unwrap().error.as_deref(),
        Some("tokenizer panicked: engine crashed")
    );
}

#[test]
fn manifest_is_saved_at_the_configured_cadence() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let mut config = config(&temp);
    config.save_every = 2;
    for name in ["a", "b", "c", "d", "e"] {
        write(&config.root, &format!("{name}.txt"), name);
    }

    let tokenizer = script();
    let progress = RecordingProgress::default();
    BatchRunner::new(&config, &tokenizer)
        .with_progress(&progress)
        .run()
        .unwrap();

    let events = progress.events.lock().unwrap();
    assert_eq!(events[0], RunEvent::BatchSelected { count: 5 });
    let saves: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::ManifestSaved { processed } => Some(*processed),
            _ => None,
        })
        .collect();
    assert_eq!(saves, vec![2, 4]);
    let done = events
        .iter()
        .filter(|e| matches!(e, RunEvent::RowDone { .. }))
        .count();
    assert_eq!(done, 5);

    // The final save still captures the fifth row.
    let manifest = load_manifest(&config.manifest_path).unwrap();
    assert!(manifest.is_complete());
}

#[test]
fn rediscovery_appends_new_files_only_when_asked() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let mut config = config(&temp);
    write(&config.root, "b.txt", "犬");
    let tokenizer = script();
    BatchRunner::new(&config, &tokenizer).run().unwrap();

    write(&config.root, "a.txt", "猫");
    let ignored = BatchRunner::new(&config, &tokenizer).run().unwrap();
    assert_eq!(ignored.manifest.len(), 1);

    config.rediscover = true;
    let report = BatchRunner::new(&config, &tokenizer).run().unwrap();
    assert_eq!(report.discovered, 1);
    assert_eq!(report.selected, 1);
    // Existing ids are stable; the newcomer gets the next id.
    assert_eq!(report.manifest.get(1).unwrap().relative_path, "b.txt");
    assert_eq!(report.manifest.get(2).unwrap().relative_path, "a.txt");
    assert!(report.manifest.is_complete());
}

#[test]
fn crash_between_append_and_save_duplicates_but_dedupes() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let config = config(&temp);
    write(&config.root, "a.txt", "犬が歩く");

    let tokenizer = script();
    BatchRunner::new(&config, &tokenizer).run().unwrap();

    // Simulate a crash after the sink append but before the manifest save:
    // put the row back to pending while keeping its sink record.
    let mut manifest = corpus_core::Manifest::new();
    manifest.bootstrap(["a.txt"], FIXED_TIME).unwrap();
    save_manifest(&manifest, &config.manifest_path).unwrap();

    let report = BatchRunner::new(&config, &tokenizer).run().unwrap();
    assert_eq!(report.succeeded, 1);

    let records = read_sink(&config.output_path).unwrap().records;
    assert_eq!(records.len(), 2);
    let latest = latest_by_doc(records);
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[&1].relative_path, "a.txt");
}

#[test]
fn bad_root_aborts_before_any_state_is_written() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let mut config = config(&temp);
    config.root = temp.path().join("missing");

    let err = BatchRunner::new(&config, &script()).run().unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Discover(DiscoverError::RootNotFound(_))
    ));
    assert!(!config.manifest_path.exists());
    assert!(!config.output_path.exists());
}

#[test]
fn zero_save_cadence_is_rejected() {
    let temp = TempDir::new().unwrap();
    let mut config = config(&temp);
    config.save_every = 0;
    let err = BatchRunner::new(&config, &script()).run().unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}

#[cfg(target_os = "linux")]
#[test]
fn non_utf8_file_name_gets_a_failed_row() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    init_logging();
    let temp = TempDir::new().unwrap();
    let config = config(&temp);
    write(&config.root, "a.txt", "犬");
    fs::write(config.root.join(OsStr::from_bytes(b"b\xff.txt")), "猫").unwrap();
    write(&config.root, "c.txt", "鳥");

    let tokenizer = script();
    let report = BatchRunner::new(&config, &tokenizer).run().unwrap();
    assert_eq!((report.succeeded, report.failed), (2, 1));

    let manifest = load_manifest(&config.manifest_path).unwrap();
    let rows: Vec<_> = manifest
        .rows()
        .iter()
        .map(|r| (r.relative_path.as_str(), r.status))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("a.txt", RowStatus::Done),
            ("b\u{FFFD}.txt", RowStatus::Failed),
            ("c.txt", RowStatus::Done),
        ]
    );
    assert!(manifest.get(2).unwrap().error.as_deref().unwrap().starts_with("read error: "));
    assert_eq!(read_sink(&config.output_path).unwrap().records.len(), 2);
}

#[cfg(unix)]
#[test]
fn symlinked_files_are_processed_and_dangling_links_fail() {
    use std::os::unix::fs::symlink;

    init_logging();
    let temp = TempDir::new().unwrap();
    let config = config(&temp);
    write(temp.path(), "outside.txt", "外");
    write(&config.root, "a.txt", "犬");
    symlink(temp.path().join("outside.txt"), config.root.join("link.txt")).unwrap();
    symlink(temp.path().join("missing.txt"), config.root.join("dangling.txt")).unwrap();

    let tokenizer = script();
    let report = BatchRunner::new(&config, &tokenizer).run().unwrap();
    assert_eq!((report.succeeded, report.failed), (2, 1));

    let manifest = load_manifest(&config.manifest_path).unwrap();
    let rows: Vec<_> = manifest
        .rows()
        .iter()
        .map(|r| (r.relative_path.as_str(), r.status))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("a.txt", RowStatus::Done),
            ("dangling.txt", RowStatus::Failed),
            ("link.txt", RowStatus::Done),
        ]
    );
    assert!(manifest.get(2).unwrap().error.as_deref().unwrap().starts_with("read error: "));
}

#[test]
fn manifest_rows_pointing_outside_the_root_fail_without_reading() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let config = config(&temp);
    write(temp.path(), "outside.txt", "外");
    write(&config.root, "a.txt", "犬");
    let absolute = temp.path().join("outside.txt");
    write(
        temp.path(),
        "state/manifest.csv",
        format!(
            "doc_id,relative_path,status\n1,a.txt,pending\n2,../outside.txt,pending\n3,{},pending\n",
            absolute.display()
        ),
    );

    let counting = CountingTokenizer::default();
    let report = BatchRunner::new(&config, &counting).run().unwrap();
    assert_eq!((report.succeeded, report.failed), (1, 2));
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);

    let manifest = load_manifest(&config.manifest_path).unwrap();
    let escaped = manifest.get(2).unwrap();
    assert_eq!(escaped.status, RowStatus::Failed);
    assert_eq!(
        escaped.error.as_deref(),
        Some("read error: \"../outside.txt\" is not a path inside the root")
    );
    assert_eq!(manifest.get(3).unwrap().status, RowStatus::Failed);

    let sink = read_sink(&config.output_path).unwrap();
    assert_eq!(sink.records.len(), 1);
    assert_eq!(sink.records[0].relative_path, "a.txt");
}
