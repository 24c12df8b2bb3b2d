use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tempfile::TempDir;
use tokio::sync::mpsc;

use super::debouncer::{Debouncer, IDLE};
use super::graph::BundleGraph;
use super::session::{WatchSession, WatchSettings, affected_bundles};
use super::types::{ChangeKind, RebuildOutcome};
use crate::asset::{AssetPath, IndexStore, Precedence, SearchRoot, SuffixIndex};
use crate::config::Bundle;
use crate::pipeline::{BundleProcessor, ConcatProcessor, ProcessError, Processed};
use crate::utils::kv;
use crate::utils::path::normalize_path;

const WINDOW: Duration = Duration::from_millis(50);

fn make_event(paths: Vec<&str>, kind: notify::EventKind) -> notify::Event {
    notify::Event {
        kind,
        paths: paths.into_iter().map(PathBuf::from).collect(),
        attrs: Default::default(),
    }
}

fn modify_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Data(
        notify::event::DataChange::Any,
    ))
}

fn create_kind() -> notify::EventKind {
    notify::EventKind::Create(notify::event::CreateKind::File)
}

fn remove_kind() -> notify::EventKind {
    notify::EventKind::Remove(notify::event::RemoveKind::File)
}

fn bundle(name: &str, assets: &[&str]) -> Bundle {
    Bundle::new(name, assets.iter().map(|a| a.to_string()))
}

// -----------------------------------------------------------------------------
// Debouncer
// -----------------------------------------------------------------------------

#[test]
fn test_debouncer_empty() {
    let mut debouncer = Debouncer::new(WINDOW);
    assert!(debouncer.take_if_ready().is_none());
    assert_eq!(debouncer.sleep_duration(), IDLE);
}

#[test]
fn test_event_routing_by_kind() {
    let mut debouncer = Debouncer::new(WINDOW);

    debouncer.add_event(&make_event(vec!["/tmp/a.js"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/b.js"], modify_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/c.js"], remove_kind()));

    assert_eq!(debouncer.changes.len(), 3);
    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/a.js")], ChangeKind::Created);
    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/b.js")], ChangeKind::Modified);
    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/c.js")], ChangeKind::Removed);
}

#[test]
fn test_metadata_change_ignored() {
    let mut debouncer = Debouncer::new(WINDOW);
    let kind = notify::EventKind::Modify(notify::event::ModifyKind::Metadata(
        notify::event::MetadataKind::WriteTime,
    ));

    debouncer.add_event(&make_event(vec!["/tmp/a.js"], kind));
    assert!(debouncer.changes.is_empty());
    assert!(debouncer.last_event.is_none());
}

#[test]
fn test_temp_file_ignored() {
    let mut debouncer = Debouncer::new(WINDOW);

    debouncer.add_event(&make_event(vec!["/tmp/real.js"], modify_kind()));
    let first_time = debouncer.last_event.unwrap();

    std::thread::sleep(Duration::from_millis(5));

    // Editor swap files and our own scratch files
    debouncer.add_event(&make_event(vec!["/tmp/.app.js.swp"], modify_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/.humpty-abc.tmp"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/app.js~"], modify_kind()));

    assert_eq!(debouncer.last_event.unwrap(), first_time);
    assert_eq!(debouncer.changes.len(), 1);
}

#[test]
fn test_dedup_first_event_wins() {
    let mut debouncer = Debouncer::new(WINDOW);

    debouncer.add_event(&make_event(vec!["/tmp/a.js"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/a.js"], modify_kind()));

    assert_eq!(debouncer.changes.len(), 1);
    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/a.js")], ChangeKind::Created);
}

#[test]
fn test_remove_then_create_restores() {
    let mut debouncer = Debouncer::new(WINDOW);

    debouncer.add_event(&make_event(vec!["/tmp/a.js"], remove_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/a.js"], create_kind()));

    assert_eq!(debouncer.changes.len(), 1);
    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/a.js")], ChangeKind::Created);
}

#[test]
fn test_create_then_remove_discards() {
    let mut debouncer = Debouncer::new(WINDOW);

    debouncer.add_event(&make_event(vec!["/tmp/a.js"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/a.js"], remove_kind()));
    assert!(debouncer.changes.is_empty(), "created+removed should discard");

    // The quiet period still ends, leaving the debouncer idle
    std::thread::sleep(WINDOW + Duration::from_millis(10));
    assert!(debouncer.take_if_ready().is_none());
    assert_eq!(debouncer.sleep_duration(), IDLE);
}

#[test]
fn test_modify_then_remove_upgrades() {
    let mut debouncer = Debouncer::new(WINDOW);

    debouncer.add_event(&make_event(vec!["/tmp/a.js"], modify_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/a.js"], remove_kind()));

    assert_eq!(debouncer.changes.len(), 1);
    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/a.js")], ChangeKind::Removed);
}

#[test]
fn test_sleep_duration_after_event() {
    let mut debouncer = Debouncer::new(WINDOW);
    debouncer.last_event = Some(std::time::Instant::now());

    let dur = debouncer.sleep_duration();
    assert!(dur <= WINDOW);
    assert!(dur >= WINDOW - Duration::from_millis(10));
}

#[test]
fn test_burst_released_after_quiet_period() {
    let mut debouncer = Debouncer::new(WINDOW);

    debouncer.add_event(&make_event(vec!["/tmp/a.js"], modify_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/b.js"], modify_kind()));
    assert!(debouncer.take_if_ready().is_none());

    std::thread::sleep(WINDOW + Duration::from_millis(10));
    let changes = debouncer.take_if_ready().unwrap();
    assert_eq!(changes.len(), 2);
    assert!(debouncer.changes.is_empty());
    assert!(debouncer.take_if_ready().is_none());
}

#[test]
fn test_wake_without_changes() {
    let mut debouncer = Debouncer::new(WINDOW);
    debouncer.wake();
    assert!(debouncer.sleep_duration() <= WINDOW);

    std::thread::sleep(WINDOW + Duration::from_millis(10));
    assert!(debouncer.take_if_ready().is_none());
    assert!(debouncer.last_event.is_none());
}

// -----------------------------------------------------------------------------
// BundleGraph
// -----------------------------------------------------------------------------

fn index(files: &[&str]) -> SuffixIndex {
    let assets = files
        .iter()
        .map(|f| AssetPath::new(*f, Path::new("/assets").join(f), Precedence::Project));
    SuffixIndex::build(assets, false).unwrap()
}

fn used_by(graph: &BundleGraph, file: &str) -> Vec<String> {
    let mut bundles: Vec<String> = graph.used_by(Path::new(file)).map(str::to_string).collect();
    bundles.sort();
    bundles
}

#[test]
fn test_graph_maps_files_to_bundles() {
    let bundles = vec![
        bundle("app", &["a.js", "b.js"]),
        bundle("vendor", &["b.js", "c.js"]),
    ];
    let mut graph = BundleGraph::new();
    let changed = graph.seed(&bundles, &index(&["a.js", "b.js", "c.js"]));

    assert_eq!(changed.len(), 2);
    assert_eq!(used_by(&graph, "/assets/a.js"), vec!["app"]);
    assert_eq!(used_by(&graph, "/assets/b.js"), vec!["app", "vendor"]);
    assert!(used_by(&graph, "/assets/unrelated.js").is_empty());
}

#[test]
fn test_graph_reseed_reports_only_changed_resolution() {
    let bundles = vec![bundle("app", &["a.js"]), bundle("late", &["d.js"])];
    let mut graph = BundleGraph::new();
    graph.seed(&bundles, &index(&["a.js"]));

    let changed = graph.seed(&bundles, &index(&["a.js", "d.js"]));
    assert_eq!(changed.into_iter().collect::<Vec<_>>(), vec!["late".to_string()]);
    assert_eq!(used_by(&graph, "/assets/d.js"), vec!["late"]);

    let changed = graph.seed(&bundles, &index(&["a.js", "d.js"]));
    assert!(changed.is_empty());
}

#[test]
fn test_graph_record_replaces_declared_dependencies() {
    let bundles = vec![bundle("app", &["a.js"])];
    let mut graph = BundleGraph::new();
    graph.seed(&bundles, &index(&["a.js"]));

    graph.record("app", &[PathBuf::from("/assets/partial.js")]);
    assert_eq!(used_by(&graph, "/assets/partial.js"), vec!["app"]);

    graph.record("app", &[PathBuf::from("/assets/other.js")]);
    assert!(used_by(&graph, "/assets/partial.js").is_empty());
    assert_eq!(used_by(&graph, "/assets/other.js"), vec!["app"]);
    // Resolved assets stay linked
    assert_eq!(used_by(&graph, "/assets/a.js"), vec!["app"]);
}

#[test]
fn test_graph_shared_file_survives_partial_unlink() {
    let bundles = vec![bundle("app", &["a.js"])];
    let mut graph = BundleGraph::new();
    graph.seed(&bundles, &index(&["a.js"]));

    // Declared and resolved both name a.js; dropping the declared set keeps it
    graph.record("app", &[PathBuf::from("/assets/a.js")]);
    graph.record("app", &[]);
    assert_eq!(used_by(&graph, "/assets/a.js"), vec!["app"]);
}

// -----------------------------------------------------------------------------
// Affected bundles
// -----------------------------------------------------------------------------

fn asset_dir() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let assets = normalize_path(temp.path()).join("assets");
    fs::create_dir_all(&assets).unwrap();
    (temp, assets)
}

#[test]
fn test_modified_file_affects_only_its_bundles() {
    let (_tmp, assets) = asset_dir();
    for f in ["a.js", "b.js", "c.css"] {
        fs::write(assets.join(f), f).unwrap();
    }
    let store = IndexStore::open(vec![SearchRoot::project(&assets)], false).unwrap();
    let bundles = vec![bundle("app", &["a.js", "b.js"]), bundle("site", &["c.css"])];
    let mut graph = BundleGraph::new();
    graph.seed(&bundles, &store.load());

    let mut changes = FxHashMap::default();
    changes.insert(assets.join("a.js"), ChangeKind::Modified);

    let affected = affected_bundles(&mut graph, &store, &bundles, &changes, false);
    assert_eq!(affected, vec!["app"]);
}

#[test]
fn test_created_file_rescans_and_affects_new_resolution() {
    let (_tmp, assets) = asset_dir();
    fs::write(assets.join("a.js"), "a").unwrap();
    let store = IndexStore::open(vec![SearchRoot::project(&assets)], false).unwrap();
    let bundles = vec![bundle("app", &["a.js"]), bundle("late", &["d.js"])];
    let mut graph = BundleGraph::new();
    graph.seed(&bundles, &store.load());

    fs::write(assets.join("d.js"), "d").unwrap();
    let mut changes = FxHashMap::default();
    changes.insert(assets.join("d.js"), ChangeKind::Created);

    let affected = affected_bundles(&mut graph, &store, &bundles, &changes, false);
    assert_eq!(affected, vec!["late"]);
    assert!(store.load().resolve("d.js").is_ok());
}

#[test]
fn test_affected_bundles_in_declaration_order() {
    let (_tmp, assets) = asset_dir();
    fs::write(assets.join("shared.js"), "s").unwrap();
    let store = IndexStore::open(vec![SearchRoot::project(&assets)], false).unwrap();
    let bundles = vec![
        bundle("zeta", &["shared.js"]),
        bundle("alpha", &["shared.js"]),
    ];
    let mut graph = BundleGraph::new();
    graph.seed(&bundles, &store.load());

    let mut changes = FxHashMap::default();
    changes.insert(assets.join("shared.js"), ChangeKind::Modified);

    let affected = affected_bundles(&mut graph, &store, &bundles, &changes, false);
    assert_eq!(affected, vec!["zeta", "alpha"]);
}

// -----------------------------------------------------------------------------
// WatchSession
// -----------------------------------------------------------------------------

/// Counts how often each bundle was processed.
struct Counting {
    inner: ConcatProcessor,
    counts: Mutex<FxHashMap<String, usize>>,
}

impl Counting {
    fn count(&self, bundle: &str) -> usize {
        self.counts.lock().get(bundle).copied().unwrap_or(0)
    }
}

impl BundleProcessor for Counting {
    fn process(&self, name: &str) -> Result<Processed, ProcessError> {
        *self.counts.lock().entry(name.to_string()).or_default() += 1;
        self.inner.process(name)
    }
}

struct Fixture {
    _tmp: TempDir,
    assets: PathBuf,
    handoff: PathBuf,
    processor: Arc<Counting>,
    session: WatchSession,
}

fn fixture(files: &[(&str, &str)], bundles: Vec<Bundle>) -> Fixture {
    let (tmp, assets) = asset_dir();
    for (name, content) in files {
        fs::write(assets.join(name), content).unwrap();
    }
    let handoff = normalize_path(tmp.path()).join("humpty-watch.toml");

    let store = Arc::new(IndexStore::open(vec![SearchRoot::project(&assets)], false).unwrap());
    let processor = Arc::new(Counting {
        inner: ConcatProcessor::new(Arc::clone(&store), &bundles),
        counts: Mutex::new(FxHashMap::default()),
    });
    let settings = WatchSettings {
        handoff_path: handoff.clone(),
        debounce: WINDOW,
    };
    let session = WatchSession::start(processor.clone(), store, bundles, settings).unwrap();

    Fixture {
        _tmp: tmp,
        assets,
        handoff,
        processor,
        session,
    }
}

/// Outcome reported to the callback, reduced to comparable data.
#[derive(Debug, PartialEq, Eq)]
enum Seen {
    Published(String),
    Superseded(String),
    Failed(String),
}

impl From<&RebuildOutcome> for Seen {
    fn from(outcome: &RebuildOutcome) -> Self {
        let bundle = outcome.bundle().to_string();
        match outcome {
            RebuildOutcome::Published { .. } => Self::Published(bundle),
            RebuildOutcome::Superseded { .. } => Self::Superseded(bundle),
            RebuildOutcome::Failed { .. } => Self::Failed(bundle),
        }
    }
}

async fn next(rx: &mut mpsc::UnboundedReceiver<Seen>) -> Seen {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a rebuild")
        .expect("session ended")
}

fn read_handoff(path: &Path) -> FxHashMap<String, String> {
    kv::parse(&fs::read_to_string(path).unwrap())
        .unwrap()
        .into_iter()
        .collect()
}

#[test]
fn test_start_discards_stale_handoff_file() {
    let (tmp, assets) = asset_dir();
    fs::write(assets.join("a.js"), "a").unwrap();
    let handoff = tmp.path().join("humpty-watch.toml");
    fs::write(&handoff, "\"app\" = \"/previous/session/app\"\n").unwrap();

    let store = Arc::new(IndexStore::open(vec![SearchRoot::project(&assets)], false).unwrap());
    let bundles = vec![bundle("app", &["a.js"])];
    let processor = Arc::new(ConcatProcessor::new(Arc::clone(&store), &bundles));
    let settings = WatchSettings {
        handoff_path: handoff.clone(),
        debounce: WINDOW,
    };

    let session = WatchSession::start(processor, store, bundles, settings).unwrap();
    assert!(!handoff.exists());
    assert!(session.publisher().upgrade().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_rebuilds_only_affected_bundle() {
    let fixture = fixture(
        &[("a.js", "let a;"), ("b.js", "let b;"), ("c.css", "body{}")],
        vec![bundle("app", &["a.js", "b.js"]), bundle("site", &["c.css"])],
    );
    let Fixture {
        _tmp,
        assets,
        handoff,
        processor,
        session,
    } = fixture;

    let (shutdown_tx, shutdown_rx) = crossbeam::channel::bounded(1);
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(session.run(shutdown_rx, move |outcome| {
        let _ = seen_tx.send(Seen::from(outcome));
    }));

    // Bootstrap publishes every bundle
    let mut bootstrap = vec![next(&mut seen_rx).await, next(&mut seen_rx).await];
    bootstrap.sort_by_key(|seen| format!("{seen:?}"));
    assert_eq!(
        bootstrap,
        vec![Seen::Published("app".into()), Seen::Published("site".into())]
    );

    let published = read_handoff(&handoff);
    assert_eq!(published.len(), 2);
    assert_eq!(fs::read_to_string(&published["app"]).unwrap(), "let a;\nlet b;\n");
    assert_eq!(fs::read_to_string(&published["site"]).unwrap(), "body{}\n");

    fs::write(assets.join("a.js"), "let a2;").unwrap();
    assert_eq!(next(&mut seen_rx).await, Seen::Published("app".into()));
    assert_eq!(fs::read_to_string(&published["app"]).unwrap(), "let a2;\nlet b;\n");

    // Nothing else follows the edit
    tokio::time::sleep(WINDOW * 4).await;
    assert!(seen_rx.try_recv().is_err());
    assert_eq!(processor.count("site"), 1);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();

    assert!(!handoff.exists());
    assert!(!Path::new(&published["app"]).exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_picks_up_created_asset() {
    let fixture = fixture(
        &[("a.js", "let a;")],
        vec![bundle("app", &["a.js"]), bundle("late", &["d.js"])],
    );
    let Fixture {
        _tmp,
        assets,
        handoff,
        session,
        ..
    } = fixture;

    let (shutdown_tx, shutdown_rx) = crossbeam::channel::bounded(1);
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(session.run(shutdown_rx, move |outcome| {
        let _ = seen_tx.send(Seen::from(outcome));
    }));

    let mut bootstrap = vec![next(&mut seen_rx).await, next(&mut seen_rx).await];
    bootstrap.sort_by_key(|seen| format!("{seen:?}"));
    assert_eq!(
        bootstrap,
        vec![Seen::Failed("late".into()), Seen::Published("app".into())]
    );
    assert!(!read_handoff(&handoff).contains_key("late"));

    fs::write(assets.join("d.js"), "let d;").unwrap();
    assert_eq!(next(&mut seen_rx).await, Seen::Published("late".into()));

    let published = read_handoff(&handoff);
    assert_eq!(fs::read_to_string(&published["late"]).unwrap(), "let d;\n");

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
    assert!(!handoff.exists());
}

/// Panics the first time `target` is processed.
struct PanicOnce {
    inner: ConcatProcessor,
    target: &'static str,
    armed: AtomicBool,
}

impl BundleProcessor for PanicOnce {
    fn process(&self, name: &str) -> Result<Processed, ProcessError> {
        if name == self.target && self.armed.swap(false, Ordering::SeqCst) {
            panic!("processor blew up on {name}");
        }
        self.inner.process(name)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_survives_panicking_processor() {
    let (tmp, assets) = asset_dir();
    fs::write(assets.join("a.js"), "let a;").unwrap();
    fs::write(assets.join("c.css"), "body{}").unwrap();
    let handoff = normalize_path(tmp.path()).join("humpty-watch.toml");

    let bundles = vec![bundle("app", &["a.js"]), bundle("site", &["c.css"])];
    let store = Arc::new(IndexStore::open(vec![SearchRoot::project(&assets)], false).unwrap());
    let processor = Arc::new(PanicOnce {
        inner: ConcatProcessor::new(Arc::clone(&store), &bundles),
        target: "site",
        armed: AtomicBool::new(true),
    });
    let settings = WatchSettings {
        handoff_path: handoff.clone(),
        debounce: WINDOW,
    };
    let session = WatchSession::start(processor, store, bundles, settings).unwrap();

    let (shutdown_tx, shutdown_rx) = crossbeam::channel::bounded(1);
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(session.run(shutdown_rx, move |outcome| {
        let _ = seen_tx.send(Seen::from(outcome));
    }));

    // The panic is reported as a failure, so bootstrap completes
    let mut bootstrap = vec![next(&mut seen_rx).await, next(&mut seen_rx).await];
    bootstrap.sort_by_key(|seen| format!("{seen:?}"));
    assert_eq!(
        bootstrap,
        vec![Seen::Failed("site".into()), Seen::Published("app".into())]
    );

    fs::write(assets.join("a.js"), "let a2;").unwrap();
    assert_eq!(next(&mut seen_rx).await, Seen::Published("app".into()));

    fs::write(assets.join("c.css"), "body{margin:0}").unwrap();
    assert_eq!(next(&mut seen_rx).await, Seen::Published("site".into()));

    let published = read_handoff(&handoff);
    assert_eq!(fs::read_to_string(&published["site"]).unwrap(), "body{margin:0}\n");

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
    assert!(!handoff.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_stops_when_shutdown_sender_dropped() {
    let fixture = fixture(&[("a.js", "let a;")], vec![bundle("app", &["a.js"])]);
    let Fixture {
        _tmp,
        handoff,
        session,
        ..
    } = fixture;

    let (shutdown_tx, shutdown_rx) = crossbeam::channel::bounded::<()>(1);
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(session.run(shutdown_rx, move |outcome| {
        let _ = seen_tx.send(Seen::from(outcome));
    }));

    assert_eq!(next(&mut seen_rx).await, Seen::Published("app".into()));
    drop(shutdown_tx);

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("session did not stop")
        .unwrap()
        .unwrap();
    assert!(!handoff.exists());
}
