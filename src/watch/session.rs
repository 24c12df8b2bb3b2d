use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam::channel::{Receiver, TryRecvError};
use notify::RecommendedWatcher;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::mpsc;

use super::debouncer::{Debouncer, IDLE};
use super::graph::BundleGraph;
use super::handoff::{HandoffPublisher, Publication, Ticket, discard_stale};
use super::types::{ChangeKind, RebuildOutcome};
use super::watch_roots::WatchRoots;
use crate::asset::IndexStore;
use crate::config::Bundle;
use crate::pipeline::BundleProcessor;
use crate::utils::path::normalize_path;
use crate::utils::plural_count;
use crate::{debug, log};

/// How often the loop checks for a shutdown request
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);
/// How often missing watch roots are looked for
const ROOT_CHECK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub handoff_path: PathBuf,
    pub debounce: Duration,
}

/// A running watch session.
pub struct WatchSession {
    processor: Arc<dyn BundleProcessor>,
    store: Arc<IndexStore>,
    bundles: Vec<Bundle>,
    publisher: Arc<HandoffPublisher>,
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    watch_roots: WatchRoots,
    debounce: Duration,
}

impl WatchSession {
    /// Attach the watcher, then discard any stale handoff file.
    ///
    /// The watcher starts first so changes made while the bootstrap rebuild
    /// runs are buffered instead of lost.
    pub fn start(
        processor: Arc<dyn BundleProcessor>,
        store: Arc<IndexStore>,
        bundles: Vec<Bundle>,
        settings: WatchSettings,
    ) -> Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })
        .context("failed to create file watcher")?;

        let dirs = store.roots().iter().map(|root| root.dir.clone()).collect();
        let mut watch_roots = WatchRoots::new(dirs);
        watch_roots
            .attach_existing(&mut watcher)
            .context("failed to watch asset directories")?;
        debug!("watch"; "watching {}", plural_count(watch_roots.attached_count(), "root"));

        let handoff_path = settings.handoff_path;
        match discard_stale(&handoff_path) {
            Ok(Some(count)) => {
                log!("watch"; "discarded stale handoff file naming {}", plural_count(count, "asset"));
            }
            Ok(None) => {}
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to remove stale handoff file `{}`", handoff_path.display())
                });
            }
        }

        let publisher = HandoffPublisher::new(handoff_path)
            .context("failed to create rebuild cache directory")?;
        debug!("watch"; "rebuild cache: {}", publisher.cache_dir().display());

        Ok(Self {
            processor,
            store,
            bundles,
            publisher: Arc::new(publisher),
            notify_rx,
            watcher,
            watch_roots,
            debounce: settings.debounce,
        })
    }

    /// Handle for cleanup outside the session (signal handlers).
    ///
    /// Weak, so the cache directory is still removed when the session drops.
    pub fn publisher(&self) -> Weak<HandoffPublisher> {
        Arc::downgrade(&self.publisher)
    }

    /// Rebuild every bundle, then rebuild affected bundles on change until
    /// `shutdown` fires. The handoff file is deleted before returning.
    pub async fn run<F>(self, shutdown: Receiver<()>, mut on_rebuild: F) -> Result<()>
    where
        F: FnMut(&RebuildOutcome) + Send,
    {
        let Self {
            processor,
            store,
            bundles,
            publisher,
            notify_rx,
            mut watcher,
            mut watch_roots,
            debounce,
        } = self;

        let (event_tx, mut event_rx) = mpsc::channel::<notify::Event>(64);

        // Spawn a thread to poll notify events and send to async channel
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if event_tx.blocking_send(event).is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) => log!("watch"; "notify error: {}", e),
                }
            }
        });

        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher {
            processor,
            publisher: Arc::clone(&publisher),
            done_tx,
        };

        let mut graph = BundleGraph::new();
        graph.seed(&bundles, &store.load());
        debug!("watch"; "tracking {}", plural_count(graph.file_count(), "file"));

        // Bootstrap: the previous session's output is never reused
        let mut bootstrap = bundles.len();
        log!("watch"; "building {}", plural_count(bootstrap, "bundle"));
        for bundle in &bundles {
            dispatcher.dispatch(&bundle.name, true);
        }

        let mut debouncer = Debouncer::new(debounce);
        let mut pending_rescan = false;
        let mut shutdown_tick = tokio::time::interval(SHUTDOWN_POLL);
        let mut roots_tick = tokio::time::interval(ROOT_CHECK);

        loop {
            // Keep events queued until every bundle was published once
            let wait = if bootstrap > 0 {
                IDLE
            } else {
                debouncer.sleep_duration()
            };

            tokio::select! {
                biased;
                _ = shutdown_tick.tick() => {
                    if !matches!(shutdown.try_recv(), Err(TryRecvError::Empty)) {
                        debug!("watch"; "shutdown signal received");
                        break;
                    }
                }
                Some(done) = done_rx.recv() => {
                    let Completed { outcome, dependencies, bootstrap: from_bootstrap } = done;
                    if matches!(outcome, RebuildOutcome::Published { .. }) {
                        graph.record(outcome.bundle(), &dependencies);
                    }
                    on_rebuild(&outcome);

                    if from_bootstrap {
                        bootstrap = bootstrap.saturating_sub(1);
                        if bootstrap == 0 {
                            log!("watch"; "watching for changes");
                        }
                    }
                }
                Some(event) = event_rx.recv() => debouncer.add_event(&event),
                _ = roots_tick.tick() => {
                    if watch_roots.maintain(&mut watcher) {
                        pending_rescan = true;
                        debouncer.wake();
                    }
                }
                _ = tokio::time::sleep(wait) => {
                    let mut changes = debouncer.take_if_ready().unwrap_or_default();
                    changes.remove(&normalize_path(publisher.handoff_path()));
                    if changes.is_empty() && !pending_rescan {
                        continue;
                    }

                    let affected = affected_bundles(&mut graph, &store, &bundles, &changes, pending_rescan);
                    pending_rescan = false;

                    if affected.is_empty() {
                        debug!("watch"; "{} changed, no bundle affected", plural_count(changes.len(), "file"));
                        continue;
                    }
                    debug!("watch"; "rebuilding {}", affected.join(", "));
                    for name in &affected {
                        dispatcher.dispatch(name, false);
                    }
                }
            }
        }

        if let Err(e) = publisher.close() {
            log!("error"; "failed to remove handoff file `{}`: {}", publisher.handoff_path().display(), e);
        }
        Ok(())
    }
}

/// Bundles to rebuild for a batch of changes, in declaration order.
///
/// Modified files affect the bundles that use them. Created and removed
/// files (or `force_rescan`) also rescan the index, and every bundle whose
/// asset names now resolve differently is affected too. A failed rescan
/// keeps the previous index.
pub(super) fn affected_bundles(
    graph: &mut BundleGraph,
    store: &IndexStore,
    bundles: &[Bundle],
    changes: &FxHashMap<PathBuf, ChangeKind>,
    force_rescan: bool,
) -> Vec<String> {
    let mut affected: FxHashSet<String> = changes
        .keys()
        .flat_map(|path| graph.used_by(path))
        .map(str::to_string)
        .collect();

    let structural = force_rescan || changes.values().any(|kind| kind.is_structural());
    if structural {
        match store.rescan() {
            Ok(count) => {
                debug!("watch"; "rescanned {}", plural_count(count, "asset"));
                affected.extend(graph.seed(bundles, &store.load()));
            }
            Err(e) => log!("error"; "rescan failed, keeping previous index: {}", e),
        }
    }

    bundles
        .iter()
        .filter(|bundle| affected.contains(&bundle.name))
        .map(|bundle| bundle.name.clone())
        .collect()
}

struct Completed {
    outcome: RebuildOutcome,
    dependencies: Vec<PathBuf>,
    bootstrap: bool,
}

/// Runs rebuilds on the blocking pool, one task per bundle.
///
/// Unrelated bundles build in parallel and a hung processor only holds up
/// its own task. Tickets are taken at dispatch time, so when two rebuilds of
/// one bundle race, the later dispatch wins.
struct Dispatcher {
    processor: Arc<dyn BundleProcessor>,
    publisher: Arc<HandoffPublisher>,
    done_tx: mpsc::UnboundedSender<Completed>,
}

impl Dispatcher {
    fn dispatch(&self, bundle: &str, bootstrap: bool) {
        let ticket = self.publisher.ticket();
        let processor = Arc::clone(&self.processor);
        let publisher = Arc::clone(&self.publisher);
        let done_tx = self.done_tx.clone();
        let bundle = bundle.to_string();

        tokio::task::spawn_blocking(move || {
            let Some((outcome, dependencies)) =
                rebuild(processor.as_ref(), &publisher, bundle, ticket)
            else {
                return;
            };
            let _ = done_tx.send(Completed {
                outcome,
                dependencies,
                bootstrap,
            });
        });
    }
}

/// Process and publish one bundle. `None` once the publisher is closed.
fn rebuild(
    processor: &dyn BundleProcessor,
    publisher: &HandoffPublisher,
    bundle: String,
    ticket: Ticket,
) -> Option<(RebuildOutcome, Vec<PathBuf>)> {
    let started = Instant::now();

    // A panicking processor still reports, or the bootstrap gate never opens
    let result = panic::catch_unwind(AssertUnwindSafe(|| processor.process(&bundle)));
    let processed = match result {
        Ok(Ok(processed)) => processed,
        Ok(Err(e)) => {
            let error = anyhow::Error::new(e);
            return Some((RebuildOutcome::Failed { bundle, error }, Vec::new()));
        }
        Err(payload) => {
            let error = anyhow::anyhow!("processor panicked: {}", panic_message(payload.as_ref()));
            return Some((RebuildOutcome::Failed { bundle, error }, Vec::new()));
        }
    };

    let outcome = match publisher.publish(&bundle, ticket, &processed.bytes) {
        Ok(Publication::Published(path)) => RebuildOutcome::Published {
            bundle,
            path,
            elapsed: started.elapsed(),
        },
        Ok(Publication::Superseded) => RebuildOutcome::Superseded { bundle },
        Ok(Publication::Closed) => return None,
        Err(e) => RebuildOutcome::Failed {
            bundle,
            error: anyhow::Error::new(e),
        },
    };
    Some((outcome, processed.dependencies))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
