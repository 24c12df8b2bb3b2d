//! `humpty watch`: development loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::HumptyConfig;
use crate::core::register_session;
use crate::logger::{status_error, status_success};
use crate::pipeline::ConcatProcessor;
use crate::watch::{RebuildOutcome, WatchSession, WatchSettings};
use crate::{debug, log};

/// How long a forced exit waits for an in-flight publication.
const CLEANUP_TIMEOUT: Duration = Duration::from_millis(500);

/// How long rebuilds still running at shutdown may take to finish.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

pub fn run_watch(config: &HumptyConfig) -> Result<()> {
    let bundles = config.bundles();
    let store = super::open_store(config)?;
    let processor = Arc::new(ConcatProcessor::new(Arc::clone(&store), &bundles));

    let settings = WatchSettings {
        handoff_path: config.options.watch_file.clone(),
        debounce: config.watch.debounce(),
    };
    let session = WatchSession::start(processor, store, bundles, settings)?;

    let (shutdown_tx, shutdown_rx) = crossbeam::channel::bounded(1);
    let publisher = session.publisher();
    register_session(shutdown_tx, move || {
        if let Some(publisher) = publisher.upgrade()
            && let Err(e) = publisher.close_within(CLEANUP_TIMEOUT)
        {
            log!("error"; "failed to remove handoff file: {}", e);
        }
    });

    log!("watch"; "handoff file: {}", config.root_relative(&config.options.watch_file).display());

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let result = rt.block_on(session.run(shutdown_rx, report));
    rt.shutdown_timeout(SHUTDOWN_TIMEOUT);
    result
}

fn report(outcome: &RebuildOutcome) {
    match outcome {
        RebuildOutcome::Published {
            bundle, elapsed, ..
        } => status_success(&format!("{bundle} rebuilt in {}ms", elapsed.as_millis())),
        RebuildOutcome::Superseded { bundle } => {
            debug!("watch"; "{} superseded by a newer rebuild", bundle);
        }
        RebuildOutcome::Failed { bundle, error } => {
            status_error(&format!("{bundle} failed"), &format!("{error:#}"));
        }
    }
}
