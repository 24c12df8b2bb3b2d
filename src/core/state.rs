//! Process-wide shutdown state.
//!
//! The first Ctrl+C asks the registered watch session to stop gracefully.
//! A second Ctrl+C runs the session's cleanup hook directly and exits, so the
//! handoff file is removed even if the session is stuck.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::channel::Sender;

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Exit status for an interrupted process
pub const INTERRUPTED: i32 = 130;

type CleanupHook = Box<dyn Fn() + Send + Sync>;

struct Session {
    shutdown_tx: Sender<()>,
    cleanup: CleanupHook,
}

static SESSION: OnceLock<Session> = OnceLock::new();

/// Setup the global Ctrl+C handler. Call once at program start
///
/// - Before `register_session()`: exits immediately, nothing to clean up
/// - After: first signal stops the session, second runs cleanup and exits
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        let repeated = SHUTDOWN.swap(true, Ordering::SeqCst);

        let Some(session) = SESSION.get() else {
            std::process::exit(INTERRUPTED);
        };

        if repeated {
            crate::log!("watch"; "forced exit");
            (session.cleanup)();
            std::process::exit(INTERRUPTED);
        }

        crate::log!("watch"; "shutting down...");
        let _ = session.shutdown_tx.send(());
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Register the running watch session for graceful shutdown
///
/// Only the first registration takes effect.
pub fn register_session(shutdown_tx: Sender<()>, cleanup: impl Fn() + Send + Sync + 'static) {
    let _ = SESSION.set(Session {
        shutdown_tx,
        cleanup: Box::new(cleanup),
    });
}

/// Whether Ctrl+C was received
pub fn is_interrupted() -> bool {
    SHUTDOWN.load(Ordering::SeqCst)
}
