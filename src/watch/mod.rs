//! Watch Coordinator
//!
//! Keeps processed bundles fresh while a developer edits assets, and tells a
//! separately running consumer where the freshest output lives through the
//! handoff file. Implements the "Watcher-First" pattern for zero event loss.
//!
//! Architecture:
//! ```text
//! Watcher → Debouncer (pure timing) → BundleGraph (file → bundles)
//!         → Dispatcher (blocking pool) → HandoffPublisher (cache + handoff file)
//! ```

// File → bundle dependency tracking.
mod graph;
// Rebuild cache and handoff file publication.
mod handoff;
// Pure timing and deduplication.
mod debouncer;
// Event loop and rebuild dispatch.
mod session;
// Shared watch types.
mod types;
// Watch root attach/re-attach lifecycle.
mod watch_roots;

#[cfg(test)]
mod tests;

pub use handoff::HandoffPublisher;
pub use session::{WatchSession, WatchSettings};
pub use types::RebuildOutcome;
