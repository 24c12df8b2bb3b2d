//! Configuration section definitions.

pub(super) mod bundles;
mod options;
mod watch;

pub use bundles::Bundle;
pub use options::OptionsConfig;
pub use watch::WatchConfig;
