//! Process-level state shared across commands.

mod state;

pub use state::{INTERRUPTED, is_interrupted, register_session, setup_shutdown_handler};
