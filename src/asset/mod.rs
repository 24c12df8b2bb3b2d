//! Asset discovery and suffix resolution.
//!
//! ```text
//! search roots ──scan──▶ AssetPath list ──build──▶ SuffixIndex ──swap──▶ IndexStore
//! ```
//!
//! Scanning is pure (reads the filesystem, returns data). The index is
//! immutable once built; the store swaps whole indexes atomically on rescan.

mod index;
mod scan;
mod store;

pub use index::{IndexError, SuffixIndex};
pub use scan::{AssetPath, Precedence, SearchRoot};
pub use store::IndexStore;
