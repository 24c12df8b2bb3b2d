//! Bundle processing seam.
//!
//! A [`BundleProcessor`] turns a logical name into output bytes and the files
//! those bytes were built from. The digest builder and the watch session only
//! talk to this trait; [`ConcatProcessor`] is the processor shipped with the
//! binary.

mod concat;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::asset::IndexError;

pub use concat::ConcatProcessor;

/// Output of one processing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Processed {
    pub bytes: Vec<u8>,
    /// Absolute paths of every file read to produce `bytes`.
    pub dependencies: Vec<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("unknown bundle or asset `{0}`")]
    UnknownBundle(String),

    #[error("failed to resolve `{asset}` in bundle `{bundle}`")]
    Resolve {
        bundle: String,
        asset: String,
        #[source]
        source: IndexError,
    },

    #[error("failed to read `{}`", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Produces output for a bundle (or a single asset).
///
/// Implementations must be callable from several threads at once: the watch
/// session processes unrelated bundles in parallel.
pub trait BundleProcessor: Send + Sync {
    fn process(&self, name: &str) -> Result<Processed, ProcessError>;
}
