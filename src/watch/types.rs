use std::path::PathBuf;
use std::time::Duration;

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub(super) fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }

    /// Created and removed files can change how names resolve.
    pub(super) fn is_structural(self) -> bool {
        !matches!(self, Self::Modified)
    }
}

/// Result of rebuilding one bundle, reported to the session's callback.
#[derive(Debug)]
pub enum RebuildOutcome {
    /// Fresh output is in the cache and named by the handoff file.
    Published {
        bundle: String,
        path: PathBuf,
        elapsed: Duration,
    },
    /// A newer rebuild of the same bundle published first.
    Superseded { bundle: String },
    /// Processing or publishing failed; the previous output stays published.
    Failed {
        bundle: String,
        error: anyhow::Error,
    },
}

impl RebuildOutcome {
    pub fn bundle(&self) -> &str {
        match self {
            Self::Published { bundle, .. }
            | Self::Superseded { bundle }
            | Self::Failed { bundle, .. } => bundle,
        }
    }
}
