use std::fs;
use std::io;
use std::path::Path;

use indexmap::IndexMap;

use crate::utils::{fs::write_atomic, kv};

/// Bundle name → digest-qualified output name, in bundle declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: IndexMap<String, String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bundle: impl Into<String>, output: impl Into<String>) {
        self.entries.insert(bundle.into(), output.into());
    }

    pub fn get(&self, bundle: &str) -> Option<&str> {
        self.entries.get(bundle).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self) -> String {
        kv::render(self.iter())
    }

    /// Replace `path` with this manifest.
    pub fn write(&self, path: &Path) -> io::Result<()> {
        write_atomic(path, self.render().as_bytes())
    }

    /// Read a previously written manifest.
    ///
    /// A missing or unreadable file yields `None`; the previous manifest is
    /// only used for reporting.
    pub fn read(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        let entries = kv::parse(&content).ok()?;
        Some(Self { entries })
    }

    /// Number of bundles whose output name differs from `previous`.
    ///
    /// Bundles missing from `previous` count as changed.
    pub fn changed_since(&self, previous: &Self) -> usize {
        self.iter()
            .filter(|(bundle, output)| previous.get(bundle) != Some(*output))
            .count()
    }
}
