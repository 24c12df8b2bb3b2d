//! Handoff file publication.
//!
//! The handoff file tells a separately running consumer where the freshest
//! output of each logical asset lives:
//!
//! ```text
//! "app.js" = "/tmp/humpty-cache-XXXX/app.js"
//! "site.css" = "/tmp/humpty-cache-XXXX/site.css"
//! ```
//!
//! Outputs live in a private rebuild cache (one stable file per logical
//! asset) that exists as long as the publisher. Every publication writes the
//! cache file first, then rewrites the entire handoff file, both via scratch
//! file + rename. A single lock serializes publications, so the file never
//! names a missing or half-written target.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tempfile::TempDir;
use thiserror::Error;

use crate::utils::fs::{remove_if_exists, write_atomic};
use crate::utils::kv;
use crate::utils::path::is_contained;

#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("`{0}` cannot be placed inside the rebuild cache")]
    InvalidName(String),

    #[error("failed to write `{}`", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Issued before processing starts; orders rebuilds of the same asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, PartialEq, Eq)]
pub enum Publication {
    Published(PathBuf),
    /// A rebuild with a newer ticket already published this asset.
    Superseded,
    /// The session is shutting down; nothing was written.
    Closed,
}

#[derive(Default)]
struct Record {
    entries: IndexMap<String, PathBuf>,
    tickets: FxHashMap<String, Ticket>,
}

pub struct HandoffPublisher {
    handoff_path: PathBuf,
    cache: TempDir,
    record: Mutex<Record>,
    next_ticket: AtomicU64,
    closed: AtomicBool,
}

impl HandoffPublisher {
    /// Create the rebuild cache. The handoff file is not written until the
    /// first publication.
    pub fn new(handoff_path: PathBuf) -> io::Result<Self> {
        let cache = tempfile::Builder::new()
            .prefix("humpty-cache-")
            .tempdir()?;

        Ok(Self {
            handoff_path,
            cache,
            record: Mutex::new(Record::default()),
            next_ticket: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        })
    }

    pub fn handoff_path(&self) -> &Path {
        &self.handoff_path
    }

    pub fn cache_dir(&self) -> &Path {
        self.cache.path()
    }

    pub fn ticket(&self) -> Ticket {
        Ticket(self.next_ticket.fetch_add(1, Ordering::SeqCst))
    }

    /// Publish fresh bytes for `name`.
    ///
    /// The in-memory record only changes once both the cache file and the
    /// handoff file were written.
    pub fn publish(
        &self,
        name: &str,
        ticket: Ticket,
        bytes: &[u8],
    ) -> Result<Publication, HandoffError> {
        if !is_contained(name) {
            return Err(HandoffError::InvalidName(name.to_string()));
        }

        let mut record = self.record.lock();
        if self.closed.load(Ordering::SeqCst) {
            return Ok(Publication::Closed);
        }
        self.publish_locked(&mut record, name, ticket, bytes)
    }

    fn publish_locked(
        &self,
        record: &mut Record,
        name: &str,
        ticket: Ticket,
        bytes: &[u8],
    ) -> Result<Publication, HandoffError> {
        if record.tickets.get(name).is_some_and(|&latest| latest > ticket) {
            return Ok(Publication::Superseded);
        }

        let target = self.cache.path().join(name);
        write_atomic(&target, bytes).map_err(|source| HandoffError::Write {
            path: target.clone(),
            source,
        })?;

        let mut entries = record.entries.clone();
        entries.insert(name.to_string(), target.clone());
        self.write_handoff(&entries)?;

        // close_within gave up waiting for us and already removed the files
        if self.closed.load(Ordering::SeqCst) {
            if let Err(e) = self.remove_files() {
                crate::log!("error"; "failed to clean up handoff file: {}", e);
            }
            return Ok(Publication::Closed);
        }

        record.entries = entries;
        record.tickets.insert(name.to_string(), ticket);
        Ok(Publication::Published(target))
    }

    fn write_handoff(&self, entries: &IndexMap<String, PathBuf>) -> Result<(), HandoffError> {
        let lines: Vec<(&str, String)> = entries
            .iter()
            .map(|(name, path)| (name.as_str(), path.to_string_lossy().into_owned()))
            .collect();
        let content = kv::render(lines.iter().map(|(k, v)| (*k, v.as_str())));

        write_atomic(&self.handoff_path, content.as_bytes()).map_err(|source| {
            HandoffError::Write {
                path: self.handoff_path.clone(),
                source,
            }
        })
    }

    /// Snapshot of the published record.
    pub fn entries(&self) -> IndexMap<String, PathBuf> {
        self.record.lock().entries.clone()
    }

    /// Stop publishing, delete the handoff file and empty the cache.
    ///
    /// Waits for an in-flight publication to finish first, so the file
    /// cannot reappear afterwards. Idempotent.
    pub fn close(&self) -> io::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        let _record = self.record.lock();
        self.remove_files()
    }

    /// Like [`close`](Self::close), but gives up waiting for an in-flight
    /// publication after `timeout`. Used when the process is about to exit.
    pub fn close_within(&self, timeout: Duration) -> io::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        let _record = self.record.try_lock_for(timeout);
        self.remove_files()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn remove_files(&self) -> io::Result<()> {
        let handoff = remove_if_exists(&self.handoff_path);
        let cache = match fs::remove_dir_all(self.cache.path()) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        };
        handoff.map(|_| ()).and(cache)
    }
}

impl Drop for HandoffPublisher {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            crate::log!("error"; "failed to clean up handoff file: {}", e);
        }
    }
}

/// Remove a handoff file left behind by an earlier session.
///
/// Its content is never trusted; it is read only to report how many
/// entries are being discarded. Returns `None` when there was no file.
pub fn discard_stale(path: &Path) -> io::Result<Option<usize>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let entries = kv::parse(&content).map(|e| e.len()).unwrap_or(0);
    remove_if_exists(path)?;
    Ok(Some(entries))
}
