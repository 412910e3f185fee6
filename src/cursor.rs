//! Cycle cursor: "since when" the current collection should look.
//!
//! The durable state is a single marker file; its mtime records when the
//! previous cycle started. The fetch window deliberately reaches back a
//! further 24 hours from that mark as a safety margin against clock drift
//! and late-arriving items; there is no dedup downstream, so repeated
//! delivery of an item across consecutive cycles is accepted behavior.

use chrono::{DateTime, Duration, Utc};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

const LOOKBACK_HOURS: i64 = 24;

pub trait CursorStore: Send + Sync {
    /// Earliest publication instant the current cycle should include.
    fn read_cutoff(&self) -> DateTime<Utc>;
    /// Record `now` as the start of the cycle just completed. Side-effect
    /// only; failures are logged, never raised.
    fn advance(&self, now: DateTime<Utc>);
}

/// Marker-file cursor. Absence of the file means "no prior cycle".
pub struct FileCursor {
    path: PathBuf,
}

impl FileCursor {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CursorStore for FileCursor {
    fn read_cutoff(&self) -> DateTime<Utc> {
        let recorded = fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        recorded - Duration::hours(LOOKBACK_HOURS)
    }

    fn advance(&self, now: DateTime<Utc>) {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let res = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|f| f.set_modified(now.into()));
        if let Err(e) = res {
            tracing::warn!(error = ?e, path = %self.path.display(), "cursor advance failed");
        }
    }
}

/// In-memory cursor for tests; no prior state until the first `advance`.
pub struct MemoryCursor {
    recorded: Mutex<Option<DateTime<Utc>>>,
}

impl MemoryCursor {
    pub fn new() -> Self {
        Self {
            recorded: Mutex::new(None),
        }
    }
}

impl Default for MemoryCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl CursorStore for MemoryCursor {
    fn read_cutoff(&self) -> DateTime<Utc> {
        let recorded = self.recorded.lock().unwrap().unwrap_or_else(Utc::now);
        recorded - Duration::hours(LOOKBACK_HOURS)
    }

    fn advance(&self, now: DateTime<Utc>) {
        *self.recorded.lock().unwrap() = Some(now);
    }
}
