//! Conversion statistics.
//!
//! In-process counters behind a lock, persisted best-effort to a JSON file
//! so totals survive restarts. Increment paths never fail the request.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Counter snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_files: u64,
    pub total_size_mb: f64,
    pub total_downloads: u64,
}

/// Shared statistics store.
pub struct StatsStore {
    stats: RwLock<Stats>,
    persist_path: Option<PathBuf>,
}

impl StatsStore {
    /// Create a store, loading any previously persisted counters.
    pub fn new(persist_path: Option<PathBuf>) -> Self {
        let stats = persist_path
            .as_deref()
            .and_then(|path| match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(stats) => Some(stats),
                    Err(e) => {
                        tracing::warn!("ignoring corrupt stats file {:?}: {}", path, e);
                        None
                    }
                },
                Err(_) => None,
            })
            .unwrap_or_default();

        Self {
            stats: RwLock::new(stats),
            persist_path,
        }
    }

    /// Record one completed conversion of the given output size.
    pub fn record_conversion(&self, file_size_bytes: u64) {
        let snapshot = {
            let mut stats = self.stats.write();
            stats.total_files += 1;
            stats.total_size_mb += file_size_bytes as f64 / BYTES_PER_MB;
            stats.clone()
        };
        self.persist(&snapshot);
    }

    /// Record one successful download.
    pub fn record_download(&self) {
        let snapshot = {
            let mut stats = self.stats.write();
            stats.total_downloads += 1;
            stats.clone()
        };
        self.persist(&snapshot);
    }

    /// Current counter values.
    pub fn snapshot(&self) -> Stats {
        self.stats.read().clone()
    }

    fn persist(&self, stats: &Stats) {
        let Some(path) = self.persist_path.as_deref() else {
            return;
        };
        let serialized = match serde_json::to_string_pretty(stats) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("failed to serialize stats: {}", e);
                return;
            }
        };
        if let Err(e) = std::fs::write(path, serialized) {
            tracing::warn!("failed to persist stats to {:?}: {}", path, e);
        }
    }
}
