//! Age-based expiry of stored converted files.
//!
//! Converted files wait in the store until downloaded (which deletes them)
//! or until this sweeper purges them after the configured retention.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Delete regular files in `dir` whose modification time is older than
/// `retention`. Returns the number of files removed.
pub fn sweep_expired(dir: &Path, retention: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                tracing::warn!("could not stat {:?}: {}", path, e);
                continue;
            }
        };

        let age = now.duration_since(modified).unwrap_or_default();
        if age > retention {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!("expired {:?} (age {:?})", path, age);
                    removed += 1;
                }
                Err(e) => tracing::warn!("failed to expire {:?}: {}", path, e),
            }
        }
    }

    if removed > 0 {
        tracing::info!("expired {} converted file(s)", removed);
    }
    Ok(removed)
}

/// Start a background task that periodically purges expired files.
///
/// Owned by server startup; aborted at shutdown.
pub fn start_cleanup_task(
    dir: PathBuf,
    retention: Duration,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if let Err(e) = sweep_expired(&dir, retention) {
                tracing::warn!("cleanup sweep of {:?} failed: {}", dir, e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_only_expired_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"data").unwrap();
        std::fs::write(dir.path().join("b.mp4"), b"data").unwrap();

        // Nothing is older than an hour yet.
        assert_eq!(sweep_expired(dir.path(), Duration::from_secs(3600)).unwrap(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);

        // With zero retention everything qualifies.
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(sweep_expired(dir.path(), Duration::ZERO).unwrap(), 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn skips_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(sweep_expired(dir.path(), Duration::ZERO).unwrap(), 0);
        assert!(dir.path().join("nested").exists());
    }

    #[test]
    fn missing_dir_is_an_error() {
        assert!(sweep_expired(Path::new("/nonexistent/convertaphile"), Duration::ZERO).is_err());
    }
}
