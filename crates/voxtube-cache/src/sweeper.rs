//! Background TTL eviction
//!
//! A sweep enumerates every regular file in the cache root and deletes
//! those whose age has reached the TTL. The store owns the directory
//! exclusively, so everything in it is an artifact, a sidecar, or a
//! leftover temp file from an interrupted write; all of them age out the
//! same way. No eviction state is persisted between sweeps.

use crate::store::ArtifactStore;
use crate::types::SweepOutcome;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Run one full eviction pass over the store's cache root.
///
/// Per-file failures are counted and skipped; every other file is still
/// attempted. A file that vanishes mid-sweep (lazy eviction, a concurrent
/// sweep) is not an error.
pub async fn sweep_once(store: &ArtifactStore) -> SweepOutcome {
    let mut outcome = SweepOutcome::default();
    let ttl = store.ttl();

    let mut entries = match tokio::fs::read_dir(store.cache_dir()).await {
        Ok(entries) => entries,
        // A cache root that doesn't exist yet has nothing to evict.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return outcome,
        Err(e) => {
            warn!(cache_dir = ?store.cache_dir(), error = %e, "Failed to enumerate cache root");
            outcome.errors += 1;
            return outcome;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read cache directory entry");
                outcome.errors += 1;
                break;
            }
        };

        let path = entry.path();
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to stat cache file");
                outcome.errors += 1;
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        let age = match metadata.modified() {
            Ok(modified) => modified.elapsed().unwrap_or(Duration::ZERO),
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to read modification time");
                outcome.errors += 1;
                continue;
            }
        };
        if age < ttl {
            continue;
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = ?path, age_secs = age.as_secs(), "Swept expired artifact");
                outcome.deleted += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to delete expired artifact");
                outcome.errors += 1;
            }
        }
    }

    outcome
}

/// Owner of the periodic background sweep task.
pub struct Sweeper;

/// Handle to a running background sweeper. Dropping the handle leaves the
/// task running; call [`SweeperHandle::shutdown`] to stop it cleanly.
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Sweeper {
    /// Spawn the background sweep task.
    ///
    /// The first sweep fires immediately inside the spawned task, then once
    /// per `interval`. Nothing waits on a sweep completing: a slow pass
    /// simply overlaps the next tick, which is safe because deleting an
    /// already-deleted file is not an error.
    pub fn spawn(store: Arc<ArtifactStore>, interval: Duration) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let outcome = sweep_once(&store).await;
                        if outcome.deleted > 0 || outcome.errors > 0 {
                            info!(
                                deleted = outcome.deleted,
                                errors = outcome.errors,
                                "Eviction sweep finished"
                            );
                        } else {
                            debug!("Eviction sweep found nothing to delete");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        debug!("Sweeper shutting down");
                        return;
                    }
                }
            }
        });

        SweeperHandle { shutdown_tx, task }
    }
}

impl SweeperHandle {
    /// Signal the sweep task to stop and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}
