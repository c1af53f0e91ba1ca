// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! The current snapshot, in memory and on disk.
//!
//! Readers get an `Arc` to a complete snapshot. A commit rewrites the file
//! through a temporary sibling and a rename, then swaps the pointer, so the
//! file on disk is always one whole snapshot and readers never see one the
//! file did not get.

use kurs_core::{KursResult, Snapshot};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub struct SnapshotStore {
    path: PathBuf,
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    /// Open the store at `path`, starting from whatever it holds.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let snapshot = load(&path).await;
        if !snapshot.is_empty() {
            info!(
                path = %path.display(),
                resolved = snapshot.counts.resolved,
                post_date = ?snapshot.post_date,
                "loaded stored snapshot"
            );
        }
        Self {
            path,
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.current.read().await)
    }

    /// Persist `snapshot`, then publish it. On a write failure the previous
    /// snapshot stays current.
    pub async fn commit(&self, snapshot: Snapshot) -> KursResult<Arc<Snapshot>> {
        let snapshot = Arc::new(snapshot);
        let mut current = self.current.write().await;
        persist(&self.path, &snapshot).await?;
        *current = Arc::clone(&snapshot);
        info!(path = %self.path.display(), "snapshot saved");
        Ok(snapshot)
    }
}

/// The stored snapshot, or an empty one when the file is missing or
/// unreadable.
pub async fn load(path: &Path) -> Snapshot {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Snapshot::empty(),
        Err(e) => {
            warn!(path = %path.display(), "cannot read snapshot: {e}");
            return Snapshot::empty();
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(path = %path.display(), "ignoring corrupt snapshot: {e}");
            Snapshot::empty()
        }
    }
}

async fn persist(path: &Path, snapshot: &Snapshot) -> KursResult<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
