//! File-backed store for resolved callback definitions.
//!
//! A scheduled task holds only a [`SpoolHandle`]; the definition itself sits
//! on disk until the task fires. This trades per-waiting-callback memory for
//! file churn, which is the right trade when many long-delay callbacks are
//! outstanding at once. The spool is not a durability mechanism: a process
//! restart abandons scheduled tasks and leaves their files orphaned.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::callback::ResolvedCallback;
use crate::config::SpoolConfig;
use crate::error::{EngineError, EngineResult};

/// Opaque reference to a spooled definition; owned exclusively by its
/// scheduled task and reused unchanged across retries.
#[derive(Debug, Clone, PartialEq)]
pub struct SpoolHandle {
    key: String,
    path: PathBuf,
}

impl SpoolHandle {
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Writes, reads, and removes spooled definitions under one directory.
pub struct SpoolStore {
    dir: PathBuf,
}

impl SpoolStore {
    /// Open the store, creating the spool directory if needed.
    pub async fn open(config: &SpoolConfig) -> EngineResult<Self> {
        let dir = PathBuf::from(&config.dir);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| EngineError::Spool(format!("Failed to create spool dir: {err}")))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Serialize a definition to a fresh spool file.
    pub async fn persist(&self, definition: &ResolvedCallback) -> EngineResult<SpoolHandle> {
        let key = Uuid::new_v4().to_string();
        let path = self.dir.join(format!("{key}.json"));

        let body = serde_json::to_vec(definition)
            .map_err(|err| EngineError::Spool(format!("Failed to serialize definition: {err}")))?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|err| EngineError::Spool(format!("Failed to write spool file: {err}")))?;

        tracing::debug!(key = %key, "Spooled callback definition");
        Ok(SpoolHandle { key, path })
    }

    /// Read a definition back; the handle stays valid for further reads.
    pub async fn read(&self, handle: &SpoolHandle) -> EngineResult<ResolvedCallback> {
        let body = tokio::fs::read(&handle.path)
            .await
            .map_err(|err| EngineError::Spool(format!("Failed to read spool file: {err}")))?;
        serde_json::from_slice(&body)
            .map_err(|err| EngineError::Spool(format!("Corrupt spool file: {err}")))
    }

    /// Delete a spooled definition on terminal outcome.
    pub async fn remove(&self, handle: &SpoolHandle) {
        if let Err(err) = tokio::fs::remove_file(&handle.path).await {
            tracing::warn!(key = %handle.key, error = %err, "Failed to remove spool file");
        }
    }

    /// Delete every spool file, returning the number removed.
    ///
    /// Intended for embedders that want to sweep orphans from a previous
    /// process at startup; nothing is rescheduled from disk.
    pub async fn purge(&self) -> EngineResult<usize> {
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|err| EngineError::Spool(format!("Failed to list spool dir: {err}")))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| EngineError::Spool(format!("Failed to list spool dir: {err}")))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && tokio::fs::remove_file(&path).await.is_ok()
            {
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(removed = removed, "Purged orphaned spool files");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ResolvedCallback {
        ResolvedCallback {
            delay_seconds: 10,
            url: Some("http://example.test/cb".to_string()),
            queue: None,
            topic: None,
            data: json!({"order": "A1", "total": 42}),
            auth: None,
            trace_id: "trace-1".to_string(),
            expected_status: Some(201),
        }
    }

    async fn store() -> (tempfile::TempDir, SpoolStore) {
        let dir = tempfile::tempdir().unwrap();
        let config = SpoolConfig {
            dir: dir.path().to_string_lossy().into_owned(),
        };
        let store = SpoolStore::open(&config).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn persist_read_round_trip() {
        let (_dir, store) = store().await;
        let definition = sample();

        let handle = store.persist(&definition).await.unwrap();
        let back = store.read(&handle).await.unwrap();
        assert_eq!(back, definition);
    }

    #[tokio::test]
    async fn read_survives_retries() {
        let (_dir, store) = store().await;
        let handle = store.persist(&sample()).await.unwrap();

        // Same handle, multiple reads, identical content
        let first = store.read(&handle).await.unwrap();
        let second = store.read(&handle).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn remove_deletes_file() {
        let (_dir, store) = store().await;
        let handle = store.persist(&sample()).await.unwrap();

        store.remove(&handle).await;
        assert!(store.read(&handle).await.is_err());
    }

    #[tokio::test]
    async fn purge_clears_orphans() {
        let (_dir, store) = store().await;
        store.persist(&sample()).await.unwrap();
        store.persist(&sample()).await.unwrap();

        let removed = store.purge().await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.purge().await.unwrap(), 0);
    }
}
