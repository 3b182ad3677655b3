//! [`StateStore`] over any `object_store` backend.

use std::path::Path as FsPath;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use singer_types::{CheckpointKey, TapName};

use crate::backend::StateStore;
use crate::error::{self, StateError};
use crate::layout;

/// Checkpoints kept as append-only objects in an [`ObjectStore`].
///
/// Production wires an S3 bucket (see [`crate::build_s3_store`]); tests use
/// `object_store::memory::InMemory`.
pub struct ObjectStoreStateStore {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreStateStore {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// First free checkpoint key at or after `epoch_millis`.
    async fn mint_key(&self, tap: &TapName, epoch_millis: i64) -> error::Result<CheckpointKey> {
        let mut millis = epoch_millis;
        loop {
            let key = layout::checkpoint_key(tap, millis);
            match self.store.head(&Path::from(key.as_str())).await {
                Err(object_store::Error::NotFound { .. }) => return Ok(key),
                Ok(_) => {
                    tracing::debug!(key = %key, "Checkpoint key taken, advancing timestamp");
                    millis += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn publish_at(
        &self,
        tap: &TapName,
        source: &FsPath,
        epoch_millis: i64,
    ) -> error::Result<Option<CheckpointKey>> {
        let content = tokio::fs::read(source)
            .await
            .map_err(|e| StateError::io(source, e))?;
        if content.iter().all(u8::is_ascii_whitespace) {
            tracing::debug!(tap = %tap, "Checkpoint file is empty, nothing to publish");
            return Ok(None);
        }

        let key = self.mint_key(tap, epoch_millis).await?;
        self.store
            .put(
                &Path::from(key.as_str()),
                PutPayload::from_bytes(Bytes::from(content)),
            )
            .await?;
        Ok(Some(key))
    }
}

#[async_trait]
impl StateStore for ObjectStoreStateStore {
    async fn locate(&self, tap: &TapName) -> error::Result<Option<CheckpointKey>> {
        let prefix = Path::from(layout::states_prefix(tap).as_str());
        let mut latest: Option<(DateTime<Utc>, Option<i64>, CheckpointKey)> = None;

        let mut listing = self.store.list(Some(&prefix));
        while let Some(meta) = listing.next().await {
            let meta = meta?;
            // Folder marker objects created by some S3 tooling.
            if meta.location == prefix {
                continue;
            }
            let key = CheckpointKey::new(meta.location.to_string());
            let rank = (meta.last_modified, key.epoch_millis(), key);
            if latest.as_ref().map_or(true, |current| rank > *current) {
                latest = Some(rank);
            }
        }

        Ok(latest.map(|(_, _, key)| key))
    }

    async fn fetch(&self, key: &CheckpointKey, dest: &FsPath) -> error::Result<()> {
        let data = self
            .store
            .get(&Path::from(key.as_str()))
            .await?
            .bytes()
            .await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StateError::io(parent, e))?;
        }
        tokio::fs::write(dest, &data)
            .await
            .map_err(|e| StateError::io(dest, e))?;

        tracing::debug!(key = %key, bytes = data.len(), "Checkpoint downloaded");
        Ok(())
    }

    async fn publish(
        &self,
        tap: &TapName,
        source: &FsPath,
    ) -> error::Result<Option<CheckpointKey>> {
        self.publish_at(tap, source, Utc::now().timestamp_millis())
            .await
    }
}
