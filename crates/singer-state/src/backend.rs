//! State store trait definition.

use std::path::Path;

use async_trait::async_trait;
use singer_types::{CheckpointKey, TapName};

use crate::error;

/// Storage contract for tap checkpoints.
///
/// Checkpoints are append-only: every publish creates a new object and the
/// authoritative checkpoint is the most recently modified one.
/// Implementations must be `Send + Sync` for use behind `Arc<dyn StateStore>`.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Find the latest checkpoint for `tap`.
    ///
    /// Returns `Ok(None)` when the tap has never published a checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::StateError) if the namespace can't be listed.
    async fn locate(&self, tap: &TapName) -> error::Result<Option<CheckpointKey>>;

    /// Download the checkpoint at `key` into the local file `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::StateError) if the object can't be read
    /// or the file can't be written.
    async fn fetch(&self, key: &CheckpointKey, dest: &Path) -> error::Result<()>;

    /// Upload the checkpoint file at `source` under a freshly minted key.
    ///
    /// Returns `Ok(None)` without uploading when the file holds no content.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::StateError) if the file can't be read or
    /// the upload fails.
    async fn publish(&self, tap: &TapName, source: &Path)
        -> error::Result<Option<CheckpointKey>>;
}
