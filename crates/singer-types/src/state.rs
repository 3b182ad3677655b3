//! Checkpoint model types shared by the state and engine crates.

use serde::{Deserialize, Serialize};

/// Bare tap name used in checkpoint namespaces (`shopify`, not `tap-shopify`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TapName(String);

impl TapName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TapName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&crate::ConnectorIdentity> for TapName {
    fn from(identity: &crate::ConnectorIdentity) -> Self {
        Self(identity.name().to_string())
    }
}

/// Full object-storage key of one checkpoint object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckpointKey(String);

impl CheckpointKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Epoch milliseconds encoded in the file name
    /// (`<epoch-ms>-<tap>-state.json`), if the key follows that layout.
    #[must_use]
    pub fn epoch_millis(&self) -> Option<i64> {
        let file = self.0.rsplit('/').next()?;
        let (millis, _) = file.split_once('-')?;
        millis.parse().ok()
    }
}

impl std::fmt::Display for CheckpointKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
