//! Sync error model.

use singer_state::StateError;

use crate::process::ProcessError;

/// Categorized failure of a `sync` or `discover` command.
///
/// Every variant is fatal to the command; cleanup still runs because it is
/// tied to scope, not to the success path.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// No config source produced a usable config, or the remote fetch failed.
    #[error("config for {connector} could not be resolved: {reason}")]
    ConfigResolution { connector: String, reason: String },

    /// A prior checkpoint exists but could not be listed or downloaded.
    #[error("last checkpoint for tap-{tap} could not be fetched")]
    CheckpointFetch {
        tap: String,
        #[source]
        source: StateError,
    },

    /// A connector exited unsuccessfully.
    #[error("{connector} failed ({status}):\n{stderr}")]
    ConnectorProcess {
        connector: String,
        status: String,
        stderr: String,
    },

    /// A connector could not be spawned, awaited, or ran past its deadline.
    #[error("{connector} could not be run")]
    ConnectorRun {
        connector: String,
        #[source]
        source: ProcessError,
    },

    /// The new checkpoint could not be uploaded.
    #[error("new checkpoint for tap-{tap} could not be published")]
    CheckpointPublish {
        tap: String,
        #[source]
        source: StateError,
    },

    /// Project config, filesystem and other host-side failures.
    #[error(transparent)]
    Infrastructure(#[from] anyhow::Error),
}

impl SyncError {
    pub(crate) fn config(connector: impl ToString, reason: impl Into<String>) -> Self {
        Self::ConfigResolution {
            connector: connector.to_string(),
            reason: reason.into(),
        }
    }

    /// Captured stderr of a failed connector, if this is a process failure.
    #[must_use]
    pub fn connector_stderr(&self) -> Option<&str> {
        match self {
            Self::ConnectorProcess { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connector_process_display_carries_stderr() {
        let err = SyncError::ConnectorProcess {
            connector: "tap-stripe".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "invalid credentials".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("tap-stripe"));
        assert!(msg.contains("invalid credentials"));
        assert_eq!(err.connector_stderr(), Some("invalid credentials"));
    }

    #[test]
    fn test_config_resolution_display() {
        let err = SyncError::config("tap-shopify", "not provided as file, env var or remote parameter");
        assert!(err.to_string().starts_with("config for tap-shopify could not be resolved"));
        assert!(err.connector_stderr().is_none());
    }

    #[test]
    fn test_from_anyhow_is_infrastructure() {
        let err: SyncError = anyhow::anyhow!("disk full").into();
        assert!(matches!(err, SyncError::Infrastructure(_)));
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn test_checkpoint_fetch_keeps_source() {
        let err = SyncError::CheckpointFetch {
            tap: "shopify".to_string(),
            source: StateError::Config("boom".to_string()),
        };
        assert!(err.to_string().contains("tap-shopify"));
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("boom"));
    }
}
