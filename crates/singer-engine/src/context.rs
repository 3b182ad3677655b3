//! Resolved filesystem layout of one singer project.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use singer_state::layout;
use singer_types::{ConnectorIdentity, TapName};

/// File name of the project configuration inside the project root.
pub const PROJECT_FILE: &str = "singer_project_config.yml";

/// Absolute paths every component works with.
///
/// Built once per command from the project root; nothing downstream reads
/// the process working directory.
#[derive(Debug, Clone)]
pub struct RunContext {
    root: PathBuf,
}

impl RunContext {
    /// Anchor a context at `root`, made absolute.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory can't be determined for a
    /// relative `root`.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = std::path::absolute(root.as_ref()).with_context(|| {
            format!("Failed to resolve project directory: {}", root.as_ref().display())
        })?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn project_file(&self) -> PathBuf {
        self.root.join(PROJECT_FILE)
    }

    /// `taps/tap-<name>` or `targets/target-<name>`.
    #[must_use]
    pub fn connector_dir(&self, identity: &ConnectorIdentity) -> PathBuf {
        self.root
            .join(identity.kind().dir_name())
            .join(identity.slug())
    }

    /// Canonical config location for a connector.
    #[must_use]
    pub fn config_path(&self, identity: &ConnectorIdentity) -> PathBuf {
        self.connector_dir(identity).join("config.json")
    }

    #[must_use]
    pub fn catalog_path(&self, tap: &ConnectorIdentity) -> PathBuf {
        self.connector_dir(tap).join("catalog.json")
    }

    #[must_use]
    pub fn requirements_path(&self, identity: &ConnectorIdentity) -> PathBuf {
        self.connector_dir(identity).join("requirements.txt")
    }

    /// Isolated virtualenv of a connector.
    #[must_use]
    pub fn venv_dir(&self, identity: &ConnectorIdentity) -> PathBuf {
        self.root.join("venv").join(identity.slug())
    }

    #[must_use]
    pub fn executable(&self, identity: &ConnectorIdentity) -> PathBuf {
        self.venv_dir(identity).join("bin").join(identity.executable())
    }

    /// Staging directory for the checkpoint fed into the tap.
    #[must_use]
    pub fn states_in_dir(&self) -> PathBuf {
        self.root.join("states_in")
    }

    /// Staging directory for the checkpoint emitted by the target.
    #[must_use]
    pub fn states_out_dir(&self) -> PathBuf {
        self.root.join("states_out")
    }

    #[must_use]
    pub fn state_in_file(&self, tap: &TapName) -> PathBuf {
        self.states_in_dir().join(layout::staging_file_name(tap))
    }

    #[must_use]
    pub fn state_out_file(&self, tap: &TapName) -> PathBuf {
        self.states_out_dir().join(layout::staging_file_name(tap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use singer_types::ConnectorKind;

    #[test]
    fn test_connector_paths() {
        let ctx = RunContext::new("/srv/singer").unwrap();
        let tap = ConnectorIdentity::tap("shopify");
        let target = ConnectorIdentity::new(ConnectorKind::Target, "redshift", Some("target-rs"));

        assert_eq!(
            ctx.config_path(&tap),
            PathBuf::from("/srv/singer/taps/tap-shopify/config.json")
        );
        assert_eq!(
            ctx.catalog_path(&tap),
            PathBuf::from("/srv/singer/taps/tap-shopify/catalog.json")
        );
        assert_eq!(
            ctx.config_path(&target),
            PathBuf::from("/srv/singer/targets/target-redshift/config.json")
        );
        assert_eq!(
            ctx.executable(&target),
            PathBuf::from("/srv/singer/venv/target-redshift/bin/target-rs")
        );
    }

    #[test]
    fn test_staging_paths() {
        let ctx = RunContext::new("/srv/singer").unwrap();
        let tap = TapName::new("shopify");
        assert_eq!(
            ctx.state_in_file(&tap),
            PathBuf::from("/srv/singer/states_in/tap-shopify-state.json")
        );
        assert_eq!(
            ctx.state_out_file(&tap),
            PathBuf::from("/srv/singer/states_out/tap-shopify-state.json")
        );
    }

    #[test]
    fn test_relative_root_made_absolute() {
        let ctx = RunContext::new("project").unwrap();
        assert!(ctx.root().is_absolute());
        assert!(ctx.project_file().ends_with("project/singer_project_config.yml"));
    }
}
