//! Connector identity: which tap or target a run talks to and how its
//! executable is named.

use serde::{Deserialize, Serialize};

/// Role a connector plays in a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    /// Extractor: reads a source and emits Singer messages on stdout.
    Tap,
    /// Loader: consumes Singer messages on stdin and writes a destination.
    Target,
}

impl ConnectorKind {
    /// Lower-case prefix used in directory names (`tap-shopify`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tap => "tap",
            Self::Target => "target",
        }
    }

    /// Project sub-directory holding connectors of this kind.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Tap => "taps",
            Self::Target => "targets",
        }
    }

    /// Upper-case prefix of environment variables and remote parameters.
    #[must_use]
    pub fn env_prefix(self) -> &'static str {
        match self {
            Self::Tap => "TAP",
            Self::Target => "TARGET",
        }
    }
}

impl std::fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable identity of one connector, derived from project configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectorIdentity {
    kind: ConnectorKind,
    name: String,
    executable: String,
}

impl ConnectorIdentity {
    /// Build an identity. `name` is the bare connector name (`shopify`);
    /// a leading `tap-`/`target-` is stripped. The executable defaults to
    /// the connector slug when the project declares none.
    #[must_use]
    pub fn new(kind: ConnectorKind, name: &str, executable: Option<&str>) -> Self {
        let prefix = format!("{}-", kind.as_str());
        let name = name.strip_prefix(&prefix).unwrap_or(name).to_string();
        let executable = executable
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map_or_else(|| format!("{prefix}{}", name.to_lowercase()), str::to_string);
        Self {
            kind,
            name,
            executable,
        }
    }

    #[must_use]
    pub fn tap(name: &str) -> Self {
        Self::new(ConnectorKind::Tap, name, None)
    }

    #[must_use]
    pub fn target(name: &str) -> Self {
        Self::new(ConnectorKind::Target, name, None)
    }

    #[must_use]
    pub fn kind(&self) -> ConnectorKind {
        self.kind
    }

    /// Bare connector name as given on the command line.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name of the connector executable inside its virtualenv.
    #[must_use]
    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Directory-style name, e.g. `tap-shopify`.
    #[must_use]
    pub fn slug(&self) -> String {
        format!("{}-{}", self.kind.as_str(), self.name.to_lowercase())
    }

    /// Name of the variable carrying this connector's JSON config, e.g.
    /// `TAP_GOOGLE_ADS_CONFIG` for `tap-google-ads`. Also the leaf name of
    /// the remote parameter.
    #[must_use]
    pub fn config_variable(&self) -> String {
        format!(
            "{}_{}_CONFIG",
            self.kind.env_prefix(),
            self.name.to_uppercase().replace('-', "_")
        )
    }
}

impl std::fmt::Display for ConnectorIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.kind.as_str(), self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_executable_is_slug() {
        let tap = ConnectorIdentity::tap("shopify");
        assert_eq!(tap.executable(), "tap-shopify");
        assert_eq!(tap.slug(), "tap-shopify");
        assert_eq!(tap.to_string(), "tap-shopify");
    }

    #[test]
    fn declared_executable_wins() {
        let target = ConnectorIdentity::new(
            ConnectorKind::Target,
            "redshift",
            Some("target-redshift-pipelinewise"),
        );
        assert_eq!(target.executable(), "target-redshift-pipelinewise");
        assert_eq!(target.slug(), "target-redshift");
    }

    #[test]
    fn blank_executable_falls_back() {
        let tap = ConnectorIdentity::new(ConnectorKind::Tap, "stripe", Some("  "));
        assert_eq!(tap.executable(), "tap-stripe");
    }

    #[test]
    fn prefixed_name_is_stripped() {
        let tap = ConnectorIdentity::tap("tap-stripe");
        assert_eq!(tap.name(), "stripe");
        assert_eq!(tap.slug(), "tap-stripe");
    }

    #[test]
    fn config_variable_replaces_hyphens() {
        let tap = ConnectorIdentity::tap("google-ads");
        assert_eq!(tap.config_variable(), "TAP_GOOGLE_ADS_CONFIG");
        let target = ConnectorIdentity::target("redshift");
        assert_eq!(target.config_variable(), "TARGET_REDSHIFT_CONFIG");
    }

    proptest! {
        #[test]
        fn config_variable_is_shell_safe(name in "[a-z][a-z0-9-]{0,20}") {
            let var = ConnectorIdentity::tap(&name).config_variable();
            prop_assert!(var.starts_with("TAP_"));
            prop_assert!(var.ends_with("_CONFIG"));
            prop_assert!(var.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'));
        }
    }
}
