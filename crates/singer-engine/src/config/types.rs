//! Project configuration types (`singer_project_config.yml`).

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer};
use singer_types::{ConnectorIdentity, ConnectorKind};

/// Top-level project document read by every command.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    /// Taps keyed by `tap-<name>` (bare `<name>` is accepted too).
    #[serde(default, deserialize_with = "null_as_default")]
    pub taps: BTreeMap<String, Option<TapSettings>>,
    /// Targets keyed by `target-<name>` (bare `<name>` is accepted too).
    #[serde(default, deserialize_with = "null_as_default")]
    pub targets: BTreeMap<String, Option<TargetSettings>>,
    /// Bucket holding checkpoints and loaded output.
    #[serde(default)]
    pub data_bucket: Option<String>,
    /// Named AWS profile for local runs.
    #[serde(default)]
    pub redshift_aws_profile: Option<String>,
    /// Role assumed for bucket access when no profile is set.
    #[serde(default)]
    pub redshift_iam_role: Option<String>,
    /// Parameter-store path under which connector configs live.
    #[serde(default)]
    pub ssm_prefix: Option<String>,
    /// Upper bound on a single connector run. Unset waits indefinitely.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TapSettings {
    /// Executable name inside the tap's virtualenv.
    #[serde(default)]
    pub module: Option<String>,
    /// Flag the tap expects before the catalog path (`--catalog`, `--properties`).
    #[serde(default)]
    pub catalog_arg: Option<String>,
    /// Extra environment for provisioning.
    #[serde(default, deserialize_with = "null_as_default")]
    pub env_vars: BTreeMap<String, String>,
    /// Warehouse schema the tap's data lands in.
    #[serde(default)]
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TargetSettings {
    /// Package name; used as the executable when `module_name` is unset.
    #[serde(default)]
    pub module: Option<String>,
    /// Executable name inside the target's virtualenv.
    #[serde(default)]
    pub module_name: Option<String>,
    /// Extra environment for provisioning.
    #[serde(default, deserialize_with = "null_as_default")]
    pub env_vars: BTreeMap<String, String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lookup<T: Clone + Default>(
    map: &BTreeMap<String, Option<T>>,
    kind: ConnectorKind,
    name: &str,
) -> Option<T> {
    let bare = name
        .strip_prefix(&format!("{}-", kind.as_str()))
        .unwrap_or(name);
    map.get(&format!("{}-{bare}", kind.as_str()))
        .or_else(|| map.get(bare))
        .map(|settings| settings.clone().unwrap_or_default())
}

impl ProjectConfig {
    #[must_use]
    pub fn tap_settings(&self, name: &str) -> Option<TapSettings> {
        lookup(&self.taps, ConnectorKind::Tap, name)
    }

    #[must_use]
    pub fn target_settings(&self, name: &str) -> Option<TargetSettings> {
        lookup(&self.targets, ConnectorKind::Target, name)
    }

    /// Identity of a declared tap.
    ///
    /// # Errors
    ///
    /// Returns an error if the project does not declare the tap.
    pub fn tap_identity(&self, name: &str) -> Result<ConnectorIdentity> {
        let settings = self
            .tap_settings(name)
            .ok_or_else(|| anyhow!("tap '{name}' is not declared under `taps` in the project config"))?;
        Ok(ConnectorIdentity::new(
            ConnectorKind::Tap,
            name,
            settings.module.as_deref(),
        ))
    }

    /// Identity of a declared target.
    ///
    /// # Errors
    ///
    /// Returns an error if the project does not declare the target.
    pub fn target_identity(&self, name: &str) -> Result<ConnectorIdentity> {
        let settings = self.target_settings(name).ok_or_else(|| {
            anyhow!("target '{name}' is not declared under `targets` in the project config")
        })?;
        let executable = settings.module_name.as_deref().or(settings.module.as_deref());
        Ok(ConnectorIdentity::new(
            ConnectorKind::Target,
            name,
            executable,
        ))
    }

    /// Every declared connector with its provisioning environment, taps first.
    #[must_use]
    pub fn connectors(&self) -> Vec<(ConnectorIdentity, BTreeMap<String, String>)> {
        let taps = self.taps.iter().map(|(key, settings)| {
            let settings = settings.clone().unwrap_or_default();
            (
                ConnectorIdentity::new(ConnectorKind::Tap, key, settings.module.as_deref()),
                settings.env_vars,
            )
        });
        let targets = self.targets.iter().map(|(key, settings)| {
            let settings = settings.clone().unwrap_or_default();
            let executable = settings.module_name.as_deref().or(settings.module.as_deref());
            (
                ConnectorIdentity::new(ConnectorKind::Target, key, executable),
                settings.env_vars,
            )
        });
        taps.chain(targets).collect()
    }

    /// Flag preceding the catalog path for `tap`. A tap without one is
    /// never given a catalog.
    #[must_use]
    pub fn catalog_arg(&self, tap: &ConnectorIdentity) -> Option<String> {
        self.tap_settings(tap.name())
            .and_then(|s| s.catalog_arg)
            .filter(|arg| !arg.trim().is_empty())
    }

    /// Declared warehouse schema of `tap`.
    #[must_use]
    pub fn tap_schema(&self, tap: &ConnectorIdentity) -> Option<String> {
        self.tap_settings(tap.name()).and_then(|s| s.schema)
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}
