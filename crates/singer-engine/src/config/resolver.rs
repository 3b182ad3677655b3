//! Layered connector config resolution.
//!
//! Sources, first match wins:
//! 1. `<kind>s/<kind>-<name>/config.json` already on disk (kept after the run)
//! 2. `<KIND>_<NAME>_CONFIG` environment variable (ephemeral)
//! 3. `<ssm_prefix>/<KIND>_<NAME>_CONFIG` remote parameter (ephemeral)

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use singer_state::layout;
use singer_types::{ConnectorIdentity, TapName};

use crate::config::params::{parameter_name, ParameterStore};
use crate::config::types::ProjectConfig;
use crate::context::RunContext;
use crate::errors::SyncError;

/// Key receiving the tap's warehouse schema in loader configs.
const SCHEMA_FIELD: &str = "redshift_schema";
/// Object receiving the run's output prefix in loader configs.
const S3_SECTION: &str = "target_s3";
const KEY_PREFIX_FIELD: &str = "key_prefix";

/// Where a resolved config came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    PreExisting,
    EnvironmentVariable,
    RemoteParameter,
}

impl ConfigOrigin {
    /// Configs materialized by the resolver are removed after the run.
    #[must_use]
    pub fn is_ephemeral(self) -> bool {
        !matches!(self, Self::PreExisting)
    }

    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::PreExisting => "existing config file",
            Self::EnvironmentVariable => "environment variable",
            Self::RemoteParameter => "remote parameter",
        }
    }
}

impl std::fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

/// A connector config materialized at its canonical path.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    pub path: PathBuf,
    pub content: Map<String, Value>,
    pub origin: ConfigOrigin,
    pub ephemeral: bool,
}

impl ConnectorConfig {
    fn new(path: PathBuf, content: Map<String, Value>, origin: ConfigOrigin) -> Self {
        Self {
            path,
            content,
            ephemeral: origin.is_ephemeral(),
            origin,
        }
    }
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Resolves and materializes connector configs for one run.
pub struct ConfigResolver<'a> {
    ctx: &'a RunContext,
    project: &'a ProjectConfig,
    params: &'a dyn ParameterStore,
    env: EnvLookup,
}

impl<'a> ConfigResolver<'a> {
    #[must_use]
    pub fn new(
        ctx: &'a RunContext,
        project: &'a ProjectConfig,
        params: &'a dyn ParameterStore,
    ) -> Self {
        Self {
            ctx,
            project,
            params,
            env: Box::new(|name| std::env::var(name).ok()),
        }
    }

    /// Replace the process environment as the variable source.
    #[must_use]
    pub fn with_env(mut self, env: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Resolve a connector config and make sure it exists at its canonical
    /// path. A pre-existing file is used verbatim and left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConfigResolution`] if no source yields a JSON
    /// object or the remote fetch fails, and [`SyncError::Infrastructure`]
    /// if the file can't be written.
    pub async fn resolve(&self, identity: &ConnectorIdentity) -> Result<ConnectorConfig, SyncError> {
        let (content, origin) = self.load(identity).await?;
        let config = ConnectorConfig::new(self.ctx.config_path(identity), content, origin);
        if origin.is_ephemeral() {
            persist(&config)?;
        }
        log_resolved(identity, &config);
        Ok(config)
    }

    /// Resolve a target config and inject the fields derived from the tap
    /// it loads: the tap's warehouse schema and the date-partitioned key
    /// prefix for this run's output. Always persisted.
    ///
    /// # Errors
    ///
    /// Same as [`ConfigResolver::resolve`], plus a resolution error when the
    /// config's `target_s3` entry is not an object.
    pub async fn resolve_loader(
        &self,
        target: &ConnectorIdentity,
        tap: &ConnectorIdentity,
        now: DateTime<Utc>,
    ) -> Result<ConnectorConfig, SyncError> {
        let (mut content, origin) = self.load(target).await?;

        match self.project.tap_schema(tap) {
            Some(schema) => {
                content.insert(SCHEMA_FIELD.to_string(), Value::String(schema));
            }
            None => tracing::warn!(
                tap = %tap,
                loader = %target,
                "No schema declared for tap, {SCHEMA_FIELD} not injected"
            ),
        }

        let key_prefix = layout::output_prefix(&TapName::from(tap), now);
        match content
            .entry(S3_SECTION)
            .or_insert_with(|| Value::Object(Map::new()))
        {
            Value::Object(section) => {
                section.insert(KEY_PREFIX_FIELD.to_string(), Value::String(key_prefix));
            }
            _ => {
                return Err(SyncError::config(
                    target,
                    format!("`{S3_SECTION}` must be an object to receive the output key prefix"),
                ))
            }
        }

        let config = ConnectorConfig::new(self.ctx.config_path(target), content, origin);
        persist(&config)?;
        log_resolved(target, &config);
        Ok(config)
    }

    async fn load(
        &self,
        identity: &ConnectorIdentity,
    ) -> Result<(Map<String, Value>, ConfigOrigin), SyncError> {
        let path = self.ctx.config_path(identity);
        if path.is_file() {
            let raw = std::fs::read_to_string(&path).map_err(|e| {
                SyncError::config(identity, format!("{} is unreadable: {e}", path.display()))
            })?;
            let content = parse_object(identity, &raw, ConfigOrigin::PreExisting)?;
            return Ok((content, ConfigOrigin::PreExisting));
        }

        let variable = identity.config_variable();
        if let Some(raw) = (self.env)(&variable) {
            let content = parse_object(identity, &raw, ConfigOrigin::EnvironmentVariable)?;
            return Ok((content, ConfigOrigin::EnvironmentVariable));
        }

        let Some(prefix) = self
            .project
            .ssm_prefix
            .as_deref()
            .filter(|p| !p.trim().is_empty())
        else {
            return Err(SyncError::config(
                identity,
                format!(
                    "not provided as {}, ${variable}, or remote parameter (ssm_prefix is not set)",
                    path.display()
                ),
            ));
        };

        let name = parameter_name(prefix, identity);
        match self.params.get_decrypted(&name).await {
            Ok(Some(raw)) => {
                let content = parse_object(identity, &raw, ConfigOrigin::RemoteParameter)?;
                Ok((content, ConfigOrigin::RemoteParameter))
            }
            Ok(None) => Err(SyncError::config(
                identity,
                format!(
                    "not provided as {}, ${variable}, or remote parameter {name}",
                    path.display()
                ),
            )),
            Err(e) => Err(SyncError::config(
                identity,
                format!("remote parameter {name} could not be fetched: {e:#}"),
            )),
        }
    }
}

fn parse_object(
    identity: &ConnectorIdentity,
    raw: &str,
    origin: ConfigOrigin,
) -> Result<Map<String, Value>, SyncError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(SyncError::config(
            identity,
            format!("config from {origin} is not a JSON object"),
        )),
        Err(e) => Err(SyncError::config(
            identity,
            format!("config from {origin} is not valid JSON: {e}"),
        )),
    }
}

fn log_resolved(identity: &ConnectorIdentity, config: &ConnectorConfig) {
    tracing::info!(
        connector = %identity,
        origin = config.origin.describe(),
        ephemeral = config.ephemeral,
        path = %config.path.display(),
        "Config resolved"
    );
}

/// Write the config to its canonical path through a temp file in the same
/// directory, so a failed write never leaves a truncated config behind.
fn persist(config: &ConnectorConfig) -> Result<(), SyncError> {
    let body = serde_json::to_vec(&config.content).context("Failed to serialize config")?;
    write_config(&config.path, &body, config.ephemeral)
        .with_context(|| format!("Failed to write config: {}", config.path.display()))?;
    Ok(())
}

/// Ephemeral configs are owner-only; a rewritten file keeps its permissions.
fn write_config(path: &Path, body: &[u8], private: bool) -> anyhow::Result<()> {
    let dir = path
        .parent()
        .with_context(|| format!("Config path has no parent: {}", path.display()))?;
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(body)?;
    tmp.as_file().sync_all()?;
    if private {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
    } else if let Ok(existing) = std::fs::metadata(path) {
        tmp.as_file().set_permissions(existing.permissions())?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
