//! Semantic validation for parsed project configuration values.

use anyhow::{bail, Result};
use singer_types::ConnectorKind;

use crate::config::types::ProjectConfig;

fn validate_key(kind: ConnectorKind, key: &str, errors: &mut Vec<String>) {
    let section = kind.dir_name();
    if key.trim().is_empty() {
        errors.push(format!("{section}: connector name must not be empty"));
        return;
    }
    let other = match kind {
        ConnectorKind::Tap => ConnectorKind::Target,
        ConnectorKind::Target => ConnectorKind::Tap,
    };
    if key.starts_with(&format!("{}-", other.as_str())) {
        errors.push(format!(
            "{section}: '{key}' looks like a {other}, declare it under `{}`",
            other.dir_name()
        ));
    }
}

fn validate_env_vars<'a>(
    context: &str,
    vars: impl IntoIterator<Item = &'a String>,
    errors: &mut Vec<String>,
) {
    for name in vars {
        if name.is_empty() || name.contains('=') || name.contains('\0') {
            errors.push(format!("{context}: invalid env var name '{name}'"));
        }
    }
}

/// Validate a parsed project configuration.
/// Returns `Ok(())` if valid, Err with all validation errors if not.
///
/// # Errors
///
/// Returns an error listing all validation failures found in the project config.
pub fn validate_project(config: &ProjectConfig) -> Result<()> {
    let mut errors = Vec::new();

    for (key, settings) in &config.taps {
        validate_key(ConnectorKind::Tap, key, &mut errors);
        let Some(settings) = settings else { continue };
        if let Some(arg) = &settings.catalog_arg {
            if !arg.starts_with('-') {
                errors.push(format!(
                    "taps: '{key}' catalog_arg '{arg}' must be a flag such as --catalog"
                ));
            }
        }
        validate_env_vars(&format!("taps: '{key}'"), settings.env_vars.keys(), &mut errors);
    }

    for (key, settings) in &config.targets {
        validate_key(ConnectorKind::Target, key, &mut errors);
        let Some(settings) = settings else { continue };
        validate_env_vars(
            &format!("targets: '{key}'"),
            settings.env_vars.keys(),
            &mut errors,
        );
    }

    if let Some(prefix) = &config.ssm_prefix {
        if !prefix.starts_with('/') {
            errors.push(format!(
                "ssm_prefix '{prefix}' must be an absolute parameter path starting with '/'"
            ));
        }
    }

    if config.timeout_seconds == Some(0) {
        errors.push("timeout_seconds must be > 0".to_string());
    }

    if !errors.is_empty() {
        bail!("Project config validation failed:\n  - {}", errors.join("\n  - "));
    }

    Ok(())
}

/// Bucket that checkpoints are kept in; required by `sync`.
///
/// # Errors
///
/// Returns an error if `data_bucket` is unset or blank.
pub fn require_data_bucket(config: &ProjectConfig) -> Result<&str> {
    match config.data_bucket.as_deref().map(str::trim) {
        Some(bucket) if !bucket.is_empty() => Ok(bucket),
        _ => bail!("data_bucket must be set in the project config to sync"),
    }
}
