//! Connector provisioning: one virtualenv per declared connector with its
//! `requirements.txt` installed.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use anyhow::{bail, Context, Result};
use singer_types::ConnectorIdentity;

use crate::config::ProjectConfig;
use crate::context::RunContext;
use crate::process::{describe_status, Stage};

const PYTHON: &str = "python3";

/// The commands that build `identity`'s virtualenv, in order.
fn install_steps(
    ctx: &RunContext,
    identity: &ConnectorIdentity,
    env_vars: &BTreeMap<String, String>,
) -> Vec<Stage> {
    let venv = ctx.venv_dir(identity);
    let pip = venv.join("bin").join("pip");
    let steps = vec![
        Stage::new(PYTHON).args(["-m", "venv"]).arg(&venv),
        Stage::new(&pip).args(["install", "-U", "pip"]),
        Stage::new(&pip)
            .args(["install", "--no-cache-dir", "-r"])
            .arg(ctx.requirements_path(identity)),
    ];
    steps
        .into_iter()
        .map(|stage| {
            env_vars
                .iter()
                .fold(stage, |stage, (key, value)| stage.env(key, value))
        })
        .collect()
}

/// Recreate the connector's virtualenv and install its requirements.
///
/// # Errors
///
/// Fails when the requirements file is missing or any step can't be run
/// or exits non-zero. Later steps are not attempted.
pub async fn install_connector(
    ctx: &RunContext,
    identity: &ConnectorIdentity,
    env_vars: &BTreeMap<String, String>,
) -> Result<()> {
    let requirements = ctx.requirements_path(identity);
    if !requirements.is_file() {
        bail!(
            "{identity} has no requirements file at {}",
            requirements.display()
        );
    }

    let venv = ctx.venv_dir(identity);
    remove_dir(&venv)?;

    for stage in install_steps(ctx, identity, env_vars) {
        tracing::info!(connector = %identity, command = %stage.render(), "Installing");
        let output = stage
            .output(None)
            .await
            .with_context(|| format!("Failed to run `{}`", stage.render()))?;
        if !output.status.success() {
            bail!(
                "`{}` failed ({}):\n{}",
                stage.render(),
                describe_status(output.status),
                String::from_utf8_lossy(&output.stdout).trim_end()
            );
        }
    }

    tracing::info!(connector = %identity, venv = %venv.display(), "Connector installed");
    Ok(())
}

/// Install every connector declared in the project, taps first.
///
/// # Errors
///
/// Stops at the first connector that fails to install.
pub async fn install_all(ctx: &RunContext, project: &ProjectConfig) -> Result<()> {
    let connectors = project.connectors();
    if connectors.is_empty() {
        tracing::warn!("No connectors declared, nothing to install");
    }
    for (identity, env_vars) in &connectors {
        install_connector(ctx, identity, env_vars).await?;
    }
    Ok(())
}

fn remove_dir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => {
            Err(e).with_context(|| format!("Failed to remove {}", dir.display()))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_install_steps() {
        let ctx = RunContext::new("/srv/singer").unwrap();
        let tap = ConnectorIdentity::tap("shopify");
        let env = BTreeMap::from([("PIP_INDEX_URL".to_string(), "https://pypi.internal".to_string())]);

        let rendered: Vec<String> = install_steps(&ctx, &tap, &env)
            .iter()
            .map(Stage::render)
            .collect();
        assert_eq!(
            rendered,
            vec![
                "python3 -m venv /srv/singer/venv/tap-shopify",
                "/srv/singer/venv/tap-shopify/bin/pip install -U pip",
                "/srv/singer/venv/tap-shopify/bin/pip install --no-cache-dir -r /srv/singer/taps/tap-shopify/requirements.txt",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_requirements_fails_before_touching_venv() {
        let dir = tempdir().unwrap();
        let ctx = RunContext::new(dir.path()).unwrap();
        let target = ConnectorIdentity::target("redshift");
        let marker = ctx.venv_dir(&target).join("keep");
        std::fs::create_dir_all(marker.parent().unwrap()).unwrap();
        std::fs::write(&marker, "").unwrap();

        let err = install_connector(&ctx, &target, &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("requirements"));
        assert!(marker.exists());
    }
}
