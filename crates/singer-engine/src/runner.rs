//! One sync run: tap piped into target, checkpoint restored before and
//! published after.

use std::path::Path;
use std::process::ExitStatus;
use std::time::Duration;

use anyhow::Context;
use singer_state::StateStore;
use singer_types::{CheckpointKey, ConnectorIdentity, TapName};

use crate::config::ProjectConfig;
use crate::context::RunContext;
use crate::errors::SyncError;
use crate::process::{describe_status, Pipeline, ProcessError, Sink, Stage};

/// Outcome of a successful [`PipelineRunner::run`].
#[derive(Debug, Clone)]
pub struct RunResult {
    pub loader_status: ExitStatus,
    pub extractor_status: ExitStatus,
    /// Last non-empty line of the loader's output, byte for byte.
    pub checkpoint: Option<Vec<u8>>,
    /// Checkpoint the tap was started from, if any.
    pub restored_from: Option<CheckpointKey>,
    /// Key the new checkpoint was uploaded to, if any.
    pub published: Option<CheckpointKey>,
}

/// Runs a tap into a target with checkpoint handling.
///
/// Configs must already be resolved at their canonical paths; the runner
/// neither creates nor removes them.
pub struct PipelineRunner<'a> {
    ctx: &'a RunContext,
    project: &'a ProjectConfig,
    states: &'a dyn StateStore,
    timeout: Option<Duration>,
}

impl<'a> PipelineRunner<'a> {
    #[must_use]
    pub fn new(ctx: &'a RunContext, project: &'a ProjectConfig, states: &'a dyn StateStore) -> Self {
        Self {
            ctx,
            project,
            states,
            timeout: project.timeout(),
        }
    }

    /// Override the project's `timeout_seconds`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `tap | loader`.
    ///
    /// Unless `ignore_state` is set, the tap's latest checkpoint is fetched
    /// and passed with `--state`. The loader's last non-empty output line
    /// becomes the new checkpoint.
    ///
    /// # Errors
    ///
    /// - [`SyncError::CheckpointFetch`] when a prior checkpoint can't be
    ///   listed or downloaded; no process is started.
    /// - [`SyncError::ConnectorRun`] when a connector can't be spawned or
    ///   the deadline passes.
    /// - [`SyncError::ConnectorProcess`] when the loader exits non-zero.
    /// - [`SyncError::CheckpointPublish`] when the upload fails.
    pub async fn run(
        &self,
        tap: &ConnectorIdentity,
        loader: &ConnectorIdentity,
        ignore_state: bool,
    ) -> Result<RunResult, SyncError> {
        let tap_name = TapName::from(tap);
        let restored_from = self.restore(&tap_name, ignore_state).await?;
        let state_in = restored_from
            .as_ref()
            .map(|_| self.ctx.state_in_file(&tap_name));

        let pipeline = Pipeline::new(
            self.extractor_stage(tap, state_in.as_deref()),
            self.loader_stage(loader),
        );
        let state_out = self.ctx.state_out_file(&tap_name);
        tracing::info!(
            tap = %tap,
            loader = %loader,
            command = %pipeline.render(Some(&state_out)),
            "Sync running"
        );

        let outcome = pipeline
            .run(self.timeout)
            .await
            .map_err(|source| run_error(tap, loader, source))?;

        if !outcome.upstream_status.success() {
            tracing::warn!(
                tap = %tap,
                status = %describe_status(outcome.upstream_status),
                "Tap exited unsuccessfully; loader status decides the run"
            );
        }

        let loader_ok = outcome.downstream.status.success();
        let checkpoint = last_non_empty_line(&outcome.downstream.stdout).map(<[u8]>::to_vec);
        let publishable = checkpoint.as_deref().filter(|line| {
            loader_ok || serde_json::from_slice::<serde_json::Value>(line).is_ok()
        });

        let published = match publishable {
            Some(line) => match self.publish(&tap_name, line, &state_out).await {
                Ok(key) => key,
                // The loader failure is the error to report.
                Err(e) if !loader_ok => {
                    tracing::warn!(
                        tap = %tap_name,
                        error = %e,
                        "Checkpoint from failed loader could not be published"
                    );
                    None
                }
                Err(e) => return Err(e),
            },
            None => {
                tracing::info!(tap = %tap_name, "No checkpoint emitted, nothing to publish");
                None
            }
        };

        if !loader_ok {
            return Err(SyncError::ConnectorProcess {
                connector: loader.to_string(),
                status: describe_status(outcome.downstream.status),
                stderr: outcome.downstream.stderr_lossy(),
            });
        }

        let stderr = outcome.downstream.stderr_lossy();
        if !stderr.is_empty() {
            tracing::debug!(loader = %loader, stderr = %stderr, "Loader stderr");
        }
        tracing::info!(
            tap = %tap_name,
            published = published.as_ref().map_or("-", CheckpointKey::as_str),
            "Sync complete"
        );

        Ok(RunResult {
            loader_status: outcome.downstream.status,
            extractor_status: outcome.upstream_status,
            checkpoint,
            restored_from,
            published,
        })
    }

    async fn restore(
        &self,
        tap: &TapName,
        ignore_state: bool,
    ) -> Result<Option<CheckpointKey>, SyncError> {
        if ignore_state {
            tracing::info!(tap = %tap, "Ignoring saved state");
            return Ok(None);
        }

        let fetch_error = |source| SyncError::CheckpointFetch {
            tap: tap.to_string(),
            source,
        };
        let Some(key) = self.states.locate(tap).await.map_err(fetch_error)? else {
            tracing::info!(tap = %tap, "No saved state, starting from scratch");
            return Ok(None);
        };
        self.states
            .fetch(&key, &self.ctx.state_in_file(tap))
            .await
            .map_err(fetch_error)?;
        tracing::info!(tap = %tap, key = %key, "State fetched");
        Ok(Some(key))
    }

    async fn publish(
        &self,
        tap: &TapName,
        line: &[u8],
        staging: &Path,
    ) -> Result<Option<CheckpointKey>, SyncError> {
        if let Some(parent) = staging.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(staging, line)
            .await
            .with_context(|| format!("Failed to write checkpoint: {}", staging.display()))?;

        let key = self
            .states
            .publish(tap, staging)
            .await
            .map_err(|source| SyncError::CheckpointPublish {
                tap: tap.to_string(),
                source,
            })?;
        if let Some(key) = &key {
            tracing::info!(tap = %tap, key = %key, "State published");
        }
        Ok(key)
    }

    fn extractor_stage(&self, tap: &ConnectorIdentity, state: Option<&Path>) -> Stage {
        let mut stage = Stage::new(self.ctx.executable(tap))
            .arg("--config")
            .arg(self.ctx.config_path(tap));
        let catalog = self.ctx.catalog_path(tap);
        if let Some(flag) = self.project.catalog_arg(tap) {
            if catalog.is_file() {
                stage = stage.arg(flag).arg(catalog);
            }
        }
        if let Some(state) = state {
            stage = stage.arg("--state").arg(state);
        }
        stage
    }

    fn loader_stage(&self, loader: &ConnectorIdentity) -> Stage {
        Stage::new(self.ctx.executable(loader))
            .arg("--config")
            .arg(self.ctx.config_path(loader))
            .stderr(Sink::Capture)
    }
}

fn run_error(tap: &ConnectorIdentity, loader: &ConnectorIdentity, source: ProcessError) -> SyncError {
    SyncError::ConnectorRun {
        connector: format!("{tap} | {loader}"),
        source,
    }
}

/// Last line of `output` with non-whitespace content, without its line
/// terminator. Bytes are returned untouched; the output need not be UTF-8.
pub(crate) fn last_non_empty_line(output: &[u8]) -> Option<&[u8]> {
    output
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .rev()
        .find(|line| !line.iter().all(u8::is_ascii_whitespace))
}
