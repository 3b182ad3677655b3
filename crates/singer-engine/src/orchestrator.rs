//! Top-level `sync` and `discover` flows.
//!
//! Both open a [`CleanupScope`] before anything touches the disk, so
//! staging directories and ephemeral configs are removed on every exit
//! path.

use chrono::Utc;
use singer_state::StateStore;

use crate::cleanup::CleanupScope;
use crate::config::{ConfigResolver, ParameterStore, ProjectConfig};
use crate::context::RunContext;
use crate::discover::{CatalogArtifact, Discoverer};
use crate::errors::SyncError;
use crate::runner::{PipelineRunner, RunResult};

/// Arguments of one `sync` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub tap: String,
    pub target: String,
    pub ignore_state: bool,
}

/// Resolve both configs, run the tap into the target, and publish the new
/// checkpoint.
///
/// # Errors
///
/// Returns the first [`SyncError`] hit; cleanup has already run when this
/// returns.
pub async fn sync_tap(
    ctx: &RunContext,
    project: &ProjectConfig,
    params: &dyn ParameterStore,
    states: &dyn StateStore,
    request: &SyncRequest,
) -> Result<RunResult, SyncError> {
    let tap = project.tap_identity(&request.tap)?;
    let target = project.target_identity(&request.target)?;

    let mut scope = CleanupScope::new(ctx);
    let resolver = ConfigResolver::new(ctx, project, params);

    let tap_config = resolver.resolve(&tap).await?;
    scope.track(&tap, tap_config.ephemeral);
    let target_config = resolver.resolve_loader(&target, &tap, Utc::now()).await?;
    scope.track(&target, target_config.ephemeral);

    PipelineRunner::new(ctx, project, states)
        .run(&tap, &target, request.ignore_state)
        .await
}

/// Resolve the tap's config and regenerate its catalog.
///
/// # Errors
///
/// Returns the first [`SyncError`] hit; cleanup has already run when this
/// returns.
pub async fn discover_tap(
    ctx: &RunContext,
    project: &ProjectConfig,
    params: &dyn ParameterStore,
    tap: &str,
) -> Result<CatalogArtifact, SyncError> {
    let tap = project.tap_identity(tap)?;

    let mut scope = CleanupScope::new(ctx);
    let config = ConfigResolver::new(ctx, project, params)
        .resolve(&tap)
        .await?;
    scope.track(&tap, config.ephemeral);

    Discoverer::new(ctx, project.timeout()).discover(&tap).await
}
