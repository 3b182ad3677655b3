//! Removal of per-run artifacts: checkpoint staging directories and
//! ephemeral connector configs.

use std::io;
use std::path::Path;

use singer_types::ConnectorIdentity;

use crate::context::RunContext;

/// Remove both staging directories and, when `ephemeral`, the connector's
/// canonical config file. Missing paths are not errors; other failures are
/// logged and do not stop the remaining removals.
pub fn cleanup(ctx: &RunContext, identity: &ConnectorIdentity, ephemeral: bool) {
    remove_staging(ctx);
    if ephemeral {
        let path = ctx.config_path(identity);
        if let Err(e) = ignore_missing(std::fs::remove_file(&path)) {
            tracing::warn!(
                connector = %identity,
                path = %path.display(),
                error = %e,
                "Failed to remove ephemeral config"
            );
        }
    }
    tracing::info!(connector = %identity, ephemeral, "Cleanup complete");
}

fn remove_staging(ctx: &RunContext) {
    for dir in [ctx.states_in_dir(), ctx.states_out_dir()] {
        remove_dir(&dir);
    }
}

fn remove_dir(dir: &Path) {
    if let Err(e) = ignore_missing(std::fs::remove_dir_all(dir)) {
        tracing::warn!(path = %dir.display(), error = %e, "Failed to remove staging directory");
    }
}

fn ignore_missing(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Drop guard running [`cleanup`] for every connector resolved during a
/// command, whichever way the command exits.
///
/// Create it before the first config is resolved and [`track`] each
/// connector as soon as its config is on disk.
///
/// [`track`]: CleanupScope::track
#[derive(Debug)]
pub struct CleanupScope<'a> {
    ctx: &'a RunContext,
    tracked: Vec<(ConnectorIdentity, bool)>,
}

impl<'a> CleanupScope<'a> {
    #[must_use]
    pub fn new(ctx: &'a RunContext) -> Self {
        Self {
            ctx,
            tracked: Vec::new(),
        }
    }

    pub fn track(&mut self, identity: &ConnectorIdentity, ephemeral: bool) {
        self.tracked.push((identity.clone(), ephemeral));
    }
}

impl Drop for CleanupScope<'_> {
    fn drop(&mut self) {
        if self.tracked.is_empty() {
            remove_staging(self.ctx);
            tracing::info!("Cleanup complete");
            return;
        }
        for (identity, ephemeral) in &self.tracked {
            cleanup(self.ctx, identity, *ephemeral);
        }
    }
}
