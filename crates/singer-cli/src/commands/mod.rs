pub mod discover;
pub mod inspect;
pub mod install;
pub mod sync;

use std::path::Path;

use anyhow::{Context, Result};
use singer_engine::config::{parser, validator, ProjectConfig};
use singer_engine::RunContext;

/// Anchor the project directory and load its validated config.
fn load_project(project_dir: &Path) -> Result<(RunContext, ProjectConfig)> {
    let ctx = RunContext::new(project_dir)?;
    let config = parser::parse_project(&ctx.project_file()).with_context(|| {
        format!(
            "Failed to load project config: {}",
            ctx.project_file().display()
        )
    })?;
    validator::validate_project(&config)?;

    tracing::info!(
        project = %ctx.root().display(),
        taps = config.taps.len(),
        targets = config.targets.len(),
        "Project config validated"
    );
    Ok((ctx, config))
}
