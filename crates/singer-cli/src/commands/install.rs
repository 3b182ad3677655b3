use std::path::Path;

use anyhow::Result;
use singer_engine::provision;

/// Execute the `install` command: build every connector's virtualenv.
pub async fn execute(project_dir: &Path) -> Result<()> {
    let (ctx, config) = super::load_project(project_dir)?;
    provision::install_all(&ctx, &config).await?;
    println!("Installed {} connector(s).", config.connectors().len());
    Ok(())
}
