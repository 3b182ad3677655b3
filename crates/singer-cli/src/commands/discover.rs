use std::path::Path;

use anyhow::Result;
use singer_engine::config::SsmParameterStore;
use singer_engine::discover_tap;

/// Execute the `discover` command: regenerate the tap's catalog.
pub async fn execute(project_dir: &Path, tap: &str) -> Result<()> {
    let (ctx, config) = super::load_project(project_dir)?;
    let params = SsmParameterStore::from_env().await;

    let artifact = discover_tap(&ctx, &config, &params, tap).await?;

    println!("Catalog written to {}", artifact.path.display());
    println!("  Size:    {} bytes", artifact.size_bytes);
    match artifact.stream_count {
        Some(n) => println!("  Streams: {n}"),
        None => println!("  Streams: (output is not a Singer catalog)"),
    }
    Ok(())
}
