use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use singer_types::Catalog;

/// Execute the `inspect` command: print stream and property selection from
/// the tap's catalog.
pub fn execute(project_dir: &Path, tap: &str) -> Result<()> {
    let (ctx, config) = super::load_project(project_dir)?;
    let identity = config.tap_identity(tap)?;
    let path = ctx.catalog_path(&identity);

    let raw = std::fs::read_to_string(&path).with_context(|| {
        format!(
            "Failed to read catalog: {} (run `discover --tap {}` first)",
            path.display(),
            identity.name()
        )
    })?;
    let catalog: Catalog = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse catalog: {}", path.display()))?;

    print!("{}", summarize(&catalog));
    Ok(())
}

fn summarize(catalog: &Catalog) -> String {
    let mut out = String::new();
    let selected = catalog.streams.iter().filter(|s| s.is_selected()).count();
    let _ = writeln!(
        out,
        "{} stream(s), {} selected:\n",
        catalog.streams.len(),
        selected
    );

    for stream in &catalog.streams {
        let mark = if stream.is_selected() { "x" } else { " " };
        let _ = writeln!(out, "[{mark}] {}", stream.tap_stream_id);
        let _ = writeln!(out, "    Properties: {}", stream.property_count());
        let fields = stream.selected_properties();
        if !fields.is_empty() {
            let _ = writeln!(out, "    Selected:   {}", fields.join(", "));
        }
    }
    out
}
