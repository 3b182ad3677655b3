//! Tap discovery: run the tap with `--discover` and store its catalog.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use singer_types::{Catalog, ConnectorIdentity};

use crate::context::RunContext;
use crate::errors::SyncError;
use crate::process::{describe_status, Sink, Stage};

/// Catalog written by a successful discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Stream count, when the output parses as a Singer catalog.
    pub stream_count: Option<usize>,
}

/// Runs taps in discovery mode.
pub struct Discoverer<'a> {
    ctx: &'a RunContext,
    timeout: Option<Duration>,
}

impl<'a> Discoverer<'a> {
    #[must_use]
    pub fn new(ctx: &'a RunContext, timeout: Option<Duration>) -> Self {
        Self { ctx, timeout }
    }

    /// Run `<tap> --config <config> --discover` and write its stdout
    /// verbatim to the tap's `catalog.json`.
    ///
    /// The existing catalog is replaced only after the tap exits
    /// successfully.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConnectorProcess`] with the tap's stderr when it
    /// exits non-zero, [`SyncError::ConnectorRun`] when it can't be run, and
    /// [`SyncError::Infrastructure`] when the catalog can't be written.
    pub async fn discover(&self, tap: &ConnectorIdentity) -> Result<CatalogArtifact, SyncError> {
        let stage = Stage::new(self.ctx.executable(tap))
            .arg("--config")
            .arg(self.ctx.config_path(tap))
            .arg("--discover")
            .stderr(Sink::Capture);
        let path = self.ctx.catalog_path(tap);
        tracing::info!(
            tap = %tap,
            command = %format!("{} > {}", stage.render(), path.display()),
            "Discovery running"
        );

        let output = stage
            .output(self.timeout)
            .await
            .map_err(|source| SyncError::ConnectorRun {
                connector: tap.to_string(),
                source,
            })?;
        if !output.status.success() {
            return Err(SyncError::ConnectorProcess {
                connector: tap.to_string(),
                status: describe_status(output.status),
                stderr: output.stderr_lossy(),
            });
        }

        write_atomic(&path, &output.stdout)?;
        let artifact = CatalogArtifact {
            size_bytes: output.stdout.len() as u64,
            stream_count: stream_count(&output.stdout),
            path,
        };
        tracing::info!(
            tap = %tap,
            bytes = artifact.size_bytes,
            streams = ?artifact.stream_count,
            "Catalog written"
        );
        Ok(artifact)
    }
}

fn stream_count(raw: &[u8]) -> Option<usize> {
    serde_json::from_slice::<Catalog>(raw)
        .ok()
        .map(|catalog| catalog.streams.len())
}

/// Write through a temp file in the destination directory, then rename.
fn write_atomic(path: &std::path::Path, body: &[u8]) -> anyhow::Result<()> {
    let dir = path
        .parent()
        .with_context(|| format!("Catalog path has no parent: {}", path.display()))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(body)
        .and_then(|()| tmp.as_file().sync_all())
        .context("Failed to write catalog")?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to write catalog: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_stream_count() {
        assert_eq!(
            stream_count(br#"{"streams":[{"tap_stream_id":"a"},{"tap_stream_id":"b"}]}"#),
            Some(2)
        );
        assert_eq!(stream_count(b"not a catalog"), None);
    }

    #[test]
    fn test_write_atomic_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("taps/tap-x/catalog.json");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_executable_is_run_error() {
        let dir = tempdir().unwrap();
        let ctx = RunContext::new(dir.path()).unwrap();
        let err = Discoverer::new(&ctx, None)
            .discover(&ConnectorIdentity::tap("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::ConnectorRun { .. }));
        assert!(!ctx.catalog_path(&ConnectorIdentity::tap("ghost")).exists());
    }
}
