use std::path::Path;

use anyhow::Result;
use singer_engine::config::validator::require_data_bucket;
use singer_engine::config::SsmParameterStore;
use singer_engine::process::describe_status;
use singer_engine::{sync_tap, RunResult, SyncRequest};
use singer_state::{build_s3_store, ObjectStoreStateStore, S3Settings};
use singer_types::ConnectorIdentity;

/// Execute the `sync` command: resolve configs, run the pipe, publish state.
pub async fn execute(project_dir: &Path, tap: String, target: String, ignore_state: bool) -> Result<()> {
    let (ctx, config) = super::load_project(project_dir)?;

    let settings = S3Settings {
        bucket: require_data_bucket(&config)?.to_string(),
        profile: config.redshift_aws_profile.clone(),
        role_arn: config.redshift_iam_role.clone(),
    };
    let states = ObjectStoreStateStore::new(build_s3_store(&settings).await?);
    let params = SsmParameterStore::from_env().await;

    let request = SyncRequest {
        tap,
        target,
        ignore_state,
    };
    let result = sync_tap(&ctx, &config, &params, &states, &request).await?;
    let tap = config.tap_identity(&request.tap)?;
    let target = config.target_identity(&request.target)?;

    print!("{}", summarize(&tap, &target, &result));
    Ok(())
}

fn summarize(tap: &ConnectorIdentity, target: &ConnectorIdentity, result: &RunResult) -> String {
    let mut out = format!("Sync {tap} -> {target} completed.\n");
    match &result.restored_from {
        Some(key) => out.push_str(&format!("  Resumed from:  {key}\n")),
        None => out.push_str("  Resumed from:  (none)\n"),
    }
    match &result.published {
        Some(key) => out.push_str(&format!("  New state:     {key}\n")),
        None => out.push_str("  New state:     (none emitted)\n"),
    }
    if !result.extractor_status.success() {
        out.push_str(&format!(
            "  Warning: tap {}\n",
            describe_status(result.extractor_status)
        ));
    }
    out
}
