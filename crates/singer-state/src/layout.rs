//! Object key layout for checkpoints and run output.

use chrono::{DateTime, Datelike, Utc};
use singer_types::{CheckpointKey, TapName};

/// Namespace listed to find a tap's checkpoints.
#[must_use]
pub fn states_prefix(tap: &TapName) -> String {
    format!("singer/{tap}/states/")
}

/// Key of a checkpoint published at `epoch_millis`.
#[must_use]
pub fn checkpoint_key(tap: &TapName, epoch_millis: i64) -> CheckpointKey {
    CheckpointKey::new(format!("{}{epoch_millis}-{tap}-state.json", states_prefix(tap)))
}

/// Date-partitioned prefix for a run's loaded output, e.g.
/// `singer/shopify/2024/01/05/`.
#[must_use]
pub fn output_prefix(tap: &TapName, at: DateTime<Utc>) -> String {
    format!(
        "singer/{tap}/{:04}/{:02}/{:02}/",
        at.year(),
        at.month(),
        at.day()
    )
}

/// Local staging file name for a tap's checkpoint (`tap-shopify-state.json`).
#[must_use]
pub fn staging_file_name(tap: &TapName) -> String {
    format!("tap-{tap}-state.json")
}
