//! Checkpoint persistence for singer-sync.
//!
//! Provides the [`StateStore`] trait and an [`ObjectStoreStateStore`]
//! implementation that keeps every tap's checkpoints as append-only
//! objects under `singer/<tap>/states/`.

#![warn(clippy::pedantic)]

pub mod backend;
pub mod error;
pub mod layout;
pub mod s3;
pub mod store;

pub use backend::StateStore;
pub use error::StateError;
pub use s3::{build_s3_store, S3Settings};
pub use store::ObjectStoreStateStore;
