//! Shared singer-sync model types.
//!
//! Kept dependency-light so the state, engine and CLI crates can share
//! connector identities, checkpoint keys and the Singer catalog model
//! without depending on each other.

pub mod catalog;
pub mod connector;
pub mod state;

pub use catalog::{Catalog, CatalogStream, MetadataEntry};
pub use connector::{ConnectorIdentity, ConnectorKind};
pub use state::{CheckpointKey, TapName};
