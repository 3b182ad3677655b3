//! Project configuration and per-connector config resolution.

pub mod params;
pub mod parser;
pub mod resolver;
pub mod types;
pub mod validator;

pub use params::{ParameterStore, SsmParameterStore, StaticParameterStore};
pub use resolver::{ConfigOrigin, ConfigResolver, ConnectorConfig};
pub use types::{ProjectConfig, TapSettings, TargetSettings};
