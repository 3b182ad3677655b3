//! Remote parameter store holding connector configs.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ssm::error::DisplayErrorContext;
use singer_types::ConnectorIdentity;

/// Hierarchical secret/config store consulted last when resolving a
/// connector config.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Fetch and decrypt the parameter `name`.
    ///
    /// Returns `Ok(None)` when the parameter does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store can't be reached or refuses the request.
    async fn get_decrypted(&self, name: &str) -> Result<Option<String>>;
}

/// Full parameter name for a connector: `<prefix>/TAP_<NAME>_CONFIG`.
#[must_use]
pub fn parameter_name(prefix: &str, identity: &ConnectorIdentity) -> String {
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        identity.config_variable()
    )
}

/// AWS Systems Manager Parameter Store.
pub struct SsmParameterStore {
    client: aws_sdk_ssm::Client,
}

impl SsmParameterStore {
    /// Client configured from the default AWS provider chain.
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self {
            client: aws_sdk_ssm::Client::new(&config),
        }
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn get_decrypted(&self, name: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await;

        match response {
            Ok(output) => Ok(output
                .parameter()
                .and_then(|p| p.value())
                .map(str::to_string)),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_parameter_not_found()) =>
            {
                Ok(None)
            }
            Err(err) => Err(anyhow::anyhow!("{}", DisplayErrorContext(&err))),
        }
    }
}

/// Fixed in-process parameter set, for offline runs and tests.
#[derive(Debug, Default, Clone)]
pub struct StaticParameterStore {
    values: HashMap<String, String>,
}

impl StaticParameterStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl ParameterStore for StaticParameterStore {
    async fn get_decrypted(&self, name: &str) -> Result<Option<String>> {
        Ok(self.values.get(name).cloned())
    }
}
