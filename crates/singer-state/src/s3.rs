//! S3-backed object store with credentials resolved by `aws-config`.
//!
//! Local runs authenticate with a named profile; scheduled runs assume the
//! configured IAM role. With neither set the default provider chain applies.

use std::sync::Arc;

use async_trait::async_trait;
use aws_config::sts::AssumeRoleProvider;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use chrono::Utc;
use object_store::aws::{AmazonS3Builder, AwsCredential};
use object_store::{CredentialProvider, ObjectStore};

use crate::error::{self, StateError};

/// Where checkpoints live and how to authenticate against the bucket.
#[derive(Debug, Clone, Default)]
pub struct S3Settings {
    pub bucket: String,
    pub profile: Option<String>,
    pub role_arn: Option<String>,
}

/// Build the checkpoint bucket client.
///
/// # Errors
///
/// Returns [`StateError::Config`] if the bucket is unset or no credentials
/// provider can be resolved, or [`StateError::ObjectStore`] if the client
/// can't be built.
pub async fn build_s3_store(settings: &S3Settings) -> error::Result<Arc<dyn ObjectStore>> {
    if settings.bucket.trim().is_empty() {
        return Err(StateError::Config("data_bucket must be set".to_string()));
    }

    let sdk = load_sdk_config(settings).await;
    let provider = sdk
        .credentials_provider()
        .ok_or_else(|| StateError::Config("no AWS credentials provider available".to_string()))?;

    let mut builder = AmazonS3Builder::from_env()
        .with_bucket_name(&settings.bucket)
        .with_credentials(Arc::new(SdkCredentials { inner: provider }));
    if let Some(region) = sdk.region() {
        builder = builder.with_region(region.to_string());
    }

    tracing::debug!(bucket = %settings.bucket, "Checkpoint store configured");
    Ok(Arc::new(builder.build()?))
}

async fn load_sdk_config(settings: &S3Settings) -> SdkConfig {
    if let Some(profile) = &settings.profile {
        tracing::debug!(profile = %profile, "Using AWS profile for checkpoint storage");
        return aws_config::defaults(BehaviorVersion::latest())
            .profile_name(profile)
            .load()
            .await;
    }

    let base = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let Some(role_arn) = &settings.role_arn else {
        return base;
    };

    let session_name = format!("singer_{}", Utc::now().timestamp_millis());
    tracing::debug!(role_arn = %role_arn, session = %session_name, "Assuming role for checkpoint storage");
    let provider = AssumeRoleProvider::builder(role_arn)
        .session_name(session_name)
        .configure(&base)
        .build()
        .await;
    base.to_builder()
        .credentials_provider(SharedCredentialsProvider::new(provider))
        .build()
}

/// Adapts the SDK's refreshing credentials chain to `object_store`.
#[derive(Debug)]
struct SdkCredentials {
    inner: SharedCredentialsProvider,
}

#[async_trait]
impl CredentialProvider for SdkCredentials {
    type Credential = AwsCredential;

    async fn get_credential(&self) -> object_store::Result<Arc<AwsCredential>> {
        let creds = self
            .inner
            .provide_credentials()
            .await
            .map_err(|e| object_store::Error::Generic {
                store: "S3",
                source: Box::new(e),
            })?;
        Ok(Arc::new(AwsCredential {
            key_id: creds.access_key_id().to_string(),
            secret_key: creds.secret_access_key().to_string(),
            token: creds.session_token().map(str::to_string),
        }))
    }
}
