//! Connection and retry settings.

use crate::retry::RetryPolicy;

use aws_sdk_dynamodb::Client;
use serde::Deserialize;

/// Where the store lives and how hard to retry it.
///
/// Deserializes from any serde format; absent fields take their defaults.
///
/// ```rust
/// use dynamodb_model::settings::Settings;
///
/// let settings = Settings {
///     region: Some("eu-west-1".to_string()),
///     ..Default::default()
/// };
/// assert_eq!(settings.retry_policy().max_retries, 3);
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// AWS region; the SDK default chain decides when `None`.
    pub region: Option<String>,
    /// Endpoint override, e.g. a local DynamoDB.
    pub endpoint_url: Option<String>,
    /// Retries after the first attempt on transient errors.
    pub max_retries: u32,
    /// Base of the exponential backoff, in seconds.
    pub retry_base_delay: f64,
}

impl Default for Settings {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            region: None,
            endpoint_url: None,
            max_retries: retry.max_retries,
            retry_base_delay: retry.base_delay,
        }
    }
}

impl Settings {
    /// The retry policy these settings describe.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: self.retry_base_delay,
            ..Default::default()
        }
    }

    /// Build a DynamoDB client for the configured region and endpoint.
    pub async fn client(&self) -> Client {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &self.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(endpoint_url) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        let sdk_config = loader.load().await;
        Client::new(&sdk_config)
    }
}
