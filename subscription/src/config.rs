//! Configuration types for subscriptions
//!
//! [`SubscriptionConfig`] carries the parameters requested from the server
//! when the subscription is created, plus the client-side defaults used when
//! building monitored item requests.

use serde::{Deserialize, Serialize};
use ua_types::{SubscriptionParameters, TimestampsToReturn};

use crate::error::{Result, SubscriptionError};

/// Configuration for one subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionConfig {
    /// Parameters sent with the create-subscription request
    pub parameters: SubscriptionParameters,

    /// Number of publish requests issued right after creation
    /// Default: 2
    pub publish_prime_count: usize,

    /// Queue size for monitored items built by the subscribe helpers
    /// Default: 0 (no queueing, the server keeps only the latest value)
    pub default_queue_size: u32,

    /// Discard policy when an item queue overflows
    /// Default: true
    pub discard_oldest: bool,

    /// Timestamps requested on created monitored items
    /// Default: Neither
    pub timestamps_to_return: TimestampsToReturn,

    /// Sampling interval in milliseconds for new items
    /// Default: None (use the requested publishing interval)
    pub sampling_interval: Option<f64>,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            parameters: SubscriptionParameters::default(),
            publish_prime_count: 2,
            default_queue_size: 0,
            discard_oldest: true,
            timestamps_to_return: TimestampsToReturn::Neither,
            sampling_interval: None,
        }
    }
}

impl SubscriptionConfig {
    /// Create a new SubscriptionConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a SubscriptionConfig with the given publishing interval in milliseconds
    pub fn with_publishing_interval(interval_ms: f64) -> Self {
        let mut config = Self::default();
        config.parameters.requested_publishing_interval = interval_ms;
        config
    }

    /// Create a SubscriptionConfig optimized for fast-changing values
    pub fn fast_sampling() -> Self {
        let mut config = Self {
            sampling_interval: Some(25.0),
            publish_prime_count: 3,
            ..Default::default()
        };
        config.parameters.requested_publishing_interval = 50.0;
        config
    }

    /// Create a SubscriptionConfig optimized for low bandwidth links
    pub fn low_bandwidth() -> Self {
        let mut config = Self {
            publish_prime_count: 1,
            ..Default::default()
        };
        config.parameters.requested_publishing_interval = 5_000.0;
        config.parameters.requested_max_keep_alive_count = 10;
        config.parameters.requested_lifetime_count = 30;
        config.parameters.max_notifications_per_publish = 1_000;
        config
    }

    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SubscriptionError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Sampling interval for new monitored items
    pub fn effective_sampling_interval(&self) -> f64 {
        self.sampling_interval
            .unwrap_or(self.parameters.requested_publishing_interval)
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        let params = &self.parameters;

        if !(params.requested_publishing_interval > 0.0) {
            return Err(SubscriptionError::Configuration(
                "Publishing interval must be greater than 0".to_string(),
            ));
        }

        if params.requested_max_keep_alive_count == 0 {
            return Err(SubscriptionError::Configuration(
                "Max keep-alive count must be greater than 0".to_string(),
            ));
        }

        // The protocol requires lifetime >= 3 * keep-alive.
        let min_lifetime = params.requested_max_keep_alive_count.saturating_mul(3);
        if params.requested_lifetime_count < min_lifetime {
            return Err(SubscriptionError::Configuration(format!(
                "Lifetime count {} must be at least three times the keep-alive count ({})",
                params.requested_lifetime_count, min_lifetime
            )));
        }

        if self.publish_prime_count == 0 {
            return Err(SubscriptionError::Configuration(
                "Publish prime count must be greater than 0".to_string(),
            ));
        }

        if let Some(interval) = self.sampling_interval {
            if !(interval >= 0.0) {
                return Err(SubscriptionError::Configuration(
                    "Sampling interval must not be negative".to_string(),
                ));
            }
        }

        Ok(())
    }
}
