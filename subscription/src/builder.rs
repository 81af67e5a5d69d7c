//! Builder for creating and configuring a Subscription.
//!
//! # Example
//!
//! ```rust,ignore
//! use opcua_subscription::{Subscription, SubscriptionHandler};
//!
//! let subscription = Subscription::builder(service)
//!     .with_publishing_interval(250.0)
//!     .with_keep_alive_count(10)
//!     .with_lifetime_count(30)
//!     .with_handler(SubscriptionHandler::new().with_data_change(|node, value, _| {
//!         println!("{} = {}", node, value);
//!         Ok(())
//!     }))
//!     .build()?;
//! ```

use std::sync::Arc;

use crate::config::SubscriptionConfig;
use crate::error::Result;
use crate::events::{EventDecoder, StandardEventDecoder};
use crate::handler::SubscriptionHandler;
use crate::subscription::Subscription;
use crate::transport::SubscriptionService;

/// Builder for creating a [`Subscription`].
///
/// # Validation
///
/// `build()` validates the configuration before any request is sent:
/// - Publishing interval must be positive
/// - Keep-alive count must be positive
/// - Lifetime count must be at least three times the keep-alive count
/// - At least one publish request must be primed
pub struct SubscriptionBuilder {
    service: Arc<dyn SubscriptionService>,
    config: SubscriptionConfig,
    handler: SubscriptionHandler,
    decoder: Option<Arc<dyn EventDecoder>>,
}

impl SubscriptionBuilder {
    /// Create a builder with default configuration and an empty handler.
    pub fn new(service: Arc<dyn SubscriptionService>) -> Self {
        Self {
            service,
            config: SubscriptionConfig::default(),
            handler: SubscriptionHandler::new(),
            decoder: None,
        }
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: SubscriptionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the requested publishing interval in milliseconds.
    pub fn with_publishing_interval(mut self, interval_ms: f64) -> Self {
        self.config.parameters.requested_publishing_interval = interval_ms;
        self
    }

    /// Set the requested lifetime count.
    pub fn with_lifetime_count(mut self, count: u32) -> Self {
        self.config.parameters.requested_lifetime_count = count;
        self
    }

    /// Set the requested maximum keep-alive count.
    pub fn with_keep_alive_count(mut self, count: u32) -> Self {
        self.config.parameters.requested_max_keep_alive_count = count;
        self
    }

    /// Set the maximum number of notifications per publish response.
    pub fn with_max_notifications_per_publish(mut self, max: u32) -> Self {
        self.config.parameters.max_notifications_per_publish = max;
        self
    }

    /// Set the relative priority among subscriptions of the session.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.config.parameters.priority = priority;
        self
    }

    /// Set how many publish requests are queued right after creation.
    pub fn with_publish_prime_count(mut self, count: usize) -> Self {
        self.config.publish_prime_count = count;
        self
    }

    /// Set the callbacks notifications are delivered to.
    pub fn with_handler(mut self, handler: SubscriptionHandler) -> Self {
        self.handler = handler;
        self
    }

    /// Use a custom event decoder instead of [`StandardEventDecoder`].
    pub fn with_event_decoder(mut self, decoder: Arc<dyn EventDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Validate the configuration and create the subscription on the server.
    pub fn build(self) -> Result<Subscription> {
        let decoder: Arc<dyn EventDecoder> = match self.decoder {
            Some(decoder) => decoder,
            None => Arc::new(StandardEventDecoder::new()),
        };
        Subscription::create_with_decoder(self.service, self.config, self.handler, decoder)
    }
}
