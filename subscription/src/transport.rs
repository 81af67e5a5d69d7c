//! Service calls the subscription engine makes on the session
//!
//! The engine does not encode or send anything itself. A session/transport
//! layer implements [`SubscriptionService`] and delivers publish responses
//! back through the [`PublishCallback`] handed over at creation time.

use std::sync::Arc;

use ua_types::{
    CreateMonitoredItemsParameters, CreateSubscriptionResult, DeleteMonitoredItemsParameters,
    MonitoredItemCreateResult, PublishResult, StatusCode, SubscriptionAcknowledgement,
    SubscriptionParameters,
};

use crate::error::TransportError;

/// Receives every publish response for one subscription.
///
/// May be invoked from any thread, including concurrently with subscribe
/// and unsubscribe calls on the same subscription.
pub type PublishCallback = Arc<dyn Fn(PublishResult) + Send + Sync>;

/// Request/response services of an open session.
///
/// All calls are synchronous. Timeouts and retries belong to the
/// implementation.
#[cfg_attr(test, mockall::automock)]
pub trait SubscriptionService: Send + Sync {
    /// Create a subscription and register the callback that will receive
    /// its publish responses.
    ///
    /// The callback must not be invoked before this call returns on the
    /// calling thread; implementations deliver publish responses from their
    /// own receive thread.
    fn create_subscription(
        &self,
        params: &SubscriptionParameters,
        callback: PublishCallback,
    ) -> Result<CreateSubscriptionResult, TransportError>;

    /// Delete subscriptions; one status per id, in order
    fn delete_subscriptions(&self, subscription_ids: &[u32])
        -> Result<Vec<StatusCode>, TransportError>;

    /// Queue a publish request carrying the given acknowledgements.
    ///
    /// The response arrives later through the subscription's callback.
    fn publish(&self, acks: Vec<SubscriptionAcknowledgement>) -> Result<(), TransportError>;

    /// Create monitored items; one result per requested item, in order
    fn create_monitored_items(
        &self,
        params: &CreateMonitoredItemsParameters,
    ) -> Result<Vec<MonitoredItemCreateResult>, TransportError>;

    /// Delete monitored items; one status per id, in order
    fn delete_monitored_items(
        &self,
        params: &DeleteMonitoredItemsParameters,
    ) -> Result<Vec<StatusCode>, TransportError>;
}
