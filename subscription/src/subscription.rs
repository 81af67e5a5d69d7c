//! Subscription lifecycle
//!
//! A [`Subscription`] owns one server-side subscription: it creates it,
//! adds and removes monitored items, runs the publish/acknowledge cycle and
//! deletes it again. Deletion is explicit; dropping a live subscription only
//! logs a warning.
//!
//! Publish results are delivered by the transport on its own thread. The
//! callback may fire before `create_subscription` has returned on the
//! creating thread; it then waits until the subscription id is known.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use ua_types::{
    AttributeId, CreateMonitoredItemsParameters, CreateSubscriptionResult,
    DeleteMonitoredItemsParameters, EventFilter, MonitoredItemCreateRequest, NodeId, ObjectId,
    PublishResult, StatusCode, SubscriptionAcknowledgement, SubscriptionParameters,
};

use crate::builder::SubscriptionBuilder;
use crate::config::SubscriptionConfig;
use crate::error::{Result, SubscriptionError};
use crate::events::{EventDecoder, StandardEventDecoder};
use crate::handler::SubscriptionHandler;
use crate::registry::{MonitoredItemEntry, MonitoredItemRegistry};
use crate::request::{self, ItemResult, MonitorTarget};
use crate::router::NotificationRouter;
use crate::transport::{PublishCallback, SubscriptionService};

/// Where the subscription is in its life
#[derive(Debug, Clone)]
enum Lifecycle {
    /// The create request has not been answered yet
    Pending,
    Active(CreateSubscriptionResult),
    Deleted(CreateSubscriptionResult),
    /// Creation or priming failed; the object is unusable
    Failed,
}

struct SubscriptionInner {
    service: Arc<dyn SubscriptionService>,
    config: SubscriptionConfig,
    lifecycle: Mutex<Lifecycle>,
    /// Signalled on every lifecycle change
    ready: Condvar,
    registry: Arc<MonitoredItemRegistry>,
    handler: Arc<SubscriptionHandler>,
    decoder: Arc<dyn EventDecoder>,
    router: NotificationRouter,
}

impl SubscriptionInner {
    fn set_lifecycle(&self, lifecycle: Lifecycle) {
        *self.lifecycle.lock() = lifecycle;
        self.ready.notify_all();
    }

    fn active_id(&self) -> Result<u32> {
        match &*self.lifecycle.lock() {
            Lifecycle::Active(created) => Ok(created.subscription_id),
            Lifecycle::Deleted(_) => Err(SubscriptionError::Deleted),
            Lifecycle::Pending | Lifecycle::Failed => Err(SubscriptionError::NotReady),
        }
    }

    /// Block until creation has been decided, then return the active id
    fn wait_until_ready(&self) -> Result<u32> {
        let mut lifecycle = self.lifecycle.lock();
        while matches!(*lifecycle, Lifecycle::Pending) {
            self.ready.wait(&mut lifecycle);
        }
        match &*lifecycle {
            Lifecycle::Active(created) => Ok(created.subscription_id),
            Lifecycle::Deleted(_) => Err(SubscriptionError::Deleted),
            Lifecycle::Pending | Lifecycle::Failed => Err(SubscriptionError::NotReady),
        }
    }

    fn mark_deleted(&self) {
        let mut lifecycle = self.lifecycle.lock();
        let deleted = match &*lifecycle {
            Lifecycle::Active(created) => Lifecycle::Deleted(created.clone()),
            _ => return,
        };
        *lifecycle = deleted;
        self.ready.notify_all();
    }

    fn handle_publish(&self, result: PublishResult) {
        let sequence_number = result.notification_message.sequence_number;

        let subscription_id = match self.wait_until_ready() {
            Ok(id) => id,
            Err(SubscriptionError::Deleted) => {
                tracing::debug!(
                    "Dropping publish result {} for deleted subscription {}",
                    sequence_number,
                    result.subscription_id
                );
                return;
            }
            Err(_) => {
                tracing::warn!(
                    "Dropping publish result {} for subscription that failed to create",
                    sequence_number
                );
                return;
            }
        };

        if result.subscription_id != subscription_id {
            tracing::warn!(
                "Publish result {} names subscription {} but was delivered to {}",
                sequence_number,
                result.subscription_id,
                subscription_id
            );
        }

        let summary = self.router.route(&result.notification_message);
        tracing::debug!(
            "Routed publish result {} of subscription {}: {}",
            sequence_number,
            subscription_id,
            summary
        );

        if self.active_id().is_err() {
            tracing::debug!(
                "Subscription {} deleted while routing; not re-publishing",
                subscription_id
            );
            return;
        }

        let ack = SubscriptionAcknowledgement {
            subscription_id,
            sequence_number,
        };
        if let Err(e) = self.service.publish(vec![ack]) {
            tracing::error!(
                "Failed to send publish request acknowledging {} on subscription {}: {}",
                sequence_number,
                subscription_id,
                e
            );
        }
    }
}

/// One server-side subscription and its monitored items
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

impl Subscription {
    /// Start building a subscription on `service`
    pub fn builder(service: Arc<dyn SubscriptionService>) -> SubscriptionBuilder {
        SubscriptionBuilder::new(service)
    }

    /// Create the subscription on the server and prime the publish cycle
    ///
    /// # Returns
    /// * `Err(SubscriptionError::Transport)` - If creation or priming failed
    /// * `Err(SubscriptionError::Configuration)` - If `config` is invalid
    pub fn create(
        service: Arc<dyn SubscriptionService>,
        config: SubscriptionConfig,
        handler: SubscriptionHandler,
    ) -> Result<Self> {
        Self::create_with_decoder(
            service,
            config,
            handler,
            Arc::new(StandardEventDecoder::new()),
        )
    }

    /// Like [`create`](Self::create), decoding events with `decoder`
    pub fn create_with_decoder(
        service: Arc<dyn SubscriptionService>,
        config: SubscriptionConfig,
        handler: SubscriptionHandler,
        decoder: Arc<dyn EventDecoder>,
    ) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(MonitoredItemRegistry::new());
        let handler = Arc::new(handler);
        let router = NotificationRouter::new(
            Arc::clone(&registry),
            Arc::clone(&handler),
            Arc::clone(&decoder),
        );

        let inner = Arc::new(SubscriptionInner {
            service,
            config,
            lifecycle: Mutex::new(Lifecycle::Pending),
            ready: Condvar::new(),
            registry,
            handler,
            decoder,
            router,
        });

        let weak = Arc::downgrade(&inner);
        let callback: PublishCallback = Arc::new(move |result: PublishResult| {
            match weak.upgrade() {
                Some(inner) => inner.handle_publish(result),
                None => tracing::debug!(
                    "Dropping publish result {} for released subscription {}",
                    result.notification_message.sequence_number,
                    result.subscription_id
                ),
            }
        });

        let created = match inner
            .service
            .create_subscription(&inner.config.parameters, callback)
        {
            Ok(created) => created,
            Err(e) => {
                inner.set_lifecycle(Lifecycle::Failed);
                return Err(e.into());
            }
        };

        let subscription_id = created.subscription_id;
        tracing::info!(
            "Created subscription {} (publishing interval {}ms, keep-alive {})",
            subscription_id,
            created.revised_publishing_interval,
            created.revised_max_keep_alive_count
        );
        inner.set_lifecycle(Lifecycle::Active(created));

        for _ in 0..inner.config.publish_prime_count {
            if let Err(e) = inner.service.publish(Vec::new()) {
                tracing::error!(
                    "Failed to start publishing on subscription {}: {}",
                    subscription_id,
                    e
                );
                if let Err(delete_err) = inner.service.delete_subscriptions(&[subscription_id]) {
                    tracing::warn!(
                        "Failed to delete subscription {} after priming failure: {}",
                        subscription_id,
                        delete_err
                    );
                }
                inner.set_lifecycle(Lifecycle::Failed);
                return Err(e.into());
            }
        }

        Ok(Self { inner })
    }

    /// Delete the subscription on the server
    ///
    /// Items still registered are released with it.
    pub fn delete(&self) -> Result<()> {
        let subscription_id = self.inner.active_id()?;

        let results = self.inner.service.delete_subscriptions(&[subscription_id])?;
        let status = results
            .first()
            .copied()
            .unwrap_or(StatusCode::BAD_UNEXPECTED_ERROR);
        status.check()?;

        self.inner.mark_deleted();
        let released = self.inner.registry.len();
        self.inner.registry.clear();

        tracing::info!(
            "Deleted subscription {} ({} monitored items released)",
            subscription_id,
            released
        );
        Ok(())
    }

    /// Monitor `attribute_id` of one node or a collection of nodes
    ///
    /// A single node returns its server handle; a collection returns one
    /// [`ItemResult`] per node, in order.
    pub fn subscribe_data_change<T: MonitorTarget>(
        &self,
        targets: T,
        attribute_id: AttributeId,
    ) -> Result<T::Output> {
        self.inner.active_id()?;

        if !self.inner.handler.handles_data_change() {
            tracing::warn!("Subscribing to data changes but the handler has no data change callback");
        }

        let requests = targets
            .into_nodes()
            .into_iter()
            .map(|node| {
                request::data_change_request(
                    node,
                    attribute_id,
                    self.inner.registry.next_client_handle(),
                    &self.inner.config,
                )
            })
            .collect();

        let results = self.create_monitored_items(requests)?;
        T::collect_results(results)
    }

    /// Monitor events emitted by `source`
    ///
    /// Without an explicit `filter`, one is built from `event_type`.
    pub fn subscribe_events(
        &self,
        source: NodeId,
        event_type: NodeId,
        filter: Option<EventFilter>,
    ) -> Result<u32> {
        self.inner.active_id()?;

        if !self.inner.handler.handles_events() {
            tracing::warn!("Subscribing to events but the handler has no event callback");
        }

        let filter = match filter {
            Some(filter) => filter,
            None => self.inner.decoder.filter_from_event_type(&event_type)?,
        };

        let request = request::event_request(
            source,
            filter,
            self.inner.registry.next_client_handle(),
            &self.inner.config,
        );

        let results = self.create_monitored_items(vec![request])?;
        NodeId::collect_results(results)
    }

    /// Monitor every BaseEventType event of the Server object
    pub fn subscribe_server_events(&self) -> Result<u32> {
        self.subscribe_events(ObjectId::server(), ObjectId::base_event_type(), None)
    }

    /// Create monitored items from prepared requests
    ///
    /// Each request is registered under its client handle before the batch
    /// is sent, so a notification racing the response is still routed.
    /// Returns one result per request, in order; rejected items are removed
    /// from the registry again.
    pub fn create_monitored_items(
        &self,
        requests: Vec<MonitoredItemCreateRequest>,
    ) -> Result<Vec<ItemResult>> {
        let subscription_id = self.inner.active_id()?;
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let registry = &self.inner.registry;
        let client_handles: Vec<u32> = requests.iter().map(|r| r.client_handle()).collect();
        registry.insert_batch(requests.iter().map(MonitoredItemEntry::from_request).collect())?;

        let params = CreateMonitoredItemsParameters {
            subscription_id,
            timestamps_to_return: self.inner.config.timestamps_to_return,
            items_to_create: requests,
        };

        let results = match self.inner.service.create_monitored_items(&params) {
            Ok(results) => results,
            Err(e) => {
                for handle in &client_handles {
                    registry.remove_by_client_handle(*handle);
                }
                return Err(e.into());
            }
        };

        if results.len() != client_handles.len() {
            tracing::warn!(
                "Server answered {} of {} monitored item requests on subscription {}",
                results.len(),
                client_handles.len(),
                subscription_id
            );
        }

        let mut outcomes = Vec::with_capacity(client_handles.len());
        for (index, client_handle) in client_handles.iter().copied().enumerate() {
            match results.get(index) {
                Some(result) if result.status_code.is_good() => {
                    let server_handle = result.monitored_item_id;
                    if !registry.set_server_handle(client_handle, server_handle) {
                        tracing::warn!(
                            "Monitored item {} was removed before its creation completed",
                            client_handle
                        );
                    }
                    tracing::debug!(
                        "Created monitored item {} (client handle {}) on subscription {}",
                        server_handle,
                        client_handle,
                        subscription_id
                    );
                    outcomes.push(Ok(server_handle));
                }
                other => {
                    let status = other
                        .map(|result| result.status_code)
                        .unwrap_or(StatusCode::BAD_UNEXPECTED_ERROR);
                    registry.remove_by_client_handle(client_handle);
                    tracing::debug!(
                        "Server rejected monitored item with client handle {}: {}",
                        client_handle,
                        status
                    );
                    outcomes.push(Err(status));
                }
            }
        }

        Ok(outcomes)
    }

    /// Delete the monitored item with the given server handle
    pub fn unsubscribe(&self, server_handle: u32) -> Result<()> {
        let subscription_id = self.inner.active_id()?;

        let params = DeleteMonitoredItemsParameters {
            subscription_id,
            monitored_item_ids: vec![server_handle],
        };
        let results = self.inner.service.delete_monitored_items(&params)?;
        results
            .first()
            .copied()
            .unwrap_or(StatusCode::BAD_UNEXPECTED_ERROR)
            .check()?;

        match self.inner.registry.remove_by_server_handle(server_handle) {
            Some(entry) => tracing::debug!("Removed {}", entry),
            None => tracing::debug!(
                "Monitored item {} deleted on server but was not registered locally",
                server_handle
            ),
        }
        Ok(())
    }

    /// Handle one publish response; what the transport's callback calls
    pub fn publish_callback(&self, result: PublishResult) {
        self.inner.handle_publish(result);
    }

    /// Server-assigned id, once created
    pub fn subscription_id(&self) -> Option<u32> {
        self.revised_parameters().map(|created| created.subscription_id)
    }

    /// Values the server settled on when creating the subscription
    pub fn revised_parameters(&self) -> Option<CreateSubscriptionResult> {
        match &*self.inner.lifecycle.lock() {
            Lifecycle::Active(created) | Lifecycle::Deleted(created) => Some(created.clone()),
            Lifecycle::Pending | Lifecycle::Failed => None,
        }
    }

    /// Parameters requested at creation
    pub fn parameters(&self) -> &SubscriptionParameters {
        &self.inner.config.parameters
    }

    pub fn config(&self) -> &SubscriptionConfig {
        &self.inner.config
    }

    /// Copy of the registered monitored items, ordered by client handle
    pub fn monitored_items(&self) -> Vec<MonitoredItemEntry> {
        self.inner.registry.snapshot()
    }

    pub fn registry(&self) -> &MonitoredItemRegistry {
        &self.inner.registry
    }

    pub fn is_deleted(&self) -> bool {
        matches!(*self.inner.lifecycle.lock(), Lifecycle::Deleted(_))
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("lifecycle", &*self.inner.lifecycle.lock())
            .field("registry", &*self.inner.registry)
            .field("handler", &*self.inner.handler)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Lifecycle::Active(created) = &*self.inner.lifecycle.lock() {
            tracing::warn!(
                "Subscription {} dropped without being deleted; it stays alive on the server until its lifetime expires",
                created.subscription_id
            );
        }
    }
}
