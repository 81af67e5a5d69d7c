//! Notification routing
//!
//! Turns the records of one notification message into handler calls.
//! Records are processed in the order they arrive. Nothing here fails: an
//! unknown handle or unsupported record is logged and counted, and the rest
//! of the message is still delivered.

use std::fmt;
use std::sync::Arc;

use ua_types::{
    DataChangeNotification, EventNotificationList, NotificationData, NotificationMessage,
    StatusChangeNotification,
};

use crate::events::EventDecoder;
use crate::handler::{DispatchOutcome, SubscriptionHandler};
use crate::registry::MonitoredItemRegistry;

/// Counts of what happened to the records of one message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteSummary {
    /// Data changes handed to a callback
    pub data_changes: usize,
    /// Events handed to a callback
    pub events: usize,
    /// Status changes handed to a callback
    pub status_changes: usize,
    /// Notifications dropped because their item could not be resolved
    pub skipped: usize,
    /// Records of a kind this router does not handle
    pub unsupported: usize,
    /// Notifications with no matching callback registered
    pub unhandled: usize,
    /// Callbacks that returned an error or panicked
    pub callback_failures: usize,
}

impl RouteSummary {
    /// Notifications a callback was invoked for, failed or not
    pub fn dispatched(&self) -> usize {
        self.data_changes + self.events + self.status_changes + self.callback_failures
    }

    /// Count a failed or unhandled outcome; returns whether the callback succeeded
    fn record(&mut self, outcome: DispatchOutcome) -> bool {
        match outcome {
            DispatchOutcome::Delivered => true,
            DispatchOutcome::Unhandled => {
                self.unhandled += 1;
                false
            }
            DispatchOutcome::Failed => {
                self.callback_failures += 1;
                false
            }
        }
    }
}

impl fmt::Display for RouteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "data_changes={} events={} status_changes={} skipped={} unsupported={} unhandled={} failures={}",
            self.data_changes,
            self.events,
            self.status_changes,
            self.skipped,
            self.unsupported,
            self.unhandled,
            self.callback_failures
        )
    }
}

/// Routes notification records to the handler via the registry
pub struct NotificationRouter {
    registry: Arc<MonitoredItemRegistry>,
    handler: Arc<SubscriptionHandler>,
    decoder: Arc<dyn EventDecoder>,
}

impl NotificationRouter {
    pub fn new(
        registry: Arc<MonitoredItemRegistry>,
        handler: Arc<SubscriptionHandler>,
        decoder: Arc<dyn EventDecoder>,
    ) -> Self {
        Self {
            registry,
            handler,
            decoder,
        }
    }

    /// Route every record of `message`
    pub fn route(&self, message: &NotificationMessage) -> RouteSummary {
        let mut summary = RouteSummary::default();

        for data in &message.notification_data {
            match data {
                NotificationData::DataChange(notification) => {
                    self.route_data_change(notification, &mut summary)
                }
                NotificationData::Events(notification) => {
                    self.route_events(notification, &mut summary)
                }
                NotificationData::StatusChange(notification) => {
                    self.route_status_change(notification, &mut summary)
                }
                NotificationData::Unsupported { type_id } => {
                    tracing::warn!(
                        "Notification type not supported by subscription: {}",
                        type_id
                    );
                    summary.unsupported += 1;
                }
            }
        }

        summary
    }

    fn route_data_change(&self, notification: &DataChangeNotification, summary: &mut RouteSummary) {
        for item in &notification.monitored_items {
            let entry = match self.registry.get(item.client_handle) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Dropping data change notification: {}", e);
                    summary.skipped += 1;
                    continue;
                }
            };

            let outcome = self.handler.deliver_data_change(&entry, item);
            if summary.record(outcome) {
                summary.data_changes += 1;
            }
        }
    }

    fn route_events(&self, notification: &EventNotificationList, summary: &mut RouteSummary) {
        for field_list in &notification.events {
            let entry = match self.registry.get(field_list.client_handle) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Dropping event notification: {}", e);
                    summary.skipped += 1;
                    continue;
                }
            };

            let Some(filter) = entry.event_filter.as_ref() else {
                tracing::warn!(
                    "Dropping event notification for {}: item has no event filter",
                    entry
                );
                summary.skipped += 1;
                continue;
            };

            let mut event = self
                .decoder
                .event_from_fields(&filter.select_clauses, &field_list.event_fields);
            event.server_handle = entry.server_handle;

            let outcome = self.handler.deliver_event(&event);
            if summary.record(outcome) {
                summary.events += 1;
            }
        }
    }

    fn route_status_change(
        &self,
        notification: &StatusChangeNotification,
        summary: &mut RouteSummary,
    ) {
        tracing::debug!("Subscription status changed to {}", notification.status);
        let outcome = self.handler.deliver_status_change(notification.status);
        if summary.record(outcome) {
            summary.status_changes += 1;
        }
    }
}
