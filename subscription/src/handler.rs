//! Application callbacks and their dispatch
//!
//! A [`SubscriptionHandler`] is a set of independently optional callback
//! slots. The router asks it to deliver each resolved notification; a slot
//! that is not filled falls back to its deprecated counterpart, and a
//! callback that fails or panics is logged without affecting the caller.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use ua_types::{AttributeId, MonitoredItemNotification, NodeId, StatusCode, Variant};

use crate::error::CallbackError;
use crate::events::Event;
use crate::registry::MonitoredItemEntry;

/// Result returned by every application callback
pub type CallbackResult = std::result::Result<(), CallbackError>;

/// Receives `(node, value, envelope)` for every data change
pub type DataChangeCallback =
    Box<dyn Fn(&NodeId, &Variant, &DataChangeNotif<'_>) -> CallbackResult + Send + Sync>;

/// Receives `(server_handle, node, value, attribute)`; superseded by [`DataChangeCallback`]
pub type LegacyDataChangeCallback =
    Box<dyn Fn(Option<u32>, &NodeId, &Variant, AttributeId) -> CallbackResult + Send + Sync>;

pub type EventCallback = Box<dyn Fn(&Event) -> CallbackResult + Send + Sync>;

/// Receives `(server_handle, event)`; superseded by [`EventCallback`]
pub type LegacyEventCallback = Box<dyn Fn(Option<u32>, &Event) -> CallbackResult + Send + Sync>;

pub type StatusChangeCallback = Box<dyn Fn(StatusCode) -> CallbackResult + Send + Sync>;

/// Envelope pairing a registered item with the notification it produced
#[derive(Debug, Clone, Copy)]
pub struct DataChangeNotif<'a> {
    pub entry: &'a MonitoredItemEntry,
    pub item: &'a MonitoredItemNotification,
}

impl fmt::Display for DataChangeNotif<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DataChangeNotification({}, MonitoredItemNotification(client_handle={}, value={}, status={}))",
            self.entry,
            self.item.client_handle,
            self.item.value.variant(),
            self.item.value.status()
        )
    }
}

/// What happened when a notification was handed to the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A callback ran and returned `Ok`
    Delivered,
    /// No callback is registered for this kind of notification
    Unhandled,
    /// The callback returned an error or panicked
    Failed,
}

/// Application callbacks for one subscription
///
/// # Example
///
/// ```rust,ignore
/// let handler = SubscriptionHandler::new()
///     .with_data_change(|node, value, _notif| {
///         println!("{} = {}", node, value);
///         Ok(())
///     })
///     .with_status_change(|status| {
///         println!("subscription status {}", status);
///         Ok(())
///     });
/// ```
#[derive(Default)]
pub struct SubscriptionHandler {
    data_change: Option<DataChangeCallback>,
    legacy_data_change: Option<LegacyDataChangeCallback>,
    event: Option<EventCallback>,
    legacy_event: Option<LegacyEventCallback>,
    status_change: Option<StatusChangeCallback>,
    legacy_data_change_warned: AtomicBool,
    legacy_event_warned: AtomicBool,
}

impl SubscriptionHandler {
    /// Create a handler with no callbacks
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(&NodeId, &Variant, &DataChangeNotif<'_>) -> CallbackResult + Send + Sync + 'static,
    {
        self.data_change = Some(Box::new(callback));
        self
    }

    /// Register the older four-argument data change callback
    ///
    /// Used only when no [`with_data_change`](Self::with_data_change) callback is set.
    pub fn with_legacy_data_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(Option<u32>, &NodeId, &Variant, AttributeId) -> CallbackResult
            + Send
            + Sync
            + 'static,
    {
        self.legacy_data_change = Some(Box::new(callback));
        self
    }

    pub fn with_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Event) -> CallbackResult + Send + Sync + 'static,
    {
        self.event = Some(Box::new(callback));
        self
    }

    /// Register the older two-argument event callback
    ///
    /// Used only when no [`with_event`](Self::with_event) callback is set.
    pub fn with_legacy_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(Option<u32>, &Event) -> CallbackResult + Send + Sync + 'static,
    {
        self.legacy_event = Some(Box::new(callback));
        self
    }

    pub fn with_status_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(StatusCode) -> CallbackResult + Send + Sync + 'static,
    {
        self.status_change = Some(Box::new(callback));
        self
    }

    pub fn handles_data_change(&self) -> bool {
        self.data_change.is_some() || self.legacy_data_change.is_some()
    }

    pub fn handles_events(&self) -> bool {
        self.event.is_some() || self.legacy_event.is_some()
    }

    pub fn handles_status_change(&self) -> bool {
        self.status_change.is_some()
    }

    /// Deliver one data change for a resolved item
    pub fn deliver_data_change(
        &self,
        entry: &MonitoredItemEntry,
        item: &MonitoredItemNotification,
    ) -> DispatchOutcome {
        let value = item.value.variant();

        if let Some(callback) = &self.data_change {
            let notif = DataChangeNotif { entry, item };
            return invoke("data change", || callback(&entry.node_id, &value, &notif));
        }

        if let Some(callback) = &self.legacy_data_change {
            warn_deprecated(&self.legacy_data_change_warned, "data change");
            return invoke("data change", || {
                callback(entry.server_handle, &entry.node_id, &value, entry.attribute_id)
            });
        }

        tracing::error!(
            "Received data change for {} but handler has no data change callback",
            entry.node_id
        );
        DispatchOutcome::Unhandled
    }

    /// Deliver one decoded event
    pub fn deliver_event(&self, event: &Event) -> DispatchOutcome {
        if let Some(callback) = &self.event {
            return invoke("event", || callback(event));
        }

        if let Some(callback) = &self.legacy_event {
            warn_deprecated(&self.legacy_event_warned, "event");
            return invoke("event", || callback(event.server_handle, event));
        }

        tracing::error!("Received event but handler has no event callback");
        DispatchOutcome::Unhandled
    }

    /// Deliver a subscription status change
    pub fn deliver_status_change(&self, status: StatusCode) -> DispatchOutcome {
        match &self.status_change {
            Some(callback) => invoke("status change", || callback(status)),
            None => {
                tracing::error!(
                    "Received status change {} but handler has no status change callback",
                    status
                );
                DispatchOutcome::Unhandled
            }
        }
    }
}

impl fmt::Debug for SubscriptionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandler")
            .field("data_change", &self.data_change.is_some())
            .field("legacy_data_change", &self.legacy_data_change.is_some())
            .field("event", &self.event.is_some())
            .field("legacy_event", &self.legacy_event.is_some())
            .field("status_change", &self.status_change.is_some())
            .finish()
    }
}

fn warn_deprecated(warned: &AtomicBool, kind: &str) {
    if !warned.swap(true, Ordering::Relaxed) {
        tracing::warn!(
            "The legacy {} callback is deprecated; register the primary {} callback instead",
            kind,
            kind
        );
    }
}

/// Run a callback, containing errors and panics
fn invoke<F>(kind: &str, callback: F) -> DispatchOutcome
where
    F: FnOnce() -> CallbackResult,
{
    match panic::catch_unwind(AssertUnwindSafe(callback)) {
        Ok(Ok(())) => DispatchOutcome::Delivered,
        Ok(Err(e)) => {
            tracing::error!("Exception calling {} callback: {}", kind, e);
            DispatchOutcome::Failed
        }
        Err(payload) => {
            tracing::error!("Panic in {} callback: {}", kind, panic_message(&*payload));
            DispatchOutcome::Failed
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
