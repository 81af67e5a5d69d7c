//! Test helpers shared by the integration tests.
//!
//! - `FakeService`: an in-memory session that records every request, keeps
//!   the publish callback and lets tests deliver publish results from any thread
//! - `Recorder`: a handler whose callbacks store what they receive
//! - builders for publish results

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use opcua_subscription::{
    Event, PublishCallback, SubscriptionHandler, SubscriptionService, TransportError,
};
use parking_lot::{Condvar, Mutex};
use ua_types::{
    CreateMonitoredItemsParameters, CreateSubscriptionResult, DataChangeNotification, DataValue,
    DeleteMonitoredItemsParameters, EventFieldList, EventNotificationList,
    MonitoredItemCreateResult, MonitoredItemNotification, NodeId, NotificationData,
    NotificationMessage, PublishResult, StatusChangeNotification, StatusCode,
    SubscriptionAcknowledgement, SubscriptionParameters, Variant,
};

pub const SUBSCRIPTION_ID: u32 = 7;
pub const FIRST_SERVER_HANDLE: u32 = 77;

type CreateHook = Box<dyn FnOnce(&FakeService) + Send>;
type SubscriptionHook = Box<dyn FnOnce(PublishCallback) + Send>;

/// In-memory session answering subscription services
pub struct FakeService {
    callback: Mutex<Option<PublishCallback>>,
    publishes: Mutex<Vec<Vec<SubscriptionAcknowledgement>>>,
    publish_signal: Condvar,
    create_requests: Mutex<Vec<CreateMonitoredItemsParameters>>,
    delete_item_requests: Mutex<Vec<DeleteMonitoredItemsParameters>>,
    deleted_subscriptions: Mutex<Vec<u32>>,
    create_responses: Mutex<VecDeque<Result<Vec<MonitoredItemCreateResult>, TransportError>>>,
    create_hook: Mutex<Option<CreateHook>>,
    subscription_hook: Mutex<Option<(SubscriptionHook, Duration)>>,
    delete_item_status: Mutex<StatusCode>,
    fail_publish: Mutex<bool>,
    next_server_handle: AtomicU32,
}

impl FakeService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            callback: Mutex::new(None),
            publishes: Mutex::new(Vec::new()),
            publish_signal: Condvar::new(),
            create_requests: Mutex::new(Vec::new()),
            delete_item_requests: Mutex::new(Vec::new()),
            deleted_subscriptions: Mutex::new(Vec::new()),
            create_responses: Mutex::new(VecDeque::new()),
            create_hook: Mutex::new(None),
            subscription_hook: Mutex::new(None),
            delete_item_status: Mutex::new(StatusCode::GOOD),
            fail_publish: Mutex::new(false),
            next_server_handle: AtomicU32::new(FIRST_SERVER_HANDLE),
        })
    }

    /// Answer the next create-monitored-items call with `response`
    ///
    /// Without a queued response every item is created with sequential
    /// server handles starting at `FIRST_SERVER_HANDLE`.
    pub fn respond_to_create(
        &self,
        response: Result<Vec<MonitoredItemCreateResult>, TransportError>,
    ) {
        self.create_responses.lock().push_back(response);
    }

    /// Run `hook` inside the next create-monitored-items call, after the
    /// request was received and before the response is returned
    pub fn before_create_response(&self, hook: impl FnOnce(&FakeService) + Send + 'static) {
        *self.create_hook.lock() = Some(Box::new(hook));
    }

    /// Run `hook` with the publish callback inside create_subscription, then
    /// hold the response back for `delay`
    pub fn during_create_subscription(
        &self,
        delay: Duration,
        hook: impl FnOnce(PublishCallback) + Send + 'static,
    ) {
        *self.subscription_hook.lock() = Some((Box::new(hook), delay));
    }

    pub fn set_delete_item_status(&self, status: StatusCode) {
        *self.delete_item_status.lock() = status;
    }

    pub fn set_fail_publish(&self, fail: bool) {
        *self.fail_publish.lock() = fail;
    }

    pub fn callback(&self) -> PublishCallback {
        match self.callback.lock().as_ref() {
            Some(callback) => Arc::clone(callback),
            None => panic!("no subscription has been created"),
        }
    }

    /// Deliver a publish result on the calling thread
    pub fn deliver(&self, result: PublishResult) {
        let callback = self.callback();
        callback(result);
    }

    /// Deliver a publish result from a new thread
    pub fn deliver_from_thread(&self, result: PublishResult) -> JoinHandle<()> {
        let callback = self.callback();
        thread::spawn(move || callback(result))
    }

    /// Every publish request received, in order
    pub fn publish_requests(&self) -> Vec<Vec<SubscriptionAcknowledgement>> {
        self.publishes.lock().clone()
    }

    /// Every acknowledgement received, in order
    pub fn acks(&self) -> Vec<SubscriptionAcknowledgement> {
        self.publishes.lock().iter().flatten().copied().collect()
    }

    /// Wait until at least `count` publish requests arrived
    pub fn wait_for_publishes(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut publishes = self.publishes.lock();
        while publishes.len() < count {
            if self
                .publish_signal
                .wait_until(&mut publishes, deadline)
                .timed_out()
            {
                return publishes.len() >= count;
            }
        }
        true
    }

    pub fn create_requests(&self) -> Vec<CreateMonitoredItemsParameters> {
        self.create_requests.lock().clone()
    }

    pub fn delete_item_requests(&self) -> Vec<DeleteMonitoredItemsParameters> {
        self.delete_item_requests.lock().clone()
    }

    pub fn deleted_subscriptions(&self) -> Vec<u32> {
        self.deleted_subscriptions.lock().clone()
    }
}

impl SubscriptionService for FakeService {
    fn create_subscription(
        &self,
        params: &SubscriptionParameters,
        callback: PublishCallback,
    ) -> Result<CreateSubscriptionResult, TransportError> {
        *self.callback.lock() = Some(Arc::clone(&callback));

        let hook = self.subscription_hook.lock().take();
        if let Some((hook, delay)) = hook {
            hook(callback);
            thread::sleep(delay);
        }

        Ok(CreateSubscriptionResult {
            subscription_id: SUBSCRIPTION_ID,
            revised_publishing_interval: params.requested_publishing_interval,
            revised_lifetime_count: params.requested_lifetime_count,
            revised_max_keep_alive_count: params.requested_max_keep_alive_count,
        })
    }

    fn delete_subscriptions(
        &self,
        subscription_ids: &[u32],
    ) -> Result<Vec<StatusCode>, TransportError> {
        self.deleted_subscriptions
            .lock()
            .extend_from_slice(subscription_ids);
        Ok(vec![StatusCode::GOOD; subscription_ids.len()])
    }

    fn publish(&self, acks: Vec<SubscriptionAcknowledgement>) -> Result<(), TransportError> {
        if *self.fail_publish.lock() {
            return Err(TransportError::ChannelClosed);
        }
        self.publishes.lock().push(acks);
        self.publish_signal.notify_all();
        Ok(())
    }

    fn create_monitored_items(
        &self,
        params: &CreateMonitoredItemsParameters,
    ) -> Result<Vec<MonitoredItemCreateResult>, TransportError> {
        self.create_requests.lock().push(params.clone());

        let hook = self.create_hook.lock().take();
        if let Some(hook) = hook {
            hook(self);
        }

        let queued = self.create_responses.lock().pop_front();
        match queued {
            Some(response) => response,
            None => Ok(params
                .items_to_create
                .iter()
                .map(|_| {
                    MonitoredItemCreateResult::good(
                        self.next_server_handle.fetch_add(1, Ordering::SeqCst),
                    )
                })
                .collect()),
        }
    }

    fn delete_monitored_items(
        &self,
        params: &DeleteMonitoredItemsParameters,
    ) -> Result<Vec<StatusCode>, TransportError> {
        self.delete_item_requests.lock().push(params.clone());
        let status = *self.delete_item_status.lock();
        Ok(vec![status; params.monitored_item_ids.len()])
    }
}

/// One data change as seen by the application
#[derive(Debug, Clone, PartialEq)]
pub struct SeenDataChange {
    pub node: NodeId,
    pub value: Variant,
    pub client_handle: u32,
    pub server_handle: Option<u32>,
    pub envelope: String,
}

/// Handler whose callbacks record what they receive
#[derive(Clone, Default)]
pub struct Recorder {
    pub data_changes: Arc<Mutex<Vec<SeenDataChange>>>,
    pub events: Arc<Mutex<Vec<Event>>>,
    pub statuses: Arc<Mutex<Vec<StatusCode>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler(&self) -> SubscriptionHandler {
        let data_changes = Arc::clone(&self.data_changes);
        let events = Arc::clone(&self.events);
        let statuses = Arc::clone(&self.statuses);

        SubscriptionHandler::new()
            .with_data_change(move |node, value, notif| {
                data_changes.lock().push(SeenDataChange {
                    node: node.clone(),
                    value: value.clone(),
                    client_handle: notif.entry.client_handle,
                    server_handle: notif.entry.server_handle,
                    envelope: notif.to_string(),
                });
                Ok(())
            })
            .with_event(move |event| {
                events.lock().push(event.clone());
                Ok(())
            })
            .with_status_change(move |status| {
                statuses.lock().push(status);
                Ok(())
            })
    }

    pub fn values(&self) -> Vec<Variant> {
        self.data_changes
            .lock()
            .iter()
            .map(|seen| seen.value.clone())
            .collect()
    }
}

pub fn ack(sequence_number: u32) -> SubscriptionAcknowledgement {
    SubscriptionAcknowledgement {
        subscription_id: SUBSCRIPTION_ID,
        sequence_number,
    }
}

pub fn publish_result(sequence_number: u32, data: Vec<NotificationData>) -> PublishResult {
    PublishResult::new(
        SUBSCRIPTION_ID,
        NotificationMessage::new(sequence_number, data),
    )
}

pub fn data_change(items: &[(u32, Variant)]) -> NotificationData {
    NotificationData::DataChange(DataChangeNotification {
        monitored_items: items
            .iter()
            .map(|(client_handle, value)| MonitoredItemNotification {
                client_handle: *client_handle,
                value: DataValue::new(value.clone()),
            })
            .collect(),
    })
}

pub fn events(client_handle: u32, fields: Vec<Variant>) -> NotificationData {
    NotificationData::Events(EventNotificationList {
        events: vec![EventFieldList {
            client_handle,
            event_fields: fields,
        }],
    })
}

pub fn status_change(status: StatusCode) -> NotificationData {
    NotificationData::StatusChange(StatusChangeNotification { status })
}
