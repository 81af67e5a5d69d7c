//! Publish results and the notification payloads they carry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::node_id::NodeId;
use crate::status_code::StatusCode;
use crate::variant::{DataValue, Variant};

/// New value reported for one monitored item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredItemNotification {
    pub client_handle: u32,
    pub value: DataValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DataChangeNotification {
    pub monitored_items: Vec<MonitoredItemNotification>,
}

/// Field values of one event, in select-clause order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFieldList {
    pub client_handle: u32,
    pub event_fields: Vec<Variant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EventNotificationList {
    pub events: Vec<EventFieldList>,
}

/// Reports a change in the state of the subscription itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangeNotification {
    pub status: StatusCode,
}

/// One record of a notification message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NotificationData {
    DataChange(DataChangeNotification),
    Events(EventNotificationList),
    StatusChange(StatusChangeNotification),
    /// Any notification kind this crate does not decode
    Unsupported { type_id: NodeId },
}

impl NotificationData {
    /// Encoding id of the record, used in diagnostics
    pub fn type_id(&self) -> NodeId {
        use crate::node_id::ObjectId;
        match self {
            NotificationData::DataChange(_) => NodeId::numeric(0, ObjectId::DATA_CHANGE_NOTIFICATION),
            NotificationData::Events(_) => NodeId::numeric(0, ObjectId::EVENT_NOTIFICATION_LIST),
            NotificationData::StatusChange(_) => {
                NodeId::numeric(0, ObjectId::STATUS_CHANGE_NOTIFICATION)
            }
            NotificationData::Unsupported { type_id } => type_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub sequence_number: u32,
    pub publish_time: DateTime<Utc>,
    pub notification_data: Vec<NotificationData>,
}

impl NotificationMessage {
    pub fn new(sequence_number: u32, notification_data: Vec<NotificationData>) -> Self {
        Self {
            sequence_number,
            publish_time: Utc::now(),
            notification_data,
        }
    }

    /// A message with no records
    pub fn keep_alive(sequence_number: u32) -> Self {
        Self::new(sequence_number, Vec::new())
    }
}

/// Server answer to a publish request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishResult {
    pub subscription_id: u32,
    pub available_sequence_numbers: Vec<u32>,
    pub more_notifications: bool,
    pub notification_message: NotificationMessage,
    /// Results for the acknowledgements carried by the request
    pub results: Vec<StatusCode>,
}

impl PublishResult {
    pub fn new(subscription_id: u32, notification_message: NotificationMessage) -> Self {
        Self {
            subscription_id,
            available_sequence_numbers: vec![notification_message.sequence_number],
            more_notifications: false,
            notification_message,
            results: Vec::new(),
        }
    }
}
