//! Request and response shapes of the subscription and monitored item services

use serde::{Deserialize, Serialize};

use crate::attribute::AttributeId;
use crate::filter::MonitoringFilter;
use crate::node_id::NodeId;
use crate::status_code::StatusCode;

/// Node and attribute to read or monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadValueId {
    pub node_id: NodeId,
    pub attribute_id: AttributeId,
    /// Left unset to receive the whole array
    pub index_range: Option<String>,
}

impl ReadValueId {
    pub fn new(node_id: NodeId, attribute_id: AttributeId) -> Self {
        Self {
            node_id,
            attribute_id,
            index_range: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MonitoringMode {
    Disabled,
    Sampling,
    #[default]
    Reporting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimestampsToReturn {
    Source,
    Server,
    Both,
    #[default]
    Neither,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringParameters {
    /// Handle chosen by the client, echoed back in every notification
    pub client_handle: u32,
    /// Sampling interval in milliseconds
    pub sampling_interval: f64,
    pub filter: Option<MonitoringFilter>,
    pub queue_size: u32,
    pub discard_oldest: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredItemCreateRequest {
    pub item_to_monitor: ReadValueId,
    pub monitoring_mode: MonitoringMode,
    pub requested_parameters: MonitoringParameters,
}

impl MonitoredItemCreateRequest {
    pub fn client_handle(&self) -> u32 {
        self.requested_parameters.client_handle
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateMonitoredItemsParameters {
    pub subscription_id: u32,
    pub timestamps_to_return: TimestampsToReturn,
    pub items_to_create: Vec<MonitoredItemCreateRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MonitoredItemCreateResult {
    pub status_code: StatusCode,
    /// Server-assigned monitored item id
    pub monitored_item_id: u32,
    pub revised_sampling_interval: f64,
    pub revised_queue_size: u32,
}

impl MonitoredItemCreateResult {
    pub fn good(monitored_item_id: u32) -> Self {
        Self {
            status_code: StatusCode::GOOD,
            monitored_item_id,
            ..Default::default()
        }
    }

    pub fn bad(status_code: StatusCode) -> Self {
        Self {
            status_code,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteMonitoredItemsParameters {
    pub subscription_id: u32,
    pub monitored_item_ids: Vec<u32>,
}

/// Parameters requested when creating a subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionParameters {
    /// Publishing interval in milliseconds
    pub requested_publishing_interval: f64,
    pub requested_lifetime_count: u32,
    pub requested_max_keep_alive_count: u32,
    pub max_notifications_per_publish: u32,
    pub publishing_enabled: bool,
    pub priority: u8,
}

impl Default for SubscriptionParameters {
    fn default() -> Self {
        Self {
            requested_publishing_interval: 100.0,
            requested_lifetime_count: 10_000,
            requested_max_keep_alive_count: 3_000,
            max_notifications_per_publish: 10_000,
            publishing_enabled: true,
            priority: 0,
        }
    }
}

/// Server answer to a create-subscription request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CreateSubscriptionResult {
    pub subscription_id: u32,
    pub revised_publishing_interval: f64,
    pub revised_lifetime_count: u32,
    pub revised_max_keep_alive_count: u32,
}

/// Acknowledges receipt of one notification message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionAcknowledgement {
    pub subscription_id: u32,
    pub sequence_number: u32,
}
