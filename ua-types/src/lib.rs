//! In-memory OPC-UA types for the subscription slice of the SDK
//!
//! This crate holds the shapes exchanged between the subscription engine and
//! the session transport: node ids, attribute ids, status codes, variants,
//! the create/delete/publish request and response structs, and the
//! notification records a publish response carries.
//!
//! It deliberately contains no wire encoding. Transports translate between
//! these structs and whatever encoding they speak.

pub mod attribute;
pub mod error;
pub mod filter;
pub mod node_id;
pub mod notification;
pub mod service;
pub mod status_code;
pub mod variant;

pub use attribute::AttributeId;
pub use error::ParseError;
pub use filter::{
    ContentFilterElement, DataChangeFilter, DataChangeTrigger, DeadbandType, EventFilter,
    FilterOperand, FilterOperator, MonitoringFilter, QualifiedName, SimpleAttributeOperand,
};
pub use node_id::{Identifier, NodeId, ObjectId};
pub use notification::{
    DataChangeNotification, EventFieldList, EventNotificationList, MonitoredItemNotification,
    NotificationData, NotificationMessage, PublishResult, StatusChangeNotification,
};
pub use service::{
    CreateMonitoredItemsParameters, CreateSubscriptionResult, DeleteMonitoredItemsParameters,
    MonitoredItemCreateRequest, MonitoredItemCreateResult, MonitoringMode, MonitoringParameters,
    ReadValueId, SubscriptionAcknowledgement, SubscriptionParameters, TimestampsToReturn,
};
pub use status_code::StatusCode;
pub use variant::{DataValue, Variant};
