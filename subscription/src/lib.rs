//! # OPC-UA Subscription Engine
//!
//! Client-side management of OPC-UA subscriptions: creating a subscription on
//! a session, adding and removing monitored items, keeping the
//! publish/acknowledge cycle running and routing notifications to
//! application callbacks.
//!
//! ## Overview
//!
//! The crate does not speak the wire protocol. A session layer implements
//! [`SubscriptionService`] to carry requests to the server and calls the
//! [`PublishCallback`] it is handed for every publish response.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use opcua_subscription::prelude::*;
//!
//! let handler = SubscriptionHandler::new()
//!     .with_data_change(|node, value, _notif| {
//!         println!("{} = {}", node, value);
//!         Ok(())
//!     })
//!     .with_event(|event| {
//!         println!("event from {:?}: {:?}", event.source_name(), event.message());
//!         Ok(())
//!     });
//!
//! let subscription = Subscription::builder(session)
//!     .with_publishing_interval(500.0)
//!     .with_handler(handler)
//!     .build()?;
//!
//! // One node answers with one handle...
//! let handle = subscription.subscribe_data_change("ns=2;s=Boiler.Temperature".parse::<NodeId>()?, AttributeId::Value)?;
//!
//! // ...a collection with one result per node.
//! let results = subscription.subscribe_data_change(vec![node_a, node_b], AttributeId::Value)?;
//!
//! subscription.subscribe_server_events()?;
//!
//! subscription.unsubscribe(handle)?;
//! subscription.delete()?;
//! ```
//!
//! ## Architecture
//!
//! 1. **Registry**: monitored items keyed by client handle, written before
//!    the create request is sent so early notifications are never lost
//! 2. **Router**: resolves each notification record against the registry
//! 3. **Handler**: optional callback slots with failure isolation
//! 4. **Subscription**: lifecycle plus the publish/acknowledge cycle; every
//!    publish response is answered with exactly one new publish request
//!    acknowledging it

pub mod builder;
pub mod config;
pub mod error;
pub mod events;
pub mod handler;
pub mod logging;
pub mod registry;
pub mod request;
pub mod router;
pub mod subscription;
pub mod transport;
pub mod worker;

// Re-export main types for convenience
pub use builder::SubscriptionBuilder;
pub use config::SubscriptionConfig;
pub use error::{CallbackError, Result, SubscriptionError, TransportError};
pub use events::{Event, EventDecoder, StandardEventDecoder};
pub use handler::{CallbackResult, DataChangeNotif, DispatchOutcome, SubscriptionHandler};
pub use registry::{MonitoredItemEntry, MonitoredItemRegistry, CLIENT_HANDLE_BASE};
pub use request::{ItemResult, MonitorTarget};
pub use router::{NotificationRouter, RouteSummary};
pub use subscription::Subscription;
pub use transport::{PublishCallback, SubscriptionService};
pub use worker::{spawn_publish_worker, PublishSender, PublishWorker};

// Re-export the protocol types callers need most
pub use ua_types::{AttributeId, NodeId, StatusCode, Variant};

/// Convenient imports for applications
pub mod prelude {
    pub use crate::{
        AttributeId, Event, NodeId, StatusCode, Subscription, SubscriptionConfig,
        SubscriptionError, SubscriptionHandler, SubscriptionService, Variant,
    };
}
