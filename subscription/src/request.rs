//! Monitored item request builders
//!
//! Also defines [`MonitorTarget`], which lets the subscribe helpers accept a
//! single node or a collection and answer in the same shape.

use ua_types::{
    AttributeId, EventFilter, MonitoredItemCreateRequest, MonitoringFilter, MonitoringMode,
    MonitoringParameters, NodeId, ReadValueId, StatusCode,
};

use crate::config::SubscriptionConfig;
use crate::error::{Result, SubscriptionError};

/// Outcome of one monitored item creation: the server handle, or the
/// status the server rejected it with.
pub type ItemResult = std::result::Result<u32, StatusCode>;

/// Build a request monitoring `attribute_id` of `node_id`
pub fn data_change_request(
    node_id: NodeId,
    attribute_id: AttributeId,
    client_handle: u32,
    config: &SubscriptionConfig,
) -> MonitoredItemCreateRequest {
    build_request(node_id, attribute_id, client_handle, None, config)
}

/// Build a request reporting events of `source` through `filter`
pub fn event_request(
    source: NodeId,
    filter: EventFilter,
    client_handle: u32,
    config: &SubscriptionConfig,
) -> MonitoredItemCreateRequest {
    build_request(
        source,
        AttributeId::EventNotifier,
        client_handle,
        Some(MonitoringFilter::Event(filter)),
        config,
    )
}

fn build_request(
    node_id: NodeId,
    attribute_id: AttributeId,
    client_handle: u32,
    filter: Option<MonitoringFilter>,
    config: &SubscriptionConfig,
) -> MonitoredItemCreateRequest {
    MonitoredItemCreateRequest {
        item_to_monitor: ReadValueId::new(node_id, attribute_id),
        monitoring_mode: MonitoringMode::Reporting,
        requested_parameters: MonitoringParameters {
            client_handle,
            sampling_interval: config.effective_sampling_interval(),
            filter,
            queue_size: config.default_queue_size,
            discard_oldest: config.discard_oldest,
        },
    }
}

/// Something that can be subscribed to: one node or several.
///
/// A single node answers with its server handle and turns a rejected
/// creation into `SubscriptionError::BadStatus`. A collection answers with
/// one [`ItemResult`] per node, in input order.
pub trait MonitorTarget {
    type Output;

    fn into_nodes(self) -> Vec<NodeId>;

    fn collect_results(results: Vec<ItemResult>) -> Result<Self::Output>;
}

fn single_result(results: Vec<ItemResult>) -> Result<u32> {
    match results.into_iter().next() {
        Some(Ok(handle)) => Ok(handle),
        Some(Err(status)) => Err(SubscriptionError::BadStatus(status)),
        None => Err(SubscriptionError::BadStatus(StatusCode::BAD_UNEXPECTED_ERROR)),
    }
}

impl MonitorTarget for NodeId {
    type Output = u32;

    fn into_nodes(self) -> Vec<NodeId> {
        vec![self]
    }

    fn collect_results(results: Vec<ItemResult>) -> Result<u32> {
        single_result(results)
    }
}

impl MonitorTarget for &NodeId {
    type Output = u32;

    fn into_nodes(self) -> Vec<NodeId> {
        vec![self.clone()]
    }

    fn collect_results(results: Vec<ItemResult>) -> Result<u32> {
        single_result(results)
    }
}

impl MonitorTarget for Vec<NodeId> {
    type Output = Vec<ItemResult>;

    fn into_nodes(self) -> Vec<NodeId> {
        self
    }

    fn collect_results(results: Vec<ItemResult>) -> Result<Vec<ItemResult>> {
        Ok(results)
    }
}

impl MonitorTarget for &[NodeId] {
    type Output = Vec<ItemResult>;

    fn into_nodes(self) -> Vec<NodeId> {
        self.to_vec()
    }

    fn collect_results(results: Vec<ItemResult>) -> Result<Vec<ItemResult>> {
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ua_types::ObjectId;

    #[test]
    fn test_data_change_request_defaults() {
        let config = SubscriptionConfig::with_publishing_interval(500.0);
        let request = data_change_request(NodeId::numeric(2, 10), AttributeId::Value, 201, &config);

        assert_eq!(request.client_handle(), 201);
        assert_eq!(request.item_to_monitor.attribute_id, AttributeId::Value);
        assert_eq!(request.monitoring_mode, MonitoringMode::Reporting);
        assert_eq!(request.requested_parameters.sampling_interval, 500.0);
        assert_eq!(request.requested_parameters.queue_size, 0);
        assert!(request.requested_parameters.discard_oldest);
        assert!(request.requested_parameters.filter.is_none());
    }

    #[test]
    fn test_sampling_override() {
        let config = SubscriptionConfig::fast_sampling();
        let request = data_change_request(NodeId::numeric(2, 10), AttributeId::Value, 201, &config);
        assert_eq!(request.requested_parameters.sampling_interval, 25.0);
    }

    #[test]
    fn test_event_request_uses_event_notifier() {
        let config = SubscriptionConfig::default();
        let request = event_request(ObjectId::server(), EventFilter::default(), 202, &config);

        assert_eq!(request.item_to_monitor.node_id, NodeId::numeric(0, 2253));
        assert_eq!(request.item_to_monitor.attribute_id, AttributeId::EventNotifier);
        assert!(matches!(
            request.requested_parameters.filter,
            Some(MonitoringFilter::Event(_))
        ));
    }

    #[test]
    fn test_single_target_maps_bad_status() {
        assert_eq!(NodeId::collect_results(vec![Ok(77)]).unwrap(), 77);

        let err = NodeId::collect_results(vec![Err(StatusCode::BAD_NODE_ID_UNKNOWN)]).unwrap_err();
        assert!(matches!(
            err,
            SubscriptionError::BadStatus(StatusCode::BAD_NODE_ID_UNKNOWN)
        ));

        let err = <&NodeId as MonitorTarget>::collect_results(Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            SubscriptionError::BadStatus(StatusCode::BAD_UNEXPECTED_ERROR)
        ));
    }

    #[test]
    fn test_collection_target_keeps_positions() {
        let nodes = vec![NodeId::numeric(2, 1), NodeId::numeric(2, 2)];
        assert_eq!(nodes.as_slice().into_nodes().len(), 2);

        let results = vec![Ok(1), Err(StatusCode::BAD_NODE_ID_UNKNOWN)];
        let collected = Vec::<NodeId>::collect_results(results.clone()).unwrap();
        assert_eq!(collected, results);
    }
}
