//! Monitoring filters

use serde::{Deserialize, Serialize};

use crate::attribute::AttributeId;
use crate::node_id::NodeId;
use crate::variant::Variant;

/// A name qualified by a namespace index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct QualifiedName {
    pub namespace_index: u16,
    pub name: String,
}

impl QualifiedName {
    pub fn new(namespace_index: u16, name: impl Into<String>) -> Self {
        Self {
            namespace_index,
            name: name.into(),
        }
    }
}

impl From<&str> for QualifiedName {
    fn from(name: &str) -> Self {
        Self::new(0, name)
    }
}

/// Selects one field of an event by browse path from its type definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleAttributeOperand {
    pub type_definition_id: NodeId,
    pub browse_path: Vec<QualifiedName>,
    pub attribute_id: AttributeId,
    pub index_range: Option<String>,
}

impl SimpleAttributeOperand {
    /// Select the value of the property reached by `browse_path`
    pub fn value_of(type_definition_id: NodeId, browse_path: Vec<QualifiedName>) -> Self {
        Self {
            type_definition_id,
            browse_path,
            attribute_id: AttributeId::Value,
            index_range: None,
        }
    }

    /// Field name used when decoding events: the browse path joined by `/`,
    /// or the attribute name when the path is empty.
    pub fn field_name(&self) -> String {
        if self.browse_path.is_empty() {
            self.attribute_id.to_string()
        } else {
            self.browse_path
                .iter()
                .map(|q| q.name.as_str())
                .collect::<Vec<_>>()
                .join("/")
        }
    }
}

/// Operators of a content filter element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    Equals,
    IsNull,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Like,
    Not,
    Between,
    InList,
    And,
    Or,
    OfType,
}

/// Operand of a content filter element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterOperand {
    /// Index of another element of the same filter
    Element(u32),
    Literal(Variant),
    SimpleAttribute(SimpleAttributeOperand),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentFilterElement {
    pub filter_operator: FilterOperator,
    pub filter_operands: Vec<FilterOperand>,
}

/// Event filter: which fields to report and which events to let through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EventFilter {
    pub select_clauses: Vec<SimpleAttributeOperand>,
    pub where_clause: Vec<ContentFilterElement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DataChangeTrigger {
    Status,
    #[default]
    StatusValue,
    StatusValueTimestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DeadbandType {
    #[default]
    None,
    Absolute,
    Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DataChangeFilter {
    pub trigger: DataChangeTrigger,
    pub deadband_type: DeadbandType,
    pub deadband_value: f64,
}

/// Filter attached to a monitored item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MonitoringFilter {
    DataChange(DataChangeFilter),
    Event(EventFilter),
}

impl MonitoringFilter {
    pub fn as_event_filter(&self) -> Option<&EventFilter> {
        match self {
            MonitoringFilter::Event(filter) => Some(filter),
            MonitoringFilter::DataChange(_) => None,
        }
    }
}

impl From<EventFilter> for MonitoringFilter {
    fn from(filter: EventFilter) -> Self {
        MonitoringFilter::Event(filter)
    }
}

impl From<DataChangeFilter> for MonitoringFilter {
    fn from(filter: DataChangeFilter) -> Self {
        MonitoringFilter::DataChange(filter)
    }
}
