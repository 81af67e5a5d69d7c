//! Event filters and decoded events
//!
//! An event notification carries only a list of field values whose meaning
//! comes from the select clauses of the filter the item was created with.
//! [`EventDecoder`] builds those filters and turns field lists back into
//! [`Event`] objects.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use ua_types::{
    ContentFilterElement, EventFilter, FilterOperand, FilterOperator, NodeId, ObjectId,
    QualifiedName, SimpleAttributeOperand, Variant,
};

use crate::error::{Result, SubscriptionError};

/// Properties every event type inherits from BaseEventType
pub const BASE_EVENT_FIELDS: [&str; 8] = [
    "EventId",
    "EventType",
    "SourceNode",
    "SourceName",
    "Time",
    "ReceiveTime",
    "Message",
    "Severity",
];

/// Builds event filters and decodes event field lists.
pub trait EventDecoder: Send + Sync {
    /// Filter selecting the fields of `event_type` and admitting only
    /// events of that type or its subtypes
    fn filter_from_event_type(&self, event_type: &NodeId) -> Result<EventFilter>;

    /// Pair each field value with the select clause at the same position
    fn event_from_fields(&self, select_clauses: &[SimpleAttributeOperand], fields: &[Variant])
        -> Event;
}

/// A decoded event
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Event {
    /// Field values keyed by select-clause name
    pub fields: BTreeMap<String, Variant>,
    /// Server handle of the monitored item that reported the event
    pub server_handle: Option<u32>,
}

impl Event {
    pub fn get(&self, name: &str) -> Option<&Variant> {
        self.fields.get(name)
    }

    pub fn event_id(&self) -> Option<&[u8]> {
        match self.get("EventId")? {
            Variant::ByteString(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn event_type(&self) -> Option<&NodeId> {
        match self.get("EventType")? {
            Variant::NodeId(node) => Some(node),
            _ => None,
        }
    }

    pub fn source_node(&self) -> Option<&NodeId> {
        match self.get("SourceNode")? {
            Variant::NodeId(node) => Some(node),
            _ => None,
        }
    }

    pub fn source_name(&self) -> Option<&str> {
        self.get("SourceName")?.as_str()
    }

    /// Message text, from either a localized text or a plain string
    pub fn message(&self) -> Option<&str> {
        self.get("Message")?.as_str()
    }

    /// Severity in the range 1..=1000
    pub fn severity(&self) -> Option<u16> {
        self.get("Severity")?
            .as_i64()
            .and_then(|value| u16::try_from(value).ok())
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        match self.get("Time")? {
            Variant::DateTime(time) => Some(*time),
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event(")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", name, value)?;
        }
        write!(f, ")")
    }
}

/// Decoder that selects the BaseEventType properties plus any extra
/// properties registered for a specific event type.
///
/// There is no address space browsing here; fields of custom event types
/// have to be registered up front with [`StandardEventDecoder::with_event_type`].
#[derive(Debug, Clone, Default)]
pub struct StandardEventDecoder {
    extra_fields: HashMap<NodeId, Vec<QualifiedName>>,
}

impl StandardEventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the additional properties of an event type
    pub fn with_event_type(mut self, event_type: NodeId, fields: Vec<QualifiedName>) -> Self {
        self.extra_fields.insert(event_type, fields);
        self
    }
}

impl EventDecoder for StandardEventDecoder {
    fn filter_from_event_type(&self, event_type: &NodeId) -> Result<EventFilter> {
        if event_type.is_null() {
            return Err(SubscriptionError::EventFilter(
                "event type must not be the null node id".to_string(),
            ));
        }

        let base_type = ObjectId::base_event_type();
        let mut select_clauses: Vec<SimpleAttributeOperand> = BASE_EVENT_FIELDS
            .iter()
            .map(|name| SimpleAttributeOperand::value_of(base_type.clone(), vec![(*name).into()]))
            .collect();

        if let Some(extra) = self.extra_fields.get(event_type) {
            for name in extra {
                let exists = select_clauses
                    .iter()
                    .any(|clause| clause.browse_path.len() == 1 && clause.browse_path[0] == *name);
                if !exists {
                    select_clauses.push(SimpleAttributeOperand::value_of(
                        event_type.clone(),
                        vec![name.clone()],
                    ));
                }
            }
        }

        let where_clause = vec![ContentFilterElement {
            filter_operator: FilterOperator::OfType,
            filter_operands: vec![FilterOperand::Literal(Variant::NodeId(event_type.clone()))],
        }];

        Ok(EventFilter {
            select_clauses,
            where_clause,
        })
    }

    fn event_from_fields(
        &self,
        select_clauses: &[SimpleAttributeOperand],
        fields: &[Variant],
    ) -> Event {
        if select_clauses.len() != fields.len() {
            tracing::warn!(
                "Event carries {} fields for {} select clauses; extra values are ignored",
                fields.len(),
                select_clauses.len()
            );
        }

        let fields = select_clauses
            .iter()
            .zip(fields)
            .map(|(clause, value)| (clause.field_name(), value.clone()))
            .collect();

        Event {
            fields,
            server_handle: None,
        }
    }
}
