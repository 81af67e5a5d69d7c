//! Node identifiers
//!
//! A [`NodeId`] addresses one node in a server's address space. Only the
//! identifier kinds this crate needs are modelled: numeric, string and GUID.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ParseError;

/// The identifier part of a [`NodeId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Identifier {
    /// Numeric identifier, used by every node of the standard namespace
    Numeric(u32),
    /// String identifier, common for vendor nodes
    String(String),
    /// GUID identifier
    Guid(Uuid),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "i={}", v),
            Self::String(v) => write!(f, "s={}", v),
            Self::Guid(v) => write!(f, "g={}", v),
        }
    }
}

/// Identifier of a node in the server address space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    /// Namespace index (0 is the standard namespace)
    pub namespace: u16,
    /// The identifier within the namespace
    pub identifier: Identifier,
}

impl NodeId {
    /// Create a numeric node id.
    ///
    /// ```
    /// use ua_types::NodeId;
    ///
    /// let node = NodeId::numeric(2, 1001);
    /// assert_eq!(node.to_string(), "ns=2;i=1001");
    /// ```
    pub fn numeric(namespace: u16, value: u32) -> Self {
        Self {
            namespace,
            identifier: Identifier::Numeric(value),
        }
    }

    /// Create a string node id.
    pub fn string(namespace: u16, value: impl Into<String>) -> Self {
        Self {
            namespace,
            identifier: Identifier::String(value.into()),
        }
    }

    /// Create a GUID node id.
    pub fn guid(namespace: u16, value: Uuid) -> Self {
        Self {
            namespace,
            identifier: Identifier::Guid(value),
        }
    }

    /// Numeric value when this is a numeric id
    pub fn as_numeric(&self) -> Option<u32> {
        match self.identifier {
            Identifier::Numeric(v) => Some(v),
            _ => None,
        }
    }

    /// The null node id (`i=0`)
    pub fn null() -> Self {
        Self::numeric(0, 0)
    }

    pub fn is_null(&self) -> bool {
        self.namespace == 0 && self.identifier == Identifier::Numeric(0)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace == 0 {
            write!(f, "{}", self.identifier)
        } else {
            write!(f, "ns={};{}", self.namespace, self.identifier)
        }
    }
}

impl FromStr for NodeId {
    type Err = ParseError;

    /// Parse the standard text form: `ns=2;i=1001`, `ns=2;s=Name`,
    /// `ns=1;g=<uuid>`, or the same without the `ns=` prefix for namespace 0.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let (namespace, rest) = match s.strip_prefix("ns=") {
            Some(tail) => {
                let (ns, id) = tail
                    .split_once(';')
                    .ok_or_else(|| ParseError::node_id(s, "missing identifier after namespace"))?;
                let ns: u16 = ns
                    .parse()
                    .map_err(|_| ParseError::node_id(s, "invalid namespace index"))?;
                (ns, id)
            }
            None => (0, s),
        };

        let (kind, value) = rest
            .split_once('=')
            .ok_or_else(|| ParseError::node_id(s, "missing identifier type"))?;

        let identifier = match kind {
            "i" => Identifier::Numeric(
                value
                    .parse()
                    .map_err(|_| ParseError::node_id(s, "invalid numeric identifier"))?,
            ),
            "s" => {
                if value.is_empty() {
                    return Err(ParseError::node_id(s, "empty string identifier"));
                }
                Identifier::String(value.to_string())
            }
            "g" => Identifier::Guid(
                Uuid::parse_str(value).map_err(|e| ParseError::node_id(s, e.to_string()))?,
            ),
            other => {
                return Err(ParseError::node_id(
                    s,
                    format!("unsupported identifier type '{}'", other),
                ))
            }
        };

        Ok(Self {
            namespace,
            identifier,
        })
    }
}

impl From<u32> for NodeId {
    fn from(value: u32) -> Self {
        Self::numeric(0, value)
    }
}

impl From<(u16, &str)> for NodeId {
    fn from((namespace, value): (u16, &str)) -> Self {
        Self::string(namespace, value)
    }
}

/// Well-known nodes of the standard namespace used by the subscription layer.
pub struct ObjectId;

impl ObjectId {
    /// `Server` object, the default event source
    pub const SERVER: u32 = 2253;
    /// `BaseEventType`, root of the event type hierarchy
    pub const BASE_EVENT_TYPE: u32 = 2041;
    /// `DataChangeNotification` encoding id
    pub const DATA_CHANGE_NOTIFICATION: u32 = 811;
    /// `EventNotificationList` encoding id
    pub const EVENT_NOTIFICATION_LIST: u32 = 916;
    /// `StatusChangeNotification` encoding id
    pub const STATUS_CHANGE_NOTIFICATION: u32 = 820;

    pub fn server() -> NodeId {
        NodeId::numeric(0, Self::SERVER)
    }

    pub fn base_event_type() -> NodeId {
        NodeId::numeric(0, Self::BASE_EVENT_TYPE)
    }
}
