//! Variant values and data values

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::node_id::NodeId;
use crate::status_code::StatusCode;

/// A dynamically typed value as carried by notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Variant {
    #[default]
    Empty,
    Boolean(bool),
    SByte(i8),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    DateTime(DateTime<Utc>),
    ByteString(Vec<u8>),
    LocalizedText(String),
    NodeId(NodeId),
    StatusCode(StatusCode),
    Array(Vec<Variant>),
}

impl Variant {
    pub fn is_empty(&self) -> bool {
        matches!(self, Variant::Empty)
    }

    /// Widening conversion for the integer kinds
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Variant::SByte(v) => Some(v.into()),
            Variant::Byte(v) => Some(v.into()),
            Variant::Int16(v) => Some(v.into()),
            Variant::UInt16(v) => Some(v.into()),
            Variant::Int32(v) => Some(v.into()),
            Variant::UInt32(v) => Some(v.into()),
            Variant::Int64(v) => Some(v),
            Variant::UInt64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Variant::Float(v) => Some(v.into()),
            Variant::Double(v) => Some(v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    /// Text content of `String` and `LocalizedText` values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::String(v) | Variant::LocalizedText(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Empty => write!(f, "<empty>"),
            Variant::Boolean(v) => write!(f, "{}", v),
            Variant::SByte(v) => write!(f, "{}", v),
            Variant::Byte(v) => write!(f, "{}", v),
            Variant::Int16(v) => write!(f, "{}", v),
            Variant::UInt16(v) => write!(f, "{}", v),
            Variant::Int32(v) => write!(f, "{}", v),
            Variant::UInt32(v) => write!(f, "{}", v),
            Variant::Int64(v) => write!(f, "{}", v),
            Variant::UInt64(v) => write!(f, "{}", v),
            Variant::Float(v) => write!(f, "{}", v),
            Variant::Double(v) => write!(f, "{}", v),
            Variant::String(v) | Variant::LocalizedText(v) => write!(f, "{}", v),
            Variant::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            Variant::ByteString(v) => write!(f, "<{} bytes>", v.len()),
            Variant::NodeId(v) => write!(f, "{}", v),
            Variant::StatusCode(v) => write!(f, "{}", v),
            Variant::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

macro_rules! variant_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Variant {
                fn from(value: $ty) -> Self {
                    Variant::$variant(value)
                }
            }
        )*
    };
}

variant_from! {
    bool => Boolean,
    i8 => SByte,
    u8 => Byte,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    String => String,
    DateTime<Utc> => DateTime,
    NodeId => NodeId,
    StatusCode => StatusCode,
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::String(value.to_string())
    }
}

impl<T: Into<Variant>> From<Vec<T>> for Variant {
    fn from(values: Vec<T>) -> Self {
        Variant::Array(values.into_iter().map(Into::into).collect())
    }
}

/// A value with its quality and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DataValue {
    pub value: Option<Variant>,
    pub status: Option<StatusCode>,
    pub source_timestamp: Option<DateTime<Utc>>,
    pub server_timestamp: Option<DateTime<Utc>>,
}

impl DataValue {
    pub fn new(value: impl Into<Variant>) -> Self {
        Self {
            value: Some(value.into()),
            ..Default::default()
        }
    }

    /// The carried value, `Variant::Empty` when absent
    pub fn variant(&self) -> Variant {
        self.value.clone().unwrap_or_default()
    }

    /// Quality of the value; absent means good
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::GOOD)
    }
}
