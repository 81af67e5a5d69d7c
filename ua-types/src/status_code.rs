//! Status codes
//!
//! A status code is a 32-bit value whose two top bits carry the severity:
//! `00` good, `01` uncertain, `10`/`11` bad.

use std::fmt;

use serde::{Deserialize, Serialize};

const SEVERITY_MASK: u32 = 0xC000_0000;
const SEVERITY_UNCERTAIN: u32 = 0x4000_0000;
const SEVERITY_BAD: u32 = 0x8000_0000;

/// Result code returned by the server for a service or a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct StatusCode(pub u32);

impl StatusCode {
    pub const GOOD: StatusCode = StatusCode(0);
    pub const UNCERTAIN: StatusCode = StatusCode(0x4000_0000);
    pub const BAD: StatusCode = StatusCode(0x8000_0000);
    pub const BAD_UNEXPECTED_ERROR: StatusCode = StatusCode(0x8001_0000);
    pub const BAD_INTERNAL_ERROR: StatusCode = StatusCode(0x8002_0000);
    pub const BAD_COMMUNICATION_ERROR: StatusCode = StatusCode(0x8005_0000);
    pub const BAD_TIMEOUT: StatusCode = StatusCode(0x800A_0000);
    pub const BAD_SERVICE_UNSUPPORTED: StatusCode = StatusCode(0x800B_0000);
    pub const BAD_NOTHING_TO_DO: StatusCode = StatusCode(0x800F_0000);
    pub const BAD_TOO_MANY_OPERATIONS: StatusCode = StatusCode(0x8010_0000);
    pub const BAD_SUBSCRIPTION_ID_INVALID: StatusCode = StatusCode(0x8028_0000);
    pub const BAD_NODE_ID_UNKNOWN: StatusCode = StatusCode(0x8034_0000);
    pub const BAD_ATTRIBUTE_ID_INVALID: StatusCode = StatusCode(0x8035_0000);
    pub const BAD_MONITORED_ITEM_ID_INVALID: StatusCode = StatusCode(0x8042_0000);
    pub const BAD_MONITORED_ITEM_FILTER_INVALID: StatusCode = StatusCode(0x8043_0000);
    pub const BAD_FILTER_NOT_ALLOWED: StatusCode = StatusCode(0x8045_0000);

    /// Raw 32-bit value
    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_good(self) -> bool {
        self.0 & SEVERITY_MASK == 0
    }

    pub fn is_uncertain(self) -> bool {
        self.0 & SEVERITY_MASK == SEVERITY_UNCERTAIN
    }

    pub fn is_bad(self) -> bool {
        self.0 & SEVERITY_BAD != 0
    }

    /// Turn a non-good status into an error.
    ///
    /// ```
    /// use ua_types::StatusCode;
    ///
    /// assert!(StatusCode::GOOD.check().is_ok());
    /// assert_eq!(
    ///     StatusCode::BAD_NODE_ID_UNKNOWN.check(),
    ///     Err(StatusCode::BAD_NODE_ID_UNKNOWN)
    /// );
    /// ```
    pub fn check(self) -> Result<(), StatusCode> {
        if self.is_good() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Symbolic name for the codes known to this crate
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::GOOD => "Good",
            Self::UNCERTAIN => "Uncertain",
            Self::BAD => "Bad",
            Self::BAD_UNEXPECTED_ERROR => "BadUnexpectedError",
            Self::BAD_INTERNAL_ERROR => "BadInternalError",
            Self::BAD_COMMUNICATION_ERROR => "BadCommunicationError",
            Self::BAD_TIMEOUT => "BadTimeout",
            Self::BAD_SERVICE_UNSUPPORTED => "BadServiceUnsupported",
            Self::BAD_NOTHING_TO_DO => "BadNothingToDo",
            Self::BAD_TOO_MANY_OPERATIONS => "BadTooManyOperations",
            Self::BAD_SUBSCRIPTION_ID_INVALID => "BadSubscriptionIdInvalid",
            Self::BAD_NODE_ID_UNKNOWN => "BadNodeIdUnknown",
            Self::BAD_ATTRIBUTE_ID_INVALID => "BadAttributeIdInvalid",
            Self::BAD_MONITORED_ITEM_ID_INVALID => "BadMonitoredItemIdInvalid",
            Self::BAD_MONITORED_ITEM_FILTER_INVALID => "BadMonitoredItemFilterInvalid",
            Self::BAD_FILTER_NOT_ALLOWED => "BadFilterNotAllowed",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} (0x{:08X})", name, self.0),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

impl std::error::Error for StatusCode {}

impl From<u32> for StatusCode {
    fn from(value: u32) -> Self {
        Self(value)
    }
}
