//! Error types for the ua-types crate

use thiserror::Error;

/// Errors produced when parsing protocol values from their text forms
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The node id text could not be parsed
    #[error("Invalid node id '{input}': {reason}")]
    InvalidNodeId { input: String, reason: String },

    /// The attribute id is outside the range defined by the protocol
    #[error("Unknown attribute id: {0}")]
    UnknownAttributeId(u32),
}

impl ParseError {
    pub(crate) fn node_id(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidNodeId {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}
