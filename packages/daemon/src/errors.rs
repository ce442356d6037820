//! Error types for the daemon

use markweave_dom::{DomError, NodeId};
use thiserror::Error;

pub type DaemonResult<T> = Result<T, DaemonError>;

#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("Address does not resolve: {address}")]
    AddressResolution { address: String },

    #[error("Node {0} has no stable identity and cannot be ignored")]
    InvalidIgnoreTarget(NodeId),

    #[error("Malformed operation: {0}")]
    MalformedOperation(String),

    #[error("No active selection")]
    SelectionUnavailable,

    #[error("Watched root is not attached")]
    MissingWatchedRoot,

    #[error("Mirror document is not attached")]
    MissingMirror,

    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] crate::address::AddressError),

    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DaemonError {
    pub fn unresolved(address: impl ToString) -> Self {
        Self::AddressResolution {
            address: address.to_string(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedOperation(message.into())
    }
}

impl From<serde_json::Error> for DaemonError {
    fn from(e: serde_json::Error) -> Self {
        DaemonError::Config(e.to_string())
    }
}
