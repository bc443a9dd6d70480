//! Error types for graph operations.

use thiserror::Error;

use crate::config::ConfigError;

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Error returned by event and configuration listeners.
///
/// Listener errors are logged at the dispatch site and never reach the
/// caller that triggered the dispatch.
pub type ListenerError = Box<dyn std::error::Error + 'static>;

/// Result type returned by event and configuration listeners.
pub type ListenerResult = Result<(), ListenerError>;

/// Errors that can occur in graph operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// No mount target was supplied at construction.
    #[error("Container is required")]
    MissingContainer,

    /// A node type or node was submitted without a component.
    #[error("Component is required")]
    MissingComponent,

    /// A node referenced a type that was never registered.
    #[error("Node type '{0}' is not registered")]
    UnregisteredType(String),

    /// A node with the same id is already live.
    #[error("Node id '{0}' is already in use")]
    DuplicateNodeId(String),

    /// An update could not be applied to a node.
    #[error("Invalid node update: {0}")]
    InvalidUpdate(String),

    /// Payload serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration store error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
