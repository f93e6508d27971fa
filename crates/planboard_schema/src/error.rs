//! Errors raised by the schema store and its storage.

use thiserror::Error;

/// Errors that can occur while editing, importing or persisting a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// An item was rejected before it reached the store.
    #[error("Invalid schema item: {0}")]
    InvalidItem(String),

    /// An imported document is structurally unusable. The store keeps its
    /// previous state when this is returned.
    #[error("Schema validation failed: {0}")]
    Validation(String),

    /// An update or removal referenced an id the store does not hold.
    /// The store only logs this; it is never returned from `update_item`
    /// or `remove_item`.
    #[error("Unknown schema item: {0}")]
    UnknownItem(String),

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
