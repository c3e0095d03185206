// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid item state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Queue item not found: {0}")]
    ItemNotFound(String),

    #[error("Queue is full ({capacity} items)")]
    QueueFull { capacity: usize },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
