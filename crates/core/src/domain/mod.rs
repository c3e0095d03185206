// Domain Layer - Pure business logic and entities

pub mod error;
pub mod item;
pub mod queue;

// Re-exports
pub use error::DomainError;
pub use item::{Artifact, GenerationParams, ItemId, ItemStatus, QueueItem, EMPTY_RESULT_MESSAGE};
pub use queue::{
    CompletedResult, Dispatch, GenerationQueue, QueueConfig, QueueSnapshot, SettleOutcome,
    Settlement, DEFAULT_MAX_QUEUE_SIZE,
};
