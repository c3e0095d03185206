// Application Layer - Use Cases and Business Logic

pub mod processor;
pub mod submit;

// Re-exports
pub use processor::{ProcessorConfig, QueueProcessor};
pub use submit::SubmitRequest;
