// Port Layer - Interfaces for external dependencies

pub mod gallery_sink;
pub mod generation_service;
pub mod id_provider; // For deterministic testing
pub mod time_provider;
pub mod usage_recorder;

// Re-exports
pub use gallery_sink::{GalleryEntry, GallerySink};
pub use generation_service::{GenerationError, GenerationService};
pub use id_provider::IdProvider;
pub use time_provider::TimeProvider;
pub use usage_recorder::UsageRecorder;
