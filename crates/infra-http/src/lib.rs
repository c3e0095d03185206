// Studio Infrastructure - HTTP Adapter
// Implements: GenerationService (OpenAI-compatible image endpoint)

mod image_api;
mod size;

pub use image_api::{ImageApiClient, ImageApiConfig};
pub use size::size_for;
