// Submit Use Case - validation at the call boundary, then hand-off to the processor

pub mod validate;


pub use validate::{validate_request, ALLOWED_ASPECT_RATIOS, MAX_PROMPT_CHARS};

use crate::application::processor::QueueProcessor;
use crate::domain::{GenerationParams, ItemId};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Submit request as received from a caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub prompt: String,

    #[serde(default)]
    pub parameters: serde_json::Value,
}

impl SubmitRequest {
    pub fn new(prompt: impl Into<String>, parameters: serde_json::Value) -> Self {
        Self {
            prompt: prompt.into(),
            parameters,
        }
    }
}

/// Execute submit use case
///
/// # Arguments
///
/// * `processor` - Queue processor receiving the item
/// * `req` - Submit request (validated here, never inside the processor)
pub fn execute(processor: &QueueProcessor, req: SubmitRequest) -> Result<ItemId> {
    validate_request(&req)?;

    let params = if req.parameters.is_null() {
        GenerationParams::default()
    } else {
        GenerationParams::new(req.parameters)
    };

    processor.submit(req.prompt.trim(), params)
}
