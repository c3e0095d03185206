// Submit request validation

use super::SubmitRequest;
use crate::error::{AppError, Result};

/// Longest prompt accepted, in characters
pub const MAX_PROMPT_CHARS: usize = 4000;

/// Aspect ratios the image backends understand
pub const ALLOWED_ASPECT_RATIOS: &[&str] = &["1:1", "16:9", "9:16", "4:3", "3:4"];

/// Validate a submit request before it reaches the queue
pub fn validate_request(req: &SubmitRequest) -> Result<()> {
    let prompt = req.prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::Validation("Prompt cannot be empty".to_string()));
    }

    let chars = prompt.chars().count();
    if chars > MAX_PROMPT_CHARS {
        return Err(AppError::Validation(format!(
            "Prompt too long: {} characters (max {})",
            chars, MAX_PROMPT_CHARS
        )));
    }

    if req.parameters.is_null() {
        return Ok(());
    }
    let params = req.parameters.as_object().ok_or_else(|| {
        AppError::Validation("Parameters must be a JSON object".to_string())
    })?;

    if let Some(ratio) = params.get("aspect_ratio") {
        let ratio = ratio.as_str().ok_or_else(|| {
            AppError::Validation("aspect_ratio must be a string".to_string())
        })?;
        if !ALLOWED_ASPECT_RATIOS.contains(&ratio) {
            return Err(AppError::Validation(format!(
                "Unsupported aspect_ratio '{}' (expected one of {})",
                ratio,
                ALLOWED_ASPECT_RATIOS.join(", ")
            )));
        }
    }

    Ok(())
}
