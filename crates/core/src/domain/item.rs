// Queue Item Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Queue item ID (UUID v4 in production)
pub type ItemId = String;

/// Message stored on an item whose generation came back without any artifact
pub const EMPTY_RESULT_MESSAGE: &str = "Generation returned no result";

/// Item status
///
/// `Queued` and `Generating` are live; `Done`, `Error` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Queued,
    Generating,
    Done,
    Error,
    Cancelled,
}

impl ItemStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ItemStatus::Done | ItemStatus::Error | ItemStatus::Cancelled
        )
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStatus::Queued => write!(f, "QUEUED"),
            ItemStatus::Generating => write!(f, "GENERATING"),
            ItemStatus::Done => write!(f, "DONE"),
            ItemStatus::Error => write!(f, "ERROR"),
            ItemStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Generation parameters (opaque JSON object, e.g. `{"aspect_ratio": "16:9"}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams(serde_json::Value);

impl GenerationParams {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Look up a string parameter
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self(serde_json::Value::Object(serde_json::Map::new()))
    }
}

/// A generated artifact (image URL or `data:` URI)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl Artifact {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// One submitted unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: ItemId,
    pub prompt: String,
    pub params: GenerationParams,
    pub status: ItemStatus,

    /// Set only when `status == Done`
    pub result: Option<Artifact>,
    /// Set only when `status == Error`
    pub error: Option<String>,

    pub created_at: i64, // epoch ms
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
}

impl QueueItem {
    /// Create a new queued item
    ///
    /// # Arguments
    ///
    /// * `id` - Unique item ID (injected, not generated)
    /// * `created_at` - Submission timestamp in epoch ms (injected, not system time)
    /// * `prompt` - User prompt
    /// * `params` - Generation parameters
    pub fn new(
        id: impl Into<String>,
        created_at: i64,
        prompt: impl Into<String>,
        params: GenerationParams,
    ) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            params,
            status: ItemStatus::Queued,
            result: None,
            error: None,
            created_at,
            started_at: None,
            finished_at: None,
        }
    }

    fn transition(&mut self, expected: ItemStatus, to: ItemStatus) -> Result<()> {
        if self.status != expected {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        Ok(())
    }

    /// QUEUED -> GENERATING
    pub fn start(&mut self, now_millis: i64) -> Result<()> {
        self.transition(ItemStatus::Queued, ItemStatus::Generating)?;
        self.started_at = Some(now_millis);
        Ok(())
    }

    /// GENERATING -> DONE
    pub fn complete(&mut self, artifact: Artifact, now_millis: i64) -> Result<()> {
        self.transition(ItemStatus::Generating, ItemStatus::Done)?;
        self.result = Some(artifact);
        self.finished_at = Some(now_millis);
        Ok(())
    }

    /// GENERATING -> ERROR
    pub fn fail(&mut self, message: impl Into<String>, now_millis: i64) -> Result<()> {
        self.transition(ItemStatus::Generating, ItemStatus::Error)?;
        self.error = Some(message.into());
        self.finished_at = Some(now_millis);
        Ok(())
    }

    /// GENERATING -> CANCELLED
    pub fn cancel(&mut self, now_millis: i64) -> Result<()> {
        self.transition(ItemStatus::Generating, ItemStatus::Cancelled)?;
        self.finished_at = Some(now_millis);
        Ok(())
    }
}
