//! RPC Request/Response Types
//!
//! Defines the JSON-RPC method parameters and results.

use serde::{Deserialize, Serialize};
use studio_core::domain::ItemStatus;
use studio_core::port::GalleryEntry;

/// queue.submit.v1 - Submit a prompt (validated by the submit use case)
pub use studio_core::application::SubmitRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub item_id: String,
    pub status: ItemStatus,
}

/// queue.cancel.v1 / queue.remove.v1 - Target a single item
#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    pub item_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub item_id: String,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveResponse {
    pub item_id: String,
    pub removed: bool,
}

/// queue.clear.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    pub removed: usize,
}

/// gallery.list.v1 - Recent gallery entries
#[derive(Debug, Deserialize)]
pub struct GalleryListRequest {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for GalleryListRequest {
    fn default() -> Self {
        Self {
            limit: default_limit(),
        }
    }
}

fn default_limit() -> usize {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryListResponse {
    pub entries: Vec<GalleryEntry>,
}

/// usage.get.v1 - Usage counter for a feature (defaults to the queue's feature)
#[derive(Debug, Default, Deserialize)]
pub struct UsageRequest {
    pub feature: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageResponse {
    pub feature: String,
    pub total: i64,
}
