//! RPC Method Handlers
//!
//! Implements the business logic for each JSON-RPC method.

use crate::error::to_rpc_error;
use crate::types::{
    CancelResponse, ClearResponse, GalleryListRequest, GalleryListResponse, ItemRequest,
    RemoveResponse, SubmitRequest, SubmitResponse, UsageRequest, UsageResponse,
};
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use studio_core::application::{submit, QueueProcessor};
use studio_core::domain::{ItemStatus, QueueSnapshot};
use studio_core::port::{GallerySink, UsageRecorder};
use tracing::debug;

/// Gallery listings are capped regardless of the requested limit
const MAX_GALLERY_LIMIT: usize = 200;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    processor: QueueProcessor,
    gallery: Arc<dyn GallerySink>,
    usage: Arc<dyn UsageRecorder>,
}

impl RpcHandler {
    pub fn new(
        processor: QueueProcessor,
        gallery: Arc<dyn GallerySink>,
        usage: Arc<dyn UsageRecorder>,
    ) -> Self {
        Self {
            processor,
            gallery,
            usage,
        }
    }

    /// queue.submit.v1
    pub async fn submit(&self, params: SubmitRequest) -> Result<SubmitResponse, ErrorObjectOwned> {
        let item_id = submit::execute(&self.processor, params).map_err(to_rpc_error)?;

        // Scheduling already ran, so the item may be generating by now
        let status = self
            .processor
            .snapshot()
            .status_of(&item_id)
            .unwrap_or(ItemStatus::Queued);

        Ok(SubmitResponse { item_id, status })
    }

    /// queue.cancel.v1
    pub async fn cancel(&self, params: ItemRequest) -> Result<CancelResponse, ErrorObjectOwned> {
        let cancelled = self
            .processor
            .cancel(&params.item_id)
            .map_err(to_rpc_error)?;

        Ok(CancelResponse {
            item_id: params.item_id,
            cancelled,
        })
    }

    /// queue.remove.v1
    pub async fn remove(&self, params: ItemRequest) -> Result<RemoveResponse, ErrorObjectOwned> {
        let removed = self
            .processor
            .remove(&params.item_id)
            .map_err(to_rpc_error)?;

        Ok(RemoveResponse {
            item_id: params.item_id,
            removed,
        })
    }

    /// queue.clear.v1
    pub async fn clear(&self) -> Result<ClearResponse, ErrorObjectOwned> {
        Ok(ClearResponse {
            removed: self.processor.clear(),
        })
    }

    /// queue.list.v1
    pub async fn list(&self) -> Result<QueueSnapshot, ErrorObjectOwned> {
        Ok(self.processor.snapshot())
    }

    /// gallery.list.v1
    pub async fn gallery(
        &self,
        params: GalleryListRequest,
    ) -> Result<GalleryListResponse, ErrorObjectOwned> {
        let limit = params.limit.min(MAX_GALLERY_LIMIT);
        let entries = self.gallery.recent(limit).await.map_err(to_rpc_error)?;

        debug!(limit, returned = entries.len(), "Gallery listed");
        Ok(GalleryListResponse { entries })
    }

    /// usage.get.v1
    pub async fn usage(&self, params: UsageRequest) -> Result<UsageResponse, ErrorObjectOwned> {
        let feature = params
            .feature
            .unwrap_or_else(|| self.processor.config().usage_feature.clone());
        let total = self.usage.total(&feature).await.map_err(to_rpc_error)?;

        Ok(UsageResponse { feature, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::code;
    use serde_json::json;
    use studio_core::application::ProcessorConfig;
    use studio_core::domain::Artifact;
    use studio_core::port::gallery_sink::mocks::RecordingGallery;
    use studio_core::port::generation_service::mocks::{
        ManualGenerationService, PendingGeneration,
    };
    use studio_core::port::id_provider::SequentialIdProvider;
    use studio_core::port::time_provider::MockTimeProvider;
    use studio_core::port::usage_recorder::mocks::RecordingUsage;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Fixture {
        handler: RpcHandler,
        calls: UnboundedReceiver<PendingGeneration>,
        gallery: Arc<RecordingGallery>,
        usage: Arc<RecordingUsage>,
    }

    fn fixture(max_queue_size: usize) -> Fixture {
        let (generation, calls) = ManualGenerationService::new();
        let gallery = Arc::new(RecordingGallery::new());
        let usage = Arc::new(RecordingUsage::new());
        let processor = QueueProcessor::new(
            ProcessorConfig {
                max_queue_size,
                ..ProcessorConfig::default()
            },
            Arc::new(generation),
            gallery.clone(),
            usage.clone(),
            Arc::new(SequentialIdProvider::new()),
            Arc::new(MockTimeProvider::new(1000)),
        );

        Fixture {
            handler: RpcHandler::new(processor, gallery.clone(), usage.clone()),
            calls,
            gallery,
            usage,
        }
    }

    fn submit_req(prompt: &str) -> SubmitRequest {
        SubmitRequest::new(prompt, json!({}))
    }

    #[tokio::test]
    async fn test_submit_reports_current_status() {
        let f = fixture(5);

        let first = f.handler.submit(submit_req("cat")).await.unwrap();
        let second = f.handler.submit(submit_req("dog")).await.unwrap();

        assert_eq!(first.status, ItemStatus::Generating);
        assert_eq!(second.status, ItemStatus::Queued);
        assert_ne!(first.item_id, second.item_id);
    }

    #[tokio::test]
    async fn test_submit_validation_error_code() {
        let f = fixture(5);
        let err = f.handler.submit(submit_req("   ")).await.unwrap_err();
        assert_eq!(err.code(), code::VALIDATION_ERROR);
    }

    #[tokio::test]
    async fn test_submit_when_full_returns_queue_full() {
        let f = fixture(1);
        f.handler.submit(submit_req("cat")).await.unwrap();

        let err = f.handler.submit(submit_req("dog")).await.unwrap_err();
        assert_eq!(err.code(), code::QUEUE_FULL);
        assert_eq!(f.handler.list().await.unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_and_remove() {
        let f = fixture(5);
        let id = f.handler.submit(submit_req("cat")).await.unwrap().item_id;

        let refused = f
            .handler
            .remove(ItemRequest {
                item_id: id.clone(),
            })
            .await
            .unwrap();
        assert!(!refused.removed);

        let cancelled = f
            .handler
            .cancel(ItemRequest {
                item_id: id.clone(),
            })
            .await
            .unwrap();
        assert!(cancelled.cancelled);

        let removed = f
            .handler
            .remove(ItemRequest {
                item_id: id.clone(),
            })
            .await
            .unwrap();
        assert!(removed.removed);
        assert!(f.handler.list().await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_unknown_item_is_not_found() {
        let f = fixture(5);
        let err = f
            .handler
            .cancel(ItemRequest {
                item_id: "missing".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), code::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_clear_keeps_generating_item() {
        let f = fixture(5);
        f.handler.submit(submit_req("cat")).await.unwrap();
        f.handler.submit(submit_req("dog")).await.unwrap();
        f.handler.submit(submit_req("bird")).await.unwrap();

        assert_eq!(f.handler.clear().await.unwrap().removed, 2);
        let snapshot = f.handler.list().await.unwrap();
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].prompt, "cat");
    }

    #[tokio::test]
    async fn test_gallery_and_usage_after_completion() {
        let mut f = fixture(5);
        f.handler.submit(submit_req("cat")).await.unwrap();

        let call = tokio::time::timeout(std::time::Duration::from_secs(5), f.calls.recv())
            .await
            .unwrap()
            .unwrap();
        call.succeed(vec![Artifact::new("https://img/cat.png")]);

        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            f.gallery.wait_for(1).await;
            f.usage.wait_for(1).await;
        })
        .await
        .unwrap();

        let gallery = f.handler.gallery(GalleryListRequest::default()).await.unwrap();
        assert_eq!(gallery.entries.len(), 1);
        assert_eq!(gallery.entries[0].prompt, "cat");

        let usage = f.handler.usage(UsageRequest::default()).await.unwrap();
        assert_eq!(usage.feature, "image_generation");
        assert_eq!(usage.total, 1);

        let other = f
            .handler
            .usage(UsageRequest {
                feature: Some("video_generation".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(other.total, 0);
    }
}
