// Queue Processor - single-worker driver for the generation queue

pub mod constants;

use constants::*;

use crate::domain::{
    Artifact, CompletedResult, Dispatch, DomainError, GenerationParams, GenerationQueue, ItemId,
    QueueConfig, QueueItem, QueueSnapshot, SettleOutcome, Settlement, DEFAULT_MAX_QUEUE_SIZE,
};
use crate::error::Result;
use crate::port::{
    GalleryEntry, GallerySink, GenerationError, GenerationService, IdProvider, TimeProvider,
    UsageRecorder,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Processor configuration
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Maximum number of items held, terminal ones included
    pub max_queue_size: usize,
    /// Feature name passed to the usage recorder
    pub usage_feature: String,
    /// Cancel an item whose generation has not settled within this duration
    pub generation_timeout: Option<Duration>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            usage_feature: DEFAULT_USAGE_FEATURE.to_string(),
            generation_timeout: None,
        }
    }
}

struct Inner {
    config: ProcessorConfig,
    // Single owner of all queue state; never held across an await
    state: Mutex<GenerationQueue>,
    updates: watch::Sender<QueueSnapshot>,
    generation: Arc<dyn GenerationService>,
    gallery: Arc<dyn GallerySink>,
    usage: Arc<dyn UsageRecorder>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

/// Serializes generation calls so only one item is generating at a time
///
/// All operations except `settle` are synchronous mutations. Starting an item
/// spawns its generation call on the current tokio runtime, so the processor
/// must be used from within one.
#[derive(Clone)]
pub struct QueueProcessor {
    inner: Arc<Inner>,
}

impl QueueProcessor {
    pub fn new(
        config: ProcessorConfig,
        generation: Arc<dyn GenerationService>,
        gallery: Arc<dyn GallerySink>,
        usage: Arc<dyn UsageRecorder>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        let queue = GenerationQueue::new(QueueConfig::new(config.max_queue_size));
        let (updates, _) = watch::channel(queue.snapshot());

        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(queue),
                updates,
                generation,
                gallery,
                usage,
                id_provider,
                time_provider,
            }),
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.inner.config
    }

    fn lock(&self) -> MutexGuard<'_, GenerationQueue> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn now(&self) -> i64 {
        self.inner.time_provider.now_millis()
    }

    fn publish(&self, queue: &GenerationQueue) {
        self.inner.updates.send_replace(queue.snapshot());
    }

    /// Current state of the queue
    pub fn snapshot(&self) -> QueueSnapshot {
        self.lock().snapshot()
    }

    /// Receive a fresh snapshot after every state change
    pub fn subscribe(&self) -> watch::Receiver<QueueSnapshot> {
        self.inner.updates.subscribe()
    }

    /// Append a new item and kick the scheduler
    ///
    /// At capacity this is a no-op returning `QueueFull`: nothing is added and
    /// no ID is allocated. Prompt validation belongs to the caller.
    pub fn submit(&self, prompt: impl Into<String>, params: GenerationParams) -> Result<ItemId> {
        let id = {
            let mut queue = self.lock();
            if queue.is_full() {
                warn!(capacity = queue.capacity(), "Queue full, submission rejected");
                return Err(DomainError::QueueFull {
                    capacity: queue.capacity(),
                }
                .into());
            }

            let item = QueueItem::new(
                self.inner.id_provider.generate_id(),
                self.now(),
                prompt,
                params,
            );
            let id = queue.submit(item)?;
            self.publish(&queue);
            id
        };

        info!(item_id = %id, "Item queued");
        self.schedule();
        Ok(id)
    }

    /// Scheduling rule: start the oldest queued item if nothing is generating
    ///
    /// Safe to call any number of times.
    pub fn schedule(&self) {
        let dispatch = {
            let mut queue = self.lock();
            let dispatch = queue.next_dispatch(self.now());
            if dispatch.is_some() {
                self.publish(&queue);
            }
            dispatch
        };

        if let Some(dispatch) = dispatch {
            info!(item_id = %dispatch.item_id, "Starting generation");
            let processor = self.clone();
            tokio::spawn(async move {
                processor.run_generation(dispatch).await;
            });
        }
    }

    async fn run_generation(self, dispatch: Dispatch) {
        let Dispatch {
            item_id,
            prompt,
            params,
        } = dispatch;

        let call = self.inner.generation.generate(&prompt, &params);
        let result = match self.inner.config.generation_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        item_id = %item_id,
                        timeout_ms = limit.as_millis() as u64,
                        "Generation timed out, cancelling item"
                    );
                    if let Err(e) = self.cancel(&item_id) {
                        debug!(item_id = %item_id, error = %e, "Timed-out item already gone");
                    }
                    return;
                }
            },
            None => call.await,
        };

        self.settle(&item_id, result).await;
    }

    /// Apply a generation outcome for `id`
    ///
    /// Driven by the processor's own generation task. The outcome is dropped
    /// when the item is no longer generating. Gallery and usage side effects
    /// run after the next item has been scheduled and never roll back DONE.
    pub async fn settle(
        &self,
        id: &str,
        result: std::result::Result<Vec<Artifact>, GenerationError>,
    ) -> SettleOutcome {
        let settlement = match result {
            Ok(artifacts) => Settlement::Artifacts(artifacts),
            Err(e) => Settlement::Failed(e.to_string()),
        };

        let outcome = {
            let mut queue = self.lock();
            let outcome = queue.settle(id, settlement, self.now());
            if outcome != SettleOutcome::Discarded {
                self.publish(&queue);
            }
            outcome
        };

        match &outcome {
            SettleOutcome::Completed(result) => {
                info!(item_id = %id, uri = %result.artifact.uri, "Generation completed");
            }
            SettleOutcome::EmptyResult => {
                warn!(item_id = %id, "Generation returned no artifacts");
            }
            SettleOutcome::Failed { message } => {
                warn!(item_id = %id, error = %message, "Generation failed");
            }
            SettleOutcome::Discarded => {
                debug!(item_id = %id, "Dropping outcome for item that is no longer generating");
            }
        }

        self.schedule();

        if let SettleOutcome::Completed(result) = &outcome {
            self.record_completion(result).await;
        }
        outcome
    }

    async fn record_completion(&self, result: &CompletedResult) {
        let entry = GalleryEntry {
            item_id: result.item_id.clone(),
            prompt: result.prompt.clone(),
            artifact: result.artifact.clone(),
            created_at: result.completed_at,
        };
        if let Err(e) = self.inner.gallery.record(&entry).await {
            warn!(item_id = %result.item_id, error = %e, "Failed to record gallery entry");
        }

        let feature = &self.inner.config.usage_feature;
        if let Err(e) = self.inner.usage.increment(feature, USAGE_INCREMENT).await {
            warn!(item_id = %result.item_id, feature = %feature, error = %e, "Failed to record usage");
        }
    }

    /// Cancel the generating item `id` and free the slot immediately
    ///
    /// Returns `Ok(false)` when the item exists but is not generating.
    pub fn cancel(&self, id: &str) -> Result<bool> {
        let cancelled = {
            let mut queue = self.lock();
            let cancelled = queue.cancel(id, self.now())?;
            if cancelled {
                self.publish(&queue);
            }
            cancelled
        };

        if cancelled {
            info!(item_id = %id, "Item cancelled");
            self.schedule();
        } else {
            debug!(item_id = %id, "Cancel ignored: item is not generating");
        }
        Ok(cancelled)
    }

    /// Remove a non-generating item
    ///
    /// Returns `Ok(false)` when the item is generating (cancel it first).
    pub fn remove(&self, id: &str) -> Result<bool> {
        let removed = {
            let mut queue = self.lock();
            let removed = queue.remove(id)?;
            if removed {
                self.publish(&queue);
            }
            removed
        };

        if removed {
            info!(item_id = %id, "Item removed");
            self.schedule();
        } else {
            debug!(item_id = %id, "Remove refused: item is generating");
        }
        Ok(removed)
    }

    /// Remove everything except the generating item; returns how many were removed
    pub fn clear(&self) -> usize {
        let removed = {
            let mut queue = self.lock();
            let removed = queue.clear();
            self.publish(&queue);
            removed
        };

        info!(removed, "Queue cleared");
        self.schedule();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ItemStatus;
    use crate::port::gallery_sink::mocks::RecordingGallery;
    use crate::port::generation_service::mocks::{
        artifact_for, ManualGenerationService, MockGenerationService,
    };
    use crate::port::id_provider::SequentialIdProvider;
    use crate::port::time_provider::SystemTimeProvider;
    use crate::port::usage_recorder::mocks::RecordingUsage;

    const WAIT: Duration = Duration::from_secs(5);

    struct Harness {
        processor: QueueProcessor,
        gallery: Arc<RecordingGallery>,
        usage: Arc<RecordingUsage>,
    }

    fn harness(config: ProcessorConfig, generation: Arc<dyn GenerationService>) -> Harness {
        let gallery = Arc::new(RecordingGallery::new());
        let usage = Arc::new(RecordingUsage::new());
        let processor = QueueProcessor::new(
            config,
            generation,
            gallery.clone(),
            usage.clone(),
            Arc::new(SequentialIdProvider::new()),
            Arc::new(SystemTimeProvider),
        );
        Harness {
            processor,
            gallery,
            usage,
        }
    }

    async fn wait_until(
        processor: &QueueProcessor,
        pred: impl FnMut(&QueueSnapshot) -> bool,
    ) -> QueueSnapshot {
        let mut rx = processor.subscribe();
        let snapshot = tokio::time::timeout(WAIT, rx.wait_for(pred))
            .await
            .expect("timed out waiting for queue state")
            .expect("processor dropped")
            .clone();
        snapshot
    }

    #[tokio::test]
    async fn test_submit_starts_generation_immediately() {
        let (service, mut calls) = ManualGenerationService::new();
        let h = harness(ProcessorConfig::default(), Arc::new(service));

        let id = h.processor.submit("cat", GenerationParams::default()).unwrap();
        let call = tokio::time::timeout(WAIT, calls.recv()).await.unwrap().unwrap();
        assert_eq!(call.prompt, "cat");
        assert_eq!(
            h.processor.snapshot().status_of(&id),
            Some(ItemStatus::Generating)
        );

        call.succeed(vec![artifact_for("cat")]);
        let snapshot = wait_until(&h.processor, |s| s.status_of(&id) == Some(ItemStatus::Done)).await;
        assert_eq!(snapshot.current_result.unwrap().item_id, id);
        assert!(snapshot.active_id.is_none());

        h.gallery.wait_for(1).await;
        h.usage.wait_for(1).await;
        assert_eq!(
            h.usage.increments(),
            vec![(DEFAULT_USAGE_FEATURE.to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn test_cancel_frees_slot_for_next_item() {
        let (service, mut calls) = ManualGenerationService::new();
        let h = harness(ProcessorConfig::default(), Arc::new(service));

        let first = h.processor.submit("first", GenerationParams::default()).unwrap();
        let second = h.processor.submit("second", GenerationParams::default()).unwrap();
        let first_call = calls.recv().await.unwrap();

        assert!(h.processor.cancel(&first).unwrap());
        let second_call = tokio::time::timeout(WAIT, calls.recv()).await.unwrap().unwrap();
        assert_eq!(second_call.prompt, "second");

        let snapshot = h.processor.snapshot();
        assert_eq!(snapshot.status_of(&first), Some(ItemStatus::Cancelled));
        assert_eq!(snapshot.status_of(&second), Some(ItemStatus::Generating));

        // Late success for the cancelled item changes nothing
        first_call.succeed(vec![artifact_for("first")]);
        second_call.succeed(vec![artifact_for("second")]);
        wait_until(&h.processor, |s| s.status_of(&second) == Some(ItemStatus::Done)).await;
        h.gallery.wait_for(1).await;

        let snapshot = h.processor.snapshot();
        assert_eq!(snapshot.status_of(&first), Some(ItemStatus::Cancelled));
        assert!(snapshot.get(&first).unwrap().result.is_none());
        assert!(h
            .gallery
            .entries()
            .iter()
            .all(|entry| entry.item_id == second));
    }

    #[tokio::test]
    async fn test_direct_settle_after_cancel_is_discarded() {
        let (service, mut calls) = ManualGenerationService::new();
        let h = harness(ProcessorConfig::default(), Arc::new(service));

        let id = h.processor.submit("cat", GenerationParams::default()).unwrap();
        let _pending = calls.recv().await.unwrap();
        h.processor.cancel(&id).unwrap();

        let outcome = h
            .processor
            .settle(&id, Ok(vec![artifact_for("cat")]))
            .await;
        assert_eq!(outcome, SettleOutcome::Discarded);
        assert!(h.gallery.entries().is_empty());
        assert!(h.usage.increments().is_empty());
    }

    #[tokio::test]
    async fn test_generation_timeout_cancels_item() {
        let (service, mut calls) = ManualGenerationService::new();
        let config = ProcessorConfig {
            generation_timeout: Some(Duration::from_millis(50)),
            ..ProcessorConfig::default()
        };
        let h = harness(config, Arc::new(service));

        let slow = h.processor.submit("slow", GenerationParams::default()).unwrap();
        let next = h.processor.submit("next", GenerationParams::default()).unwrap();
        // Hold the first call without answering
        let _hung = calls.recv().await.unwrap();

        let next_call = tokio::time::timeout(WAIT, calls.recv()).await.unwrap().unwrap();
        assert_eq!(next_call.prompt, "next");
        assert_eq!(
            h.processor.snapshot().status_of(&slow),
            Some(ItemStatus::Cancelled)
        );

        next_call.succeed(vec![artifact_for("next")]);
        wait_until(&h.processor, |s| s.status_of(&next) == Some(ItemStatus::Done)).await;
    }

    #[tokio::test]
    async fn test_failed_usage_or_gallery_does_not_undo_done() {
        let gallery = Arc::new(RecordingGallery::failing());
        let usage = Arc::new(RecordingUsage::new());
        let processor = QueueProcessor::new(
            ProcessorConfig::default(),
            Arc::new(MockGenerationService::new_success()),
            gallery.clone(),
            usage.clone(),
            Arc::new(SequentialIdProvider::new()),
            Arc::new(SystemTimeProvider),
        );

        let id = processor.submit("cat", GenerationParams::default()).unwrap();
        wait_until(&processor, |s| s.status_of(&id) == Some(ItemStatus::Done)).await;
        gallery.wait_for(1).await;
        usage.wait_for(1).await;

        assert_eq!(
            processor.snapshot().status_of(&id),
            Some(ItemStatus::Done)
        );
    }

    #[tokio::test]
    async fn test_unknown_item_operations() {
        let h = harness(
            ProcessorConfig::default(),
            Arc::new(MockGenerationService::new_success()),
        );
        assert!(h.processor.cancel("nope").is_err());
        assert!(h.processor.remove("nope").is_err());
        assert_eq!(h.processor.clear(), 0);
    }
}
