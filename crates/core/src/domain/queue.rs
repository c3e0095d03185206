// Generation Queue Domain Model
//
// Pure, synchronous state machine. The application layer owns one instance
// behind a single lock and drives the asynchronous generation calls.

use crate::domain::error::{DomainError, Result};
use crate::domain::item::{
    Artifact, GenerationParams, ItemId, ItemStatus, QueueItem, EMPTY_RESULT_MESSAGE,
};
use serde::{Deserialize, Serialize};

/// Maximum number of items (any status) a queue holds by default
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 20;

/// Queue configuration
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub max_size: usize,
}

impl QueueConfig {
    pub fn new(max_size: usize) -> Self {
        Self { max_size }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_QUEUE_SIZE)
    }
}

/// Work handed to the generation service when an item starts
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub item_id: ItemId,
    pub prompt: String,
    pub params: GenerationParams,
}

/// Outcome reported for a generating item
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// Service resolved (possibly with zero artifacts)
    Artifacts(Vec<Artifact>),
    /// Service failed with a message
    Failed(String),
}

/// What settling an item actually did
#[derive(Debug, Clone, PartialEq)]
pub enum SettleOutcome {
    Completed(CompletedResult),
    EmptyResult,
    Failed { message: String },
    /// Item was no longer generating (cancelled, or cancelled then removed)
    Discarded,
}

/// Most recently completed result, surfaced for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedResult {
    pub item_id: ItemId,
    pub prompt: String,
    pub artifact: Artifact,
    pub completed_at: i64,
}

/// Point-in-time view of the queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub items: Vec<QueueItem>,
    pub active_id: Option<ItemId>,
    pub current_result: Option<CompletedResult>,
    pub last_error: Option<String>,
    pub capacity: usize,
}

impl QueueSnapshot {
    pub fn get(&self, id: &str) -> Option<&QueueItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn status_of(&self, id: &str) -> Option<ItemStatus> {
        self.get(id).map(|item| item.status)
    }

    pub fn count_by_status(&self, status: ItemStatus) -> usize {
        self.items.iter().filter(|item| item.status == status).count()
    }
}

/// Ordered, bounded collection of queue items with a single generating slot
#[derive(Debug, Clone)]
pub struct GenerationQueue {
    config: QueueConfig,
    items: Vec<QueueItem>,
    active_id: Option<ItemId>,
    current_result: Option<CompletedResult>,
    last_error: Option<String>,
}

impl GenerationQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            items: Vec::new(),
            active_id: None,
            current_result: None,
            last_error: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.config.max_size
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Terminal items count towards the bound until removed
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.config.max_size
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&QueueItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn current_result(&self) -> Option<&CompletedResult> {
        self.current_result.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Append a queued item
    ///
    /// Fails with `QueueFull` (leaving the queue untouched) when at capacity.
    /// A successful submission clears the last error.
    pub fn submit(&mut self, item: QueueItem) -> Result<ItemId> {
        if self.is_full() {
            return Err(DomainError::QueueFull {
                capacity: self.config.max_size,
            });
        }
        if item.status != ItemStatus::Queued {
            return Err(DomainError::ValidationError(format!(
                "Submitted item must be QUEUED, got {}",
                item.status
            )));
        }
        if self.get(&item.id).is_some() {
            return Err(DomainError::ValidationError(format!(
                "Duplicate item id: {}",
                item.id
            )));
        }

        let id = item.id.clone();
        self.items.push(item);
        self.last_error = None;
        Ok(id)
    }

    /// Scheduling rule
    ///
    /// When the slot is free, start the earliest-submitted QUEUED item and
    /// return what must be sent to the generation service. Otherwise no-op.
    pub fn next_dispatch(&mut self, now_millis: i64) -> Option<Dispatch> {
        if self.active_id.is_some() {
            return None;
        }

        let item = self
            .items
            .iter_mut()
            .find(|item| item.status == ItemStatus::Queued)?;
        item.start(now_millis).ok()?;
        self.active_id = Some(item.id.clone());

        Some(Dispatch {
            item_id: item.id.clone(),
            prompt: item.prompt.clone(),
            params: item.params.clone(),
        })
    }

    /// Apply a generation outcome, unless the item stopped generating meanwhile
    pub fn settle(&mut self, id: &str, settlement: Settlement, now_millis: i64) -> SettleOutcome {
        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            return SettleOutcome::Discarded;
        };
        // Fencing check: a cancelled item can never complete after the fact
        if item.status != ItemStatus::Generating {
            return SettleOutcome::Discarded;
        }
        if self.active_id.as_deref() == Some(id) {
            self.active_id = None;
        }

        let outcome = match settlement {
            Settlement::Artifacts(artifacts) => match artifacts.into_iter().next() {
                Some(artifact) => item.complete(artifact.clone(), now_millis).map(|_| {
                    SettleOutcome::Completed(CompletedResult {
                        item_id: item.id.clone(),
                        prompt: item.prompt.clone(),
                        artifact,
                        completed_at: now_millis,
                    })
                }),
                None => item
                    .fail(EMPTY_RESULT_MESSAGE, now_millis)
                    .map(|_| SettleOutcome::EmptyResult),
            },
            Settlement::Failed(message) => item
                .fail(message.clone(), now_millis)
                .map(|_| SettleOutcome::Failed { message }),
        };

        match outcome {
            Ok(SettleOutcome::Completed(result)) => {
                // Last-done-wins: whatever settles last owns the display slot
                self.current_result = Some(result.clone());
                SettleOutcome::Completed(result)
            }
            Ok(SettleOutcome::Failed { message }) => {
                self.last_error = Some(message.clone());
                SettleOutcome::Failed { message }
            }
            Ok(other) => other,
            Err(_) => SettleOutcome::Discarded,
        }
    }

    /// Cancel a generating item and free the slot
    ///
    /// Returns `Ok(false)` (no-op) when the item is not generating.
    pub fn cancel(&mut self, id: &str, now_millis: i64) -> Result<bool> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| DomainError::ItemNotFound(id.to_string()))?;

        if item.status != ItemStatus::Generating {
            return Ok(false);
        }
        item.cancel(now_millis)?;
        if self.active_id.as_deref() == Some(id) {
            self.active_id = None;
        }
        Ok(true)
    }

    /// Delete a non-generating item
    ///
    /// Returns `Ok(false)` (no-op) when the item is generating.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| DomainError::ItemNotFound(id.to_string()))?;

        if self.items[index].status == ItemStatus::Generating {
            return Ok(false);
        }
        self.items.remove(index);
        Ok(true)
    }

    /// Delete every item except the generating one; returns how many were removed
    pub fn clear(&mut self) -> usize {
        let before = self.items.len();
        self.items
            .retain(|item| item.status == ItemStatus::Generating);
        before - self.items.len()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            items: self.items.clone(),
            active_id: self.active_id.clone(),
            current_result: self.current_result.clone(),
            last_error: self.last_error.clone(),
            capacity: self.config.max_size,
        }
    }
}

impl Default for GenerationQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}
