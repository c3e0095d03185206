// Gallery Sink Port (Interface)

use crate::domain::{Artifact, ItemId};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A completed artifact recorded for later display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryEntry {
    pub item_id: ItemId,
    pub prompt: String,
    pub artifact: Artifact,
    pub created_at: i64, // epoch ms
}

/// Gallery interface
#[async_trait]
pub trait GallerySink: Send + Sync {
    /// Record a completed artifact
    async fn record(&self, entry: &GalleryEntry) -> Result<()>;

    /// Most recent entries, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<GalleryEntry>>;
}

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::Mutex;
    use tokio::sync::watch;

    /// In-memory gallery that records every entry
    pub struct RecordingGallery {
        entries: Mutex<Vec<GalleryEntry>>,
        count: watch::Sender<usize>,
        fail: bool,
    }

    impl RecordingGallery {
        pub fn new() -> Self {
            Self {
                entries: Mutex::new(Vec::new()),
                count: watch::Sender::new(0),
                fail: false,
            }
        }

        /// Gallery whose writes always fail (entries are still counted)
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }

        pub fn entries(&self) -> Vec<GalleryEntry> {
            self.entries.lock().unwrap().clone()
        }

        /// Wait until at least `n` record calls have been made
        pub async fn wait_for(&self, n: usize) {
            let mut rx = self.count.subscribe();
            let _ = rx.wait_for(|count| *count >= n).await;
        }
    }

    impl Default for RecordingGallery {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl GallerySink for RecordingGallery {
        async fn record(&self, entry: &GalleryEntry) -> Result<()> {
            let len = {
                let mut entries = self.entries.lock().unwrap();
                entries.push(entry.clone());
                entries.len()
            };
            self.count.send_replace(len);

            if self.fail {
                return Err(AppError::Database("gallery unavailable".to_string()));
            }
            Ok(())
        }

        async fn recent(&self, limit: usize) -> Result<Vec<GalleryEntry>> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .iter()
                .rev()
                .take(limit)
                .cloned()
                .collect())
        }
    }
}
