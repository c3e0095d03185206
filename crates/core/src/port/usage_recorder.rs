// Usage Recorder Port (Interface)

use crate::error::Result;
use async_trait::async_trait;

/// Metered feature usage
#[async_trait]
pub trait UsageRecorder: Send + Sync {
    /// Record that `amount` units of `feature` were consumed
    async fn increment(&self, feature: &str, amount: i64) -> Result<()>;

    /// Total units consumed for `feature`
    async fn total(&self, feature: &str) -> Result<i64>;
}

pub mod mocks {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::watch;

    /// In-memory recorder keeping every increment call
    pub struct RecordingUsage {
        increments: Mutex<Vec<(String, i64)>>,
        count: watch::Sender<usize>,
    }

    impl RecordingUsage {
        pub fn new() -> Self {
            Self {
                increments: Mutex::new(Vec::new()),
                count: watch::Sender::new(0),
            }
        }

        pub fn increments(&self) -> Vec<(String, i64)> {
            self.increments.lock().unwrap().clone()
        }

        /// Wait until at least `n` increment calls have been made
        pub async fn wait_for(&self, n: usize) {
            let mut rx = self.count.subscribe();
            let _ = rx.wait_for(|count| *count >= n).await;
        }
    }

    impl Default for RecordingUsage {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl UsageRecorder for RecordingUsage {
        async fn increment(&self, feature: &str, amount: i64) -> Result<()> {
            let len = {
                let mut increments = self.increments.lock().unwrap();
                increments.push((feature.to_string(), amount));
                increments.len()
            };
            self.count.send_replace(len);
            Ok(())
        }

        async fn total(&self, feature: &str) -> Result<i64> {
            Ok(self
                .increments
                .lock()
                .unwrap()
                .iter()
                .filter(|(f, _)| f == feature)
                .map(|(_, amount)| amount)
                .sum())
        }
    }
}
