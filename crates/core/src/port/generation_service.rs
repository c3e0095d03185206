// Generation Service Port
// Abstraction over the generative image backend

use crate::domain::{Artifact, GenerationParams};
use async_trait::async_trait;
use thiserror::Error;

/// Generation errors
///
/// Every variant is a per-item, non-fatal failure; the message ends up as the
/// queue's last error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Generation request failed: {0}")]
    Request(String),

    #[error("Prompt rejected: {0}")]
    Rejected(String),

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Generation aborted: {0}")]
    Aborted(String),
}

/// Generation Service trait
///
/// Implementations:
/// - ImageApiClient (studio-infra-http): OpenAI-compatible image endpoint
/// - mocks::MockGenerationService / mocks::ManualGenerationService: tests
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Generate artifacts for a prompt
    ///
    /// An empty list is a valid response; the queue treats it as a failed item.
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<Vec<Artifact>, GenerationError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::{mpsc, oneshot};

    /// Mock generation behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Return one artifact derived from the prompt
        Success,
        /// Return exactly these artifacts
        Artifacts(Vec<Artifact>),
        /// Fail with message
        Fail(String),
    }

    /// Generation service with scripted outcomes, consumed in call order
    pub struct MockGenerationService {
        default: MockBehavior,
        scripted: Mutex<VecDeque<MockBehavior>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockGenerationService {
        pub fn new(default: MockBehavior) -> Self {
            Self {
                default,
                scripted: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }

        pub fn new_fail(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Fail(message.into()))
        }

        /// Queue a behavior for the next unscripted call
        pub fn push(&self, behavior: MockBehavior) -> &Self {
            self.scripted.lock().unwrap().push_back(behavior);
            self
        }

        /// Prompts received, in call order
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    /// Artifact the mock returns for a prompt under `MockBehavior::Success`
    pub fn artifact_for(prompt: &str) -> Artifact {
        Artifact::new(format!("mock://{}.png", prompt)).with_mime_type("image/png")
    }

    #[async_trait]
    impl GenerationService for MockGenerationService {
        async fn generate(
            &self,
            prompt: &str,
            _params: &GenerationParams,
        ) -> Result<Vec<Artifact>, GenerationError> {
            self.calls.lock().unwrap().push(prompt.to_string());

            let behavior = self
                .scripted
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.default.clone());

            match behavior {
                MockBehavior::Success => Ok(vec![artifact_for(prompt)]),
                MockBehavior::Artifacts(artifacts) => Ok(artifacts),
                MockBehavior::Fail(msg) => Err(GenerationError::Request(msg)),
            }
        }
    }

    /// A generation call waiting for the test to answer it
    pub struct PendingGeneration {
        pub prompt: String,
        pub params: GenerationParams,
        reply: oneshot::Sender<Result<Vec<Artifact>, GenerationError>>,
    }

    impl PendingGeneration {
        pub fn respond(self, result: Result<Vec<Artifact>, GenerationError>) {
            // Receiver is gone when the processor timed the call out
            let _ = self.reply.send(result);
        }

        pub fn succeed(self, artifacts: Vec<Artifact>) {
            self.respond(Ok(artifacts));
        }

        pub fn fail(self, error: GenerationError) {
            self.respond(Err(error));
        }
    }

    /// Generation service whose calls are settled by hand
    ///
    /// Each `generate` call is forwarded to the receiver returned by `new`.
    /// Holding a `PendingGeneration` without answering models a hung call.
    pub struct ManualGenerationService {
        tx: mpsc::UnboundedSender<PendingGeneration>,
    }

    impl ManualGenerationService {
        pub fn new() -> (Self, mpsc::UnboundedReceiver<PendingGeneration>) {
            let (tx, rx) = mpsc::unbounded_channel();
            (Self { tx }, rx)
        }
    }

    #[async_trait]
    impl GenerationService for ManualGenerationService {
        async fn generate(
            &self,
            prompt: &str,
            params: &GenerationParams,
        ) -> Result<Vec<Artifact>, GenerationError> {
            let (reply, rx) = oneshot::channel();
            self.tx
                .send(PendingGeneration {
                    prompt: prompt.to_string(),
                    params: params.clone(),
                    reply,
                })
                .map_err(|_| GenerationError::Aborted("test harness closed".to_string()))?;

            rx.await
                .unwrap_or_else(|_| Err(GenerationError::Aborted("reply dropped".to_string())))
        }
    }
}
