//! Mock AI Provider for testing.
//!
//! Provides a scripted implementation of the AIProvider port so the
//! conversation flow can be exercised without calling a real model.
//!
//! # Features
//!
//! - Queued responses, consumed in order
//! - Responses routed by request purpose (`tool_call`, `greeting`, ...)
//! - Error injection for resilience testing
//! - Call tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let provider = MockAIProvider::new()
//!     .with_purpose_response("tool_call", r#"<tool_call>{"name": "check_otp_valid", "arguments": {"value": "123456"}}</tool_call>"#)
//!     .with_response("Please share your email.");
//! ```

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, ProviderInfo,
    TokenUsage,
};

const DEFAULT_CONTENT: &str = "Mock response";

/// Mock AI provider for testing.
#[derive(Debug, Clone)]
pub struct MockAIProvider {
    /// Responses consumed in order when no purpose route matches.
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    /// Responses keyed by `RequestMetadata::purpose`, consumed in order.
    routed: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
    info: ProviderInfo,
    delay: Duration,
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

/// A configured mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Success { content: String },
    Error(MockError),
}

/// Mock error types for testing error handling.
#[derive(Debug, Clone)]
pub enum MockError {
    RateLimited { retry_after_secs: u32 },
    Unavailable { message: String },
    AuthenticationFailed,
    Network { message: String },
    Timeout { timeout_secs: u32 },
}

impl From<MockError> for AIError {
    fn from(err: MockError) -> Self {
        match err {
            MockError::RateLimited { retry_after_secs } => AIError::rate_limited(retry_after_secs),
            MockError::Unavailable { message } => AIError::unavailable(message),
            MockError::AuthenticationFailed => AIError::AuthenticationFailed,
            MockError::Network { message } => AIError::network(message),
            MockError::Timeout { timeout_secs } => AIError::Timeout { timeout_secs },
        }
    }
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for MockAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAIProvider {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            routed: Arc::new(Mutex::new(HashMap::new())),
            info: ProviderInfo::new("mock", "mock-model-1"),
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Adds a successful response to the queue.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        locked(&self.responses).push_back(MockResponse::Success {
            content: content.into(),
        });
        self
    }

    /// Adds an error response to the queue.
    pub fn with_error(self, error: MockError) -> Self {
        locked(&self.responses).push_back(MockResponse::Error(error));
        self
    }

    /// Adds a response returned only for requests with the given purpose.
    pub fn with_purpose_response(self, purpose: &str, content: impl Into<String>) -> Self {
        self.push_routed(
            purpose,
            MockResponse::Success {
                content: content.into(),
            },
        );
        self
    }

    /// Adds an error returned only for requests with the given purpose.
    pub fn with_purpose_error(self, purpose: &str, error: MockError) -> Self {
        self.push_routed(purpose, MockResponse::Error(error));
        self
    }

    /// Queues a response on an already shared provider.
    pub fn push_response(&self, content: impl Into<String>) {
        locked(&self.responses).push_back(MockResponse::Success {
            content: content.into(),
        });
    }

    /// Queues a purpose-routed response on an already shared provider.
    pub fn push_purpose_response(&self, purpose: &str, content: impl Into<String>) {
        self.push_routed(
            purpose,
            MockResponse::Success {
                content: content.into(),
            },
        );
    }

    fn push_routed(&self, purpose: &str, response: MockResponse) {
        locked(&self.routed)
            .entry(purpose.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        locked(&self.calls).len()
    }

    /// Returns all recorded calls.
    pub fn get_calls(&self) -> Vec<CompletionRequest> {
        locked(&self.calls).clone()
    }

    /// Number of recorded calls with the given purpose.
    pub fn calls_for(&self, purpose: &str) -> usize {
        locked(&self.calls)
            .iter()
            .filter(|c| c.metadata.purpose == purpose)
            .count()
    }

    pub fn clear_calls(&self) {
        locked(&self.calls).clear();
    }

    fn next_response(&self, purpose: &str) -> MockResponse {
        if let Some(response) = locked(&self.routed)
            .get_mut(purpose)
            .and_then(VecDeque::pop_front)
        {
            return response;
        }
        locked(&self.responses)
            .pop_front()
            .unwrap_or_else(|| MockResponse::Success {
                content: DEFAULT_CONTENT.to_string(),
            })
    }
}

#[async_trait]
impl AIProvider for MockAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        let purpose = request.metadata.purpose.clone();
        locked(&self.calls).push(request);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        match self.next_response(&purpose) {
            MockResponse::Success { content } => Ok(CompletionResponse {
                usage: TokenUsage::new(10, (content.len() / 4).max(1) as u32),
                content,
                model: self.info.model.clone(),
                finish_reason: FinishReason::Stop,
            }),
            MockResponse::Error(err) => Err(err.into()),
        }
    }

    fn provider_info(&self) -> ProviderInfo {
        self.info.clone()
    }
}
