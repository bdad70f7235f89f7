/*!
 * Mock translator for testing.
 *
 * This module provides a scripted translator that never touches the network:
 * - `MockProvider::working()` - Always succeeds with `[<language>] <text>`
 * - `MockProvider::failing(error)` - Always fails with the given error
 * - `MockProvider::fail_first(n, error)` - Fails the first `n` calls, then works
 * - `MockProvider::fail_on(text, error)` - Fails every call for one segment text
 * - `MockProvider::intermittent(n)` - Fails every `n`th call with a 503
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::translation::core::Translator;
use crate::translation::job::{TokenUsage, Translation, TranslationRequest};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Always fails with this error
    Failing(ProviderError),
    /// Fails the first `failures` calls, succeeds afterwards
    FailFirst { failures: usize, error: ProviderError },
    /// Fails whenever the segment text equals `text`
    FailOnText { text: String, error: ProviderError },
    /// Fails every `fail_every`th call
    Intermittent { fail_every: usize },
}

/// Mock translator for testing retry and pipeline behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Call counter, shared between clones
    call_count: Arc<AtomicUsize>,
    /// Every request received, in call order
    requests: Arc<Mutex<Vec<TranslationRequest>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&TranslationRequest) -> String>,
    /// Simulated latency per request (optional)
    delay: Option<fn(&TranslationRequest) -> Duration>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            call_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
            delay: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(MockBehavior::Failing(error))
    }

    pub fn fail_first(failures: usize, error: ProviderError) -> Self {
        Self::new(MockBehavior::FailFirst { failures, error })
    }

    pub fn fail_on(text: impl Into<String>, error: ProviderError) -> Self {
        Self::new(MockBehavior::FailOnText {
            text: text.into(),
            error,
        })
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&TranslationRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Delay every response by the returned duration
    pub fn with_delay(mut self, delay: fn(&TranslationRequest) -> Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of calls made so far, across clones
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Snapshot of the requests received so far
    pub fn requests(&self) -> Vec<TranslationRequest> {
        self.requests.lock().clone()
    }

    /// Segment texts received so far, in call order
    pub fn texts(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.text.clone()).collect()
    }

    fn respond(&self, request: &TranslationRequest) -> Translation {
        let text = match self.custom_response {
            Some(generator) => generator(request),
            None => format!("[{}] {}", request.output_language, request.text),
        };
        let usage = TokenUsage::new(request.text.len() as u64, (request.text.len() / 2) as u64);
        Translation::new(text, usage)
    }
}

#[async_trait]
impl Translator for MockProvider {
    async fn translate(&self, request: &TranslationRequest) -> Result<Translation, ProviderError> {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay(request)).await;
        }

        match &self.behavior {
            MockBehavior::Working => Ok(self.respond(request)),
            MockBehavior::Failing(error) => Err(error.clone()),
            MockBehavior::FailFirst { failures, error } => {
                if count < *failures {
                    Err(error.clone())
                } else {
                    Ok(self.respond(request))
                }
            }
            MockBehavior::FailOnText { text, error } => {
                if request.text == *text {
                    Err(error.clone())
                } else {
                    Ok(self.respond(request))
                }
            }
            MockBehavior::Intermittent { fail_every } => {
                if *fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.respond(request))
                }
            }
        }
    }
}
