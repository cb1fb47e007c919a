/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Always succeeds, echoing numbered lines as translated
 * - `MockProvider::intermittent(n)` - Fails every nth request
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::scripted(f)` - Responds through a closure
 */

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{Completion, CompletionRequest, Provider};

static NUMBERED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)\.\s(.*)$").expect("numbered line regex is valid")
});

/// Closure answering a request in place of a real service
pub type ResponseScript = Arc<dyn Fn(&CompletionRequest) -> Result<String, ProviderError> + Send + Sync>;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns empty response
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Custom response generator (optional)
    custom_response: Option<ResponseScript>,
    /// Body returned for requests without numbered lines (research)
    research_json: String,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
            research_json: "{}".to_string(),
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that answers after a delay
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Create a working mock whose answers come from a closure
    pub fn scripted<F>(script: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String, ProviderError> + Send + Sync + 'static,
    {
        Self::working().with_custom_response(script)
    }

    /// Set a custom response generator
    pub fn with_custom_response<F>(mut self, generator: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String, ProviderError> + Send + Sync + 'static,
    {
        self.custom_response = Some(Arc::new(generator));
        self
    }

    /// Set the JSON body returned for research requests
    pub fn with_research_json(mut self, json: impl Into<String>) -> Self {
        self.research_json = json.into();
        self
    }

    /// Number of requests received so far, across clones
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// `N. text` lines of a prompt, in order
    pub fn numbered_lines(prompt: &str) -> Vec<(usize, String)> {
        prompt
            .lines()
            .filter_map(|line| {
                let caps = NUMBERED_LINE.captures(line.trim())?;
                let number = caps[1].parse().ok()?;
                Some((number, caps[2].to_string()))
            })
            .collect()
    }

    /// Generate a properly numbered batch response
    pub fn generate_batch_response(prompt: &str) -> String {
        Self::numbered_lines(prompt)
            .into_iter()
            .map(|(n, text)| format!("{}. [TRANSLATED] {}", n, text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn default_response(&self, request: &CompletionRequest) -> String {
        if Self::numbered_lines(&request.user).is_empty() {
            self.research_json.clone()
        } else {
            Self::generate_batch_response(&request.user)
        }
    }

    fn respond(&self, request: &CompletionRequest) -> Result<Completion, ProviderError> {
        let text = match &self.custom_response {
            Some(generator) => generator(request)?,
            None => self.default_response(request),
        };

        Ok(Completion {
            prompt_tokens: Some(request.user.len() as u64 / 4),
            completion_tokens: Some(text.len() as u64 / 4),
            text,
        })
    }
}

impl fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockProvider")
            .field("behavior", &self.behavior)
            .field("request_count", &self.request_count())
            .field("custom_response", &self.custom_response.is_some())
            .finish()
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            custom_response: self.custom_response.clone(),
            research_json: self.research_json.clone(),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            MockBehavior::Working => self.respond(&request),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    self.respond(&request)
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Empty => Ok(Completion::default()),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                self.respond(&request)
            }
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
