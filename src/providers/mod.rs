/*!
 * Provider implementations for the completion services.
 *
 * This module contains client implementations for the hosted LLM providers:
 * - Anthropic: Messages API integration
 * - OpenAI: Chat Completions API integration
 * - Mock: scripted provider for tests and benchmarks
 */

use async_trait::async_trait;
use log::{error, warn};
use reqwest::StatusCode;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use crate::errors::ProviderError;

/// How much hidden reasoning a request may spend before answering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReasoningEffort {
    /// Provider default
    #[default]
    Default,
    /// Minimal reasoning, used for research and batch translation
    Low,
}

/// Provider-neutral completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// System prompt
    pub system: Option<String>,
    /// Single user message
    pub user: String,
    /// Completion token limit
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Reasoning effort hint
    pub reasoning_effort: ReasoningEffort,
}

impl CompletionRequest {
    /// Create a new request for a model with a user message
    pub fn new(model: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            user: user.into(),
            max_tokens: 4096,
            temperature: None,
            reasoning_effort: ReasoningEffort::Default,
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the completion token limit
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the reasoning effort
    pub fn reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = effort;
        self
    }
}

/// Text returned by a provider with its token accounting
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub text: String,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
}

/// Common trait for all LLM providers
///
/// Object safe so the pipeline can hold any provider behind `Arc<dyn Provider>`.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a request using this provider
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError>;

    /// Short provider name used in logs
    fn name(&self) -> &str;
}

/// Retry settings shared by the HTTP providers
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    pub backoff_base_ms: u64,
    /// Requests per minute, spaces out retries when set
    pub rate_limit: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base_ms: 1000,
            rate_limit: None,
        }
    }
}

impl RetryPolicy {
    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the retries are exhausted.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                if let Some(rate_limit) = self.rate_limit.filter(|r| *r > 0) {
                    let delay_ms = 60_000 / rate_limit as u64; // requests per minute to ms
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }

            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!("{} request failed: {} - attempt {}/{}", label, e, attempt, self.max_retries + 1);
                    let backoff_ms = self.backoff_base_ms * (1u64 << (attempt - 1));
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Err(e) => {
                    error!("{} request failed: {}", label, e);
                    return Err(e);
                }
            }
        }
    }
}

/// Map an unsuccessful HTTP status and body to a provider error
pub(crate) fn error_for_status(status: StatusCode, body: String) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationError(body),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded(body),
        _ => ProviderError::ApiError {
            status_code: status.as_u16(),
            message: body,
        },
    }
}

/// Map a transport failure to a provider error
pub(crate) fn error_for_transport(e: reqwest::Error, timeout_ms: u64) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(timeout_ms)
    } else if e.is_connect() {
        ProviderError::ConnectionError(e.to_string())
    } else {
        ProviderError::RequestFailed(e.to_string())
    }
}

pub mod anthropic;
pub mod mock;
pub mod openai;
