/*!
 * Core translation service implementation.
 *
 * This module contains the TranslationService, which owns the configured
 * provider (if any), applies the per-call deadline and tracks token usage.
 */

use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::{TranslationConfig, TranslationProvider, TranslationTier};
use crate::errors::ProviderError;
use crate::providers::anthropic::Anthropic;
use crate::providers::openai::OpenAI;
use crate::providers::{Completion, CompletionRequest, Provider, RetryPolicy};

/// Token usage statistics for tracking API consumption
#[derive(Debug, Clone)]
pub struct TokenUsageStats {
    /// Number of prompt tokens
    pub prompt_tokens: u64,

    /// Number of completion tokens
    pub completion_tokens: u64,

    /// Total number of tokens
    pub total_tokens: u64,

    /// Number of completed requests
    pub requests: u64,

    /// Start time of token tracking
    pub start_time: Instant,

    /// Total time spent on API requests
    pub api_duration: Duration,

    /// Provider name
    pub provider: String,
}

impl Default for TokenUsageStats {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenUsageStats {
    /// Create a new empty token usage stats instance
    pub fn new() -> Self {
        Self::with_provider_info(String::new())
    }

    /// Create new token usage stats with provider info
    pub fn with_provider_info(provider: String) -> Self {
        Self {
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            requests: 0,
            start_time: Instant::now(),
            api_duration: Duration::from_secs(0),
            provider,
        }
    }

    /// Record one completed request
    pub fn add_token_usage(&mut self, prompt_tokens: Option<u64>, completion_tokens: Option<u64>, duration: Duration) {
        if let Some(pt) = prompt_tokens {
            self.prompt_tokens += pt;
            self.total_tokens += pt;
        }

        if let Some(ct) = completion_tokens {
            self.completion_tokens += ct;
            self.total_tokens += ct;
        }

        self.requests += 1;
        self.api_duration += duration;
    }

    /// Calculate tokens per minute rate
    pub fn tokens_per_minute(&self) -> f64 {
        // Use the API duration for rate calculation, with fallback to elapsed time
        let duration_minutes = if self.api_duration.as_secs_f64() > 0.0 {
            self.api_duration.as_secs_f64() / 60.0
        } else {
            self.start_time.elapsed().as_secs_f64() / 60.0
        };

        if duration_minutes > 0.0 {
            self.total_tokens as f64 / duration_minutes
        } else {
            0.0
        }
    }

    /// Generate a summary of token usage
    pub fn summary(&self) -> String {
        let elapsed_minutes = self.start_time.elapsed().as_secs_f64() / 60.0;
        let api_minutes = self.api_duration.as_secs_f64() / 60.0;

        format!(
            "Token Usage Summary:\n\
             Provider: {}\n\
             Requests: {}\n\
             Prompt tokens: {}\n\
             Completion tokens: {}\n\
             Total tokens: {}\n\
             Elapsed time: {:.2} minutes\n\
             API request time: {:.2} minutes\n\
             Tokens per minute: {:.2}",
            self.provider,
            self.requests,
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens,
            elapsed_minutes,
            api_minutes,
            self.tokens_per_minute()
        )
    }
}

/// Main translation service: an optional provider behind a per-call deadline
#[derive(Debug, Clone)]
pub struct TranslationService {
    /// Provider implementation; `None` when no API key is available
    provider: Option<Arc<dyn Provider>>,

    /// Configuration for the translation service
    pub config: TranslationConfig,

    /// Deadline applied to every provider call
    call_timeout: Duration,

    /// Token usage shared between clones
    usage: Arc<Mutex<TokenUsageStats>>,
}

impl TranslationService {
    /// Create a service from configuration.
    ///
    /// Without an API key the service has no provider and the pipeline runs
    /// in fallback mode.
    pub fn new(config: TranslationConfig, call_timeout: Duration) -> Self {
        let provider = Self::build_provider(&config);
        if provider.is_none() {
            warn!("No API key for {}, provider disabled", config.provider.display_name());
        }
        Self::assemble(config, provider, call_timeout)
    }

    /// Create a service around an existing provider
    pub fn with_provider(config: TranslationConfig, provider: Arc<dyn Provider>, call_timeout: Duration) -> Self {
        Self::assemble(config, Some(provider), call_timeout)
    }

    /// Create a service without any provider
    pub fn offline(config: TranslationConfig) -> Self {
        Self::assemble(config, None, Duration::from_secs(1))
    }

    fn assemble(config: TranslationConfig, provider: Option<Arc<dyn Provider>>, call_timeout: Duration) -> Self {
        let name = provider.as_ref().map(|p| p.name().to_string()).unwrap_or_default();
        Self {
            provider,
            config,
            call_timeout,
            usage: Arc::new(Mutex::new(TokenUsageStats::with_provider_info(name))),
        }
    }

    fn build_provider(config: &TranslationConfig) -> Option<Arc<dyn Provider>> {
        let api_key = config.get_api_key();
        if api_key.is_empty() {
            return None;
        }

        let retry = RetryPolicy {
            max_retries: config.common.retry_count,
            backoff_base_ms: config.common.retry_backoff_ms,
            rate_limit: config.get_rate_limit(),
        };
        let timeout_secs = config.get_timeout_secs();

        let provider: Arc<dyn Provider> = match config.provider {
            TranslationProvider::Anthropic => Arc::new(Anthropic::new_with_config(
                api_key,
                config.get_endpoint(),
                timeout_secs,
                retry,
            )),
            TranslationProvider::OpenAI => Arc::new(OpenAI::new_with_config(
                api_key,
                config.get_endpoint(),
                timeout_secs,
                retry,
            )),
        };
        Some(provider)
    }

    /// Whether provider calls are possible at all
    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Name of the active provider, empty when offline
    pub fn provider_name(&self) -> &str {
        self.provider.as_ref().map(|p| p.name()).unwrap_or("")
    }

    /// Model for a tier on the configured provider
    pub fn model(&self, tier: TranslationTier) -> String {
        self.config.get_model(tier)
    }

    /// Run one completion under the per-call deadline
    pub async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| ProviderError::AuthenticationError("no API key configured".to_string()))?;

        let start = Instant::now();
        let result = tokio::time::timeout(self.call_timeout, provider.complete(request)).await;
        let elapsed = start.elapsed();

        let completion = match result {
            Ok(inner) => inner?,
            Err(_) => return Err(ProviderError::Timeout(self.call_timeout.as_millis() as u64)),
        };

        debug!(
            "{} completion in {:?} ({} chars)",
            provider.name(),
            elapsed,
            completion.text.len()
        );
        self.usage
            .lock()
            .add_token_usage(completion.prompt_tokens, completion.completion_tokens, elapsed);

        Ok(completion)
    }

    /// Snapshot of the token usage so far
    pub fn usage(&self) -> TokenUsageStats {
        self.usage.lock().clone()
    }
}
