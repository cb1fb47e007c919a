/*!
 * Tier-specific orchestration tuning.
 *
 * Both tiers share one orchestrator; a `TierProfile` carries what differs:
 * model, batch size, concurrency ceiling, prompt template and whether the
 * research preamble is included.
 */

use std::time::Duration;

use crate::app_config::{PipelineSettings, TranslationTier};
use crate::translation::prompts::PromptTemplate;

/// Smallest wave width
const MIN_CONCURRENCY: usize = 3;

/// Parameters for one run of the batch orchestrator
#[derive(Debug, Clone)]
pub struct TierProfile {
    pub tier: TranslationTier,
    /// Model identifier sent with every batch
    pub model: String,
    /// Cues per batch
    pub batch_size: usize,
    /// Upper bound of the wave width
    pub max_concurrency: usize,
    /// System prompt template
    pub template: PromptTemplate,
    /// Whether research context is folded into batch prompts
    pub include_research: bool,
}

impl TierProfile {
    /// Get the profile for a tier from the pipeline settings
    pub fn for_tier(tier: TranslationTier, settings: &PipelineSettings, model: impl Into<String>) -> Self {
        match tier {
            TranslationTier::Fast => Self {
                tier,
                model: model.into(),
                batch_size: settings.fast_batch_size.max(1),
                max_concurrency: settings.fast_max_concurrency.max(1),
                template: PromptTemplate::fast(),
                include_research: false,
            },
            TranslationTier::Premium => Self {
                tier,
                model: model.into(),
                batch_size: settings.premium_batch_size.max(1),
                max_concurrency: settings.premium_max_concurrency.max(1),
                template: PromptTemplate::premium(),
                include_research: true,
            },
        }
    }

    /// Number of batches for `cue_count` cues
    pub fn batch_count(&self, cue_count: usize) -> usize {
        cue_count.div_ceil(self.batch_size)
    }

    /// Wave width: a third of the batches, at least 3, at most the tier ceiling
    pub fn concurrency(&self, batch_count: usize) -> usize {
        (batch_count / 3).max(MIN_CONCURRENCY).min(self.max_concurrency)
    }
}

/// File-level budget: grows with the cue count, capped by the ceiling
pub fn file_timeout(settings: &PipelineSettings, cue_count: usize) -> Duration {
    let scaled = Duration::from_secs(settings.file_timeout_base_secs)
        + Duration::from_millis(settings.file_timeout_per_cue_ms.saturating_mul(cue_count as u64));
    scaled.min(Duration::from_secs(settings.file_timeout_ceiling_secs))
}
