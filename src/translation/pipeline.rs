/*!
 * End-to-end translation of one subtitle file.
 *
 * Stages: show detection, research (premium tier only), content analysis,
 * batch translation and re-timing. Without a provider, or once the circuit
 * breaker trips, the whole job is produced by the fallback translator and
 * reported as degraded.
 */

use log::{info, warn};
use serde::Serialize;
use std::time::Duration;

use crate::app_config::{Config, PipelineSettings, TranslationTier};
use crate::errors::{SubtitleError, TranslationError};
use crate::subtitle_processor::SubtitleCue;
use crate::translation::analysis::{self, ContentStatistics};
use crate::translation::batch::{BatchJob, BatchStatistics, BatchTranslator, Orchestration};
use crate::translation::cache::ResearchCache;
use crate::translation::concurrency::TierProfile;
use crate::translation::core::TranslationService;
use crate::translation::fallback::FallbackTranslator;
use crate::translation::jobs::{JobHandle, JobStatus};
use crate::translation::progress::{ProgressReporter, ProgressStage};
use crate::translation::research::{ResearchData, ResearchEngine};
use crate::translation::show_info::{ShowInfo, extract_show_info};
use crate::translation::timing::TimingAdjuster;

/// Whether the provider produced the output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationMode {
    Translated,
    /// Placeholder output from the fallback translator
    Degraded(String),
}

/// Everything a finished job produced
#[derive(Debug, Clone, Serialize)]
pub struct TranslationOutcome {
    pub cues: Vec<SubtitleCue>,
    pub show_info: ShowInfo,
    pub research: Option<ResearchData>,
    pub content: ContentStatistics,
    pub statistics: BatchStatistics,
    /// Cues whose end time was changed
    pub retimed_cues: usize,
    pub mode: TranslationMode,
}

impl TranslationOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self.mode, TranslationMode::Degraded(_))
    }
}

/// Input of one job
#[derive(Debug, Clone, Copy)]
pub struct TranslationRequest<'a> {
    pub cues: &'a [SubtitleCue],
    pub source_language: &'a str,
    pub target_language: &'a str,
    /// File name used for show detection
    pub file_name: Option<&'a str>,
}

/// Contextual translation pipeline for one provider configuration
#[derive(Debug, Clone)]
pub struct TranslationPipeline {
    service: TranslationService,
    research: ResearchEngine,
    settings: PipelineSettings,
    tier: TranslationTier,
    fallback: FallbackTranslator,
}

impl TranslationPipeline {
    /// Build from a service; the research cache is shared with every clone
    pub fn new(service: TranslationService, cache: ResearchCache, settings: PipelineSettings) -> Self {
        let tier = service.config.tier;
        let fallback = FallbackTranslator::new(Duration::from_millis(settings.fallback_stage_delay_ms));
        Self {
            research: ResearchEngine::new(service.clone(), cache),
            service,
            settings,
            tier,
            fallback,
        }
    }

    /// Build from application config, with a per-call deadline of `batch_timeout_secs`
    pub fn from_config(config: &Config, cache: ResearchCache) -> Self {
        let service = TranslationService::new(
            config.translation.clone(),
            Duration::from_secs(config.pipeline.batch_timeout_secs),
        );
        Self::new(service, cache, config.pipeline.clone())
    }

    /// Override the tier from the service configuration
    pub fn with_tier(mut self, tier: TranslationTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn tier(&self) -> TranslationTier {
        self.tier
    }

    pub fn service(&self) -> &TranslationService {
        &self.service
    }

    pub fn research_cache(&self) -> &ResearchCache {
        self.research.cache()
    }

    /// Translate one file's cues.
    ///
    /// Only empty input and cancellation are errors; provider trouble ends in
    /// a degraded outcome instead.
    pub async fn translate(
        &self,
        request: TranslationRequest<'_>,
        reporter: &mut ProgressReporter,
        job: &JobHandle,
    ) -> Result<TranslationOutcome, TranslationError> {
        if request.cues.is_empty() {
            reporter.error("No subtitle entries to translate");
            job.set_status(JobStatus::Failed("empty input".to_string()));
            return Err(SubtitleError::EmptyInput.into());
        }

        job.set_status(JobStatus::Running);
        reporter.stage(
            ProgressStage::Initializing,
            Some(format!("Preparing {} entries", request.cues.len())),
        );

        let show_info = extract_show_info(request.file_name.unwrap_or_default());

        if !self.service.has_provider() {
            let reason = "no translation provider configured".to_string();
            warn!("{}, using offline fallback", reason);
            let cues = self
                .fallback
                .translate(request.cues, request.target_language, reporter)
                .await;
            let content = analysis::analyze(request.cues);
            return Ok(self.degraded(
                cues,
                show_info,
                None,
                content,
                BatchStatistics::default(),
                reason,
                reporter,
                job,
            ));
        }

        reporter.stage(ProgressStage::Analyzing, Some(format!("Detected '{}'", show_info.label())));

        let research = match self.tier {
            TranslationTier::Premium => {
                reporter.stage(
                    ProgressStage::Researching,
                    Some(format!("Researching '{}'", show_info.title)),
                );
                Some(self.research.research(&show_info).await)
            }
            TranslationTier::Fast => None,
        };

        let content = analysis::analyze(request.cues);
        reporter.stage(ProgressStage::AnalyzingContent, Some(content.describe()));

        if job.is_cancelled() {
            return Err(self.cancelled(reporter, job));
        }

        let profile = TierProfile::for_tier(self.tier, &self.settings, self.service.model(self.tier));
        info!(
            "Translating {} entries with {} ({}, {} tier)",
            request.cues.len(),
            self.service.provider_name(),
            profile.model,
            self.tier
        );
        let translator = BatchTranslator::new(self.service.clone(), profile, &self.settings);
        let batch_job = BatchJob {
            source_language: request.source_language,
            target_language: request.target_language,
            research: research.as_ref(),
        };

        let (cues, statistics) = match translator.translate(request.cues, batch_job, reporter, job).await {
            Orchestration::Completed { cues, statistics } => (cues, statistics),
            Orchestration::Cancelled { .. } => return Err(self.cancelled(reporter, job)),
            Orchestration::BreakerTripped { statistics } => {
                let reason = format!(
                    "{} consecutive batch failures, provider unavailable",
                    self.settings.failure_threshold
                );
                warn!("{}; falling back for the whole job", reason);
                let cues = FallbackTranslator::translate_cues(request.cues, request.target_language);
                reporter.stage(ProgressStage::Finalizing, Some("Using offline fallback".to_string()));
                return Ok(self.degraded(cues, show_info, research, content, statistics, reason, reporter, job));
            }
        };

        reporter.stage(ProgressStage::Finalizing, Some("Adjusting timing".to_string()));
        let (cues, retimed_cues) = if self.settings.adjust_timing {
            TimingAdjuster::for_job(request.source_language, request.target_language, self.tier).adjust_all(&cues)
        } else {
            (cues, 0)
        };

        info!(
            "Translated {} entries in {} batches ({} failed, {} lines repaired, {} re-timed)",
            cues.len(),
            statistics.batches,
            statistics.failed,
            statistics.repaired_lines,
            retimed_cues
        );

        reporter.stage(
            ProgressStage::Completed,
            Some(format!("Translated {} entries", cues.len())),
        );
        job.set_status(JobStatus::Completed);

        Ok(TranslationOutcome {
            cues,
            show_info,
            research,
            content,
            statistics,
            retimed_cues,
            mode: TranslationMode::Translated,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn degraded(
        &self,
        cues: Vec<SubtitleCue>,
        show_info: ShowInfo,
        research: Option<ResearchData>,
        content: ContentStatistics,
        statistics: BatchStatistics,
        reason: String,
        reporter: &mut ProgressReporter,
        job: &JobHandle,
    ) -> TranslationOutcome {
        reporter.stage(
            ProgressStage::Completed,
            Some(format!("Finished {} entries in offline mode", cues.len())),
        );
        job.set_status(JobStatus::Degraded(reason.clone()));

        TranslationOutcome {
            cues,
            show_info,
            research,
            content,
            statistics,
            retimed_cues: 0,
            mode: TranslationMode::Degraded(reason),
        }
    }

    fn cancelled(&self, reporter: &mut ProgressReporter, job: &JobHandle) -> TranslationError {
        reporter.error("Translation cancelled");
        job.set_status(JobStatus::Cancelled);
        TranslationError::Cancelled(job.id().to_string())
    }
}
