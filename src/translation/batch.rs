/*!
 * Batch translation processing.
 *
 * Cues are split into fixed-size batches that are dispatched in waves of
 * bounded width. Each wave is awaited as a whole before the next starts,
 * which gives a single point for the consecutive-failure circuit breaker,
 * cancellation checks and progress updates. Every batch carries its
 * partition index and results are reassembled by that index.
 */

use futures::future::join_all;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::app_config::PipelineSettings;
use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::CompletionRequest;
use crate::subtitle_processor::SubtitleCue;
use crate::translation::concurrency::{TierProfile, file_timeout};
use crate::translation::core::TranslationService;
use crate::translation::jobs::JobHandle;
use crate::translation::progress::{ProgressReporter, ProgressStage, translating_progress};
use crate::translation::prompts;
use crate::translation::research::ResearchData;
use crate::translation::response::{ParsedResponse, parse_batch_response};
use crate::translation::validation::{LineValidator, suspect_positions, validators_for};

/// Translated cues of one batch, tagged with its partition position
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub batch_index: usize,
    pub cues: Vec<SubtitleCue>,
}

/// Counters for one orchestration run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStatistics {
    /// Batches in the partition
    pub batches: usize,
    /// Batches translated successfully
    pub succeeded: usize,
    /// Batches that kept their original text after a request failure
    pub failed: usize,
    /// Lines filled positionally or with original text
    pub repaired_lines: usize,
    /// Lines sent again after validation flagged them
    pub retried_lines: usize,
    /// Batches never dispatched because the file budget ran out
    pub skipped_batches: usize,
    /// Waves dispatched
    pub waves: usize,
}

/// How an orchestration run ended
#[derive(Debug, Clone)]
pub enum Orchestration {
    /// Every batch was attempted (or skipped by the file budget)
    Completed {
        cues: Vec<SubtitleCue>,
        statistics: BatchStatistics,
    },
    /// Too many consecutive failures; no further calls were made
    BreakerTripped { statistics: BatchStatistics },
    /// The job was cancelled between waves
    Cancelled { statistics: BatchStatistics },
}

/// Source, target and optional context of a run
#[derive(Debug, Clone, Copy)]
pub struct BatchJob<'a> {
    pub source_language: &'a str,
    pub target_language: &'a str,
    pub research: Option<&'a ResearchData>,
}

/// Per-run values shared by all batch tasks
struct BatchContext<'a> {
    source_name: String,
    target_name: String,
    research: Option<&'a ResearchData>,
    validators: Vec<Box<dyn LineValidator>>,
}

struct BatchReport {
    repaired_lines: usize,
    retried_lines: usize,
}

struct BatchAttempt {
    batch_index: usize,
    /// Translated cues on success, untouched cues on failure
    cues: Vec<SubtitleCue>,
    outcome: Result<BatchReport, ProviderError>,
    elapsed: Duration,
}

/// Generic orchestrator shared by both tiers
pub struct BatchTranslator {
    /// The translation service to use
    service: TranslationService,

    /// Tier parameters
    profile: TierProfile,

    /// Consecutive failures that trip the breaker
    failure_threshold: usize,

    /// Whether suspect lines are retried
    validate_untranslated: bool,

    settings: PipelineSettings,
}

impl BatchTranslator {
    /// Create a new batch translator
    pub fn new(service: TranslationService, profile: TierProfile, settings: &PipelineSettings) -> Self {
        Self {
            service,
            profile,
            failure_threshold: settings.failure_threshold.max(1),
            validate_untranslated: settings.validate_untranslated,
            settings: settings.clone(),
        }
    }

    pub fn profile(&self) -> &TierProfile {
        &self.profile
    }

    /// Split cues into `(batch_index, cues)` pairs of at most `batch_size`
    pub fn partition(cues: &[SubtitleCue], batch_size: usize) -> Vec<BatchResult> {
        cues.chunks(batch_size.max(1))
            .enumerate()
            .map(|(batch_index, chunk)| BatchResult {
                batch_index,
                cues: chunk.to_vec(),
            })
            .collect()
    }

    /// Flatten batch results in partition order
    pub fn reassemble(mut results: Vec<BatchResult>) -> Vec<SubtitleCue> {
        results.sort_by_key(|r| r.batch_index);
        results.into_iter().flat_map(|r| r.cues).collect()
    }

    /// Translate cues in waves; see `Orchestration` for the possible endings
    pub async fn translate(
        &self,
        cues: &[SubtitleCue],
        job: BatchJob<'_>,
        reporter: &mut ProgressReporter,
        handle: &JobHandle,
    ) -> Orchestration {
        let batches = Self::partition(cues, self.profile.batch_size);
        let total = batches.len();
        let width = self.profile.concurrency(total);
        let deadline = Instant::now() + file_timeout(&self.settings, cues.len());

        let context = BatchContext {
            source_name: language_utils::display_name(job.source_language),
            target_name: language_utils::display_name(job.target_language),
            research: job.research.filter(|_| self.profile.include_research),
            validators: if self.validate_untranslated {
                validators_for(job.target_language)
            } else {
                Vec::new()
            },
        };

        info!(
            "Translating {} entries in {} batches ({} tier, {} concurrent, model {})",
            cues.len(),
            total,
            self.profile.tier,
            width,
            self.profile.model
        );
        reporter.stage(
            ProgressStage::Translating,
            Some(format!("Translating {} entries in {} batches", cues.len(), total)),
        );

        let mut statistics = BatchStatistics {
            batches: total,
            ..Default::default()
        };
        let mut remaining: VecDeque<BatchResult> = batches.into();
        let mut results: Vec<BatchResult> = Vec::with_capacity(total);
        let mut consecutive_failures = 0;
        let mut tripped = false;

        while !remaining.is_empty() {
            if handle.is_cancelled() {
                warn!("Job {} cancelled before wave {}", handle.id(), statistics.waves + 1);
                return Orchestration::Cancelled { statistics };
            }

            if Instant::now() >= deadline {
                warn!(
                    "File time budget exhausted, keeping {} batches untranslated",
                    remaining.len()
                );
                statistics.skipped_batches = remaining.len();
                results.extend(remaining.drain(..));
                break;
            }

            let wave: Vec<BatchResult> = remaining.drain(..width.min(remaining.len())).collect();
            statistics.waves += 1;
            debug!(
                "Wave {}: batches {:?}",
                statistics.waves,
                wave.iter().map(|b| b.batch_index + 1).collect::<Vec<_>>()
            );

            let mut attempts = join_all(
                wave.into_iter()
                    .map(|batch| self.translate_batch(batch.batch_index, batch.cues, &context)),
            )
            .await;

            if handle.is_cancelled() {
                warn!("Job {} cancelled, discarding wave {}", handle.id(), statistics.waves);
                return Orchestration::Cancelled { statistics };
            }

            attempts.sort_by_key(|a| a.batch_index);
            for attempt in attempts {
                match attempt.outcome {
                    Ok(report) => {
                        consecutive_failures = 0;
                        statistics.succeeded += 1;
                        statistics.repaired_lines += report.repaired_lines;
                        statistics.retried_lines += report.retried_lines;
                        debug!("Batch {} done in {:?}", attempt.batch_index + 1, attempt.elapsed);
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        statistics.failed += 1;
                        warn!(
                            "Batch {}/{} failed after {:?}, keeping original text: {}",
                            attempt.batch_index + 1,
                            total,
                            attempt.elapsed,
                            e
                        );
                        if consecutive_failures >= self.failure_threshold {
                            tripped = true;
                        }
                    }
                }
                results.push(BatchResult {
                    batch_index: attempt.batch_index,
                    cues: attempt.cues,
                });
            }

            if tripped {
                warn!(
                    "Circuit breaker tripped after {} consecutive failed batches",
                    consecutive_failures
                );
                return Orchestration::BreakerTripped { statistics };
            }

            let completed = total - remaining.len();
            reporter.update(
                translating_progress(completed, total),
                Some(format!("Translated {}/{} batches", completed, total)),
            );
        }

        Orchestration::Completed {
            cues: Self::reassemble(results),
            statistics,
        }
    }

    fn request(&self, context: &BatchContext<'_>, user: String, count: usize) -> CompletionRequest {
        let system = prompts::batch_system_prompt(
            &self.profile.template,
            &context.source_name,
            &context.target_name,
            count,
            context.research,
        );
        CompletionRequest::new(self.profile.model.clone(), user)
            .system(system)
            .max_tokens(self.service.config.common.max_tokens)
            .temperature(self.service.config.common.temperature)
    }

    async fn translate_batch(
        &self,
        batch_index: usize,
        cues: Vec<SubtitleCue>,
        context: &BatchContext<'_>,
    ) -> BatchAttempt {
        let start = Instant::now();
        let outcome = self.translate_texts(&cues, context).await;
        let elapsed = start.elapsed();

        match outcome {
            Ok((texts, report)) => BatchAttempt {
                batch_index,
                cues: cues.iter().zip(texts).map(|(cue, text)| cue.with_text(text)).collect(),
                outcome: Ok(report),
                elapsed,
            },
            Err(e) => BatchAttempt {
                batch_index,
                cues,
                outcome: Err(e),
                elapsed,
            },
        }
    }

    async fn translate_texts(
        &self,
        cues: &[SubtitleCue],
        context: &BatchContext<'_>,
    ) -> Result<(Vec<String>, BatchReport), ProviderError> {
        let originals: Vec<&str> = cues.iter().map(|c| c.original_text()).collect();

        let user = prompts::batch_user_prompt(&originals, &context.target_name);
        let completion = self.service.complete(self.request(context, user, originals.len())).await?;

        let parsed = match parse_batch_response(&completion.text, originals.len()) {
            ParsedResponse::Numbered(lines) => lines,
            ParsedResponse::Malformed(raw) => {
                return Err(ProviderError::ParseError(format!(
                    "no usable lines in response ({} chars)",
                    raw.len()
                )));
            }
        };

        let repaired = parsed.repair(&originals);
        if repaired.repaired_lines() > 0 {
            warn!(
                "Repaired {} lines of batch starting at cue {} ({} missing, {} positional)",
                repaired.repaired_lines(),
                cues.first().map(|c| c.index).unwrap_or_default(),
                repaired.missing.len(),
                repaired.positional
            );
        }

        let mut report = BatchReport {
            repaired_lines: repaired.repaired_lines(),
            retried_lines: 0,
        };
        let mut texts = repaired.texts;

        let suspects = suspect_positions(&context.validators, &originals, &texts);
        if !suspects.is_empty() {
            report.retried_lines = suspects.len();
            self.retry_suspects(&originals, &mut texts, &suspects, context).await;
        }

        Ok((texts, report))
    }

    /// Send suspect lines once more; keep a retry answer only if it passes validation
    async fn retry_suspects(
        &self,
        originals: &[&str],
        texts: &mut [String],
        suspects: &[usize],
        context: &BatchContext<'_>,
    ) {
        debug!("Retrying {} suspect lines", suspects.len());
        let suspect_originals: Vec<&str> = suspects.iter().map(|&i| originals[i]).collect();
        let user = prompts::retry_user_prompt(&suspect_originals, &context.target_name);

        let completion = match self
            .service
            .complete(self.request(context, user, suspect_originals.len()))
            .await
        {
            Ok(completion) => completion,
            Err(e) => {
                warn!("Retry of suspect lines failed, keeping first answers: {}", e);
                return;
            }
        };

        let ParsedResponse::Numbered(parsed) = parse_batch_response(&completion.text, suspects.len()) else {
            warn!("Retry of suspect lines returned no usable lines");
            return;
        };

        let retried = parsed.repair(&suspect_originals);
        for (k, &position) in suspects.iter().enumerate() {
            let candidate = &retried.texts[k];
            let still_suspect = context
                .validators
                .iter()
                .any(|v| v.is_suspect(originals[position], candidate));
            if !still_suspect {
                texts[position] = candidate.clone();
            }
        }
    }
}
