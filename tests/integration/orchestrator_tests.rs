/*!
 * Integration tests for the wave-based batch orchestrator
 */

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use subcontext::app_config::{PipelineSettings, TranslationConfig, TranslationTier};
use subcontext::errors::ProviderError;
use subcontext::providers::mock::MockProvider;
use subcontext::providers::{Completion, CompletionRequest, Provider};
use subcontext::subtitle_processor::SubtitleCue;
use subcontext::translation::batch::{BatchJob, BatchTranslator, Orchestration};
use subcontext::translation::concurrency::TierProfile;
use subcontext::translation::core::TranslationService;
use subcontext::translation::jobs::JobHandle;
use subcontext::translation::progress::ProgressReporter;

use crate::common;

/// Answers later batches faster, so batches finish in reverse order
#[derive(Debug, Default)]
struct ReverseLatencyProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl Provider for ReverseLatencyProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let first = MockProvider::numbered_lines(&request.user)
            .first()
            .and_then(|(_, text)| text.trim_start_matches("Line ").parse::<u64>().ok())
            .unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(200u64.saturating_sub(first))).await;

        Ok(Completion {
            text: MockProvider::generate_batch_response(&request.user),
            ..Default::default()
        })
    }

    fn name(&self) -> &str {
        "reverse-latency"
    }
}

fn translator(provider: Arc<dyn Provider>, tier: TranslationTier, settings: &PipelineSettings) -> BatchTranslator {
    let service = TranslationService::with_provider(TranslationConfig::default(), provider, Duration::from_secs(5));
    BatchTranslator::new(service, TierProfile::for_tier(tier, settings, "mock-model"), settings)
}

fn german() -> BatchJob<'static> {
    BatchJob {
        source_language: "en",
        target_language: "de",
        research: None,
    }
}

async fn run(translator: &BatchTranslator, cues: &[SubtitleCue], job: BatchJob<'_>) -> Orchestration {
    translator
        .translate(cues, job, &mut ProgressReporter::silent(), &JobHandle::new())
        .await
}

#[tokio::test]
async fn test_translate_withReversedCompletionOrder_shouldKeepCueOrder() {
    let settings = PipelineSettings {
        fast_batch_size: 10,
        ..common::quiet_settings()
    };
    let provider = Arc::new(ReverseLatencyProvider::default());
    let cues = common::numbered_cues(100);

    let outcome = run(&translator(provider.clone(), TranslationTier::Fast, &settings), &cues, german()).await;

    let Orchestration::Completed { cues: translated, statistics } = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(translated.len(), 100);
    for (i, cue) in translated.iter().enumerate() {
        assert_eq!(cue.index, i + 1);
        assert_eq!(cue.text, format!("[TRANSLATED] Line {}", i + 1));
        assert_eq!(cue.original_text(), format!("Line {}", i + 1));
        assert_eq!(cue.start_time_ms, cues[i].start_time_ms);
    }
    assert_eq!(statistics.batches, 10);
    assert_eq!(statistics.succeeded, 10);
    assert_eq!(statistics.waves, 4);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn test_translate_withAlwaysFailingProvider_shouldStopAfterBreakerTrips() {
    let settings = PipelineSettings {
        fast_batch_size: 2,
        ..common::quiet_settings()
    };
    let provider = MockProvider::failing();
    let cues = common::numbered_cues(20);

    let outcome = run(&translator(Arc::new(provider.clone()), TranslationTier::Fast, &settings), &cues, german()).await;

    let Orchestration::BreakerTripped { statistics } = outcome else {
        panic!("expected the circuit breaker to trip");
    };
    // 10 batches in waves of 3: the second wave takes the counter past 5
    assert_eq!(provider.request_count(), 6);
    assert_eq!(statistics.failed, 6);
    assert_eq!(statistics.waves, 2);
}

#[tokio::test]
async fn test_translate_withIntermittentFailures_shouldKeepOriginalsForFailedBatches() {
    let settings = PipelineSettings {
        fast_batch_size: 2,
        ..common::quiet_settings()
    };
    let provider = MockProvider::intermittent(2);
    let cues = common::numbered_cues(20);

    let outcome = run(&translator(Arc::new(provider.clone()), TranslationTier::Fast, &settings), &cues, german()).await;

    let Orchestration::Completed { cues: translated, statistics } = outcome else {
        panic!("alternating failures must not trip the breaker");
    };
    assert_eq!(translated.len(), 20);
    assert_eq!(statistics.failed, 5);
    assert_eq!(statistics.succeeded, 5);
    assert_eq!(provider.request_count(), 10);

    // Every second request fails, so batch 2 (cues 3 and 4) kept its text
    assert_eq!(translated[0].text, "[TRANSLATED] Line 1");
    assert_eq!(translated[2].text, "Line 3");
    assert_eq!(translated[3].text, "Line 4");
}

#[tokio::test]
async fn test_translate_with67CuesAndSecondBatchFailing_shouldKeepThatBatchOriginal() {
    let settings = common::quiet_settings();
    let provider = MockProvider::scripted(|request| {
        if request.user.contains("Line 26") {
            Err(ProviderError::ConnectionError("connection reset".to_string()))
        } else {
            Ok(MockProvider::generate_batch_response(&request.user))
        }
    });
    let cues = common::numbered_cues(67);

    let outcome = run(
        &translator(Arc::new(provider.clone()), TranslationTier::Premium, &settings),
        &cues,
        german(),
    )
    .await;

    let Orchestration::Completed { cues: translated, statistics } = outcome else {
        panic!("a single failed batch must not abort the run");
    };
    assert_eq!(statistics.batches, 3);
    assert_eq!(statistics.failed, 1);
    assert_eq!(provider.request_count(), 3);
    assert_eq!(translated.len(), 67);

    for (i, cue) in translated.iter().enumerate() {
        let n = i + 1;
        assert_eq!(cue.index, n);
        if (26..=50).contains(&n) {
            assert_eq!(cue.text, format!("Line {}", n), "cue {} should keep its original", n);
        } else {
            assert_eq!(cue.text, format!("[TRANSLATED] Line {}", n));
        }
    }
}

#[tokio::test]
async fn test_translate_withUnnumberedResponse_shouldRepairPositionally() {
    let settings = common::quiet_settings();
    let provider = MockProvider::scripted(|request| {
        Ok(MockProvider::numbered_lines(&request.user)
            .into_iter()
            .map(|(_, text)| format!("<{}>", text))
            .collect::<Vec<_>>()
            .join("\n"))
    });
    let cues = common::numbered_cues(3);

    let outcome = run(&translator(Arc::new(provider), TranslationTier::Fast, &settings), &cues, german()).await;

    let Orchestration::Completed { cues: translated, statistics } = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(translated[1].text, "<Line 2>");
    assert_eq!(statistics.repaired_lines, 3);
    assert_eq!(statistics.failed, 0);
}

#[tokio::test]
async fn test_translate_withUntranslatedCzechLine_shouldRetryItOnce() {
    let settings = PipelineSettings {
        validate_untranslated: true,
        ..common::quiet_settings()
    };
    let provider = MockProvider::scripted(|request| {
        if request.user.contains("returned untranslated") {
            Ok("1. Co tady děláš?".to_string())
        } else {
            Ok("1. What are you doing here?\n2. Ahoj".to_string())
        }
    });
    let cues = vec![
        SubtitleCue::new(1, 0, 2000, "What are you doing here?"),
        SubtitleCue::new(2, 2500, 3500, "Hi"),
    ];
    let job = BatchJob {
        source_language: "en",
        target_language: "cs",
        research: None,
    };

    let outcome = run(&translator(Arc::new(provider.clone()), TranslationTier::Fast, &settings), &cues, job).await;

    let Orchestration::Completed { cues: translated, statistics } = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(translated[0].text, "Co tady děláš?");
    assert_eq!(translated[1].text, "Ahoj");
    assert_eq!(statistics.retried_lines, 1);
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn test_translate_withStillUntranslatedRetry_shouldKeepFirstAnswer() {
    let settings = PipelineSettings {
        validate_untranslated: true,
        ..common::quiet_settings()
    };
    let provider = MockProvider::scripted(|request| {
        if request.user.contains("returned untranslated") {
            Ok("1. What are you doing there?".to_string())
        } else {
            Ok("1. What are you doing here?\n2. Ahoj".to_string())
        }
    });
    let cues = vec![
        SubtitleCue::new(1, 0, 2000, "What are you doing here?"),
        SubtitleCue::new(2, 2500, 3500, "Hi"),
    ];
    let job = BatchJob {
        source_language: "en",
        target_language: "cs",
        research: None,
    };

    let outcome = run(&translator(Arc::new(provider.clone()), TranslationTier::Fast, &settings), &cues, job).await;

    let Orchestration::Completed { cues: translated, .. } = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(translated[0].text, "What are you doing here?");
    assert_eq!(translated[1].text, "Ahoj");
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn test_translate_withCancelledJob_shouldNotCallProvider() {
    let settings = common::quiet_settings();
    let provider = MockProvider::working();
    let handle = JobHandle::new();
    handle.cancel();

    let outcome = translator(Arc::new(provider.clone()), TranslationTier::Fast, &settings)
        .translate(&common::numbered_cues(10), german(), &mut ProgressReporter::silent(), &handle)
        .await;

    assert!(matches!(outcome, Orchestration::Cancelled { .. }));
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_translate_withCancelDuringWave_shouldDiscardWaveAndStop() {
    let settings = PipelineSettings {
        fast_batch_size: 2,
        ..common::quiet_settings()
    };
    let handle = JobHandle::new();
    let in_flight = handle.clone();
    let provider = MockProvider::scripted(move |request| {
        in_flight.cancel();
        Ok(MockProvider::generate_batch_response(&request.user))
    });
    let translator = translator(Arc::new(provider.clone()), TranslationTier::Fast, &settings);
    let cues = common::numbered_cues(20);

    let outcome = translator
        .translate(&cues, german(), &mut ProgressReporter::silent(), &handle)
        .await;

    let Orchestration::Cancelled { statistics } = outcome else {
        panic!("expected the run to stop after the cancelled wave");
    };
    // 10 batches in waves of 3; only the first wave was dispatched
    assert_eq!(provider.request_count(), 3);
    assert_eq!(statistics.waves, 1);
    assert_eq!(statistics.succeeded, 0);
    assert_eq!(statistics.failed, 0);
}

#[tokio::test]
async fn test_translate_withExhaustedFileBudget_shouldSkipRemainingBatches() {
    let settings = PipelineSettings {
        file_timeout_base_secs: 0,
        file_timeout_per_cue_ms: 0,
        file_timeout_ceiling_secs: 0,
        ..common::quiet_settings()
    };
    let provider = MockProvider::working();
    let cues = common::numbered_cues(40);

    let outcome = run(&translator(Arc::new(provider.clone()), TranslationTier::Fast, &settings), &cues, german()).await;

    let Orchestration::Completed { cues: translated, statistics } = outcome else {
        panic!("skipped batches are not failures");
    };
    assert_eq!(statistics.skipped_batches, 2);
    assert_eq!(statistics.failed, 0);
    assert_eq!(provider.request_count(), 0);
    assert_eq!(translated.len(), 40);
    assert!(translated.iter().all(|c| c.text == c.original_text()));
}
