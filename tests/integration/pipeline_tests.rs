/*!
 * Integration tests for the end-to-end translation pipeline
 */

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use subcontext::app_config::{PipelineSettings, TranslationTier};
use subcontext::errors::{SubtitleError, TranslationError};
use subcontext::providers::mock::MockProvider;
use subcontext::subtitle_processor::SubtitleCue;
use subcontext::translation::jobs::{JobHandle, JobRegistry, JobStatus};
use subcontext::translation::pipeline::{TranslationMode, TranslationRequest};
use subcontext::translation::progress::{ProgressReporter, ProgressStage};

use crate::common;

fn request<'a>(cues: &'a [SubtitleCue], target: &'a str, file_name: &'a str) -> TranslationRequest<'a> {
    TranslationRequest {
        cues,
        source_language: "en",
        target_language: target,
        file_name: Some(file_name),
    }
}

#[tokio::test]
async fn test_pipeline_withoutProvider_shouldFallBackAndComplete() {
    common::init_test_logging();
    let pipeline = common::offline_pipeline(common::quiet_settings());
    let cues = vec![
        SubtitleCue::new(1, 0, 1000, "Hello!"),
        SubtitleCue::new(2, 1500, 3000, "Where is the car?"),
    ];
    let (mut reporter, mut receiver) = ProgressReporter::channel(Duration::ZERO);
    let job = JobHandle::new();

    let outcome = pipeline
        .translate(request(&cues, "cs", "Dark.S01E01.srt"), &mut reporter, &job)
        .await
        .unwrap();

    assert!(outcome.is_degraded());
    assert_eq!(outcome.cues.len(), 2);
    assert_eq!(outcome.cues[0].text, "Ahoj!");
    assert_eq!(outcome.cues[1].text, "[CS] Where is the car?");
    assert!(matches!(job.status(), JobStatus::Degraded(_)));

    let events = common::drain_events(&mut receiver);
    let stages: Vec<ProgressStage> = events.iter().map(|e| e.stage).collect();
    for stage in [
        ProgressStage::Analyzing,
        ProgressStage::Researching,
        ProgressStage::AnalyzingContent,
        ProgressStage::Translating,
        ProgressStage::Finalizing,
    ] {
        assert!(stages.contains(&stage), "missing stage {}", stage);
    }
    let last = events.last().unwrap();
    assert_eq!(last.stage, ProgressStage::Completed);
    assert_eq!(last.progress, 100);
    assert!(events.windows(2).all(|pair| pair[0].progress <= pair[1].progress));
}

#[tokio::test]
async fn test_pipeline_withWorkingProvider_shouldTranslateAndReportProgress() {
    let provider = MockProvider::working();
    let pipeline = common::mock_pipeline(provider.clone(), TranslationTier::Fast, common::quiet_settings());
    let cues = common::numbered_cues(75);
    let (mut reporter, mut receiver) = ProgressReporter::channel(Duration::ZERO);

    let outcome = pipeline
        .translate(request(&cues, "de", "Show.S02E05.720p.srt"), &mut reporter, &JobHandle::new())
        .await
        .unwrap();

    assert_eq!(outcome.mode, TranslationMode::Translated);
    assert_eq!(outcome.cues.len(), 75);
    assert_eq!(outcome.cues[74].text, "[TRANSLATED] Line 75");
    assert_eq!(outcome.show_info.title, "Show");
    assert_eq!(outcome.show_info.episode, Some(5));
    assert!(outcome.research.is_none(), "fast tier skips research");
    assert_eq!(outcome.content.total_entries, 75);
    assert_eq!(outcome.statistics.batches, 3);
    assert_eq!(provider.request_count(), 3);

    let events = common::drain_events(&mut receiver);
    assert!(events.windows(2).all(|pair| pair[0].progress <= pair[1].progress));
    assert!(!events.iter().any(|e| e.stage == ProgressStage::Researching));
    assert_eq!(events.last().map(|e| e.stage), Some(ProgressStage::Completed));
}

#[tokio::test]
async fn test_pipeline_withAlwaysFailingProvider_shouldDegradeButKeepLength() {
    common::init_test_logging();
    let settings = PipelineSettings {
        fast_batch_size: 2,
        ..common::quiet_settings()
    };
    let provider = MockProvider::failing();
    let pipeline = common::mock_pipeline(provider.clone(), TranslationTier::Fast, settings);
    let cues = common::numbered_cues(20);
    let job = JobHandle::new();

    let outcome = pipeline
        .translate(request(&cues, "de", "Movie.srt"), &mut ProgressReporter::silent(), &job)
        .await
        .unwrap();

    assert!(outcome.is_degraded());
    assert_eq!(provider.request_count(), 6);
    assert_eq!(outcome.cues.len(), 20);
    assert_eq!(outcome.cues[7].text, "[DE] Line 8");
    assert_eq!(outcome.cues[7].index, 8);
    assert!(matches!(job.status(), JobStatus::Degraded(_)));
}

#[tokio::test]
async fn test_pipeline_withSameShowTwice_shouldResearchOnce() {
    let seen_system_prompts = Arc::new(Mutex::new(Vec::new()));
    let prompts = seen_system_prompts.clone();
    let provider = MockProvider::scripted(move |request| {
        if MockProvider::numbered_lines(&request.user).is_empty() {
            return Ok(r#"{"title": "Dark", "genre": ["thriller"], "plot": "Children vanish in a small German town."}"#.to_string());
        }
        prompts.lock().push(request.system.clone().unwrap_or_default());
        Ok(MockProvider::generate_batch_response(&request.user))
    });
    let pipeline = common::mock_pipeline(provider.clone(), TranslationTier::Premium, common::quiet_settings());
    let cues = common::numbered_cues(3);

    let first = pipeline
        .translate(request(&cues, "de", "Dark.S01E01.srt"), &mut ProgressReporter::silent(), &JobHandle::new())
        .await
        .unwrap();
    let second = pipeline
        .clone()
        .translate(request(&cues, "de", "dark.s01e02.srt"), &mut ProgressReporter::silent(), &JobHandle::new())
        .await
        .unwrap();

    // One research lookup plus one batch per job
    assert_eq!(provider.request_count(), 3);
    assert_eq!(first.research.as_ref().map(|r| r.genre.clone()), Some(vec!["thriller".to_string()]));
    assert_eq!(second.research, first.research);

    let (hits, misses, _) = pipeline.research_cache().stats();
    assert_eq!((hits, misses), (1, 1));

    let prompts = seen_system_prompts.lock();
    assert_eq!(prompts.len(), 2);
    assert!(prompts.iter().all(|p| p.contains("thriller")));
}

#[tokio::test]
async fn test_pipeline_withFailedResearch_shouldContinueWithoutContext() {
    let provider = MockProvider::working().with_research_json("not json at all");
    let pipeline = common::mock_pipeline(provider.clone(), TranslationTier::Premium, common::quiet_settings());
    let cues = common::numbered_cues(2);

    let outcome = pipeline
        .translate(request(&cues, "de", "Unknown.Show.S01E01.srt"), &mut ProgressReporter::silent(), &JobHandle::new())
        .await
        .unwrap();

    assert_eq!(outcome.mode, TranslationMode::Translated);
    assert!(!outcome.research.unwrap().has_context());
    assert!(pipeline.research_cache().is_empty(), "failed lookups are not cached");
    assert_eq!(outcome.cues[0].text, "[TRANSLATED] Line 1");
}

#[tokio::test]
async fn test_pipeline_withEmptyInput_shouldFail() {
    let pipeline = common::mock_pipeline(MockProvider::working(), TranslationTier::Fast, common::quiet_settings());
    let (mut reporter, mut receiver) = ProgressReporter::channel(Duration::ZERO);

    let result = pipeline
        .translate(request(&[], "de", "Empty.srt"), &mut reporter, &JobHandle::new())
        .await;

    assert!(matches!(result, Err(TranslationError::Subtitle(SubtitleError::EmptyInput))));
    let events = common::drain_events(&mut receiver);
    assert_eq!(events.last().map(|e| e.stage), Some(ProgressStage::Error));
}

#[tokio::test]
async fn test_pipeline_withCancelledJob_shouldReturnCancelled() {
    let provider = MockProvider::working();
    let pipeline = common::mock_pipeline(provider.clone(), TranslationTier::Fast, common::quiet_settings());
    let registry = JobRegistry::new();
    let job = registry.create();
    assert!(registry.cancel(job.id()));

    let result = pipeline
        .translate(request(&common::numbered_cues(5), "de", "Show.srt"), &mut ProgressReporter::silent(), &job)
        .await;

    assert!(matches!(result, Err(TranslationError::Cancelled(_))));
    assert_eq!(job.status(), JobStatus::Cancelled);
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_pipeline_withTimingEnabled_shouldOnlyMoveEndTimes() {
    let settings = PipelineSettings {
        adjust_timing: true,
        ..common::quiet_settings()
    };
    let provider = MockProvider::scripted(|_| Ok("1. Ahoj".to_string()));
    let pipeline = common::mock_pipeline(provider, TranslationTier::Fast, settings);
    let cues = vec![SubtitleCue::new(1, 10_000, 10_500, "Hi")];

    let outcome = pipeline
        .translate(request(&cues, "cs", "Show.srt"), &mut ProgressReporter::silent(), &JobHandle::new())
        .await
        .unwrap();

    let cue = &outcome.cues[0];
    assert_eq!(cue.text, "Ahoj");
    assert_eq!(cue.start_time_ms, 10_000);
    assert_eq!(cue.end_time_ms, 10_800);
    assert_eq!(outcome.retimed_cues, 1);
}
