/*!
 * Common test utilities for the subcontext test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

use subcontext::app_config::{PipelineSettings, TranslationConfig, TranslationTier};
use subcontext::providers::mock::MockProvider;
use subcontext::subtitle_processor::SubtitleCue;
use subcontext::translation::cache::ResearchCache;
use subcontext::translation::core::TranslationService;
use subcontext::translation::pipeline::TranslationPipeline;
use subcontext::translation::progress::ProgressEvent;

/// Route library logs to the test output; set RUST_LOG to see them
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a sample subtitle file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    let content = r#"1
00:00:01,000 --> 00:00:04,000
Where were you last night?

2
00:00:05,000 --> 00:00:09,000
[DOOR SLAMS]

3
00:00:10,000 --> 00:00:14,000
Hello!
"#;
    create_test_file(dir, filename, content)
}

/// `n` cues with texts `Line 1` .. `Line n`, two seconds apart
pub fn numbered_cues(n: usize) -> Vec<SubtitleCue> {
    (1..=n)
        .map(|i| {
            let start = i as u64 * 2000;
            SubtitleCue::new(i, start, start + 1500, format!("Line {}", i))
        })
        .collect()
}

/// Settings without delays or timing changes, for counting tests
pub fn quiet_settings() -> PipelineSettings {
    PipelineSettings {
        progress_debounce_ms: 0,
        fallback_stage_delay_ms: 0,
        adjust_timing: false,
        ..Default::default()
    }
}

/// Pipeline around a mock provider
pub fn mock_pipeline(provider: MockProvider, tier: TranslationTier, settings: PipelineSettings) -> TranslationPipeline {
    let service = TranslationService::with_provider(
        TranslationConfig::default(),
        Arc::new(provider),
        Duration::from_secs(5),
    );
    TranslationPipeline::new(service, ResearchCache::new(), settings).with_tier(tier)
}

/// Pipeline without any provider
pub fn offline_pipeline(settings: PipelineSettings) -> TranslationPipeline {
    TranslationPipeline::new(
        TranslationService::offline(TranslationConfig::default()),
        ResearchCache::new(),
        settings,
    )
}

/// Every event still buffered in a progress channel
pub fn drain_events(receiver: &mut UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}
