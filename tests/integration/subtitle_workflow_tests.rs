/*!
 * Integration tests for file and folder runs through the controller
 */

use anyhow::Result;

use subcontext::app_config::{Config, TranslationTier};
use subcontext::app_controller::{Controller, FolderSummary, ProgressOutput};
use subcontext::providers::mock::MockProvider;
use subcontext::subtitle_processor::SubtitleCollection;

use crate::common;

fn german_controller(provider: MockProvider) -> Controller {
    let mut config = Config::default();
    config.target_language = "de".to_string();
    config.pipeline = common::quiet_settings();

    let pipeline = common::mock_pipeline(provider, TranslationTier::Fast, common::quiet_settings());
    Controller::with_pipeline(config, pipeline).with_progress_output(ProgressOutput::Hidden)
}

/// Test translating a single file into an output directory
#[tokio::test]
async fn test_run_withSubtitleFile_shouldWriteTranslatedFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "Dark.S01E01.en.srt")?;
    let output_dir = temp_dir.path().join("out");
    let controller = german_controller(MockProvider::working());

    let written = controller.run(input.clone(), output_dir.clone(), false).await?;

    let expected = output_dir.join("Dark.S01E01.de.srt");
    assert_eq!(written.as_deref(), Some(expected.as_path()));

    let translated = SubtitleCollection::from_srt_file(&expected, "de")?;
    assert_eq!(translated.cues.len(), 3);
    assert!(translated.cues.iter().all(|c| c.text.starts_with("[TRANSLATED]")));
    assert_eq!(translated.cues[1].start_time_ms, 5000);
    assert_eq!(translated.cues[1].end_time_ms, 9000);
    Ok(())
}

/// Test that an existing output is only replaced with force
#[tokio::test]
async fn test_run_withExistingOutput_shouldSkipUnlessForced() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let output_dir = temp_dir.path().to_path_buf();
    let existing = common::create_test_file(temp_dir.path(), "movie.de.srt", "keep me")?;
    let provider = MockProvider::working();
    let controller = german_controller(provider.clone());

    let skipped = controller.run(input.clone(), output_dir.clone(), false).await?;
    assert!(skipped.is_none());
    assert_eq!(std::fs::read_to_string(&existing)?, "keep me");
    assert_eq!(provider.request_count(), 0);

    let forced = controller.run(input, output_dir, true).await?;
    assert_eq!(forced.as_deref(), Some(existing.as_path()));
    assert_ne!(std::fs::read_to_string(&existing)?, "keep me");
    Ok(())
}

/// Test that a missing input file is an error
#[test]
fn test_run_withMissingInput_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = german_controller(MockProvider::working());

    let result = tokio_test::block_on(async {
        controller
            .run(temp_dir.path().join("missing.srt"), temp_dir.path().to_path_buf(), false)
            .await
    });

    assert!(result.is_err());
    Ok(())
}

/// Test that an empty subtitle file fails without writing output
#[tokio::test]
async fn test_run_withEmptySubtitleFile_shouldFailWithoutOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "empty.srt", "")?;
    let controller = german_controller(MockProvider::working());

    let result = controller.run(input, temp_dir.path().to_path_buf(), false).await;

    assert!(result.is_err());
    assert!(!temp_dir.path().join("empty.de.srt").exists());
    Ok(())
}

/// Test folder runs, including files that are already translated
#[tokio::test]
async fn test_runFolder_withMixedFiles_shouldTranslateSourcesOnly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let season = temp_dir.path().join("Season 1");
    std::fs::create_dir_all(&season)?;
    common::create_test_subtitle(temp_dir.path(), "Show.S01E01.en.srt")?;
    common::create_test_subtitle(&season, "Show.S01E02.srt")?;
    common::create_test_subtitle(temp_dir.path(), "Show.S01E03.de.srt")?;
    let controller = german_controller(MockProvider::working());

    let summary = controller.run_folder(temp_dir.path().to_path_buf(), false).await?;
    assert_eq!(
        summary,
        FolderSummary {
            translated: 2,
            skipped: 0,
            failed: 0
        }
    );
    assert!(temp_dir.path().join("Show.S01E01.de.srt").exists());
    assert!(season.join("Show.S01E02.de.srt").exists());

    let again = controller.run_folder(temp_dir.path().to_path_buf(), false).await?;
    assert_eq!(again.translated, 0);
    assert_eq!(again.skipped, 2);
    Ok(())
}

/// Test that a folder without subtitles is an error
#[tokio::test]
async fn test_runFolder_withoutSubtitles_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "readme.txt", "nothing here")?;
    let controller = german_controller(MockProvider::working());

    assert!(controller.run_folder(temp_dir.path().to_path_buf(), false).await.is_err());
    Ok(())
}
