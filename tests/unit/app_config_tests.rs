/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;
use std::str::FromStr;

use subcontext::app_config::{Config, LogLevel, TranslationProvider, TranslationTier};
use crate::common;

/// Test that a missing config file is created with defaults
#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let config = Config::load_or_create(&path)?;

    assert!(path.exists());
    assert_eq!(config.source_language, "en");
    assert_eq!(config.translation.provider, TranslationProvider::Anthropic);
    assert_eq!(config.translation.tier, TranslationTier::Premium);
    assert_eq!(config.log_level, LogLevel::Info);
    Ok(())
}

/// Test that saved changes survive a reload
#[test]
fn test_loadOrCreate_withSavedChanges_shouldReloadThem() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let mut config = Config::default();
    config.target_language = "de".to_string();
    config.translation.tier = TranslationTier::Fast;
    config.pipeline.failure_threshold = 3;
    config.save(&path)?;

    let reloaded = Config::load_or_create(&path)?;
    assert_eq!(reloaded.target_language, "de");
    assert_eq!(reloaded.translation.tier, TranslationTier::Fast);
    assert_eq!(reloaded.pipeline.failure_threshold, 3);
    Ok(())
}

/// Test that a config file without a pipeline section gets default settings
#[test]
fn test_loadOrCreate_withoutPipelineSection_shouldUseDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{"source_language": "en", "target_language": "fr", "translation": {}}"#,
    )?;

    let config = Config::load_or_create(&path)?;
    assert_eq!(config.pipeline.premium_batch_size, 25);
    assert_eq!(config.pipeline.progress_debounce_ms, 500);
    assert_eq!(config.translation.available_providers.len(), 0);
    assert!(!config.translation.get_model(TranslationTier::Fast).is_empty());
    Ok(())
}

/// Test that broken JSON is reported instead of being overwritten
#[test]
fn test_loadOrCreate_withBrokenJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;

    assert!(Config::load_or_create(&path).is_err());
    assert_eq!(std::fs::read_to_string(&path)?, "{ not json");
    Ok(())
}

/// Test configuration validation of language codes
#[test]
fn test_validate_withInvalidLanguages_shouldFail() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.source_language = "xyz".to_string();
    assert!(config.validate().is_err());
    config.source_language = "eng".to_string();
    assert!(config.validate().is_ok());

    config.target_language = String::new();
    assert!(config.validate().is_err());
}

/// Test provider name parsing
#[test]
fn test_translationProvider_fromStr_shouldAcceptKnownNames() {
    assert_eq!(TranslationProvider::from_str("openai").unwrap(), TranslationProvider::OpenAI);
    assert_eq!(TranslationProvider::from_str("Anthropic").unwrap(), TranslationProvider::Anthropic);
    assert!(TranslationProvider::from_str("ollama").is_err());
}
