/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use std::path::Path;

use subcontext::file_utils::FileManager;
use crate::common;

/// Test that file_exists distinguishes files from directories
#[test]
fn test_fileExists_withFileAndDirectory_shouldOnlyAcceptFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "exists.srt", "content")?;

    assert!(FileManager::file_exists(&test_file));
    assert!(!FileManager::file_exists(temp_dir.path()));
    assert!(FileManager::dir_exists(temp_dir.path()));
    assert!(!FileManager::file_exists("non_existent_file.tmp"));
    Ok(())
}

/// Test that a language part in the input name is replaced
#[test]
fn test_generateOutputPath_withLanguagePart_shouldReplaceIt() {
    let output = FileManager::generate_output_path(Path::new("/in/Dark.S01E01.en.srt"), Path::new("/out"), "cs");
    assert_eq!(output, Path::new("/out/Dark.S01E01.cs.srt"));

    let output = FileManager::generate_output_path(Path::new("/in/Dark.S01E01.eng.srt"), Path::new("/out"), "de");
    assert_eq!(output, Path::new("/out/Dark.S01E01.de.srt"));
}

/// Test that a name without a language part gets one appended
#[test]
fn test_generateOutputPath_withoutLanguagePart_shouldAppend() {
    let output = FileManager::generate_output_path(Path::new("/in/movie.srt"), Path::new("/out"), "fr");
    assert_eq!(output, Path::new("/out/movie.fr.srt"));

    let output = FileManager::generate_output_path(Path::new("/in/Show.S01E02.srt"), Path::new("/out"), "fr");
    assert_eq!(output, Path::new("/out/Show.S01E02.fr.srt"));
}

/// Test that find_files walks subdirectories and ignores other extensions
#[test]
fn test_findFiles_withNestedDirectories_shouldFindSortedMatches() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let season = temp_dir.path().join("Season 1");
    FileManager::ensure_dir(&season)?;

    common::create_test_subtitle(&season, "b.srt")?;
    common::create_test_subtitle(temp_dir.path(), "a.SRT")?;
    common::create_test_file(temp_dir.path(), "notes.txt", "ignore me")?;

    let files = FileManager::find_files(temp_dir.path(), ".srt")?;
    assert_eq!(files.len(), 2);
    assert!(files.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(files.iter().all(|f| FileManager::is_subtitle_file(f)));
    Ok(())
}

/// Test that write_to_file creates missing parent directories
#[test]
fn test_writeToFile_withMissingParent_shouldCreateIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("nested").join("deeper").join("out.srt");

    FileManager::write_to_file(&path, "1\n00:00:01,000 --> 00:00:02,000\nHi\n")?;

    assert_eq!(FileManager::read_to_string(&path)?, "1\n00:00:01,000 --> 00:00:02,000\nHi\n");
    Ok(())
}
