use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::SubtitleError;

// @module: Minimal SRT cue model used by the pipeline

// @const: SRT timestamp regex (comma or dot millisecond separator)
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{3})")
        .expect("timestamp regex is valid")
});

/// One timed caption.
///
/// `original_text` is captured once when the cue is created and is never
/// touched by translation; `text` is what the pipeline rewrites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleCue {
    // @field: 1-based position, stable across translation
    pub index: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Current text
    pub text: String,

    // @field: Source text as parsed
    original_text: String,
}

impl SubtitleCue {
    /// Creates a cue whose original text equals its current text
    pub fn new(index: usize, start_time_ms: u64, end_time_ms: u64, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            index,
            start_time_ms,
            end_time_ms,
            original_text: text.clone(),
            text,
        }
    }

    // @creates: Validated cue
    // @validates: Time range and non-empty text
    pub fn new_validated(
        index: usize,
        start_time_ms: u64,
        end_time_ms: u64,
        text: &str,
    ) -> std::result::Result<Self, SubtitleError> {
        if end_time_ms <= start_time_ms {
            return Err(SubtitleError::InvalidTiming {
                index,
                start_ms: start_time_ms,
                end_ms: end_time_ms,
            });
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SubtitleError::Parse {
                block: index,
                message: "empty subtitle text".to_string(),
            });
        }

        Ok(Self::new(index, start_time_ms, end_time_ms, trimmed))
    }

    /// Source text as it was parsed
    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    /// Copy of this cue carrying a new text; timing and original text are kept
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }

    /// Display duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.end_time_ms.saturating_sub(self.start_time_ms)
    }

    /// Parse an SRT timestamp (`HH:MM:SS,mmm`) to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64> {
        let parts: Vec<&str> = timestamp.trim().split(&[':', ',', '.'][..]).collect();

        if parts.len() != 4 {
            return Err(anyhow::anyhow!("Invalid timestamp format: {}", timestamp));
        }

        let hours: u64 = parts[0].parse().context("Failed to parse hours")?;
        let minutes: u64 = parts[1].parse().context("Failed to parse minutes")?;
        let seconds: u64 = parts[2].parse().context("Failed to parse seconds")?;
        let millis: u64 = parts[3].parse().context("Failed to parse milliseconds")?;

        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(anyhow::anyhow!("Invalid time components in timestamp: {}", timestamp));
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }
}

impl fmt::Display for SubtitleCue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.index)?;
        writeln!(
            f,
            "{} --> {}",
            Self::format_timestamp(self.start_time_ms),
            Self::format_timestamp(self.end_time_ms)
        )?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Cues loaded from one subtitle file
#[derive(Debug, Clone)]
pub struct SubtitleCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// Ordered cues
    pub cues: Vec<SubtitleCue>,

    /// Source language
    pub source_language: String,
}

impl SubtitleCollection {
    /// Create an empty collection
    pub fn new(source_file: PathBuf, source_language: String) -> Self {
        Self {
            source_file,
            cues: Vec::new(),
            source_language,
        }
    }

    /// Load and parse an SRT file
    pub fn from_srt_file<P: AsRef<Path>>(path: P, source_language: &str) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;
        let cues = Self::parse_srt_string(&content)
            .with_context(|| format!("Failed to parse subtitle file: {}", path.display()))?;

        Ok(Self {
            source_file: path.to_path_buf(),
            cues,
            source_language: source_language.to_string(),
        })
    }

    /// File name of the source, used for show-info extraction
    pub fn file_name(&self) -> Option<String> {
        self.source_file
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
    }

    /// Write cues to an SRT file
    pub fn write_to_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let mut file = File::create(path)
            .with_context(|| format!("Failed to create subtitle file: {}", path.display()))?;

        for cue in &self.cues {
            write!(file, "{}", cue)?;
        }

        Ok(())
    }

    /// Parse SRT content into validated, renumbered cues.
    ///
    /// Invalid blocks are skipped with a warning; content without a single
    /// usable block is rejected as empty input.
    pub fn parse_srt_string(content: &str) -> std::result::Result<Vec<SubtitleCue>, SubtitleError> {
        let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
        let mut cues = Vec::new();

        for (block_no, block) in content.split("\n\n").filter(|b| !b.trim().is_empty()).enumerate() {
            match Self::parse_block(block) {
                Ok(cue) => cues.push(cue),
                Err(e) => warn!("Skipping subtitle block {}: {}", block_no + 1, e),
            }
        }

        if cues.is_empty() {
            return Err(SubtitleError::EmptyInput);
        }

        cues.sort_by_key(|cue| cue.start_time_ms);

        let overlaps = cues
            .windows(2)
            .filter(|pair| pair[0].end_time_ms > pair[1].start_time_ms)
            .count();
        if overlaps > 0 {
            debug!("Found {} overlapping subtitle entries", overlaps);
        }

        for (i, cue) in cues.iter_mut().enumerate() {
            cue.index = i + 1;
        }

        Ok(cues)
    }

    fn parse_block(block: &str) -> std::result::Result<SubtitleCue, SubtitleError> {
        let mut lines = block.lines().map(str::trim).skip_while(|l| l.is_empty());

        let first = lines.next().unwrap_or_default();
        let index = first.parse::<usize>().map_err(|_| SubtitleError::Parse {
            block: 0,
            message: format!("expected sequence number, found '{}'", first),
        })?;

        let timing = lines.next().unwrap_or_default();
        let caps = TIMESTAMP_REGEX.captures(timing).ok_or_else(|| SubtitleError::Parse {
            block: index,
            message: format!("invalid timing line '{}'", timing),
        })?;
        let start_ms = Self::captured_ms(&caps, 1);
        let end_ms = Self::captured_ms(&caps, 5);

        let text = lines.collect::<Vec<_>>().join("\n");
        SubtitleCue::new_validated(index, start_ms, end_ms, &text)
    }

    fn captured_ms(caps: &regex::Captures, start_idx: usize) -> u64 {
        let part = |i: usize| -> u64 {
            caps.get(start_idx + i)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0)
        };
        part(0) * 3_600_000 + part(1) * 60_000 + part(2) * 1_000 + part(3)
    }
}
