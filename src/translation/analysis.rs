use serde::{Deserialize, Serialize};

use crate::subtitle_processor::SubtitleCue;

/// Text longer than this many characters counts as dialogue
const DIALOGUE_MIN_CHARS: usize = 10;

/// Corpus statistics used to annotate progress output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentStatistics {
    pub total_entries: usize,
    pub dialogue_lines: usize,
    pub questions: usize,
    pub exclamations: usize,
}

impl ContentStatistics {
    /// Lines too short to be dialogue (sound effects, interjections)
    pub fn action_lines(&self) -> usize {
        self.total_entries - self.dialogue_lines
    }

    /// One-line summary for progress details
    pub fn describe(&self) -> String {
        format!(
            "{} entries: {} dialogue, {} action/sound, {} questions, {} exclamations",
            self.total_entries,
            self.dialogue_lines,
            self.action_lines(),
            self.questions,
            self.exclamations
        )
    }
}

/// Count dialogue lines, questions and exclamations
pub fn analyze(cues: &[SubtitleCue]) -> ContentStatistics {
    cues.iter().fold(
        ContentStatistics {
            total_entries: cues.len(),
            ..Default::default()
        },
        |mut stats, cue| {
            let text = cue.original_text();
            if text.chars().count() > DIALOGUE_MIN_CHARS {
                stats.dialogue_lines += 1;
            }
            if text.contains('?') {
                stats.questions += 1;
            }
            if text.contains('!') {
                stats.exclamations += 1;
            }
            stats
        },
    )
}
