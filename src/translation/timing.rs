/*!
 * Subtitle re-timing for the target language's reading speed.
 *
 * Only `end_time_ms` is ever changed. The full model blends language,
 * length, word and compactness ratios; English-sourced premium jobs take a
 * fast path that trusts the source timing and only extends long lines.
 */

use log::debug;

use crate::app_config::TranslationTier;
use crate::language_utils;
use crate::subtitle_processor::SubtitleCue;

/// Per-language reading constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LanguageProfile {
    /// ISO 639-1 code (639-2/T where no 2-letter code exists)
    pub code: &'static str,
    /// Comfortable reading speed in words per minute
    pub reading_speed_wpm: f64,
    /// Average word length in characters
    pub avg_word_length: f64,
    pub syllables_per_word: f64,
    /// Characters needed relative to English for the same content
    pub compactness: f64,
    /// Display time relative to English
    pub timing_multiplier: f64,
}

const fn profile(
    code: &'static str,
    reading_speed_wpm: f64,
    avg_word_length: f64,
    syllables_per_word: f64,
    compactness: f64,
    timing_multiplier: f64,
) -> LanguageProfile {
    LanguageProfile {
        code,
        reading_speed_wpm,
        avg_word_length,
        syllables_per_word,
        compactness,
        timing_multiplier,
    }
}

/// Fallback for unknown codes
pub const ENGLISH: LanguageProfile = profile("en", 238.0, 4.7, 1.5, 1.0, 1.0);

static PROFILES: &[LanguageProfile] = &[
    ENGLISH,
    profile("cs", 200.0, 5.2, 1.9, 0.92, 1.15),
    profile("sk", 200.0, 5.3, 1.9, 0.93, 1.15),
    profile("pl", 195.0, 6.0, 2.1, 0.95, 1.18),
    profile("de", 205.0, 6.3, 1.9, 1.05, 1.12),
    profile("nl", 215.0, 5.4, 1.7, 1.02, 1.08),
    profile("fr", 220.0, 5.0, 1.6, 1.12, 1.08),
    profile("es", 225.0, 4.9, 2.0, 1.10, 1.07),
    profile("it", 225.0, 5.1, 2.1, 1.08, 1.06),
    profile("pt", 220.0, 4.9, 2.0, 1.10, 1.07),
    profile("ro", 215.0, 5.2, 2.0, 1.06, 1.08),
    profile("ru", 195.0, 6.2, 2.3, 0.98, 1.15),
    profile("uk", 195.0, 6.0, 2.3, 0.98, 1.15),
    profile("bg", 200.0, 5.7, 2.2, 1.00, 1.12),
    profile("sr", 200.0, 5.5, 2.1, 0.95, 1.12),
    profile("hr", 200.0, 5.5, 2.1, 0.95, 1.12),
    profile("sl", 200.0, 5.4, 2.0, 0.95, 1.12),
    profile("hu", 190.0, 6.5, 2.4, 1.00, 1.18),
    profile("fi", 180.0, 7.5, 2.7, 0.98, 1.22),
    profile("et", 185.0, 6.8, 2.5, 0.97, 1.20),
    profile("sv", 220.0, 5.3, 1.7, 0.98, 1.05),
    profile("da", 220.0, 5.2, 1.7, 0.98, 1.05),
    profile("no", 220.0, 5.2, 1.7, 0.98, 1.05),
    profile("el", 200.0, 5.8, 2.4, 1.08, 1.12),
    profile("tr", 195.0, 6.3, 2.5, 0.98, 1.15),
    profile("ar", 180.0, 5.1, 2.2, 0.85, 1.20),
    profile("he", 190.0, 4.8, 2.1, 0.80, 1.15),
    profile("hi", 185.0, 4.5, 2.0, 1.02, 1.15),
    profile("zh", 158.0, 1.5, 1.0, 0.35, 1.10),
    profile("ja", 193.0, 2.0, 1.8, 0.50, 1.10),
    profile("ko", 180.0, 3.0, 2.2, 0.60, 1.12),
    profile("vi", 210.0, 3.5, 1.0, 1.10, 1.08),
    profile("th", 180.0, 4.0, 1.8, 0.90, 1.15),
    profile("id", 215.0, 6.0, 2.6, 1.15, 1.08),
];

/// Profile for a language code, English when unknown
pub fn profile_for(code: &str) -> &'static LanguageProfile {
    let normalized = language_utils::normalize_to_part1_or_part2t(code).unwrap_or_else(|_| code.to_lowercase());
    let normalized = if normalized == "nb" || normalized == "nn" { "no".to_string() } else { normalized };

    PROFILES.iter().find(|p| p.code == normalized).unwrap_or(&PROFILES[0])
}

fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3040..=0x30FF   // kana
        | 0x3400..=0x4DBF // CJK extension A
        | 0x4E00..=0x9FFF // CJK unified
        | 0xAC00..=0xD7AF // hangul syllables
        | 0xF900..=0xFAFF)
}

/// Words in a text; every CJK character counts as one word
pub fn word_count(text: &str) -> usize {
    text.split_whitespace()
        .map(|token| {
            let cjk = token.chars().filter(|c| is_cjk(*c)).count();
            let has_other = token.chars().any(|c| c.is_alphanumeric() && !is_cjk(c));
            cjk + usize::from(has_other)
        })
        .sum()
}

/// Text length in characters, spaces included
fn char_count(text: &str) -> usize {
    text.chars().count()
}

/// Allowed display duration for `words` words: `[floor, ceiling]` in ms.
///
/// Above 26 words the floor passes the 8 s cap and wins.
pub fn duration_bounds(words: usize) -> (u64, u64) {
    let words = words as u64;
    let floor = (words * 300).max(800);
    let ceiling = (words * 1200).min(8000).max(floor);
    (floor, ceiling)
}

/// Lowest and highest ratio used for duration blending
pub const RATIO_RANGE: (f64, f64) = (0.5, 2.5);

/// Ratio changes below this are ignored
const STABILITY_THRESHOLD: f64 = 0.1;

/// Fast path: translations up to this much longer keep their timing
const FAST_PATH_TOLERANCE: f64 = 1.3;

/// Fast path: largest extension in ms
const FAST_PATH_MAX_EXTENSION_MS: u64 = 800;

/// Re-times cues for one language pair
#[derive(Debug, Clone)]
pub struct TimingAdjuster {
    source: &'static LanguageProfile,
    target: &'static LanguageProfile,
    fast_path: bool,
}

impl TimingAdjuster {
    /// Full ratio model for a language pair
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            source: profile_for(source_language),
            target: profile_for(target_language),
            fast_path: false,
        }
    }

    /// Adjuster for a pipeline run; English sources in the premium tier use the fast path
    pub fn for_job(source_language: &str, target_language: &str, tier: TranslationTier) -> Self {
        Self {
            fast_path: tier == TranslationTier::Premium && language_utils::is_english(source_language),
            ..Self::new(source_language, target_language)
        }
    }

    pub fn uses_fast_path(&self) -> bool {
        self.fast_path
    }

    /// Blended, clamped duration ratio for a translation
    pub fn final_ratio(&self, original: &str, translated: &str) -> f64 {
        let language_ratio = self.target.timing_multiplier / self.source.timing_multiplier;

        let original_chars = char_count(original);
        let length_ratio = if original_chars == 0 {
            1.0
        } else {
            char_count(translated) as f64 / original_chars as f64
        };

        let original_words = word_count(original);
        let word_ratio = if original_words == 0 {
            1.0
        } else {
            word_count(translated) as f64 / original_words as f64
        };

        let compactness_ratio = self.target.compactness / self.source.compactness;

        let blended = 0.4 * language_ratio + 0.3 * length_ratio + 0.2 * word_ratio + 0.1 * compactness_ratio;
        blended.clamp(RATIO_RANGE.0, RATIO_RANGE.1)
    }

    /// Time a reader of the target language needs for `text`, in ms
    pub fn optimal_duration_ms(&self, text: &str) -> f64 {
        let chars_per_second = self.target.avg_word_length * self.target.reading_speed_wpm / 60.0;
        char_count(text) as f64 / chars_per_second * 1000.0
    }

    /// Re-time a cue against its own original text
    pub fn adjust(&self, cue: &SubtitleCue) -> SubtitleCue {
        self.adjust_with_original(cue, cue.original_text())
    }

    /// Re-time a cue whose current text translates `original_text`
    pub fn adjust_with_original(&self, cue: &SubtitleCue, original_text: &str) -> SubtitleCue {
        if cue.text == original_text {
            return cue.clone();
        }

        let new_duration = if self.fast_path {
            self.fast_path_duration(cue, original_text)
        } else {
            self.blended_duration(cue, original_text)
        };

        match new_duration {
            Some(duration) if duration != cue.duration_ms() => {
                debug!(
                    "Cue {}: duration {}ms -> {}ms",
                    cue.index,
                    cue.duration_ms(),
                    duration
                );
                let mut adjusted = cue.clone();
                adjusted.end_time_ms = cue.start_time_ms + duration;
                adjusted
            }
            _ => cue.clone(),
        }
    }

    fn blended_duration(&self, cue: &SubtitleCue, original_text: &str) -> Option<u64> {
        let ratio = self.final_ratio(original_text, &cue.text);
        if (ratio - 1.0).abs() < STABILITY_THRESHOLD {
            return None;
        }

        let scaled = cue.duration_ms() as f64 * ratio;
        let blended = 0.7 * scaled + 0.3 * self.optimal_duration_ms(&cue.text);

        let (floor, ceiling) = duration_bounds(word_count(&cue.text));
        Some((blended.round() as u64).clamp(floor, ceiling))
    }

    fn fast_path_duration(&self, cue: &SubtitleCue, original_text: &str) -> Option<u64> {
        let original_chars = char_count(original_text) as f64;
        let translated_chars = char_count(&cue.text) as f64;
        if translated_chars <= original_chars * FAST_PATH_TOLERANCE {
            return None;
        }

        let ms_per_char = 60_000.0 / (self.target.reading_speed_wpm * self.target.avg_word_length);
        let excess = translated_chars - original_chars;
        let extension = ((excess * ms_per_char).round() as u64).min(FAST_PATH_MAX_EXTENSION_MS);
        Some(cue.duration_ms() + extension)
    }

    /// Re-time every cue, returning how many changed
    pub fn adjust_all(&self, cues: &[SubtitleCue]) -> (Vec<SubtitleCue>, usize) {
        let adjusted: Vec<SubtitleCue> = cues.iter().map(|cue| self.adjust(cue)).collect();
        let changed = adjusted
            .iter()
            .zip(cues)
            .filter(|(a, b)| a.end_time_ms != b.end_time_ms)
            .count();
        (adjusted, changed)
    }
}

/// Re-time one cue with the full ratio model
pub fn adjust_cue(cue: &SubtitleCue, original_text: &str, source_language: &str, target_language: &str) -> SubtitleCue {
    TimingAdjuster::new(source_language, target_language).adjust_with_original(cue, original_text)
}
