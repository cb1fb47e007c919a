/*!
 * Offline fallback translator.
 *
 * Used when no provider is configured or the circuit breaker trips. It
 * walks through the same progress stages as a real run and produces
 * deterministic text: a few known phrases per language, everything else
 * passed through with a language tag such as `[CS] Hello there`.
 */

use log::info;
use std::time::Duration;

use crate::subtitle_processor::SubtitleCue;
use crate::translation::progress::{ProgressReporter, ProgressStage, translating_progress};

/// Known phrases per target language (ISO 639-1)
static PHRASES: &[(&str, &[(&str, &str)])] = &[
    (
        "cs",
        &[
            ("hello", "Ahoj"),
            ("hi", "Ahoj"),
            ("goodbye", "Na shledanou"),
            ("thank you", "Děkuji"),
            ("thanks", "Díky"),
            ("yes", "Ano"),
            ("no", "Ne"),
            ("please", "Prosím"),
            ("sorry", "Promiň"),
            ("good morning", "Dobré ráno"),
            ("good night", "Dobrou noc"),
            ("what", "Co"),
            ("okay", "Dobře"),
        ],
    ),
    (
        "de",
        &[
            ("hello", "Hallo"),
            ("hi", "Hallo"),
            ("goodbye", "Auf Wiedersehen"),
            ("thank you", "Danke"),
            ("yes", "Ja"),
            ("no", "Nein"),
            ("please", "Bitte"),
            ("sorry", "Entschuldigung"),
            ("good morning", "Guten Morgen"),
            ("good night", "Gute Nacht"),
            ("what", "Was"),
        ],
    ),
    (
        "fr",
        &[
            ("hello", "Bonjour"),
            ("hi", "Salut"),
            ("goodbye", "Au revoir"),
            ("thank you", "Merci"),
            ("yes", "Oui"),
            ("no", "Non"),
            ("please", "S'il vous plaît"),
            ("sorry", "Désolé"),
            ("good night", "Bonne nuit"),
            ("what", "Quoi"),
        ],
    ),
    (
        "es",
        &[
            ("hello", "Hola"),
            ("hi", "Hola"),
            ("goodbye", "Adiós"),
            ("thank you", "Gracias"),
            ("yes", "Sí"),
            ("no", "No"),
            ("please", "Por favor"),
            ("sorry", "Lo siento"),
            ("good morning", "Buenos días"),
            ("good night", "Buenas noches"),
            ("what", "Qué"),
        ],
    ),
];

fn language_key(target_language: &str) -> String {
    crate::language_utils::normalize_to_part1_or_part2t(target_language)
        .unwrap_or_else(|_| target_language.to_lowercase())
}

fn translate_line(line: &str, language: &str, tag: &str) -> String {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let core = trimmed.trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ',' | '…'));
    let punctuation = &trimmed[core.len()..];

    let known = PHRASES
        .iter()
        .find(|(code, _)| *code == language)
        .and_then(|(_, phrases)| {
            phrases
                .iter()
                .find(|(source, _)| source.eq_ignore_ascii_case(core))
                .map(|(_, target)| *target)
        });

    match known {
        Some(target) => format!("{}{}", target, punctuation),
        None => format!("[{}] {}", tag, trimmed),
    }
}

/// Deterministic placeholder translation of one cue text
pub fn placeholder_translation(text: &str, target_language: &str) -> String {
    let language = language_key(target_language);
    let tag = language.to_uppercase();
    text.lines()
        .map(|line| translate_line(line, &language, &tag))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Never-failing translator with simulated stages
#[derive(Debug, Clone)]
pub struct FallbackTranslator {
    stage_delay: Duration,
}

impl FallbackTranslator {
    pub fn new(stage_delay: Duration) -> Self {
        Self { stage_delay }
    }

    async fn pause(&self) {
        if !self.stage_delay.is_zero() {
            tokio::time::sleep(self.stage_delay).await;
        }
    }

    /// Placeholder text for every cue, without progress or delays
    pub fn translate_cues(cues: &[SubtitleCue], target_language: &str) -> Vec<SubtitleCue> {
        cues.iter()
            .map(|cue| cue.with_text(placeholder_translation(cue.original_text(), target_language)))
            .collect()
    }

    /// Translate every cue with placeholder text, emitting the staged
    /// progress sequence up to `finalizing`
    pub async fn translate(
        &self,
        cues: &[SubtitleCue],
        target_language: &str,
        reporter: &mut ProgressReporter,
    ) -> Vec<SubtitleCue> {
        info!("Using offline fallback translator for {} entries", cues.len());

        for (stage, details) in [
            (ProgressStage::Analyzing, "Analyzing subtitles (offline mode)"),
            (ProgressStage::Researching, "Skipping research (offline mode)"),
            (ProgressStage::AnalyzingContent, "Analyzing content (offline mode)"),
        ] {
            reporter.stage(stage, Some(details.to_string()));
            self.pause().await;
        }

        reporter.stage(ProgressStage::Translating, Some("Translating (offline mode)".to_string()));
        let translated = Self::translate_cues(cues, target_language);
        self.pause().await;
        reporter.stage_at(ProgressStage::Translating, translating_progress(1, 1), None);

        reporter.stage(ProgressStage::Finalizing, None);
        self.pause().await;

        translated
    }
}
