/*!
 * Prompt templates for batch translation and research.
 *
 * Batch prompts render cues as a numbered list (`1. text`). Line breaks
 * inside a cue are encoded as `\N` so one cue stays on one prompt line.
 */

use crate::translation::research::ResearchData;
use crate::translation::show_info::ShowInfo;

/// Marker standing in for a line break inside one numbered line
pub const LINE_BREAK_MARKER: &str = "\\N";

/// System prompt template for batch translation
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: &'static str,
}

impl PromptTemplate {
    /// Short instructions for the fast tier
    pub const FAST_TRANSLATOR: &'static str = r#"You are a subtitle translator. Translate subtitle lines from {source_language} to {target_language}.

{rules}"#;

    /// Context-aware instructions for the premium tier
    pub const PREMIUM_TRANSLATOR: &'static str = r#"You are an expert subtitle translator specializing in {source_language} to {target_language} translation.

## Your Role
- Translate dialogue naturally while preserving meaning, tone and register
- Use the show context below to pick the right terminology and forms of address
- Keep translations concise (subtitles have limited display time)

{rules}"#;

    const RULES: &'static str = r#"## Formatting Rules
- Keep bracketed speaker tags and sound effects such as [DOOR SLAMS] or (laughs) exactly as written
- Translate the full dialogue of every line, never a shortened portion
- Keep the \N line break markers where they appear
- Return exactly {count} numbered lines in the form "N. translation", in the same order as the input
- Do not add commentary, notes or explanations"#;

    pub fn fast() -> Self {
        Self { template: Self::FAST_TRANSLATOR }
    }

    pub fn premium() -> Self {
        Self { template: Self::PREMIUM_TRANSLATOR }
    }

    /// Render the system prompt for a batch of `count` lines
    pub fn render(&self, source_language: &str, target_language: &str, count: usize) -> String {
        self.template
            .replace("{rules}", Self::RULES)
            .replace("{source_language}", source_language)
            .replace("{target_language}", target_language)
            .replace("{count}", &count.to_string())
    }
}

/// Encode a cue text for a single prompt line
pub fn encode_line(text: &str) -> String {
    text.trim().replace("\r\n", "\n").replace('\n', LINE_BREAK_MARKER)
}

/// Restore line breaks in a translated line
pub fn decode_line(text: &str) -> String {
    text.split(LINE_BREAK_MARKER)
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Context block prepended to premium batch system prompts
pub fn research_preamble(research: &ResearchData) -> Option<String> {
    if !research.has_context() {
        return None;
    }

    let mut preamble = format!("## Show Context: {}\n", research.title);
    let mut field = |label: &str, value: &str| {
        if !value.trim().is_empty() {
            preamble.push_str(&format!("- {}: {}\n", label, value.trim()));
        }
    };
    field("Genre", &research.genre.join(", "));
    field("Plot", &research.plot);
    field("Setting", &research.setting);
    field("Cultural context", &research.cultural_context);
    field("Main characters", &research.characters.join(", "));

    if !research.translation_guidelines.is_empty() {
        preamble.push_str("- Translation guidelines:\n");
        for guideline in &research.translation_guidelines {
            preamble.push_str(&format!("  * {}\n", guideline.trim()));
        }
    }

    Some(preamble)
}

/// Full system prompt for one batch
pub fn batch_system_prompt(
    template: &PromptTemplate,
    source_language: &str,
    target_language: &str,
    count: usize,
    research: Option<&ResearchData>,
) -> String {
    let rendered = template.render(source_language, target_language, count);
    match research.and_then(research_preamble) {
        Some(preamble) => format!("{}\n\n{}", preamble, rendered),
        None => rendered,
    }
}

/// User block: the numbered lines to translate
pub fn batch_user_prompt<S: AsRef<str>>(texts: &[S], target_language: &str) -> String {
    let mut prompt = format!(
        "Translate these {} subtitle lines to {}:\n\n",
        texts.len(),
        target_language
    );
    for (i, text) in texts.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, encode_line(text.as_ref())));
    }
    prompt
}

/// User block for lines that came back untranslated
pub fn retry_user_prompt<S: AsRef<str>>(texts: &[S], target_language: &str) -> String {
    format!(
        "These lines were returned untranslated. Translate each of them fully to {}.\n\n{}",
        target_language,
        batch_user_prompt(texts, target_language)
    )
}

/// System prompt for research lookups
pub const RESEARCH_SYSTEM_PROMPT: &str = "You are a film and television researcher helping subtitle translators. \
Answer with a single JSON object and nothing else.";

/// User prompt asking for research on a title
pub fn research_prompt(show: &ShowInfo) -> String {
    let mut subject = format!("Title: {}", show.title);
    if let Some(year) = show.year {
        subject.push_str(&format!("\nYear: {}", year));
    }
    if let (Some(season), Some(episode)) = (show.season, show.episode) {
        subject.push_str(&format!("\nSeason {}, episode {}", season, episode));
    }

    format!(
        r#"{subject}

Describe this title for a subtitle translator. Return JSON with these fields:
{{
  "title": "official title",
  "genre": ["genre"],
  "plot": "short plot summary",
  "setting": "time and place",
  "characters": ["main character names"],
  "cultural_context": "slang, dialects or cultural references to watch for",
  "translation_guidelines": ["concrete advice for translating the dialogue"]
}}
Use empty strings or empty arrays for anything you do not know."#
    )
}
