/*!
 * Research engine: descriptive context about a title.
 *
 * One low-effort LLM call per title asks for a JSON description (genre,
 * characters, setting, guidelines). Results are cached per normalized title;
 * any failure degrades to an empty context instead of an error.
 */

use log::{info, warn};
use serde::{Deserialize, Deserializer, Serialize};

use crate::app_config::TranslationTier;
use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, ReasoningEffort};
use crate::translation::cache::ResearchCache;
use crate::translation::core::TranslationService;
use crate::translation::prompts;
use crate::translation::show_info::ShowInfo;

/// Completion limit for the research answer
const RESEARCH_MAX_TOKENS: u32 = 1500;

/// Contextual metadata about a title
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchData {
    pub title: String,
    pub plot: String,
    pub setting: String,
    #[serde(alias = "culturalContext")]
    pub cultural_context: String,
    #[serde(deserialize_with = "string_or_list")]
    pub genre: Vec<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub characters: Vec<String>,
    #[serde(alias = "translationGuidelines", deserialize_with = "string_or_list")]
    pub translation_guidelines: Vec<String>,
}

impl ResearchData {
    /// Context-free placeholder for a title
    pub fn unknown(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Whether anything beyond the title is known
    pub fn has_context(&self) -> bool {
        !(self.plot.is_empty()
            && self.setting.is_empty()
            && self.cultural_context.is_empty()
            && self.genre.is_empty()
            && self.characters.is_empty()
            && self.translation_guidelines.is_empty())
    }
}

/// Accept `"drama"` as well as `["drama"]`; `null` becomes empty
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<serde_json::Value>),
        Null,
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) if s.trim().is_empty() => Vec::new(),
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(values) => values
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        OneOrMany::Null => Vec::new(),
    })
}

/// Remove markdown code fences and surrounding chatter around a JSON object
pub fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```JSON"))
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```").trim())
        .unwrap_or(trimmed);

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if end > start => &unfenced[start..=end],
        _ => unfenced,
    }
}

/// Parse a research answer; missing fields take defaults
pub fn parse_research_response(response: &str) -> Result<ResearchData, ProviderError> {
    let json = strip_code_fences(response);
    serde_json::from_str::<ResearchData>(json)
        .map_err(|e| ProviderError::ParseError(format!("Invalid research JSON: {}", e)))
}

/// Looks up and caches research context for titles
#[derive(Debug, Clone)]
pub struct ResearchEngine {
    service: TranslationService,
    cache: ResearchCache,
}

impl ResearchEngine {
    pub fn new(service: TranslationService, cache: ResearchCache) -> Self {
        Self { service, cache }
    }

    /// The store backing this engine
    pub fn cache(&self) -> &ResearchCache {
        &self.cache
    }

    /// Research a title. Never fails; unknown titles yield an empty context.
    pub async fn research(&self, show: &ShowInfo) -> ResearchData {
        if show.title.trim().is_empty() || !self.service.has_provider() {
            return ResearchData::unknown(show.title.clone());
        }

        let key = show.research_key();
        match self.cache.get_or_try_init(&key, || self.lookup(show)).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Research for '{}' failed, continuing without context: {}", show.label(), e);
                ResearchData::unknown(show.title.clone())
            }
        }
    }

    async fn lookup(&self, show: &ShowInfo) -> Result<ResearchData, ProviderError> {
        info!("Researching '{}'", show.label());

        let request = CompletionRequest::new(
            self.service.model(TranslationTier::Premium),
            prompts::research_prompt(show),
        )
        .system(prompts::RESEARCH_SYSTEM_PROMPT)
        .max_tokens(RESEARCH_MAX_TOKENS)
        .reasoning_effort(ReasoningEffort::Low);

        let completion = self.service.complete(request).await?;
        let mut data = parse_research_response(&completion.text)?;
        if data.title.trim().is_empty() {
            data.title = show.title.clone();
        }
        Ok(data)
    }
}
