/*!
 * # subcontext - contextual subtitle translation
 *
 * Translates subtitle cues through an LLM backend with show-aware context.
 *
 * ## Features
 *
 * - Show and episode detection from file names
 * - One research lookup per title, cached across jobs
 * - Concurrent batch translation in bounded waves with response repair
 * - Circuit breaker and offline fallback so every job produces output
 * - Re-timing of cues for the target language's reading speed
 * - Staged, debounced progress events and cancellable jobs
 *
 * ## Architecture
 *
 * - `app_config`: configuration file and pipeline settings
 * - `subtitle_processor`: cue model and minimal SRT reading/writing
 * - `translation`: the pipeline and its stages
 * - `providers`: Anthropic, OpenAI and mock clients behind one trait
 * - `app_controller`: file and folder runs for the command line
 * - `file_utils`: file system helpers
 * - `language_utils`: ISO language code utilities
 * - `errors`: error types
 */

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod subtitle_processor;
pub mod translation;

pub use app_config::Config;
pub use errors::{ProviderError, SubtitleError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use subtitle_processor::{SubtitleCollection, SubtitleCue};
pub use translation::{TranslationOutcome, TranslationPipeline, TranslationRequest, TranslationService};
