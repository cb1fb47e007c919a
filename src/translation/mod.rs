/*!
 * Contextual subtitle translation.
 *
 * - `show_info`: show and episode detection from file names
 * - `research`, `cache`: research context per title and its store
 * - `analysis`: content statistics for progress details
 * - `batch`, `concurrency`: the wave-based batch orchestrator and its tier tuning
 * - `prompts`, `response`, `validation`: prompt building, response repair, suspect lines
 * - `timing`: re-timing for the target language's reading speed
 * - `fallback`: offline translator used when no provider is available
 * - `progress`, `jobs`: progress stream and cancellable job handles
 * - `pipeline`: the stages above wired together
 */

pub use self::batch::{BatchResult, BatchStatistics, BatchTranslator};
pub use self::cache::ResearchCache;
pub use self::core::TranslationService;
pub use self::jobs::{JobHandle, JobRegistry, JobStatus};
pub use self::pipeline::{TranslationMode, TranslationOutcome, TranslationPipeline, TranslationRequest};
pub use self::progress::{ProgressEvent, ProgressReporter, ProgressStage};
pub use self::research::{ResearchData, ResearchEngine};
pub use self::show_info::{ShowInfo, extract_show_info};
pub use self::timing::TimingAdjuster;

pub mod analysis;
pub mod batch;
pub mod cache;
pub mod concurrency;
pub mod core;
pub mod fallback;
pub mod jobs;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod research;
pub mod response;
pub mod show_info;
pub mod timing;
pub mod validation;
