use anyhow::{Context, Result, anyhow};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::app_config::Config;
use crate::errors::TranslationError;
use crate::file_utils::FileManager;
use crate::subtitle_processor::SubtitleCollection;
use crate::translation::cache::ResearchCache;
use crate::translation::jobs::JobRegistry;
use crate::translation::pipeline::{TranslationMode, TranslationOutcome, TranslationPipeline, TranslationRequest};
use crate::translation::progress::{ProgressEvent, ProgressReporter};

// @module: Application controller for subtitle files and folders

/// How progress events are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressOutput {
    /// Terminal progress bar
    #[default]
    Bar,
    /// One JSON object per event on stdout
    JsonLines,
    /// Nothing
    Hidden,
}

/// Result of a folder run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderSummary {
    pub translated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Main application controller for subtitle translation
pub struct Controller {
    // @field: App configuration
    config: Config,

    pipeline: TranslationPipeline,

    jobs: JobRegistry,

    progress: ProgressOutput,

    multi_progress: MultiProgress,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let pipeline = TranslationPipeline::from_config(&config, ResearchCache::new());
        Ok(Self::with_pipeline(config, pipeline))
    }

    /// Create a controller around an existing pipeline
    pub fn with_pipeline(config: Config, pipeline: TranslationPipeline) -> Self {
        Self {
            config,
            pipeline,
            jobs: JobRegistry::new(),
            progress: ProgressOutput::default(),
            multi_progress: MultiProgress::new(),
        }
    }

    /// Choose how progress is displayed
    pub fn with_progress_output(mut self, progress: ProgressOutput) -> Self {
        self.progress = progress;
        self
    }

    /// Jobs started by this controller; cancel through it
    pub fn jobs(&self) -> &JobRegistry {
        &self.jobs
    }

    pub fn pipeline(&self) -> &TranslationPipeline {
        &self.pipeline
    }

    /// Translate one subtitle file into `output_dir`.
    ///
    /// Returns the written path, or `None` when the output exists and
    /// `force_overwrite` is off.
    pub async fn run(&self, input_file: PathBuf, output_dir: PathBuf, force_overwrite: bool) -> Result<Option<PathBuf>> {
        let start_time = Instant::now();

        if !FileManager::file_exists(&input_file) {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }

        let output_path = FileManager::generate_output_path(&input_file, &output_dir, &self.config.target_language);
        if output_path.exists() && !force_overwrite {
            warn!(
                "Skipping {:?}, translation already exists (use -f to force overwrite)",
                input_file
            );
            return Ok(None);
        }

        FileManager::ensure_dir(&output_dir)?;

        let subtitles = SubtitleCollection::from_srt_file(&input_file, &self.config.source_language)?;
        info!("Loaded {} entries from {:?}", subtitles.cues.len(), input_file);

        let outcome = self.translate_collection(&subtitles).await?;
        if let TranslationMode::Degraded(reason) = &outcome.mode {
            warn!("Output for {:?} is a placeholder translation: {}", input_file, reason);
        }

        let translated = SubtitleCollection {
            source_file: output_path.clone(),
            cues: outcome.cues,
            source_language: self.config.target_language.clone(),
        };
        translated.write_to_srt(&output_path)?;

        info!(
            "Success: {} ({})",
            output_path.display(),
            Self::format_duration(start_time.elapsed())
        );
        debug!("{}", self.pipeline.service().usage().summary());

        Ok(Some(output_path))
    }

    /// Run the pipeline over an already loaded collection
    pub async fn translate_collection(&self, subtitles: &SubtitleCollection) -> Result<TranslationOutcome> {
        let job = self.jobs.create();
        let (mut reporter, receiver) =
            ProgressReporter::channel(Duration::from_millis(self.config.pipeline.progress_debounce_ms));
        let display = self.spawn_progress_display(receiver);

        let file_name = subtitles.file_name();
        let request = TranslationRequest {
            cues: &subtitles.cues,
            source_language: &subtitles.source_language,
            target_language: &self.config.target_language,
            file_name: file_name.as_deref(),
        };

        let result = self.pipeline.translate(request, &mut reporter, &job).await;

        drop(reporter);
        if let Err(e) = display.await {
            debug!("Progress display task ended abnormally: {}", e);
        }
        self.jobs.prune_finished();

        result.with_context(|| format!("Translation of {:?} failed", subtitles.source_file))
    }

    fn spawn_progress_display(&self, mut receiver: UnboundedReceiver<ProgressEvent>) -> JoinHandle<()> {
        match self.progress {
            ProgressOutput::Bar => {
                let bar = self.multi_progress.add(ProgressBar::new(100));
                let style = ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar());
                bar.set_style(style.progress_chars("█▓▒░"));

                tokio::spawn(async move {
                    while let Some(event) = receiver.recv().await {
                        bar.set_position(event.progress as u64);
                        match event.details {
                            Some(details) => bar.set_message(format!("{}: {}", event.stage, details)),
                            None => bar.set_message(event.stage.to_string()),
                        }
                    }
                    bar.finish_and_clear();
                })
            }
            ProgressOutput::JsonLines => tokio::spawn(async move {
                while let Some(event) = receiver.recv().await {
                    match serde_json::to_string(&event) {
                        Ok(line) => println!("{}", line),
                        Err(e) => debug!("Cannot serialize progress event: {}", e),
                    }
                }
            }),
            ProgressOutput::Hidden => tokio::spawn(async move { while receiver.recv().await.is_some() {} }),
        }
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }

    /// Translate every `.srt` file under a directory, next to its source.
    /// Files in the target language already are skipped.
    pub async fn run_folder(&self, input_dir: PathBuf, force_overwrite: bool) -> Result<FolderSummary> {
        let start_time = Instant::now();

        if !FileManager::dir_exists(&input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let target_suffix = format!(".{}.srt", self.config.target_language);
        let files: Vec<PathBuf> = FileManager::find_files(&input_dir, "srt")?
            .into_iter()
            .filter(|f| !f.to_string_lossy().ends_with(&target_suffix))
            .collect();

        if files.is_empty() {
            return Err(anyhow!("No subtitle files found in directory: {:?}", input_dir));
        }

        let folder_pb = match self.progress {
            ProgressOutput::Bar => {
                let pb = self.multi_progress.add(ProgressBar::new(files.len() as u64));
                let style = ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar());
                pb.set_style(style.progress_chars("█▓▒░"));
                pb
            }
            _ => ProgressBar::hidden(),
        };

        let mut summary = FolderSummary::default();

        for file in &files {
            let file_name = file
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(file_name.clone());

            let output_dir = file.parent().map(Path::to_path_buf).unwrap_or_else(|| input_dir.clone());

            match self.run(file.clone(), output_dir, force_overwrite).await {
                Ok(Some(_)) => summary.translated += 1,
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    error!("Error processing file {}: {:#}", file_name, e);
                    summary.failed += 1;
                    if matches!(e.downcast_ref::<TranslationError>(), Some(TranslationError::Cancelled(_))) {
                        warn!("Cancelled, stopping folder run");
                        break;
                    }
                }
            }

            folder_pb.inc(1);
        }

        folder_pb.finish_and_clear();

        info!(
            "Folder processing completed in {}: {} translated, {} skipped, {} errors",
            Self::format_duration(start_time.elapsed()),
            summary.translated,
            summary.skipped,
            summary.failed
        );

        Ok(summary)
    }
}
