#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use subcontext::app_config::{self, Config, ProviderConfig, TranslationProvider, TranslationTier};
use subcontext::app_controller::{Controller, ProgressOutput};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Anthropic,
    #[value(name = "openai")]
    OpenAI,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum CliTier {
    Fast,
    Premium,
}

impl From<CliTier> for TranslationTier {
    fn from(tier: CliTier) -> Self {
        match tier {
            CliTier::Fast => TranslationTier::Fast,
            CliTier::Premium => TranslationTier::Premium,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate an SRT file or every SRT file under a directory
    Translate(TranslateArgs),

    /// Generate shell completions for subcontext
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input SRT file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Output directory (defaults to the input file's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for the selected tier
    #[arg(short, long)]
    model: Option<String>,

    /// Translation tier
    #[arg(long, value_enum)]
    tier: Option<CliTier>,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'cs', 'de', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Print progress events as JSON lines instead of a progress bar
    #[arg(long)]
    progress_json: bool,
}

/// subcontext - contextual subtitle translation
///
/// Detects the show from the file name, researches it once, and translates
/// subtitles in concurrent batches with an LLM provider.
#[derive(Parser, Debug)]
#[command(name = "subcontext")]
#[command(version)]
#[command(about = "Contextual subtitle translation with LLM providers")]
#[command(long_about = "subcontext translates SRT subtitles with show-aware context.

EXAMPLES:
    subcontext translate show.S01E02.en.srt            # Translate using default config
    subcontext translate -t de --tier fast show.srt    # Fast tier to German
    subcontext translate -p openai -m gpt-4.1 show.srt # Specific provider and model
    subcontext translate --progress-json show.srt      # Machine-readable progress
    subcontext translate -l debug /subtitles/          # Whole directory with debug logging
    subcontext completions bash > subcontext.bash      # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file doesn't exist,
    a default one is created. API keys may also come from ANTHROPIC_API_KEY or
    OPENAI_API_KEY. Without a key, output is produced by the offline fallback.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger; the effective level is `log::max_level`
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger::new(LevelFilter::Trace)))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subcontext", &mut std::io::stdout());
            Ok(())
        }
        Commands::Translate(args) => run_translate(args).await,
    }
}

/// Apply command line overrides on top of the loaded configuration
fn apply_overrides(config: &mut Config, options: &TranslateArgs) {
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }

    if let Some(tier) = &options.tier {
        config.translation.tier = tier.clone().into();
    }

    if let Some(model) = &options.model {
        let provider = config.translation.provider;
        let provider_str = provider.to_lowercase_string();
        let tier = config.translation.tier;

        if !config
            .translation
            .available_providers
            .iter()
            .any(|p| p.provider_type == provider_str)
        {
            config.translation.available_providers.push(ProviderConfig::new(provider));
        }

        if let Some(provider_config) = config
            .translation
            .available_providers
            .iter_mut()
            .find(|p| p.provider_type == provider_str)
        {
            match tier {
                TranslationTier::Fast => provider_config.fast_model = model.clone(),
                TranslationTier::Premium => provider_config.premium_model = model.clone(),
            }
        }
    }

    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }

    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }

    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.into());
    }

    let mut config = Config::load_or_create(&options.config_path)?;
    apply_overrides(&mut config, &options);
    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.into());

    let progress = if options.progress_json {
        ProgressOutput::JsonLines
    } else {
        ProgressOutput::Bar
    };
    let controller = Controller::with_config(config.clone())?.with_progress_output(progress);

    let jobs = controller.jobs().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling running translations");
            jobs.cancel_all();
        }
    });

    info!(
        "subcontext: {} ({} tier, model {}) {} -> {}",
        config.translation.provider.display_name(),
        config.translation.tier,
        config.translation.get_model(config.translation.tier),
        config.source_language,
        config.target_language
    );

    if options.input_path.is_file() {
        let output_dir = options.output_dir.clone().unwrap_or_else(|| {
            options
                .input_path
                .parent()
                .unwrap_or(Path::new("."))
                .to_path_buf()
        });
        controller
            .run(options.input_path.clone(), output_dir, options.force_overwrite)
            .await?;
    } else if options.input_path.is_dir() {
        if options.output_dir.is_some() {
            warn!("--output-dir is ignored for directories; files are written next to their sources");
        }
        let summary = controller
            .run_folder(options.input_path.clone(), options.force_overwrite)
            .await?;
        if summary.failed > 0 {
            return Err(anyhow!("{} files failed to translate", summary.failed));
        }
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", options.input_path));
    }

    Ok(())
}
