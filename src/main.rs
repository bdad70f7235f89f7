// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use bulkxlate::app_config::{self, Config, TranslationProvider};
use bulkxlate::app_controller::Controller;
use bulkxlate::estimate;
use bulkxlate::translation::Cancellation;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Ollama,
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    #[value(name = "lmstudio")]
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
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
    /// Translate documents into every output language (default command)
    Translate(TranslateArgs),

    /// Estimate chunks and tokens without calling any provider
    Estimate(EstimateArgs),

    /// Generate shell completions for bulkxlate
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
struct TranslateArgs {
    /// Documents to translate (overrides `input_paths` from the config)
    #[arg(value_name = "INPUT_PATH")]
    input_paths: Vec<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Language of the input documents
    #[arg(short, long)]
    input_language: Option<String>,

    /// Output language, repeat for several (e.g. -o fr -o de)
    #[arg(short, long = "output-language")]
    output_languages: Vec<String>,

    /// Output base path per input, in the same order as the inputs
    #[arg(long = "output", value_name = "PATH")]
    output_paths: Vec<PathBuf>,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Boundary marker the documents are split on (accepts \n and \t escapes)
    #[arg(long)]
    boundary: Option<String>,

    /// Format descriptor passed to the model (e.g. markdown, json)
    #[arg(long)]
    format: Option<String>,

    /// Write every chunk outcome next to the output for inspection
    #[arg(long)]
    persist_chunks: bool,

    /// Attempts per chunk, the first one included
    #[arg(long)]
    max_attempts: Option<u32>,

    /// How many (document, language) pairs run at the same time
    #[arg(long)]
    concurrent_pairs: Option<usize>,

    /// Write the run summary as JSON to this path
    #[arg(long = "report", value_name = "PATH")]
    report_path: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Args, Debug, Clone)]
struct EstimateArgs {
    /// Documents to estimate (overrides `input_paths` from the config)
    #[arg(value_name = "INPUT_PATH")]
    input_paths: Vec<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Output language, repeat for several
    #[arg(short, long = "output-language")]
    output_languages: Vec<String>,

    /// Boundary marker the documents are split on
    #[arg(long)]
    boundary: Option<String>,
}

/// bulkxlate - batch document translation with AI
///
/// Splits text documents on a boundary marker, translates every chunk with
/// an LLM provider and writes one output file per document and language.
#[derive(Parser, Debug)]
#[command(name = "bulkxlate")]
#[command(version)]
#[command(about = "Batch document translation with AI providers")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "bulkxlate translates batches of documents into several languages using AI providers.

EXAMPLES:
    bulkxlate guide.md                           # Translate using default config
    bulkxlate -o fr -o de guide.md faq.md        # Two documents into French and German
    bulkxlate -p openai -m gpt-4o-mini guide.md  # Use specific provider and model
    bulkxlate --boundary '\\n---\\n' notes.md       # Split on a custom marker
    bulkxlate --concurrent-pairs 4 docs/*.md     # Translate four pairs at a time
    bulkxlate estimate docs/*.md                 # Estimate tokens without translating
    bulkxlate completions bash > bulkxlate.bash  # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    ollama    - Local Ollama server (default: llama3.2)
    openai    - OpenAI API (requires API key)
    anthropic - Anthropic Claude API (requires API key)
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
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

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI color for log level
    fn decoration(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "1;31"),
            Level::Warn => ("🚧 ", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍 ", "1;36"),
            Level::Trace => ("📋 ", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.target().starts_with("bulkxlate")
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (emoji, color) = Self::decoration(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color, now, emoji, record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the config says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "bulkxlate", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Estimate(args)) => run_estimate(args),
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => run_translate(cli.translate).await,
    }
}

/// Load the config file, creating a default one when it is missing
fn load_or_create_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        Config::from_file(config_path)
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);
        let config = Config::default();
        config.save(config_path)
            .context(format!("Failed to write default config to file: {}", config_path))?;
        Ok(config)
    }
}

/// Apply command line overrides on top of the file configuration
fn apply_overrides(config: &mut Config, options: &TranslateArgs) {
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }

    if let Some(model) = &options.model {
        config.translation.active_provider_config_mut().model = model.clone();
    }

    if let Some(input_language) = &options.input_language {
        config.input_language = input_language.clone();
    }

    if !options.output_languages.is_empty() {
        config.output_languages = options.output_languages.clone();
    }

    if !options.input_paths.is_empty() {
        config.input_paths = options.input_paths.clone();
        // Output paths from the file belong to the file's inputs
        config.output_paths.clear();
    }

    if !options.output_paths.is_empty() {
        config.output_paths = options.output_paths.clone();
    }

    if let Some(boundary) = &options.boundary {
        config.boundary = app_config::unescape_boundary(boundary);
    }

    if let Some(format) = &options.format {
        config.format = format.clone();
    }

    if options.persist_chunks {
        config.persist_chunks = true;
    }

    if let Some(max_attempts) = options.max_attempts {
        config.retry.max_attempts = max_attempts;
    }

    if let Some(concurrent_pairs) = options.concurrent_pairs {
        config.concurrent_pairs = concurrent_pairs;
    }

    if let Some(report_path) = &options.report_path {
        config.report_path = Some(report_path.clone());
    }

    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    // Apply a command line log level before anything gets logged
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = load_or_create_config(&options.config_path)?;
    apply_overrides(&mut config, &options);
    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::with_config(config)?;

    let cancellation = Cancellation::new();
    let on_signal = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight chunks and stopping");
            on_signal.cancel();
        }
    });

    let output = controller.run(cancellation).await?;
    let summary = output.summary;

    if summary.has_failures() {
        return Err(anyhow!(
            "{} of {} chunk(s) failed, {} pair(s) cancelled, {} write failure(s)",
            summary.failed,
            summary.attempted,
            summary.pairs_cancelled,
            summary.write_failures
        ));
    }

    info!("All {} chunk(s) translated", summary.succeeded);
    Ok(())
}

fn run_estimate(options: EstimateArgs) -> Result<()> {
    let mut config = load_or_create_config(&options.config_path)?;
    if !options.input_paths.is_empty() {
        config.input_paths = options.input_paths.clone();
        config.output_paths.clear();
    }
    if !options.output_languages.is_empty() {
        config.output_languages = options.output_languages.clone();
    }
    if let Some(boundary) = &options.boundary {
        config.boundary = app_config::unescape_boundary(boundary);
    }

    let controller = Controller::with_config(config)?;
    if controller.config().boundary.is_empty() {
        return Err(anyhow!("Boundary marker must not be empty"));
    }
    let documents = controller.read_documents()?;
    let languages = controller.config().unique_output_languages();

    let estimate = estimate::estimate_batch(&documents, &controller.config().boundary, languages.len());
    println!("{}", estimate.describe());
    Ok(())
}
