//! Check command - validate local photos as reference images.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use portrait_qa_adapters::{
    DeepAnalysisProvider, FsImageSource, FsObjectStorage, HttpSettings, VisionProvider,
};
use portrait_qa_core::domain::{
    EnhancementLevel, ImageReference, ValidationOptions, ValidationResult,
};
use portrait_qa_core::{
    FeatureExtractionAdapter, ImageSource, PipelineConfig, ProgressEvent, ProgressSink,
    ResultOutput, ValidationPipeline, ValidationRequest,
};
use tracing::{debug, info, warn};

use super::ExitCode;
use crate::config::{default_storage_dir, AppConfig, DEFAULT_API_KEY_ENV};
use crate::output::{JsonOutput, ProgressBar};

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// JSON Lines (one JSON object per line)
    #[default]
    Jsonl,
    /// Single JSON array
    Json,
}

/// Enhancement strength.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Level {
    /// Half-strength corrections
    Conservative,
    /// Corrections sized to the measured deficit
    Balanced,
    /// One-and-a-half strength corrections
    Aggressive,
}

impl From<Level> for EnhancementLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Conservative => Self::Conservative,
            Level::Balanced => Self::Balanced,
            Level::Aggressive => Self::Aggressive,
        }
    }
}

/// Hardcoded fallbacks not covered by `ValidationOptions::default()`.
mod defaults {
    pub const CALLER: &str = "cli";
    pub const TIMEOUT_SECS: u64 = 10;
    pub const RETRIES: u32 = 2;
}

/// Shared arguments for photo validation.
#[derive(Args, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct CheckArgs {
    /// Files or directories to validate
    pub paths: Vec<PathBuf>,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Stop at the first hard error and fail on provider errors
    #[arg(long)]
    pub strict: bool,

    /// Do not produce enhanced copies
    #[arg(long)]
    pub no_enhance: bool,

    /// Enhancement strength
    #[arg(long, value_enum)]
    pub level: Option<Level>,

    /// Youngest acceptable estimated age
    #[arg(long)]
    pub min_age: Option<u32>,

    /// Oldest acceptable estimated age
    #[arg(long)]
    pub max_age: Option<u32>,

    /// Maximum number of people (implies more than one may be present)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_people: Option<u32>,

    /// Caller id used to namespace stored images
    #[arg(long)]
    pub caller: Option<String>,

    /// Annotation provider endpoint
    #[arg(long, value_name = "URL")]
    pub vision_endpoint: Option<String>,

    /// Deep-analysis fallback endpoint
    #[arg(long, value_name = "URL")]
    pub deep_endpoint: Option<String>,

    /// Bucket directory for temporary and accepted images
    #[arg(long, value_name = "DIR")]
    pub storage_dir: Option<PathBuf>,

    /// Show progress bar
    #[arg(long)]
    pub progress: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print JSON output (only affects --format json)
    #[arg(long)]
    pub pretty: bool,

    /// Merged config (populated by `with_config`, not from CLI).
    #[arg(skip)]
    config: Option<AppConfig>,
}

impl CheckArgs {
    /// Apply configuration file values, respecting CLI precedence.
    ///
    /// Layering priority (lowest to highest):
    /// 1. Hardcoded defaults (in accessor methods)
    /// 2. Config file values (XDG, then project-local)
    /// 3. CLI arguments (already set on self)
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        if !args.recursive {
            args.recursive = config.general.recursive.unwrap_or(false);
        }
        if !args.strict {
            args.strict = config.options.strict.unwrap_or(false);
        }
        if !args.no_enhance {
            args.no_enhance = config.options.enhance.is_some_and(|enabled| !enabled);
        }

        args.min_age = args.min_age.or(config.options.min_age);
        args.max_age = args.max_age.or(config.options.max_age);
        args.max_people = args.max_people.or(config.options.max_people);
        if args.caller.is_none() {
            args.caller.clone_from(&config.general.caller);
        }
        if args.vision_endpoint.is_none() {
            args.vision_endpoint.clone_from(&config.provider.vision_endpoint);
        }
        if args.deep_endpoint.is_none() {
            args.deep_endpoint.clone_from(&config.provider.deep_endpoint);
        }
        if args.storage_dir.is_none() {
            args.storage_dir.clone_from(&config.storage.dir);
        }

        if args.format.is_none() {
            args.format = config
                .output
                .format
                .as_ref()
                .and_then(|s| match s.as_str() {
                    "json" => Some(OutputFormat::Json),
                    "jsonl" => Some(OutputFormat::Jsonl),
                    _ => None,
                });
        }
        if !args.pretty {
            args.pretty = config.output.pretty.unwrap_or(false);
        }
        if !args.progress {
            args.progress = config.output.progress.unwrap_or(false);
        }

        args.config = Some(config.clone());
        args
    }

    /// Validation options from flags, config and defaults.
    fn options(&self) -> ValidationOptions {
        let config = self.config.as_ref().map(|c| &c.options);
        let defaults = ValidationOptions::default();
        let enhancement_level = self
            .level
            .map(EnhancementLevel::from)
            .or_else(|| config.and_then(|c| c.level))
            .unwrap_or(defaults.enhancement_level);
        ValidationOptions {
            min_age: self.min_age.unwrap_or(defaults.min_age),
            max_age: self.max_age.unwrap_or(defaults.max_age),
            require_single_person: self.max_people.map_or(true, |n| n <= 1),
            max_people: self.max_people.unwrap_or(defaults.max_people),
            strict_mode: self.strict,
            enhance_image: !self.no_enhance,
            enhancement_level,
            allow_text_overlay: config
                .and_then(|c| c.allow_text_overlay)
                .unwrap_or(defaults.allow_text_overlay),
            allow_watermark: config
                .and_then(|c| c.allow_watermark)
                .unwrap_or(defaults.allow_watermark),
            ..defaults
        }
    }

    fn caller(&self) -> &str {
        self.caller.as_deref().unwrap_or(defaults::CALLER)
    }

    /// Get output format with fallback to JSONL.
    fn format(&self) -> OutputFormat {
        self.format.unwrap_or(OutputFormat::Jsonl)
    }
}

/// Result of running the check command.
#[allow(dead_code)] // Fields exposed for programmatic use
pub struct CheckResult {
    /// Images accepted.
    pub valid: usize,
    /// Images rejected.
    pub invalid: usize,
    /// Images that could not be validated.
    pub skipped: usize,
    /// Exit code.
    pub exit_code: ExitCode,
}

/// Run the check command.
///
/// Expects `args` to have been processed through `with_config()` first
/// to apply configuration file settings.
pub fn run(args: &CheckArgs) -> Result<CheckResult> {
    info!("Running check command on {} paths", args.paths.len());

    if args.paths.is_empty() {
        anyhow::bail!("No paths specified");
    }
    let options = args.options();
    options
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid options: {e}"))?;

    let pipeline = build_pipeline(args)?;
    let source = FsImageSource::new(args.paths.clone(), args.recursive);
    let total = source.count_hint();

    let show_progress = !args.quiet && (args.progress || std::io::stderr().is_terminal());
    let progress_bar = ProgressBar::new(total.map(|t| t as u64), args.quiet, show_progress);
    let output = JsonOutput::stdout();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime.block_on(process_images(
        &pipeline,
        &source,
        total,
        &options,
        &output,
        &progress_bar,
        args,
    ))
}

/// Build the pipeline from merged args (CLI + config).
fn build_pipeline(args: &CheckArgs) -> Result<ValidationPipeline> {
    let provider = args.config.as_ref().map(|c| &c.provider);
    let vision_endpoint = args.vision_endpoint.as_deref().context(
        "no feature provider configured; set provider.vision_endpoint or pass --vision-endpoint",
    )?;

    let key_env = provider
        .and_then(|p| p.api_key_env.as_deref())
        .unwrap_or(DEFAULT_API_KEY_ENV);
    let timeout = Duration::from_secs(
        provider
            .and_then(|p| p.timeout_secs)
            .unwrap_or(defaults::TIMEOUT_SECS),
    );
    let settings = HttpSettings {
        timeout,
        retries: provider
            .and_then(|p| p.retries)
            .unwrap_or(defaults::RETRIES),
        api_key: std::env::var(key_env).ok().filter(|k| !k.is_empty()),
        ..HttpSettings::default()
    };
    if settings.api_key.is_none() {
        debug!("{key_env} is not set, calling providers without a key");
    }

    let config = pipeline_config(&settings);

    let vision = VisionProvider::new(vision_endpoint, settings.clone())
        .context("failed to set up the vision provider")?;
    let mut features = FeatureExtractionAdapter::new(Arc::new(vision));
    if let Some(deep_endpoint) = args.deep_endpoint.as_deref() {
        let deep = DeepAnalysisProvider::new(deep_endpoint, settings)
            .context("failed to set up the deep-analysis provider")?;
        features = features.with_fallback(Arc::new(deep));
        debug!("Deep-analysis fallback enabled");
    }

    let storage_dir = args.storage_dir.clone().unwrap_or_else(default_storage_dir);
    debug!("Using bucket directory {}", storage_dir.display());
    let storage = FsObjectStorage::new(storage_dir);

    Ok(ValidationPipeline::new(config, features, Arc::new(storage)))
}

/// Pipeline settings whose provider bound leaves room for every HTTP retry.
fn pipeline_config(settings: &HttpSettings) -> PipelineConfig {
    PipelineConfig {
        provider_timeout: settings.call_budget(),
        ..PipelineConfig::default()
    }
}

/// Validate every discovered image in turn.
async fn process_images(
    pipeline: &ValidationPipeline,
    source: &FsImageSource,
    total: Option<usize>,
    options: &ValidationOptions,
    output: &JsonOutput,
    progress: &ProgressBar,
    args: &CheckArgs,
) -> Result<CheckResult> {
    let mut valid = 0usize;
    let mut invalid = 0usize;
    let mut skipped = 0usize;
    let mut all_results: Vec<(String, ValidationResult)> = Vec::new();

    for (index, image_result) in source.images().enumerate() {
        let image = match image_result {
            Ok(img) => img,
            Err(e) => {
                progress.on_event(ProgressEvent::Skipped {
                    path: format!("image {index}"),
                    reason: format!("{e:#}"),
                });
                skipped += 1;
                continue;
            }
        };
        let path = image.path;

        progress.on_event(ProgressEvent::Started {
            path: path.clone(),
            index,
            total,
        });

        let request = ValidationRequest::new(
            ImageReference::Bytes {
                data: image.bytes,
                content_type: None,
            },
            args.caller(),
        )
        .with_options(options.clone());

        let result = match pipeline.validate(request).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Validation failed for {path}: {e}");
                progress.on_event(ProgressEvent::Skipped {
                    path,
                    reason: e.to_string(),
                });
                skipped += 1;
                continue;
            }
        };

        if result.is_valid {
            valid += 1;
        } else {
            invalid += 1;
        }

        progress.on_event(ProgressEvent::Completed {
            path: path.clone(),
            result: Box::new(result.clone()),
        });

        match args.format() {
            OutputFormat::Jsonl => output.write(&path, &result)?,
            OutputFormat::Json => all_results.push((path, result)),
        }
    }

    if matches!(args.format(), OutputFormat::Json) {
        output.write_array(&all_results, args.pretty)?;
    }

    output.flush()?;

    progress.on_event(ProgressEvent::Finished {
        valid,
        invalid,
        skipped,
    });

    let exit_code = if skipped > 0 {
        ExitCode::Error
    } else if invalid > 0 {
        ExitCode::Invalid
    } else {
        ExitCode::Success
    };

    Ok(CheckResult {
        valid,
        invalid,
        skipped,
        exit_code,
    })
}
