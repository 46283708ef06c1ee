//! End-to-end validation of one image.
//!
//! Pixel validators start as soon as the image is decoded. Feature extraction
//! runs alongside them; validators that need the feature report are spawned
//! once it arrives. Everything CPU-bound runs on the blocking pool.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::distr::Alphanumeric;
use rand::Rng;
use tokio::task::{Id, JoinSet};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::aggregate::{AggregatorConfig, ConfidenceAggregator};
use crate::characteristics::{CharacteristicConfig, CharacteristicExtractor, LOW_CONFIDENCE_WARNING};
use crate::domain::{
    Analysis, CharacteristicDecision, CharacteristicSet, DataQuality, EnhancementSummary,
    ExternalServiceError, ExtractionError, FeatureReport, FeatureSource, ImageInput,
    ImageReference, PipelineError, QualityMetrics, StandardImageSpec, StepName, StepResult,
    StorageError, ValidationOptions, ValidationReport, ValidationResult,
};
use crate::enhance::{EnhancementExecutor, EnhancementPlanner, PlannerConfig};
use crate::features::{FeatureExtractionAdapter, DEFAULT_PROVIDER_TIMEOUT};
use crate::ports::{ImageFetcher, ObjectStorage, ProviderRequest};
use crate::recommend::recommendations;
use crate::validators::{
    standard_validators, IntegrityValidator, StepInput, Validator, ValidatorConfig,
};

/// Warning added when the enhanced image had to be discarded.
pub const ENHANCEMENT_FALLBACK_WARNING: &str =
    "The photo could not be enhanced to the output standard; the original image will be used";

/// Thresholds, timeouts and storage layout for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validator thresholds.
    pub validators: ValidatorConfig,
    /// Confidence weights and enhancement thresholds.
    pub aggregator: AggregatorConfig,
    /// Characteristic tier rules.
    pub characteristics: CharacteristicConfig,
    /// Enhancement planning thresholds.
    pub planner: PlannerConfig,
    /// Output contract for enhanced images.
    pub spec: StandardImageSpec,
    /// Bound on each provider and fetch call.
    pub provider_timeout: Duration,
    /// Bound on each storage call.
    pub storage_timeout: Duration,
    /// Prefix of temporary uploads.
    pub temp_prefix: String,
    /// Prefix of promoted originals.
    pub validated_prefix: String,
    /// Prefix of enhanced images.
    pub enhanced_prefix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            validators: ValidatorConfig::default(),
            aggregator: AggregatorConfig::default(),
            characteristics: CharacteristicConfig::default(),
            planner: PlannerConfig::default(),
            spec: StandardImageSpec::default(),
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            storage_timeout: DEFAULT_PROVIDER_TIMEOUT,
            temp_prefix: "tmp/".into(),
            validated_prefix: "validated/".into(),
            enhanced_prefix: "enhanced/".into(),
        }
    }
}

/// One validation call.
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    /// Image to validate.
    pub image: ImageReference,
    /// Caller options.
    pub options: ValidationOptions,
    /// Identity used to namespace storage keys.
    pub caller_id: String,
}

impl ValidationRequest {
    /// Creates a request with default options.
    #[must_use]
    pub fn new(image: ImageReference, caller_id: impl Into<String>) -> Self {
        Self {
            image,
            options: ValidationOptions::default(),
            caller_id: caller_id.into(),
        }
    }

    /// Replaces the options.
    #[must_use]
    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }
}

/// Runs validators, aggregation, characteristic extraction and enhancement.
pub struct ValidationPipeline {
    config: PipelineConfig,
    validators: Vec<Arc<dyn Validator>>,
    features: FeatureExtractionAdapter,
    storage: Arc<dyn ObjectStorage>,
    fetcher: Option<Arc<dyn ImageFetcher>>,
    aggregator: ConfidenceAggregator,
    extractor: CharacteristicExtractor,
    planner: EnhancementPlanner,
    executor: EnhancementExecutor,
}

struct CallContext {
    id: String,
    caller: String,
    options: Arc<ValidationOptions>,
}

enum Event {
    Step(StepName, anyhow::Result<StepResult>),
    Features(Result<FeatureReport, ExtractionError>),
}

#[derive(Default)]
struct Collected {
    steps: Vec<StepResult>,
    features: Option<Arc<FeatureReport>>,
    source: FeatureSource,
}

impl ValidationPipeline {
    /// Creates a pipeline with the standard validator set.
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        features: FeatureExtractionAdapter,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            validators: standard_validators(&config.validators),
            features: features.with_timeout(config.provider_timeout),
            storage,
            fetcher: None,
            aggregator: ConfidenceAggregator::new(config.aggregator),
            extractor: CharacteristicExtractor::new(config.characteristics),
            planner: EnhancementPlanner::new(config.planner.clone()),
            executor: EnhancementExecutor::new(config.spec),
            config,
        }
    }

    /// Adds a fetcher for URL references.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ImageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Replaces the validator set.
    #[must_use]
    pub fn with_validators(mut self, validators: Vec<Arc<dyn Validator>>) -> Self {
        self.validators = validators;
        self
    }

    /// Output contract in effect.
    #[must_use]
    pub const fn spec(&self) -> &StandardImageSpec {
        &self.config.spec
    }

    /// Validates one image.
    ///
    /// Domain failures are reported in the returned result. Temporary uploads
    /// are removed before this returns, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid options, an unreachable image, storage
    /// failures and, in strict mode, provider failures and step faults.
    pub async fn validate(
        &self,
        request: ValidationRequest,
    ) -> Result<ValidationResult, PipelineError> {
        request
            .options
            .validate()
            .map_err(PipelineError::InvalidOptions)?;
        let ctx = CallContext {
            id: validation_id(),
            caller: storage_segment(&request.caller_id),
            options: Arc::new(request.options),
        };
        let span = info_span!("validate", validation_id = %ctx.id, caller = %ctx.caller);
        self.run(&ctx, request.image).instrument(span).await
    }

    async fn run(
        &self,
        ctx: &CallContext,
        reference: ImageReference,
    ) -> Result<ValidationResult, PipelineError> {
        let (bytes, declared) = self.load(reference).await?;
        let len = bytes.len();
        let image = match ImageInput::decode(bytes, declared.as_deref()) {
            Ok(image) => Arc::new(image),
            Err(err) => {
                info!(error = %err, "image could not be decoded");
                let report = self
                    .aggregator
                    .aggregate(vec![IntegrityValidator::corrupt(len)]);
                return Ok(self.assemble(ctx, report, Collected::default(), None, None));
            }
        };
        debug!(width = image.width, height = image.height, mime = %image.mime, "image decoded");

        let temp_key = format!(
            "{}{}/{}.{}",
            self.config.temp_prefix,
            ctx.caller,
            ctx.id,
            image.extension()
        );
        let mut temp = TempUpload {
            storage: Arc::clone(&self.storage),
            key: temp_key,
            timeout: self.config.storage_timeout,
            armed: true,
        };
        let temp_url = match self
            .bounded("put", &temp.key, self.storage.put(&image.bytes, &temp.key, &image.mime))
            .await
        {
            Ok(url) => Some(url),
            Err(err) if ctx.options.strict_mode => {
                temp.armed = false;
                return Err(err.into());
            }
            Err(err) => {
                temp.armed = false;
                warn!(error = %err, "temporary upload failed, providers receive raw bytes");
                None
            }
        };

        let outcome = self.evaluate(ctx, &image, temp_url).await;

        if temp.armed {
            temp.armed = false;
            if let Err(err) = self
                .bounded("delete", &temp.key, self.storage.delete(&temp.key))
                .await
            {
                warn!(key = %temp.key, error = %err, "failed to delete temporary upload");
            }
        }
        outcome
    }

    async fn load(
        &self,
        reference: ImageReference,
    ) -> Result<(Vec<u8>, Option<String>), PipelineError> {
        match reference {
            ImageReference::Bytes { data, content_type } => Ok((data, content_type)),
            ImageReference::Url(url) => {
                let fetcher = self.fetcher.as_ref().ok_or_else(|| {
                    ExternalServiceError::Unreachable {
                        service: "fetcher".into(),
                        reason: "no image fetcher configured".into(),
                    }
                })?;
                let timeout = self.config.provider_timeout;
                let fetched = tokio::time::timeout(timeout, fetcher.fetch(&url))
                    .await
                    .map_err(|_| ExternalServiceError::Timeout {
                        service: "fetcher".into(),
                        timeout,
                    })??;
                Ok((fetched.bytes, fetched.content_type))
            }
        }
    }

    async fn evaluate(
        &self,
        ctx: &CallContext,
        image: &Arc<ImageInput>,
        temp_url: Option<String>,
    ) -> Result<ValidationResult, PipelineError> {
        let collected = self.run_steps(image, &ctx.options, temp_url).await?;
        let report = self.aggregator.aggregate(collected.steps.clone());
        info!(
            is_valid = report.is_valid,
            confidence = report.confidence_score,
            steps = report.steps.len(),
            "validation aggregated"
        );

        let characteristics = collected
            .features
            .as_deref()
            .filter(|f| !f.faces.is_empty())
            .map(|f| self.extractor.extract(f, Some(image.as_ref())));

        let image_url = if report.is_valid {
            let key = format!(
                "{}{}/{}.{}",
                self.config.validated_prefix,
                ctx.caller,
                ctx.id,
                image.extension()
            );
            let url = self
                .bounded("put", &key, self.storage.put(&image.bytes, &key, &image.mime))
                .await?;
            Some(url)
        } else {
            None
        };

        let enhancement = if report.is_valid && report.can_be_enhanced && ctx.options.enhance_image
        {
            Some(
                self.enhance(ctx, image, &report, collected.features.as_deref())
                    .await,
            )
        } else {
            None
        };

        let mut result = self.assemble(ctx, report, collected, characteristics, enhancement);
        result.image_url = image_url;
        Ok(result)
    }

    async fn run_steps(
        &self,
        image: &Arc<ImageInput>,
        options: &Arc<ValidationOptions>,
        temp_url: Option<String>,
    ) -> Result<Collected, PipelineError> {
        let strict = options.strict_mode;
        let mut set: JoinSet<Event> = JoinSet::new();
        let mut running: HashMap<Id, StepName> = HashMap::new();

        let (pixel, featured): (Vec<_>, Vec<_>) = self
            .validators
            .iter()
            .cloned()
            .partition(|v| !v.needs_features());
        for validator in pixel {
            spawn_step(&mut set, &mut running, validator, image, None, options);
        }

        let request = ProviderRequest {
            bytes: Arc::new(image.bytes.clone()),
            mime: image.mime.clone(),
            url: temp_url,
            width: image.width,
            height: image.height,
        };
        let adapter = self.features.clone();
        set.spawn(async move { Event::Features(adapter.extract(&request).await) });

        let mut collected = Collected::default();
        while let Some(joined) = set.join_next_with_id().await {
            let event = match joined {
                Ok((_, event)) => event,
                Err(err) if err.is_cancelled() => continue,
                Err(err) => {
                    let Some(step) = running.get(&err.id()).copied() else {
                        set.abort_all();
                        return Err(PipelineError::Task(err.to_string()));
                    };
                    if strict {
                        set.abort_all();
                        return Err(PipelineError::StepFault {
                            step,
                            message: err.to_string(),
                        });
                    }
                    collected.steps.push(StepResult::fault(step, &err));
                    continue;
                }
            };

            match event {
                Event::Step(step, Ok(result)) => {
                    let failed = !result.valid;
                    collected.steps.push(result);
                    if strict && failed {
                        debug!(%step, "hard error in strict mode, cancelling remaining steps");
                        set.abort_all();
                        break;
                    }
                }
                Event::Step(step, Err(fault)) => {
                    warn!(%step, error = %fault, "validation step faulted");
                    if strict {
                        set.abort_all();
                        return Err(PipelineError::StepFault {
                            step,
                            message: format!("{fault:#}"),
                        });
                    }
                    collected
                        .steps
                        .push(StepResult::fault(step, format!("{fault:#}")));
                }
                Event::Features(outcome) => {
                    let report = match outcome {
                        Ok(report) => report,
                        Err(ExtractionError::NoFeaturesDetected) => {
                            FeatureReport::empty(FeatureSource::None, image.width, image.height)
                        }
                        Err(ExtractionError::ExternalService(err)) => {
                            warn!(error = %err, "feature extraction failed");
                            if strict {
                                set.abort_all();
                                return Err(err.into());
                            }
                            collected.source = FeatureSource::Unavailable;
                            for validator in &featured {
                                collected.steps.push(StepResult::fault(
                                    validator.name(),
                                    format!("external service error: {err}"),
                                ));
                            }
                            continue;
                        }
                    };
                    collected.source = report.source;
                    let report = Arc::new(report);
                    for validator in &featured {
                        spawn_step(
                            &mut set,
                            &mut running,
                            Arc::clone(validator),
                            image,
                            Some(Arc::clone(&report)),
                            options,
                        );
                    }
                    collected.features = Some(report);
                }
            }
        }
        Ok(collected)
    }

    async fn enhance(
        &self,
        ctx: &CallContext,
        image: &Arc<ImageInput>,
        report: &ValidationReport,
        features: Option<&FeatureReport>,
    ) -> (EnhancementSummary, Option<String>) {
        let quality = report
            .step(StepName::QualityMetrics)
            .map(QualityMetrics::from_step)
            .unwrap_or_default();
        let face_box = features.and_then(FeatureReport::primary_face).map(|f| f.bbox);
        let plan = self.planner.plan(
            &quality,
            report.step(StepName::HumanFeatureAnalysis),
            face_box,
            ctx.options.enhancement_level,
        );
        let mut summary = EnhancementSummary {
            planned: plan.kinds(),
            ..EnhancementSummary::default()
        };

        let executor = self.executor.clone();
        let source = Arc::clone(image);
        let executed =
            tokio::task::spawn_blocking(move || executor.execute(&source.image, &plan)).await;
        let enhanced = match executed {
            Ok(Ok(enhanced)) => enhanced,
            Ok(Err(err)) => {
                warn!(error = %err, kind = ?err.kind(), "enhancement discarded");
                summary.fallback_reason = Some(err.to_string());
                return (summary, None);
            }
            Err(err) => {
                warn!(error = %err, "enhancement task failed");
                summary.fallback_reason = Some(err.to_string());
                return (summary, None);
            }
        };

        let key = format!(
            "{}{}/{}.{}",
            self.config.enhanced_prefix,
            ctx.caller,
            ctx.id,
            enhanced.format.extension()
        );
        match self
            .bounded("put", &key, self.storage.put(&enhanced.data, &key, enhanced.format.mime()))
            .await
        {
            Ok(url) => {
                summary.applied = enhanced.applied;
                summary.quality_used = Some(enhanced.quality_used);
                (summary, Some(url))
            }
            Err(err) => {
                warn!(error = %err, "enhanced image upload failed");
                summary.fallback_reason = Some(err.to_string());
                (summary, None)
            }
        }
    }

    fn assemble(
        &self,
        ctx: &CallContext,
        report: ValidationReport,
        collected: Collected,
        characteristics: Option<CharacteristicSet>,
        enhancement: Option<(EnhancementSummary, Option<String>)>,
    ) -> ValidationResult {
        let (enhancement, enhanced_image_url) = enhancement.unwrap_or_default();
        let enhancement_applied = enhanced_image_url.is_some();

        let mut warnings = report.warnings.clone();
        if characteristics
            .as_ref()
            .is_some_and(|c| c.decision == CharacteristicDecision::WarnInaccurate)
        {
            warnings.push(LOW_CONFIDENCE_WARNING.to_string());
        }
        if enhancement.fallback_reason.is_some() {
            warnings.push(ENHANCEMENT_FALLBACK_WARNING.to_string());
        }

        let primary_face = collected.features.as_deref().and_then(FeatureReport::primary_face);
        let data_quality = DataQuality {
            feature_source: collected.source,
            face_detection_confidence: primary_face.map(|f| f.detection_confidence),
            landmark_count: primary_face.map_or(0, |f| f.landmarks.len()),
            characteristic_confidence: characteristics.as_ref().map(|c| c.overall),
            steps_run: report.steps.len(),
        };
        let recommendations = recommendations(
            &report,
            &warnings,
            characteristics.as_ref(),
            enhancement_applied,
        );

        let step = |name| report.step(name).cloned();
        let analysis = Analysis {
            human: step(StepName::HumanFeatureAnalysis),
            quality: step(StepName::QualityMetrics),
            composition: step(StepName::Composition),
            safety: step(StepName::Safety),
            characteristics,
            data_quality,
            enhancement,
        };

        ValidationResult {
            is_valid: report.is_valid,
            confidence_score: report.confidence_score,
            analysis,
            recommendations,
            warnings,
            image_url: None,
            enhanced_image_url,
            enhancement_applied,
            standard_specs: self.config.spec,
            validation_id: ctx.id.clone(),
            validation_summary: report,
        }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        key: &str,
        call: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, StorageError> {
        let timeout = self.config.storage_timeout;
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::new(
                operation,
                key,
                format!("timed out after {}ms", timeout.as_millis()),
            )),
        }
    }
}

/// Temporary upload that is deleted in the background if the call is
/// dropped before it could clean up itself.
struct TempUpload {
    storage: Arc<dyn ObjectStorage>,
    key: String,
    timeout: Duration,
    armed: bool,
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(key = %self.key, "no runtime left to delete temporary upload");
            return;
        };
        let storage = Arc::clone(&self.storage);
        let key = std::mem::take(&mut self.key);
        let timeout = self.timeout;
        handle.spawn(async move {
            match tokio::time::timeout(timeout, storage.delete(&key)).await {
                Ok(Ok(())) => debug!(key = %key, "temporary upload deleted after cancellation"),
                Ok(Err(err)) => {
                    warn!(key = %key, error = %err, "failed to delete temporary upload");
                }
                Err(_) => warn!(key = %key, "timed out deleting temporary upload"),
            }
        });
    }
}

fn spawn_step(
    set: &mut JoinSet<Event>,
    running: &mut HashMap<Id, StepName>,
    validator: Arc<dyn Validator>,
    image: &Arc<ImageInput>,
    features: Option<Arc<FeatureReport>>,
    options: &Arc<ValidationOptions>,
) {
    let step = validator.name();
    let image = Arc::clone(image);
    let options = Arc::clone(options);
    let handle = set.spawn_blocking(move || {
        let input = StepInput {
            image: &image,
            features: features.as_deref(),
            options: &options,
        };
        Event::Step(step, validator.validate(&input))
    });
    running.insert(handle.id(), step);
}

/// New validation id: `VAL_<base36 millis>_<6 random>`, uppercased.
#[must_use]
pub fn validation_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis());
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("VAL_{}_{suffix}", base36(millis)).to_uppercase()
}

fn base36(mut n: u128) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::new();
    loop {
        #[allow(clippy::cast_possible_truncation)]
        let digit = (n % 36) as usize;
        out.push(DIGITS[digit]);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    out.iter().rev().map(|&b| char::from(b)).collect()
}

/// Caller id reduced to characters safe in a storage key.
fn storage_segment(caller: &str) -> String {
    let cleaned: String = caller
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect();
    if cleaned.is_empty() {
        "anonymous".into()
    } else {
        cleaned
    }
}
