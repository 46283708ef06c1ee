//! Content safety, overlays and privacy elements.

use crate::analysis::{working_copy, ColorStats, WORKING_SIZE};
use crate::domain::{ContentSafety, FeatureReport, Likelihood, StepName, StepResult};

use super::{warning_penalised, StepInput, Validator};

/// Configuration for the safety step.
#[derive(Debug, Clone)]
pub struct SafetyConfig {
    /// Label confidence at which a watermark or logo label counts.
    pub watermark_label_confidence: f32,
    /// Text fragments that identify stock watermarks.
    pub watermark_markers: Vec<String>,
    /// Minimum recognised characters for text to count as an overlay.
    pub min_overlay_chars: usize,
    /// Skin-pixel share above which exposed skin is flagged.
    pub skin_exposure_warning: f64,
    /// Filter intensity above which a warning is recorded.
    pub filter_warning: f64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            watermark_label_confidence: 0.6,
            watermark_markers: ["©", "watermark", "shutterstock", "getty", "istock", "stock photo"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            min_overlay_chars: 3,
            skin_exposure_warning: 0.55,
            filter_warning: 0.5,
        }
    }
}

/// Rejects unsafe content and disallowed overlays.
pub struct SafetyValidator {
    config: SafetyConfig,
}

impl SafetyValidator {
    /// Creates a new safety validator with the given configuration.
    #[must_use]
    pub const fn new(config: SafetyConfig) -> Self {
        Self { config }
    }

    fn has_watermark(&self, report: &FeatureReport) -> bool {
        let labelled = report.labels.iter().any(|l| {
            let value = l.value.to_ascii_lowercase();
            (value.contains("watermark") || value.contains("logo"))
                && l.confidence >= self.config.watermark_label_confidence
        });
        labelled
            || report.text_blocks.iter().any(|block| {
                let text = block.text.to_lowercase();
                self.config
                    .watermark_markers
                    .iter()
                    .any(|m| text.contains(m.as_str()))
            })
    }

    fn overlay_chars(report: &FeatureReport) -> usize {
        report
            .text_blocks
            .iter()
            .map(|b| b.text.chars().filter(|c| c.is_alphanumeric()).count())
            .sum()
    }
}

impl Default for SafetyValidator {
    fn default() -> Self {
        Self::new(SafetyConfig::default())
    }
}

impl Validator for SafetyValidator {
    fn name(&self) -> StepName {
        StepName::Safety
    }

    fn needs_features(&self) -> bool {
        true
    }

    fn validate(&self, input: &StepInput<'_>) -> anyhow::Result<StepResult> {
        let cfg = &self.config;
        let options = input.options;
        let mut result = StepResult::new(self.name());

        if !options.safety_checks {
            result.flag("skipped", true);
            result.metric("score", 1.0);
            return Ok(result);
        }
        let report = input.require_features()?;

        let safety = report.content_safety.unwrap_or_default();
        let risk = content_risk(&safety);
        result.metric("contentRisk", risk);
        result.flag("safetyEvidence", report.content_safety.is_some());
        if is_inappropriate(&safety) {
            result.error("Inappropriate content detected");
        }
        if safety.medical.is_likely() {
            result.warn("Image appears to contain medical content");
        }
        if safety.spoof.is_likely() {
            result.warn("Image appears to be edited or synthetic");
        }

        if report.text_blocks.iter().any(|b| contains_personal_info(&b.text)) {
            result.flag("personalInfo", true);
            result.error("Image contains personal information such as an email or phone number");
        }

        let watermark = self.has_watermark(report);
        result.flag("watermark", watermark);
        if watermark {
            if options.allow_watermark {
                result.warn("Watermark detected");
            } else {
                result.error("Watermark detected in the image");
            }
        }

        let overlay = !watermark && Self::overlay_chars(report) >= cfg.min_overlay_chars;
        result.flag("textOverlay", overlay);
        if overlay {
            if options.allow_text_overlay {
                result.warn("Text overlay detected");
            } else {
                result.error("Text overlay detected in the image");
            }
        }

        let rgb = working_copy(&input.image.image, WORKING_SIZE).to_rgb8();
        let stats = ColorStats::from_rgb(&rgb);
        let face_share = report.primary_face().map_or(0.0, |f| {
            #[allow(clippy::cast_precision_loss)]
            let area = f.bbox.area() as f64;
            area / (f64::from(input.image.width) * f64::from(input.image.height)).max(1.0)
        });
        // Skin beyond what the face explains.
        let skin_exposure = (stats.skin_ratio - face_share).max(0.0);
        result.metric("skinExposure", skin_exposure);
        if skin_exposure > cfg.skin_exposure_warning {
            result.warn("Large areas of exposed skin detected");
        }

        let filter_intensity = (stats.oversaturated * 4.0)
            .max(stats.cast(0.35, 0.5))
            .min(1.0);
        result.metric("filterIntensity", filter_intensity);
        if filter_intensity > cfg.filter_warning {
            result.warn("A strong filter or effect seems to be applied");
        }

        let score = if result.valid {
            warning_penalised(1.0 - 0.3 * risk, result.warnings.len(), 0.1)
        } else {
            0.0
        };
        result.metric("score", score);
        Ok(result)
    }
}

fn is_inappropriate(safety: &ContentSafety) -> bool {
    safety.adult.is_likely() || safety.violence.is_likely() || safety.racy == Likelihood::VeryLikely
}

fn content_risk(safety: &ContentSafety) -> f64 {
    f64::from(
        safety
            .adult
            .score()
            .max(safety.violence.score())
            .max(safety.racy.score()),
    )
}

/// True for text that looks like an email address or a phone number.
fn contains_personal_info(text: &str) -> bool {
    let email = text.split_whitespace().any(|word| {
        word.split_once('@')
            .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'))
    });
    let digits = text.chars().filter(char::is_ascii_digit).count();
    let phone_like = digits >= 7
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || " +-().".contains(c) || c.is_alphabetic());
    email || phone_like
}
