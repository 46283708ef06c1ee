//! Embedded metadata inspection.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use tracing::debug;

use crate::domain::{StepName, StepResult};

use super::{warning_penalised, StepInput, Validator};

/// Configuration for metadata inspection.
#[derive(Debug, Clone)]
pub struct MetadataConfig {
    /// Captures older than this many years produce a warning.
    pub max_capture_age_years: i32,
    /// Year used as "now"; the current UTC year when unset.
    pub reference_year: Option<i32>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            max_capture_age_years: 5,
            reference_year: None,
        }
    }
}

/// Rejects uploads carrying location data and flags other revealing tags.
pub struct MetadataValidator {
    config: MetadataConfig,
}

impl MetadataValidator {
    /// Creates a new metadata validator with the given configuration.
    #[must_use]
    pub const fn new(config: MetadataConfig) -> Self {
        Self { config }
    }

    fn reference_year(&self) -> i32 {
        self.config
            .reference_year
            .unwrap_or_else(|| time::OffsetDateTime::now_utc().year())
    }
}

impl Default for MetadataValidator {
    fn default() -> Self {
        Self::new(MetadataConfig::default())
    }
}

impl Validator for MetadataValidator {
    fn name(&self) -> StepName {
        StepName::MetadataPrivacy
    }

    fn validate(&self, input: &StepInput<'_>) -> anyhow::Result<StepResult> {
        let mut result = StepResult::new(self.name());
        let mut cursor = Cursor::new(input.image.bytes.as_slice());

        let exif = match Reader::new().read_from_container(&mut cursor) {
            Ok(exif) => exif,
            Err(exif::Error::NotFound(_)) => {
                result.flag("hasMetadata", false);
                result.metric("score", 1.0);
                return Ok(result);
            }
            Err(e) => {
                debug!("Unreadable metadata: {e}");
                result.flag("hasMetadata", false);
                result.warn("Embedded metadata could not be read");
                result.metric("score", 0.9);
                return Ok(result);
            }
        };
        result.flag("hasMetadata", true);

        let has_gps = exif
            .fields()
            .any(|f| f.tag == Tag::GPSInfoIFDPointer || is_gps_tag(f.tag));
        result.flag("hasGps", has_gps);
        if has_gps {
            result.error("Image contains embedded GPS location data");
        }

        if let Some(field) = exif.get_field(Tag::Software, In::PRIMARY) {
            let software = field.display_value().to_string();
            result.flag("hasSoftwareTag", true);
            result.warn(format!(
                "Image was processed with editing software ({})",
                software.trim_matches('"')
            ));
        }

        if exif.get_field(Tag::Copyright, In::PRIMARY).is_some() {
            result.flag("hasCopyright", true);
            result.warn("Image carries a copyright notice; make sure you have the right to use it");
        }

        let captured = [Tag::DateTimeOriginal, Tag::DateTime]
            .iter()
            .find_map(|&tag| exif.get_field(tag, In::PRIMARY))
            .and_then(|field| match &field.value {
                exif::Value::Ascii(parts) => parts
                    .first()
                    .and_then(|raw| exif::DateTime::from_ascii(raw).ok()),
                _ => None,
            });
        if let Some(dt) = captured {
            let age = self.reference_year() - i32::from(dt.year);
            result.metric("captureAgeYears", f64::from(age));
            if age > self.config.max_capture_age_years {
                result.warn(format!(
                    "Photo was taken in {}; a recent photo gives better results",
                    dt.year
                ));
            }
        }

        let score = if result.valid {
            warning_penalised(1.0, result.warnings.len(), 0.05)
        } else {
            0.0
        };
        result.metric("score", score);
        Ok(result)
    }
}

fn is_gps_tag(tag: Tag) -> bool {
    tag.context() == exif::Context::Gps
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::{ImageInput, ValidationOptions};
    use crate::testutil;
    use portrait_qa_test_support::ExifJpegBuilder;

    fn run(input: &ImageInput) -> StepResult {
        let options = ValidationOptions::default();
        MetadataValidator::new(MetadataConfig {
            reference_year: Some(2024),
            ..MetadataConfig::default()
        })
        .validate(&StepInput {
            image: input,
            features: None,
            options: &options,
        })
        .expect("validate")
    }

    fn tagged(builder: ExifJpegBuilder) -> ImageInput {
        let plain = testutil::jpeg_bytes(&testutil::portrait(64, 64));
        let bytes = builder.apply(&plain).expect("write exif");
        ImageInput::decode(bytes, None).expect("decode")
    }

    #[test]
    fn test_plain_jpeg_has_no_metadata() {
        let result = run(&testutil::jpeg_input(64, 64));
        assert!(result.valid);
        assert!(!result.is_set("hasMetadata"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_editing_software_warns() {
        let result = run(&tagged(ExifJpegBuilder::new().software("Photoshop")));
        assert!(result.valid);
        assert!(result.is_set("hasSoftwareTag"));
        assert_eq!(
            result.warnings,
            vec!["Image was processed with editing software (Photoshop)".to_string()]
        );
        assert!(result.score() < 1.0);
    }

    #[test]
    fn test_copyright_notice_warns() {
        let result = run(&tagged(ExifJpegBuilder::new().copyright("Jo Doe")));
        assert!(result.valid);
        assert!(result.is_set("hasCopyright"));
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("copyright notice"));
    }

    #[test]
    fn test_old_capture_date_warns() {
        let result = run(&tagged(ExifJpegBuilder::new().taken("2009:05:01 10:00:00")));
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].starts_with("Photo was taken in 2009"));
        assert_eq!(result.get("captureAgeYears"), Some(15.0));
    }

    #[test]
    fn test_recent_capture_date_is_quiet() {
        let result = run(&tagged(ExifJpegBuilder::new().taken("2023:11:20 09:30:00")));
        assert!(result.valid);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_all_advisory_tags_warn_together() {
        let result = run(&tagged(
            ExifJpegBuilder::new()
                .software("Photoshop")
                .copyright("Jo Doe")
                .taken("2009:05:01 10:00:00"),
        ));
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert_eq!(result.warnings.len(), 3);
    }

    #[test]
    fn test_gps_position_is_an_error() {
        let result = run(&tagged(ExifJpegBuilder::new().gps(48.8584, 2.2945)));
        assert!(!result.valid);
        assert!(result.is_set("hasGps"));
        assert!(result.score().abs() < f64::EPSILON);
    }

    #[test]
    fn test_gps_tag_context() {
        assert!(is_gps_tag(Tag::GPSLatitude));
        assert!(!is_gps_tag(Tag::Software));
    }
}
