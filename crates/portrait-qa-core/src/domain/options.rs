//! Caller-supplied validation options.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::Gender;

/// How hard the enhancement executor pushes its corrections.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementLevel {
    /// Half-strength corrections.
    Conservative,
    /// Corrections sized to the measured deficit.
    #[default]
    Balanced,
    /// One-and-a-half strength corrections.
    Aggressive,
}

impl EnhancementLevel {
    /// Multiplier applied to every planned intensity.
    #[must_use]
    pub const fn multiplier(self) -> f32 {
        match self {
            Self::Conservative => 0.5,
            Self::Balanced => 1.0,
            Self::Aggressive => 1.5,
        }
    }
}

/// Options recognised by the validation pipeline.
///
/// Every field has a default; deserialising rejects unknown keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)]
pub struct ValidationOptions {
    /// Youngest acceptable estimated age.
    pub min_age: u32,
    /// Oldest acceptable estimated age.
    pub max_age: u32,
    /// Exactly one person must be present.
    pub require_single_person: bool,
    /// Face clarity must reach the configured threshold.
    pub require_clear_face: bool,
    /// Genders accepted without a warning.
    pub allowed_genders: BTreeSet<Gender>,
    /// Maximum number of detected faces.
    pub max_people: u32,
    /// Run the safety checks.
    pub safety_checks: bool,
    /// Produce an enhanced, canonical image when possible.
    pub enhance_image: bool,
    /// Strength of the enhancement corrections.
    pub enhancement_level: EnhancementLevel,
    /// Abort on the first hard error or fault.
    pub strict_mode: bool,
    /// Accept images carrying text overlays.
    pub allow_text_overlay: bool,
    /// Accept images carrying watermarks.
    pub allow_watermark: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            min_age: 0,
            max_age: 120,
            require_single_person: true,
            require_clear_face: true,
            allowed_genders: [Gender::Male, Gender::Female, Gender::Other]
                .into_iter()
                .collect(),
            max_people: 1,
            safety_checks: true,
            enhance_image: true,
            enhancement_level: EnhancementLevel::Balanced,
            strict_mode: false,
            allow_text_overlay: false,
            allow_watermark: false,
        }
    }
}

impl ValidationOptions {
    /// Checks that the options are internally consistent.
    ///
    /// # Errors
    ///
    /// Returns a description of the first inconsistency found.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_age > self.max_age {
            return Err(format!(
                "minAge ({}) must not exceed maxAge ({})",
                self.min_age, self.max_age
            ));
        }
        if self.max_people == 0 {
            return Err("maxPeople must be at least 1".to_string());
        }
        Ok(())
    }

    /// Maximum number of faces accepted given both count options.
    #[must_use]
    pub const fn face_limit(&self) -> u32 {
        if self.require_single_person {
            1
        } else {
            self.max_people
        }
    }
}
