//! Framing and composition. Advisory only.

use crate::analysis::{evenness, mirror_symmetry, working_copy, EdgeMap, WORKING_SIZE};
use crate::domain::{StepName, StepResult};

use super::{StepInput, Validator};

/// Configuration for composition scoring.
#[derive(Debug, Clone)]
pub struct CompositionConfig {
    /// Sobel magnitude that counts as an edge.
    pub edge_threshold: f32,
    /// Thickness of the border ring treated as background, as a fraction of each side.
    pub background_ring: f64,
    /// Border edge density that counts as a fully busy background.
    pub busy_background_density: f64,
    /// Gradient below which a pixel counts as empty space.
    pub empty_threshold: f32,
    /// Sub-scores below this produce a warning.
    pub warning_threshold: f64,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            edge_threshold: 48.0,
            background_ring: 1.0 / 6.0,
            busy_background_density: 0.3,
            empty_threshold: 12.0,
            warning_threshold: 0.4,
        }
    }
}

/// Scores framing: squareness, centering, balance, background and empty space.
pub struct CompositionValidator {
    config: CompositionConfig,
}

impl CompositionValidator {
    /// Creates a new composition validator with the given configuration.
    #[must_use]
    pub const fn new(config: CompositionConfig) -> Self {
        Self { config }
    }
}

impl Default for CompositionValidator {
    fn default() -> Self {
        Self::new(CompositionConfig::default())
    }
}

impl Validator for CompositionValidator {
    fn name(&self) -> StepName {
        StepName::Composition
    }

    fn validate(&self, input: &StepInput<'_>) -> anyhow::Result<StepResult> {
        let cfg = &self.config;
        let image = input.image;
        let luma = working_copy(&image.image, WORKING_SIZE).to_luma8();
        let edges = EdgeMap::sobel(&luma);
        let mut result = StepResult::new(self.name());

        let squareness = f64::from(image.width.min(image.height))
            / f64::from(image.width.max(image.height).max(1));

        let (cx, cy) = edges.centroid();
        let center_distance = (cx - 0.5).hypot(cy - 0.5);
        let centering = 1.0 - (center_distance / 0.5).min(1.0);

        let (t1, t2) = (1.0 / 3.0, 2.0 / 3.0);
        let thirds_distance = [(t1, t1), (t2, t1), (t1, t2), (t2, t2)]
            .iter()
            .map(|(tx, ty)| (cx - tx).hypot(cy - ty))
            .fold(f64::MAX, f64::min);
        // Distance from a thirds point to the frame center is ~0.236.
        let rule_of_thirds = 1.0 - (thirds_distance.min(center_distance) / 0.236).min(1.0);

        let symmetry = mirror_symmetry(&luma);

        let ring = cfg.background_ring;
        let border = edges.border_density(ring, cfg.edge_threshold);
        let background_complexity = (border / cfg.busy_background_density).min(1.0);
        let center = edges.region_density(ring, ring, 1.0 - ring, 1.0 - ring, cfg.edge_threshold);
        let foreground_clarity = if center + border <= f64::EPSILON {
            0.0
        } else {
            center / (center + border)
        };

        let edge_distribution = evenness(&edges.grid_shares());
        let (left, right) = edges.horizontal_masses();
        let visual_balance = if left + right <= f64::EPSILON {
            1.0
        } else {
            1.0 - (left - right).abs() / (left + right)
        };
        let negative_space = 1.0 - edges.density(cfg.empty_threshold);
        // Around half the frame empty reads as calm; either extreme is worse.
        let harmony = 1.0 - ((negative_space - 0.5).abs() / 0.5).min(1.0);

        result.metric("aspectSquareness", squareness);
        result.metric("subjectCenterX", cx);
        result.metric("subjectCenterY", cy);
        result.metric("centering", centering);
        result.metric("ruleOfThirds", rule_of_thirds);
        result.metric("symmetry", symmetry);
        result.metric("backgroundComplexity", background_complexity);
        result.metric("foregroundClarity", foreground_clarity);
        result.metric("edgeDistribution", edge_distribution);
        result.metric("visualBalance", visual_balance);
        result.metric("negativeSpace", negative_space);
        result.metric("harmony", harmony);

        let threshold = cfg.warning_threshold;
        if squareness < 0.75 {
            result.warn("Photo is not square; it will be cropped around the face");
        }
        if centering < threshold {
            result.warn("Subject appears off-center");
        }
        if background_complexity > 1.0 - threshold {
            result.warn("Background is busy; a plain background works best");
        }
        if visual_balance < threshold {
            result.warn("Composition is unbalanced");
        }

        let score = 0.2 * squareness
            + 0.2 * centering
            + 0.1 * rule_of_thirds
            + 0.1 * symmetry
            + 0.15 * (1.0 - background_complexity)
            + 0.1 * foreground_clarity
            + 0.1 * visual_balance
            + 0.05 * harmony;
        result.metric("score", score.clamp(0.0, 1.0));

        Ok(result)
    }
}
