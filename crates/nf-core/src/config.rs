//! Field configuration.
//!
//! Every tuning knob the engine uses lives here with a named default. All
//! structs are `#[serde(default)]` so a partial TOML or JSON file only needs
//! to name what it overrides.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{FieldError, Result};

/// How raw word overlap is normalized before bandwidth scaling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverlapNormalization {
    /// `|A∩B| / |A∪B|` (Jaccard).
    #[default]
    Union,
    /// `|A∩B| / max(|A|, |B|)`.
    MaxSize,
}

/// Strategy used by `measure_coherence`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CoherenceStrategy {
    /// Strength-weighted mean resonance over all pattern pairs.
    #[default]
    Pairwise,
    /// Strength-weighted mean of each pattern's best attractor resonance.
    AttractorAlignment,
    /// Strength-weighted sum of best attractor resonance.
    Entropy,
}

impl CoherenceStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pairwise => "pairwise",
            Self::AttractorAlignment => "attractor_alignment",
            Self::Entropy => "entropy",
        }
    }
}

impl fmt::Display for CoherenceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoherenceStrategy {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pairwise" => Ok(Self::Pairwise),
            "attractor_alignment" | "alignment" => Ok(Self::AttractorAlignment),
            "entropy" => Ok(Self::Entropy),
            other => Err(FieldError::InvalidConfig(format!(
                "unknown coherence strategy '{other}'"
            ))),
        }
    }
}

/// Multipliers used by inject and decay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub pull_cutoff: f64,
    pub pull_blend: f64,
    pub pull_gain: f64,
    pub propagation: f64,
    pub protection: f64,
    pub protection_cap: f64,
    pub attractor_decay: f64,
    pub pattern_floor: f64,
    pub attractor_floor: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            pull_cutoff: ATTRACTOR_PULL_CUTOFF,
            pull_blend: PULL_BLEND_FACTOR,
            pull_gain: PULL_STRENGTH_GAIN,
            propagation: PROPAGATION_FACTOR,
            protection: PROTECTION_FACTOR,
            protection_cap: PROTECTION_CAP,
            attractor_decay: ATTRACTOR_DECAY_FACTOR,
            pattern_floor: PATTERN_PRUNE_FLOOR,
            attractor_floor: ATTRACTOR_PRUNE_FLOOR,
        }
    }
}

/// Measurement and rendering parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub threshold: f64,
    pub amplification: f64,
    pub coherence: CoherenceStrategy,
    pub top_k: usize,
    pub preview_chars: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MEASURE_THRESHOLD,
            amplification: DEFAULT_MEASURE_AMPLIFICATION,
            coherence: CoherenceStrategy::default(),
            top_k: DEFAULT_CONTEXT_TOP_K,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }
}

/// Field parameters. Immutable once a `Field` is built; `Field::reset_with`
/// replaces the whole struct.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub decay_rate: f64,
    pub boundary_permeability: f64,
    pub resonance_bandwidth: f64,
    pub attractor_threshold: f64,
    pub overlap: OverlapNormalization,
    pub tuning: Tuning,
    pub metrics: MetricsConfig,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            decay_rate: DEFAULT_DECAY_RATE,
            boundary_permeability: DEFAULT_BOUNDARY_PERMEABILITY,
            resonance_bandwidth: DEFAULT_RESONANCE_BANDWIDTH,
            attractor_threshold: DEFAULT_ATTRACTOR_THRESHOLD,
            overlap: OverlapNormalization::default(),
            tuning: Tuning::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl FieldConfig {
    pub fn with_decay_rate(mut self, decay_rate: f64) -> Self {
        self.decay_rate = decay_rate;
        self
    }

    pub fn with_boundary_permeability(mut self, permeability: f64) -> Self {
        self.boundary_permeability = permeability;
        self
    }

    pub fn with_resonance_bandwidth(mut self, bandwidth: f64) -> Self {
        self.resonance_bandwidth = bandwidth;
        self
    }

    pub fn with_attractor_threshold(mut self, threshold: f64) -> Self {
        self.attractor_threshold = threshold;
        self
    }

    pub fn with_coherence(mut self, strategy: CoherenceStrategy) -> Self {
        self.metrics.coherence = strategy;
        self
    }

    /// Reject values that would break the non-negative strength invariant
    /// or make decay grow the field.
    pub fn validate(&self) -> Result<()> {
        check_unit("decay_rate", self.decay_rate)?;
        check_unit("boundary_permeability", self.boundary_permeability)?;
        check_non_negative("resonance_bandwidth", self.resonance_bandwidth)?;
        check_non_negative("attractor_threshold", self.attractor_threshold)?;

        let t = &self.tuning;
        check_unit("tuning.protection_cap", t.protection_cap)?;
        check_unit("tuning.attractor_decay", t.attractor_decay)?;
        for (name, value) in [
            ("tuning.pull_cutoff", t.pull_cutoff),
            ("tuning.pull_blend", t.pull_blend),
            ("tuning.pull_gain", t.pull_gain),
            ("tuning.propagation", t.propagation),
            ("tuning.protection", t.protection),
            ("tuning.pattern_floor", t.pattern_floor),
            ("tuning.attractor_floor", t.attractor_floor),
        ] {
            check_non_negative(name, value)?;
        }

        check_unit("metrics.threshold", self.metrics.threshold)?;
        check_non_negative("metrics.amplification", self.metrics.amplification)?;
        Ok(())
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(FieldError::InvalidConfig(format!(
            "{name} must be in [0, 1], got {value}"
        )));
    }
    Ok(())
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(FieldError::InvalidConfig(format!(
            "{name} must be finite and >= 0, got {value}"
        )));
    }
    Ok(())
}
