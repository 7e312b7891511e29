//! Resonance: symmetric [0, 1] similarity between two text fragments.
//!
//! The field uses [`ResonanceCalculator`] directly during inject and decay.
//! Metrics go through [`MeasuredResonance`], which additionally drops weak
//! scores and amplifies the rest. The two must not be mixed up: the field's
//! own dynamics never see the threshold or the amplification.

use std::fmt;
use std::sync::Arc;

use crate::config::{FieldConfig, OverlapNormalization};
use crate::tokenizer::{is_blank, token_set};

/// Text encoder backing embedding resonance. Implementations wrap a
/// third-party model; the engine only computes cosine similarity on the
/// returned vectors.
pub trait Encoder: Send + Sync {
    fn encode(&self, text: &str) -> Vec<f32>;
}

/// Field-internal resonance: raw similarity scaled by bandwidth.
#[derive(Clone)]
pub struct ResonanceCalculator {
    bandwidth: f64,
    overlap: OverlapNormalization,
    encoder: Option<Arc<dyn Encoder>>,
}

impl fmt::Debug for ResonanceCalculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResonanceCalculator")
            .field("bandwidth", &self.bandwidth)
            .field("overlap", &self.overlap)
            .field("encoder", &self.encoder.is_some())
            .finish()
    }
}

impl ResonanceCalculator {
    pub fn new(bandwidth: f64) -> Self {
        Self {
            bandwidth,
            overlap: OverlapNormalization::default(),
            encoder: None,
        }
    }

    pub fn from_config(config: &FieldConfig) -> Self {
        Self::new(config.resonance_bandwidth).with_overlap(config.overlap)
    }

    pub fn with_overlap(mut self, overlap: OverlapNormalization) -> Self {
        self.overlap = overlap;
        self
    }

    /// Swap word overlap for cosine similarity over encoder vectors.
    pub fn with_encoder(mut self, encoder: Arc<dyn Encoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn has_encoder(&self) -> bool {
        self.encoder.is_some()
    }

    pub fn encoder(&self) -> Option<Arc<dyn Encoder>> {
        self.encoder.clone()
    }

    /// Resonance between two fragments, in [0, 1]. Zero if either is blank.
    pub fn resonance(&self, a: &str, b: &str) -> f64 {
        if is_blank(a) || is_blank(b) {
            return 0.0;
        }
        let raw = match &self.encoder {
            Some(encoder) => cosine(&encoder.encode(a), &encoder.encode(b)),
            None => word_overlap(a, b, self.overlap),
        };
        (raw * self.bandwidth).clamp(0.0, 1.0)
    }
}

/// Set overlap of lowercase words, normalized per `mode`.
pub fn word_overlap(a: &str, b: &str, mode: OverlapNormalization) -> f64 {
    let words_a = token_set(a);
    let words_b = token_set(b);
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let shared = words_a.intersection(&words_b).count();
    let denominator = match mode {
        OverlapNormalization::Union => words_a.union(&words_b).count(),
        OverlapNormalization::MaxSize => words_a.len().max(words_b.len()),
    };
    shared as f64 / denominator as f64
}

/// Cosine similarity clamped to [0, 1]. Mismatched or zero vectors score 0.
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

/// Resonance as seen by metrics: below `threshold` counts as silence,
/// anything else is amplified and clamped to 1.
#[derive(Clone, Debug)]
pub struct MeasuredResonance {
    calculator: ResonanceCalculator,
    threshold: f64,
    amplification: f64,
}

impl MeasuredResonance {
    pub fn new(calculator: ResonanceCalculator, threshold: f64, amplification: f64) -> Self {
        Self {
            calculator,
            threshold,
            amplification,
        }
    }

    pub fn from_config(config: &FieldConfig, calculator: ResonanceCalculator) -> Self {
        Self::new(
            calculator,
            config.metrics.threshold,
            config.metrics.amplification,
        )
    }

    pub fn measure(&self, a: &str, b: &str) -> f64 {
        let score = self.calculator.resonance(a, b);
        if score < self.threshold {
            return 0.0;
        }
        (score * self.amplification).clamp(0.0, 1.0)
    }

    pub fn calculator(&self) -> &ResonanceCalculator {
        &self.calculator
    }
}
