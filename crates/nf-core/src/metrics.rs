//! Field health metrics: stability, coherence and entropy.
//!
//! Every metric reads through [`FieldView`] and scores similarity with
//! [`MeasuredResonance`], never with the field-internal calculator. All
//! outputs are clamped to [0, 1].

use std::collections::BTreeMap;

use crate::config::{CoherenceStrategy, FieldConfig};
use crate::constants::EPSILON;
use crate::resonance::{MeasuredResonance, ResonanceCalculator};
use crate::view::FieldView;

/// Weight of mean attractor strength in stability.
const STABILITY_ATTRACTOR_WEIGHT: f64 = 0.6;

/// Weight of pattern organization in stability.
const STABILITY_ORGANIZATION_WEIGHT: f64 = 0.4;

#[derive(Clone, Debug)]
pub struct FieldMetrics {
    resonance: MeasuredResonance,
    strategy: CoherenceStrategy,
}

impl FieldMetrics {
    pub fn new(resonance: MeasuredResonance, strategy: CoherenceStrategy) -> Self {
        Self {
            resonance,
            strategy,
        }
    }

    pub fn from_config(config: &FieldConfig, calculator: ResonanceCalculator) -> Self {
        Self::new(
            MeasuredResonance::from_config(config, calculator),
            config.metrics.coherence,
        )
    }

    pub fn strategy(&self) -> CoherenceStrategy {
        self.strategy
    }

    /// `mean(attractor strength) * 0.6 + organization * 0.4`, capped at 1.
    /// Zero when there are no attractors.
    pub fn stability(&self, view: &impl FieldView) -> f64 {
        let attractors: Vec<(&str, f64)> = view.attractors().collect();
        if attractors.is_empty() {
            return 0.0;
        }
        let patterns: Vec<(&str, f64)> = view.patterns().collect();

        let mean_strength =
            attractors.iter().map(|(_, s)| s).sum::<f64>() / attractors.len() as f64;
        let organization = self.organization(&patterns, &attractors);

        unit(mean_strength * STABILITY_ATTRACTOR_WEIGHT
            + organization * STABILITY_ORGANIZATION_WEIGHT)
    }

    /// Coherence under the configured strategy.
    pub fn coherence(&self, view: &impl FieldView) -> f64 {
        self.coherence_with(view, self.strategy)
    }

    pub fn coherence_with(&self, view: &impl FieldView, strategy: CoherenceStrategy) -> f64 {
        let patterns: Vec<(&str, f64)> = view.patterns().collect();
        let attractors: Vec<(&str, f64)> = view.attractors().collect();

        match strategy {
            CoherenceStrategy::Pairwise => self.pairwise(&patterns),
            CoherenceStrategy::AttractorAlignment => {
                if attractors.is_empty() {
                    self.pairwise(&patterns)
                } else {
                    self.organization(&patterns, &attractors)
                }
            }
            CoherenceStrategy::Entropy => {
                let weighted: f64 = patterns
                    .iter()
                    .map(|(text, s)| s * self.best_resonance(text, &attractors))
                    .sum();
                unit(weighted)
            }
        }
    }

    /// Normalized Shannon entropy of the pattern strength distribution.
    pub fn entropy(&self, view: &impl FieldView) -> f64 {
        normalized_entropy(view.patterns().map(|(_, s)| s))
    }

    /// Every metric plus basic counts, keyed by name.
    pub fn summary(&self, view: &impl FieldView) -> BTreeMap<String, f64> {
        let pattern_strengths: Vec<f64> = view.patterns().map(|(_, s)| s).collect();
        let attractor_strengths: Vec<f64> = view.attractors().map(|(_, s)| s).collect();
        let mean_attractor = if attractor_strengths.is_empty() {
            0.0
        } else {
            attractor_strengths.iter().sum::<f64>() / attractor_strengths.len() as f64
        };

        let mut metrics = BTreeMap::new();
        metrics.insert("stability".to_string(), self.stability(view));
        metrics.insert("coherence".to_string(), self.coherence(view));
        metrics.insert("entropy".to_string(), self.entropy(view));
        metrics.insert("pattern_count".to_string(), pattern_strengths.len() as f64);
        metrics.insert(
            "attractor_count".to_string(),
            attractor_strengths.len() as f64,
        );
        metrics.insert(
            "total_strength".to_string(),
            pattern_strengths.iter().sum(),
        );
        metrics.insert("mean_attractor_strength".to_string(), mean_attractor);
        metrics
    }

    /// Strength-weighted mean resonance over all pattern pairs.
    /// 1.0 for fields with at most one pattern.
    fn pairwise(&self, patterns: &[(&str, f64)]) -> f64 {
        if patterns.len() <= 1 {
            return 1.0;
        }
        let mut weighted = 0.0;
        let mut weight = 0.0;
        for (i, (a, sa)) in patterns.iter().enumerate() {
            for (b, sb) in &patterns[i + 1..] {
                let w = sa * sb;
                weighted += w * self.resonance.measure(a, b);
                weight += w;
            }
        }
        if weight <= EPSILON {
            return 0.0;
        }
        unit(weighted / weight)
    }

    /// Strength-weighted mean of each pattern's best attractor resonance.
    fn organization(&self, patterns: &[(&str, f64)], attractors: &[(&str, f64)]) -> f64 {
        let total: f64 = patterns.iter().map(|(_, s)| s).sum();
        if total <= EPSILON {
            return 0.0;
        }
        let weighted: f64 = patterns
            .iter()
            .map(|(text, s)| s * self.best_resonance(text, attractors))
            .sum();
        unit(weighted / total)
    }

    fn best_resonance(&self, text: &str, attractors: &[(&str, f64)]) -> f64 {
        attractors
            .iter()
            .map(|(a, _)| self.resonance.measure(text, a))
            .fold(0.0, f64::max)
    }
}

/// `-Σ p·log2(p) / log2(N)` over the strength distribution. An empty or
/// weightless field is maximally disordered (1.0); a single pattern is
/// perfectly ordered (0.0).
pub fn normalized_entropy(strengths: impl IntoIterator<Item = f64>) -> f64 {
    let strengths: Vec<f64> = strengths.into_iter().collect();
    let total: f64 = strengths.iter().sum();
    if strengths.is_empty() || total <= EPSILON {
        return 1.0;
    }
    if strengths.len() == 1 {
        return 0.0;
    }

    let entropy: f64 = strengths
        .iter()
        .map(|s| s / total)
        .filter(|p| *p > 0.0)
        .map(|p| -p * p.log2())
        .sum();
    unit(entropy / (strengths.len() as f64).log2())
}

fn unit(x: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    x.clamp(0.0, 1.0)
}
