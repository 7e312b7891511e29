//! The neural field: one owned struct holding patterns, attractors and the
//! parameters that drive them.
//!
//! Callers alternate `inject` (add information) with `decay` (advance one
//! cycle) and read results through the `measure_*` methods or
//! `get_context_representation`. The field exclusively owns its pattern store,
//! attractor registry and residue ledger; nothing else mutates them.
//! Residues are never touched by inject or decay: callers surface, integrate
//! and echo them explicitly through `residues_mut`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::attractor::AttractorRegistry;
use crate::config::FieldConfig;
use crate::error::{FieldError, Result};
use crate::metrics::FieldMetrics;
use crate::pattern::PatternStore;
use crate::render::ContextRenderer;
use crate::residue::ResidueTracker;
use crate::resonance::{Encoder, ResonanceCalculator};
use crate::tokenizer::is_blank;
use crate::view::FieldView;

/// Operation log entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum FieldEvent {
    Inject {
        pattern: String,
        strength: f64,
        attractor: Option<String>,
    },
    Decay {
        cycle: u64,
        pruned_patterns: usize,
        pruned_attractors: usize,
    },
    Reset,
}

#[derive(Debug)]
pub struct Field {
    config: FieldConfig,
    resonance: ResonanceCalculator,
    metrics: FieldMetrics,
    patterns: PatternStore,
    attractors: AttractorRegistry,
    residues: ResidueTracker,
    cycle: u64,
    history: Vec<FieldEvent>,
}

impl Default for Field {
    fn default() -> Self {
        Self::from_parts(FieldConfig::default(), None)
    }
}

impl Field {
    /// Field with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Field with validated parameters.
    pub fn with_config(config: FieldConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(config, None))
    }

    /// Route resonance through `encoder` instead of word overlap.
    pub fn with_encoder(mut self, encoder: Arc<dyn Encoder>) -> Self {
        self.rebuild_resonance(Some(encoder));
        self
    }

    fn from_parts(config: FieldConfig, encoder: Option<Arc<dyn Encoder>>) -> Self {
        let resonance = calculator_for(&config, encoder);
        Self {
            metrics: FieldMetrics::from_config(&config, resonance.clone()),
            resonance,
            config,
            patterns: PatternStore::new(),
            attractors: AttractorRegistry::new(),
            residues: ResidueTracker::new(),
            cycle: 0,
            history: Vec::new(),
        }
    }

    fn rebuild_resonance(&mut self, encoder: Option<Arc<dyn Encoder>>) {
        self.resonance = calculator_for(&self.config, encoder);
        self.metrics = FieldMetrics::from_config(&self.config, self.resonance.clone());
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn resonance(&self) -> &ResonanceCalculator {
        &self.resonance
    }

    pub fn pattern_store(&self) -> &PatternStore {
        &self.patterns
    }

    pub fn attractor_registry(&self) -> &AttractorRegistry {
        &self.attractors
    }

    pub fn residues(&self) -> &ResidueTracker {
        &self.residues
    }

    pub fn residues_mut(&mut self) -> &mut ResidueTracker {
        &mut self.residues
    }

    /// Completed decay cycles since construction or the last reset.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn history(&self) -> &[FieldEvent] {
        &self.history
    }

    /// Current strength of `pattern`, if stored.
    pub fn strength_of(&self, pattern: &str) -> Option<f64> {
        self.patterns.get(pattern)
    }

    /// Add `pattern` with `strength`, scaled by boundary permeability.
    ///
    /// Resonant attractors pull and blend the text first; the stored entry
    /// may form a new attractor; finally every other pattern gains from its
    /// resonance with the injected one. Blank text is a no-op; negative or
    /// non-finite strength is clamped to zero.
    pub fn inject(&mut self, pattern: &str, strength: f64) -> &mut Self {
        if is_blank(pattern) {
            trace!("ignoring blank pattern");
            return self;
        }
        let strength = if !strength.is_finite() {
            warn!(pattern, strength, "non-finite injection strength clamped to 0");
            0.0
        } else if strength < 0.0 {
            warn!(pattern, strength, "negative injection strength clamped to 0");
            0.0
        } else {
            strength
        };

        let tuning = &self.config.tuning;
        let effective = strength * self.config.boundary_permeability;
        let text = self.attractors.pull(pattern, &self.resonance, tuning);
        let updated = self.patterns.add(&text, effective);

        let attractor = if updated > self.config.attractor_threshold {
            Some(self.form_unchecked(&text, updated))
        } else {
            None
        };

        self.patterns
            .propagate(&text, &self.resonance, self.config.tuning.propagation);

        trace!(pattern = %text, strength = updated, "pattern injected");
        self.history.push(FieldEvent::Inject {
            pattern: text,
            strength: effective,
            attractor,
        });
        self
    }

    /// `inject` with the default strength of 1.0.
    pub fn inject_default(&mut self, pattern: &str) -> &mut Self {
        self.inject(pattern, 1.0)
    }

    /// Advance one cycle: weaken every pattern (less so near attractors),
    /// weaken every attractor, then prune whatever fell to its floor.
    pub fn decay(&mut self) -> &mut Self {
        let tuning = &self.config.tuning;
        let decay_rate = self.config.decay_rate;
        let attractors = &self.attractors;
        let resonance = &self.resonance;

        self.patterns.scale_each(|content| {
            let protection = attractors.protection(
                content,
                resonance,
                tuning.protection,
                tuning.protection_cap,
            );
            1.0 - decay_rate * (1.0 - protection)
        });
        self.attractors
            .scale(1.0 - decay_rate * tuning.attractor_decay);

        let pruned_patterns = self.patterns.prune(tuning.pattern_floor);
        let pruned_attractors = self.attractors.prune(tuning.attractor_floor);
        self.cycle += 1;

        if pruned_patterns > 0 || pruned_attractors > 0 {
            debug!(
                cycle = self.cycle,
                pruned_patterns, pruned_attractors, "decay pruned field"
            );
        }
        self.history.push(FieldEvent::Decay {
            cycle: self.cycle,
            pruned_patterns,
            pruned_attractors,
        });
        self
    }

    /// Run `n` decay cycles.
    pub fn decay_n(&mut self, n: usize) -> &mut Self {
        for _ in 0..n {
            self.decay();
        }
        self
    }

    /// Explicitly form an attractor around a stored pattern at its current
    /// strength.
    pub fn form_attractor(&mut self, pattern: &str) -> Result<String> {
        let strength = self
            .patterns
            .get(pattern)
            .ok_or_else(|| FieldError::PatternNotFound(pattern.to_string()))?;
        Ok(self.form_unchecked(pattern, strength))
    }

    fn form_unchecked(&mut self, pattern: &str, strength: f64) -> String {
        let id = self
            .attractors
            .form(pattern, strength, self.config.resonance_bandwidth);
        debug!(attractor = %id, strength, "attractor formed");
        id
    }

    pub fn measure_stability(&self) -> f64 {
        self.metrics.stability(self)
    }

    pub fn measure_coherence(&self) -> f64 {
        self.metrics.coherence(self)
    }

    pub fn measure_entropy(&self) -> f64 {
        self.metrics.entropy(self)
    }

    pub fn get_field_metrics(&self) -> BTreeMap<String, f64> {
        self.metrics.summary(self)
    }

    pub fn get_context_representation(&self) -> String {
        ContextRenderer::from_config(&self.config.metrics).render(
            &self.attractors,
            &self.patterns,
            self.measure_stability(),
        )
    }

    /// Clear all state, keeping parameters and encoder. The residue ledger
    /// is cleared too.
    pub fn reset(&mut self) {
        self.patterns.clear();
        self.attractors.clear();
        self.residues.clear();
        self.cycle = 0;
        self.history.clear();
        self.history.push(FieldEvent::Reset);
        debug!("field reset");
    }

    /// Clear all state and replace the parameters wholesale.
    pub fn reset_with(&mut self, config: FieldConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        let encoder = self.resonance.encoder();
        self.rebuild_resonance(encoder);
        self.reset();
        Ok(())
    }

    pub(crate) fn restore(
        &mut self,
        patterns: PatternStore,
        attractors: AttractorRegistry,
        residues: ResidueTracker,
        cycle: u64,
    ) {
        self.patterns = patterns;
        self.attractors = attractors;
        self.residues = residues;
        self.cycle = cycle;
    }
}

fn calculator_for(config: &FieldConfig, encoder: Option<Arc<dyn Encoder>>) -> ResonanceCalculator {
    let calculator = ResonanceCalculator::from_config(config);
    match encoder {
        Some(encoder) => calculator.with_encoder(encoder),
        None => calculator,
    }
}

impl FieldView for Field {
    fn patterns(&self) -> impl Iterator<Item = (&str, f64)> {
        self.patterns.iter().map(|p| (p.content.as_str(), p.strength))
    }

    fn attractors(&self) -> impl Iterator<Item = (&str, f64)> {
        self.attractors
            .iter()
            .map(|a| (a.pattern.as_str(), a.strength))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn field(config: FieldConfig) -> Field {
        Field::with_config(config).unwrap()
    }

    #[test]
    fn test_inject_scales_by_permeability() {
        let mut f = field(FieldConfig::default().with_decay_rate(0.05));
        f.inject("alpha", 1.0);
        assert_relative_eq!(f.strength_of("alpha").unwrap(), 0.8);
    }

    #[test]
    fn test_inject_is_chainable() {
        let mut f = Field::new();
        f.inject("one", 0.1).inject("two", 0.1).decay();
        assert_eq!(f.pattern_store().len(), 2);
        assert_eq!(f.cycle(), 1);
    }

    #[test]
    fn test_blank_pattern_is_noop() {
        let mut f = Field::new();
        f.inject("", 1.0).inject("   ", 1.0);
        assert!(f.pattern_store().is_empty());
        assert!(f.history().is_empty());
    }

    #[test]
    fn test_negative_strength_clamped() {
        let mut f = Field::new();
        f.inject("alpha", -1.0);
        assert_eq!(f.strength_of("alpha"), Some(0.0));
        f.decay();
        assert_eq!(f.strength_of("alpha"), None);
    }

    #[test]
    fn test_non_finite_strength_clamped() {
        let mut f = Field::new();
        f.inject("x", f64::INFINITY).inject("y", 1.0);
        assert_eq!(f.strength_of("x"), Some(0.0));
        f.inject("z", f64::NAN);
        assert_eq!(f.strength_of("z"), Some(0.0));
        f.decay();
        assert_eq!(f.strength_of("x"), None);
        assert_relative_eq!(
            f.strength_of("y").unwrap(),
            0.8 * (1.0 - 0.05 * 0.7),
            epsilon = 1e-12
        );
        for (_, strength) in f.patterns() {
            assert!(strength.is_finite());
        }
    }

    #[test]
    fn test_reinject_accumulates_and_pulls() {
        let mut f = Field::new();
        f.inject("alpha", 1.0);
        assert_eq!(f.attractor_registry().len(), 1);
        f.inject("alpha", 1.0);
        assert_relative_eq!(f.strength_of("alpha").unwrap(), 1.6, epsilon = 1e-12);
        // first attractor was pulled: 0.8 + 0.6 * 0.1
        let first = f.attractor_registry().get("attractor_0").unwrap();
        assert_relative_eq!(first.strength, 0.86, epsilon = 1e-12);
        assert_eq!(f.attractor_registry().len(), 2);
    }

    #[test]
    fn test_propagation_couples_resonant_patterns() {
        let config = FieldConfig::default()
            .with_attractor_threshold(10.0)
            .with_boundary_permeability(1.0);
        let mut f = field(config);
        f.inject("red apple", 0.5);
        f.inject("green apple", 0.5);
        // "red apple" gains 1/3 * 0.6 * 0.5 * 0.2
        assert_relative_eq!(
            f.strength_of("red apple").unwrap(),
            0.5 + 0.02,
            epsilon = 1e-12
        );
        assert_relative_eq!(f.strength_of("green apple").unwrap(), 0.5);
    }

    #[test]
    fn test_decay_without_attractors() {
        let config = FieldConfig::default().with_attractor_threshold(10.0);
        let mut f = field(config);
        f.inject("alpha", 1.0);
        f.decay();
        assert_relative_eq!(f.strength_of("alpha").unwrap(), 0.8 * 0.95, epsilon = 1e-12);
    }

    #[test]
    fn test_attractor_protects_resonant_pattern() {
        let mut f = Field::new();
        f.inject("alpha", 1.0);
        f.decay();
        // protection 0.6 * 0.5 = 0.3 → effective decay 0.05 * 0.7
        assert_relative_eq!(
            f.strength_of("alpha").unwrap(),
            0.8 * (1.0 - 0.05 * 0.7),
            epsilon = 1e-12
        );
        let a = f.attractor_registry().get("attractor_0").unwrap();
        assert_relative_eq!(a.strength, 0.8 * (1.0 - 0.05 * 0.2), epsilon = 1e-12);
    }

    #[test]
    fn test_attractor_survives_pattern_prune() {
        let config = FieldConfig::default()
            .with_decay_rate(1.0)
            .with_boundary_permeability(1.0)
            .with_attractor_threshold(0.5);
        let mut f = field(config);
        f.inject("solo", 1.0);
        // pattern keeps 0.3 per cycle under protection, attractor keeps 0.8
        f.decay_n(3);
        assert!(f.strength_of("solo").is_some());
        f.decay();
        assert_eq!(f.strength_of("solo"), None);
        let a = f.attractor_registry().get("attractor_0").unwrap();
        assert_eq!(a.pattern, "solo");
        assert_relative_eq!(a.strength, 0.8f64.powi(4), epsilon = 1e-12);
    }

    #[test]
    fn test_form_attractor_requires_pattern() {
        let mut f = Field::new();
        assert!(matches!(
            f.form_attractor("ghost"),
            Err(FieldError::PatternNotFound(_))
        ));
        f.inject("weak", 0.1);
        let id = f.form_attractor("weak").unwrap();
        assert_eq!(id, "attractor_0");
        let a = f.attractor_registry().get(&id).unwrap();
        assert_relative_eq!(a.strength, 0.08, epsilon = 1e-12);
        assert_eq!(a.basin_width, 0.6);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut f = Field::new();
        f.inject("alpha", 1.0).decay();
        f.residues_mut().surface("note", "test", 1.0);
        f.reset();
        assert!(f.residues().is_empty());
        assert!(f.pattern_store().is_empty());
        assert!(f.attractor_registry().is_empty());
        assert_eq!(f.cycle(), 0);
        assert_eq!(f.history(), &[FieldEvent::Reset]);
        f.inject("beta", 1.0);
        assert_eq!(f.attractor_registry().iter().next().unwrap().id, "attractor_0");
    }

    #[test]
    fn test_reset_with_replaces_config() {
        let mut f = Field::new();
        f.inject("alpha", 1.0);
        f.reset_with(FieldConfig::default().with_boundary_permeability(0.5))
            .unwrap();
        assert!(f.pattern_store().is_empty());
        f.inject("alpha", 1.0);
        assert_relative_eq!(f.strength_of("alpha").unwrap(), 0.5);

        assert!(f.reset_with(FieldConfig::default().with_decay_rate(2.0)).is_err());
        assert_eq!(f.config().boundary_permeability, 0.5);
    }

    #[test]
    fn test_with_config_validates() {
        assert!(matches!(
            Field::with_config(FieldConfig::default().with_decay_rate(-0.1)),
            Err(FieldError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_history_records_operations() {
        let mut f = Field::new();
        f.inject("beta", 1.0).decay();
        assert_eq!(
            f.history()[0],
            FieldEvent::Inject {
                pattern: "beta".into(),
                strength: 0.8,
                attractor: Some("attractor_0".into()),
            }
        );
        assert!(matches!(f.history()[1], FieldEvent::Decay { cycle: 1, .. }));
    }

    #[test]
    fn test_metrics_read_only() {
        let mut f = Field::new();
        f.inject("alpha beta", 1.0).inject("beta gamma", 0.5);
        let before: Vec<(String, f64)> = f
            .patterns()
            .map(|(t, s)| (t.to_string(), s))
            .collect();
        let _ = f.get_field_metrics();
        let _ = f.get_context_representation();
        let after: Vec<(String, f64)> = f
            .patterns()
            .map(|(t, s)| (t.to_string(), s))
            .collect();
        assert_eq!(before, after);
    }
}
