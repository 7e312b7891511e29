use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::Tuning;
use crate::pattern::blend;
use crate::resonance::ResonanceCalculator;

/// A pattern that crossed the formation threshold and now acts as a stable
/// organizing center. Holds its own copy of the text, so it outlives the
/// pattern it formed from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attractor {
    pub id: String,
    pub pattern: String,
    pub strength: f64,
    pub formation_order: u64,
    pub basin_width: f64,
}

/// Attractors in formation order.
///
/// `formed` counts every attractor ever created and feeds the
/// `attractor_<n>` ids, so ids stay unique after pruning.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttractorRegistry {
    attractors: Vec<Attractor>,
    formed: u64,
}

impl AttractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from saved attractors. `formed` is raised to at
    /// least the number of attractors so fresh ids never collide.
    pub fn restore(attractors: Vec<Attractor>, formed: u64) -> Self {
        let next = attractors
            .iter()
            .map(|a| a.formation_order + 1)
            .max()
            .unwrap_or(0);
        Self {
            formed: formed.max(next).max(attractors.len() as u64),
            attractors,
        }
    }

    pub fn len(&self) -> usize {
        self.attractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attractors.is_empty()
    }

    /// Number of attractors formed over the registry's lifetime.
    pub fn formed(&self) -> u64 {
        self.formed
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attractor> {
        self.attractors.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Attractor> {
        self.attractors.iter().find(|a| a.id == id)
    }

    /// Form a new attractor around `pattern`. Returns its id.
    pub fn form(&mut self, pattern: &str, strength: f64, basin_width: f64) -> String {
        let order = self.formed;
        let id = format!("attractor_{order}");
        self.formed += 1;
        self.attractors.push(Attractor {
            id: id.clone(),
            pattern: pattern.to_string(),
            strength,
            formation_order: order,
            basin_width,
        });
        id
    }

    /// Let every sufficiently resonant attractor pull `incoming` toward
    /// itself. Each pulling attractor is strengthened and the incoming text
    /// is blended; later attractors see the already-blended text.
    pub fn pull(
        &mut self,
        incoming: &str,
        resonance: &ResonanceCalculator,
        tuning: &Tuning,
    ) -> String {
        let mut text = incoming.to_string();
        for attractor in &mut self.attractors {
            let r = resonance.resonance(&text, &attractor.pattern);
            if r > tuning.pull_cutoff {
                text = blend(&text, &attractor.pattern, r * tuning.pull_blend);
                attractor.strength += r * tuning.pull_gain;
                trace!(attractor = %attractor.id, resonance = r, "attractor pulled pattern");
            }
        }
        text
    }

    /// Highest resonance between `text` and any attractor, 0 if none.
    pub fn best_resonance(&self, text: &str, resonance: &ResonanceCalculator) -> f64 {
        self.attractors
            .iter()
            .map(|a| resonance.resonance(text, &a.pattern))
            .fold(0.0, f64::max)
    }

    /// Decay shielding for `text`: summed attractor resonance times `factor`,
    /// capped at `cap`.
    pub fn protection(
        &self,
        text: &str,
        resonance: &ResonanceCalculator,
        factor: f64,
        cap: f64,
    ) -> f64 {
        let total: f64 = self
            .attractors
            .iter()
            .map(|a| resonance.resonance(text, &a.pattern) * factor)
            .sum();
        total.min(cap)
    }

    /// Multiply every attractor's strength by `retention`.
    pub fn scale(&mut self, retention: f64) {
        for a in &mut self.attractors {
            a.strength *= retention;
        }
    }

    /// Drop attractors at or below `floor`. Returns the count removed.
    pub fn prune(&mut self, floor: f64) -> usize {
        let before = self.attractors.len();
        self.attractors.retain(|a| a.strength > floor);
        before - self.attractors.len()
    }

    /// Up to `k` strongest attractors. Ties keep formation order.
    pub fn strongest(&self, k: usize) -> Vec<&Attractor> {
        let mut sorted: Vec<&Attractor> = self.attractors.iter().collect();
        sorted.sort_by(|a, b| b.strength.total_cmp(&a.strength));
        sorted.truncate(k);
        sorted
    }

    pub fn clear(&mut self) {
        self.attractors.clear();
        self.formed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn calc() -> ResonanceCalculator {
        ResonanceCalculator::new(0.6)
    }

    #[test]
    fn test_form_assigns_sequential_ids() {
        let mut reg = AttractorRegistry::new();
        assert_eq!(reg.form("a", 0.8, 0.6), "attractor_0");
        assert_eq!(reg.form("b", 0.9, 0.6), "attractor_1");
        let b = reg.get("attractor_1").unwrap();
        assert_eq!(b.pattern, "b");
        assert_eq!(b.formation_order, 1);
        assert_eq!(b.basin_width, 0.6);
    }

    #[test]
    fn test_ids_unique_after_prune() {
        let mut reg = AttractorRegistry::new();
        reg.form("a", 0.05, 0.6);
        reg.form("b", 0.9, 0.6);
        assert_eq!(reg.prune(0.1), 1);
        assert_eq!(reg.form("c", 0.9, 0.6), "attractor_2");
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_pull_identical_text_keeps_key() {
        let mut reg = AttractorRegistry::new();
        reg.form("alpha", 0.8, 0.6);
        let text = reg.pull("alpha", &calc(), &Tuning::default());
        assert_eq!(text, "alpha");
        // 0.8 + 0.6 * 0.1
        assert_relative_eq!(
            reg.get("attractor_0").unwrap().strength,
            0.86,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_pull_blends_resonant_text() {
        let mut reg = AttractorRegistry::new();
        reg.form("beta", 0.8, 0.6);
        // shared {beta} / union {beta, gamma} = 0.5, * 0.6 = 0.3
        let text = reg.pull("beta gamma", &calc(), &Tuning::default());
        assert_eq!(text, "beta gamma [~0.09 beta]");
        assert_relative_eq!(
            reg.get("attractor_0").unwrap().strength,
            0.83,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_pull_ignores_weak_resonance() {
        let mut reg = AttractorRegistry::new();
        reg.form("cat dog", 0.8, 0.6);
        // 1/4 * 0.6 = 0.15, below the cutoff
        let text = reg.pull("dog bird fish", &calc(), &Tuning::default());
        assert_eq!(text, "dog bird fish");
        assert_eq!(reg.get("attractor_0").unwrap().strength, 0.8);
    }

    #[test]
    fn test_protection_caps() {
        let mut reg = AttractorRegistry::new();
        for _ in 0..5 {
            reg.form("same words", 1.0, 0.6);
        }
        // 5 * 0.6 * 0.5 = 1.5, capped
        assert_eq!(reg.protection("same words", &calc(), 0.5, 0.9), 0.9);
        assert_eq!(reg.protection("other", &calc(), 0.5, 0.9), 0.0);
    }

    #[test]
    fn test_best_resonance_empty_is_zero() {
        let reg = AttractorRegistry::new();
        assert_eq!(reg.best_resonance("anything", &calc()), 0.0);
    }

    #[test]
    fn test_strongest_orders_by_strength() {
        let mut reg = AttractorRegistry::new();
        reg.form("a", 0.5, 0.6);
        reg.form("b", 0.9, 0.6);
        reg.form("c", 0.5, 0.6);
        let ids: Vec<&str> = reg.strongest(5).iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["attractor_1", "attractor_0", "attractor_2"]);
    }

    #[test]
    fn test_restore_keeps_ids_fresh() {
        let mut reg = AttractorRegistry::new();
        reg.form("a", 0.9, 0.6);
        reg.form("b", 0.9, 0.6);
        let saved: Vec<Attractor> = reg.iter().skip(1).cloned().collect();
        let mut restored = AttractorRegistry::restore(saved, 0);
        assert_eq!(restored.form("c", 0.9, 0.6), "attractor_2");
    }
}
