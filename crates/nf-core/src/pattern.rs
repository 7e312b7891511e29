use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::resonance::ResonanceCalculator;

/// A weighted text fragment. Identity is the content string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub content: String,
    pub strength: f64,
}

impl Pattern {
    pub fn new(content: impl Into<String>, strength: f64) -> Self {
        Self {
            content: content.into(),
            strength,
        }
    }
}

/// Insertion-ordered map of patterns keyed by content.
///
/// Patterns live in a `Vec` so iteration order is insertion order; the
/// content index is rebuilt after pruning.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PatternStore {
    patterns: Vec<Pattern>,
    index: HashMap<String, usize>,
}

impl PatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from patterns, summing duplicates into the first entry.
    pub fn from_patterns(patterns: impl IntoIterator<Item = Pattern>) -> Self {
        let mut store = Self::new();
        for p in patterns {
            store.add(&p.content, p.strength);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn contains(&self, content: &str) -> bool {
        self.index.contains_key(content)
    }

    pub fn get(&self, content: &str) -> Option<f64> {
        self.index.get(content).map(|&i| self.patterns[i].strength)
    }

    /// Patterns in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Pattern> {
        self.patterns.iter()
    }

    pub fn total_strength(&self) -> f64 {
        self.patterns.iter().map(|p| p.strength).sum()
    }

    /// Add `amount` to `content`, creating the entry if absent.
    /// Returns the updated strength.
    pub fn add(&mut self, content: &str, amount: f64) -> f64 {
        match self.index.get(content) {
            Some(&i) => {
                self.patterns[i].strength += amount;
                self.patterns[i].strength
            }
            None => {
                self.index.insert(content.to_string(), self.patterns.len());
                self.patterns.push(Pattern::new(content, amount));
                amount
            }
        }
    }

    /// Couple every other pattern to `trigger`: each gains
    /// `resonance(pattern, trigger) * strength * factor`. Effects are computed
    /// against the pre-propagation strengths, then applied together.
    pub fn propagate(&mut self, trigger: &str, resonance: &ResonanceCalculator, factor: f64) {
        let effects: Vec<f64> = self
            .patterns
            .iter()
            .map(|p| {
                if p.content == trigger {
                    0.0
                } else {
                    resonance.resonance(&p.content, trigger) * p.strength * factor
                }
            })
            .collect();

        for (p, effect) in self.patterns.iter_mut().zip(effects) {
            p.strength += effect;
        }
    }

    /// Multiply every strength by `retention(content)`.
    pub fn scale_each(&mut self, mut retention: impl FnMut(&str) -> f64) {
        for p in &mut self.patterns {
            p.strength *= retention(&p.content);
        }
    }

    /// Drop patterns with strength at or below `floor`. Returns the count removed.
    pub fn prune(&mut self, floor: f64) -> usize {
        let before = self.patterns.len();
        self.patterns.retain(|p| p.strength > floor);
        let removed = before - self.patterns.len();
        if removed > 0 {
            self.rebuild_index();
        }
        removed
    }

    /// Up to `k` strongest patterns. Ties keep insertion order.
    pub fn top(&self, k: usize) -> Vec<&Pattern> {
        let mut sorted: Vec<&Pattern> = self.patterns.iter().collect();
        sorted.sort_by(|a, b| b.strength.total_cmp(&a.strength));
        sorted.truncate(k);
        sorted
    }

    pub fn clear(&mut self) {
        self.patterns.clear();
        self.index.clear();
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .patterns
            .iter()
            .enumerate()
            .map(|(i, p)| (p.content.clone(), i))
            .collect();
    }
}

/// Blend `incoming` toward `attractor`, recording the blend ratio in the text.
/// Blending a fragment with itself leaves it unchanged.
pub fn blend(incoming: &str, attractor: &str, ratio: f64) -> String {
    if incoming == attractor {
        return incoming.to_string();
    }
    format!("{incoming} [~{ratio:.2} {attractor}]")
}
