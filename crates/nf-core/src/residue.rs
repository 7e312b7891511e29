//! Symbolic residue: a provenance ledger for fragments.
//!
//! A residue records where a fragment surfaced and what it later integrated
//! into or echoed through. Residues are independent of field decay and are
//! never pruned; only explicit `integrate` / `echo` calls change them.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{FieldError, Result};
use crate::time::now_secs;

/// Default strength gained by `integrate`.
pub const DEFAULT_INTEGRATE_DELTA: f64 = 0.5;

/// Default strength change applied by `echo`.
pub const DEFAULT_ECHO_DELTA: f64 = -0.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResidueState {
    Surfaced,
    Integrated,
    Echo,
}

impl ResidueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Surfaced => "surfaced",
            Self::Integrated => "integrated",
            Self::Echo => "echo",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Integration,
    Echo,
}

/// One integrate/echo event applied to a residue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub target: String,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    pub strength_delta: f64,
    pub timestamp: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymbolicResidue {
    pub id: String,
    pub content: String,
    pub source: String,
    pub strength: f64,
    pub state: ResidueState,
    pub timestamp: f64,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

/// Tracker-wide event log entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResidueEvent {
    pub residue_id: String,
    pub event: ResidueState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub timestamp: f64,
}

/// Serializable tracker state: `{residues: {id: residue}, history: [...]}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResidueSnapshot {
    pub residues: BTreeMap<String, SymbolicResidue>,
    #[serde(default)]
    pub history: Vec<ResidueEvent>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResidueSummary {
    pub total: usize,
    pub surfaced: usize,
    pub integrated: usize,
    pub echo: usize,
    pub total_strength: f64,
}

/// Residues in surfacing order with an id index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResidueTracker {
    residues: Vec<SymbolicResidue>,
    index: HashMap<String, usize>,
    history: Vec<ResidueEvent>,
}

impl ResidueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    /// Record a freshly surfaced fragment. Always creates a new residue.
    pub fn surface(&mut self, content: &str, source: &str, strength: f64) -> String {
        let id = format!("residue_{}", Uuid::new_v4().simple());
        let timestamp = now_secs();
        let strength = non_negative(strength, &id);

        self.index.insert(id.clone(), self.residues.len());
        self.residues.push(SymbolicResidue {
            id: id.clone(),
            content: content.to_string(),
            source: source.to_string(),
            strength,
            state: ResidueState::Surfaced,
            timestamp,
            interactions: Vec::new(),
        });
        self.history.push(ResidueEvent {
            residue_id: id.clone(),
            event: ResidueState::Surfaced,
            target: None,
            timestamp,
        });
        debug!(residue = %id, source, "residue surfaced");
        id
    }

    /// Mark a residue as integrated into `target` and add `strength_delta`.
    pub fn integrate(&mut self, residue_id: &str, target: &str, strength_delta: f64) -> Result<()> {
        self.transition(
            residue_id,
            target,
            strength_delta,
            ResidueState::Integrated,
            InteractionKind::Integration,
        )
    }

    /// Mark a residue as echoing through `target` and add `strength_delta`
    /// (negative by default).
    pub fn echo(&mut self, residue_id: &str, target: &str, strength_delta: f64) -> Result<()> {
        self.transition(
            residue_id,
            target,
            strength_delta,
            ResidueState::Echo,
            InteractionKind::Echo,
        )
    }

    fn transition(
        &mut self,
        residue_id: &str,
        target: &str,
        strength_delta: f64,
        state: ResidueState,
        kind: InteractionKind,
    ) -> Result<()> {
        let &i = self
            .index
            .get(residue_id)
            .ok_or_else(|| FieldError::ResidueNotFound(residue_id.to_string()))?;
        let timestamp = now_secs();

        let residue = &mut self.residues[i];
        residue.state = state;
        residue.strength = non_negative(residue.strength + strength_delta, residue_id);
        residue.interactions.push(Interaction {
            target: target.to_string(),
            kind,
            strength_delta,
            timestamp,
        });

        self.history.push(ResidueEvent {
            residue_id: residue_id.to_string(),
            event: state,
            target: Some(target.to_string()),
            timestamp,
        });
        debug!(
            residue = residue_id,
            to = target,
            state = state.as_str(),
            strength = residue.strength,
            "residue transition"
        );
        Ok(())
    }

    pub fn clear(&mut self) {
        self.residues.clear();
        self.index.clear();
        self.history.clear();
    }

    pub fn get(&self, residue_id: &str) -> Option<&SymbolicResidue> {
        self.index.get(residue_id).map(|&i| &self.residues[i])
    }

    /// Residues in surfacing order.
    pub fn iter(&self) -> std::slice::Iter<'_, SymbolicResidue> {
        self.residues.iter()
    }

    /// Residues with strength at or above `min_strength`.
    pub fn get_active_residues(&self, min_strength: f64) -> Vec<&SymbolicResidue> {
        self.residues
            .iter()
            .filter(|r| r.strength >= min_strength)
            .collect()
    }

    pub fn get_residues_by_state(&self, state: ResidueState) -> Vec<&SymbolicResidue> {
        self.residues.iter().filter(|r| r.state == state).collect()
    }

    pub fn history(&self) -> &[ResidueEvent] {
        &self.history
    }

    pub fn summary(&self) -> ResidueSummary {
        let mut summary = ResidueSummary {
            total: self.residues.len(),
            ..Default::default()
        };
        for r in &self.residues {
            match r.state {
                ResidueState::Surfaced => summary.surfaced += 1,
                ResidueState::Integrated => summary.integrated += 1,
                ResidueState::Echo => summary.echo += 1,
            }
            summary.total_strength += r.strength;
        }
        summary
    }

    /// Snapshot of all residues and the event history.
    pub fn to_dict(&self) -> ResidueSnapshot {
        ResidueSnapshot {
            residues: self
                .residues
                .iter()
                .map(|r| (r.id.clone(), r.clone()))
                .collect(),
            history: self.history.clone(),
        }
    }

    /// Rebuild a tracker from a snapshot. Surfacing order comes from the
    /// history's `surfaced` events; residues missing from the history follow
    /// in id order.
    pub fn from_dict(snapshot: ResidueSnapshot) -> Self {
        let ResidueSnapshot {
            mut residues,
            history,
        } = snapshot;

        let mut ordered = Vec::with_capacity(residues.len());
        for event in &history {
            if event.event == ResidueState::Surfaced
                && let Some(residue) = residues.remove(&event.residue_id)
            {
                ordered.push(residue);
            }
        }
        ordered.extend(residues.into_values());

        let index = ordered
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();

        Self {
            residues: ordered,
            index,
            history,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_dict())?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: ResidueSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_dict(snapshot))
    }
}

fn non_negative(strength: f64, residue_id: &str) -> f64 {
    if !strength.is_finite() {
        warn!(residue = residue_id, strength, "non-finite residue strength clamped to 0");
        return 0.0;
    }
    if strength < 0.0 {
        warn!(residue = residue_id, strength, "negative residue strength clamped to 0");
        return 0.0;
    }
    strength
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_surface_creates_new_each_time() {
        let mut tracker = ResidueTracker::new();
        let a = tracker.surface("fragment", "doc", 1.0);
        let b = tracker.surface("fragment", "doc", 1.0);
        assert_ne!(a, b);
        assert!(a.starts_with("residue_"));
        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.get(&a).unwrap().state, ResidueState::Surfaced);
    }

    #[test]
    fn test_integrate_records_interaction() {
        let mut tracker = ResidueTracker::new();
        let id = tracker.surface("fragment", "doc", 1.0);
        tracker.integrate(&id, "attractor_0", DEFAULT_INTEGRATE_DELTA).unwrap();

        let r = tracker.get(&id).unwrap();
        assert_eq!(r.state, ResidueState::Integrated);
        assert_relative_eq!(r.strength, 1.5);
        assert_eq!(r.interactions.len(), 1);
        assert_eq!(r.interactions[0].target, "attractor_0");
        assert_eq!(r.interactions[0].kind, InteractionKind::Integration);
        assert_eq!(tracker.history().len(), 2);
    }

    #[test]
    fn test_echo_weakens() {
        let mut tracker = ResidueTracker::new();
        let id = tracker.surface("fragment", "doc", 1.0);
        tracker.echo(&id, "pattern", DEFAULT_ECHO_DELTA).unwrap();
        let r = tracker.get(&id).unwrap();
        assert_eq!(r.state, ResidueState::Echo);
        assert_relative_eq!(r.strength, 0.8);
    }

    #[test]
    fn test_strength_clamped_at_zero() {
        let mut tracker = ResidueTracker::new();
        let id = tracker.surface("fragment", "doc", 0.1);
        tracker.echo(&id, "pattern", -0.5).unwrap();
        assert_eq!(tracker.get(&id).unwrap().strength, 0.0);
        // the interaction keeps the requested delta
        assert_eq!(tracker.get(&id).unwrap().interactions[0].strength_delta, -0.5);

        let neg = tracker.surface("other", "doc", -1.0);
        assert_eq!(tracker.get(&neg).unwrap().strength, 0.0);

        let inf = tracker.surface("unbounded", "doc", f64::INFINITY);
        assert_eq!(tracker.get(&inf).unwrap().strength, 0.0);
        tracker.integrate(&id, "pattern", f64::NAN).unwrap();
        assert_eq!(tracker.get(&id).unwrap().strength, 0.0);
    }

    #[test]
    fn test_clear() {
        let mut tracker = ResidueTracker::new();
        let id = tracker.surface("fragment", "doc", 1.0);
        tracker.clear();
        assert!(tracker.is_empty());
        assert!(tracker.history().is_empty());
        assert!(tracker.get(&id).is_none());
    }

    #[test]
    fn test_unknown_id_fails() {
        let mut tracker = ResidueTracker::new();
        assert!(matches!(
            tracker.integrate("residue_missing", "x", 0.5),
            Err(FieldError::ResidueNotFound(id)) if id == "residue_missing"
        ));
        assert!(tracker.echo("residue_missing", "x", -0.2).is_err());
        assert!(tracker.history().is_empty());
    }

    #[test]
    fn test_filters_have_no_side_effects() {
        let mut tracker = ResidueTracker::new();
        let a = tracker.surface("a", "s", 1.0);
        let b = tracker.surface("b", "s", 0.2);
        tracker.integrate(&b, "t", 0.1).unwrap();
        let before = tracker.clone();

        let active = tracker.get_active_residues(0.5);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, a);

        let integrated = tracker.get_residues_by_state(ResidueState::Integrated);
        assert_eq!(integrated.len(), 1);
        assert_eq!(integrated[0].id, b);
        assert!(tracker.get_residues_by_state(ResidueState::Echo).is_empty());

        assert_eq!(tracker, before);
    }

    #[test]
    fn test_summary() {
        let mut tracker = ResidueTracker::new();
        let a = tracker.surface("a", "s", 1.0);
        tracker.surface("b", "s", 1.0);
        let c = tracker.surface("c", "s", 1.0);
        tracker.integrate(&a, "t", 0.5).unwrap();
        tracker.echo(&c, "t", -0.2).unwrap();

        let summary = tracker.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.surfaced, 1);
        assert_eq!(summary.integrated, 1);
        assert_eq!(summary.echo, 1);
        assert_relative_eq!(summary.total_strength, 3.3, epsilon = 1e-12);
    }

    #[test]
    fn test_dict_roundtrip() {
        let mut tracker = ResidueTracker::new();
        let a = tracker.surface("first", "doc-a", 1.0);
        let b = tracker.surface("second", "doc-b", 0.7);
        tracker.integrate(&a, "attractor_0", 0.5).unwrap();
        tracker.echo(&b, "pattern", -0.2).unwrap();
        tracker.echo(&a, "pattern", -0.2).unwrap();

        let restored = ResidueTracker::from_dict(tracker.to_dict());
        assert_eq!(restored, tracker);
        let order: Vec<&str> = restored.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(order, vec![a.as_str(), b.as_str()]);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut tracker = ResidueTracker::new();
        let a = tracker.surface("first", "doc", 1.0);
        tracker.integrate(&a, "attractor_0", 0.5).unwrap();

        let json = tracker.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["residues"][&a].is_object());
        assert_eq!(value["residues"][&a]["state"], "integrated");
        assert_eq!(
            value["residues"][&a]["interactions"][0]["type"],
            "integration"
        );
        assert!(value["history"].is_array());

        let restored = ResidueTracker::from_json(&json).unwrap();
        assert_eq!(restored, tracker);
    }

    #[test]
    fn test_from_dict_without_history_uses_id_order() {
        let mut residues = BTreeMap::new();
        for id in ["residue_b", "residue_a"] {
            residues.insert(
                id.to_string(),
                SymbolicResidue {
                    id: id.to_string(),
                    content: "x".into(),
                    source: "s".into(),
                    strength: 1.0,
                    state: ResidueState::Surfaced,
                    timestamp: 0.0,
                    interactions: Vec::new(),
                },
            );
        }
        let tracker = ResidueTracker::from_dict(ResidueSnapshot {
            residues,
            history: Vec::new(),
        });
        let order: Vec<&str> = tracker.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(order, vec!["residue_a", "residue_b"]);
        assert!(tracker.get("residue_b").is_some());
    }
}
