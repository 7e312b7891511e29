//! JSON snapshots of a whole field.
//!
//! A snapshot carries parameters, patterns in insertion order, attractors in
//! formation order and the residue ledger. The field's operation history and
//! the encoder are not part of it: an imported field starts with an empty
//! operation log and word-overlap resonance until the caller attaches an
//! encoder again.
//!
//! Imports are checked before anything is built: every strength must be
//! finite and non-negative, pattern contents and attractor ids unique.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::attractor::{Attractor, AttractorRegistry};
use crate::config::FieldConfig;
use crate::error::{FieldError, Result};
use crate::field::Field;
use crate::pattern::{Pattern, PatternStore};
use crate::residue::{ResidueSnapshot, ResidueTracker};
use crate::view::FieldView;

pub const CURRENT_VERSION: &str = "0.1.0";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub version: String,
    #[serde(default)]
    pub config: FieldConfig,
    #[serde(default)]
    pub cycle: u64,
    #[serde(default)]
    pub patterns: Vec<Pattern>,
    #[serde(default)]
    pub attractors: Vec<Attractor>,
    /// Lifetime attractor count, so restored fields keep issuing fresh ids.
    #[serde(default)]
    pub formed: u64,
    #[serde(default)]
    pub residues: ResidueSnapshot,
}

impl FieldSnapshot {
    pub fn from_field(field: &Field) -> Self {
        let registry = field.attractor_registry();
        Self {
            version: CURRENT_VERSION.to_string(),
            config: field.config().clone(),
            cycle: field.cycle(),
            patterns: field.pattern_store().iter().cloned().collect(),
            attractors: registry.iter().cloned().collect(),
            formed: registry.formed(),
            residues: field.residues().to_dict(),
        }
    }

    pub fn into_field(self) -> Result<Field> {
        if self.version != CURRENT_VERSION {
            return Err(FieldError::UnsupportedVersion(self.version));
        }
        self.check_state()?;
        let mut field = Field::with_config(self.config)?;
        field.restore(
            PatternStore::from_patterns(self.patterns),
            AttractorRegistry::restore(self.attractors, self.formed),
            ResidueTracker::from_dict(self.residues),
            self.cycle,
        );
        Ok(field)
    }

    fn check_state(&self) -> Result<()> {
        let mut contents = HashSet::new();
        for p in &self.patterns {
            check_strength("pattern", &p.content, p.strength)?;
            if !contents.insert(p.content.as_str()) {
                return Err(FieldError::InvalidSnapshot(format!(
                    "duplicate pattern {:?}",
                    p.content
                )));
            }
        }

        let mut ids = HashSet::new();
        for a in &self.attractors {
            check_strength("attractor", &a.id, a.strength)?;
            if !ids.insert(a.id.as_str()) {
                return Err(FieldError::InvalidSnapshot(format!(
                    "duplicate attractor id {}",
                    a.id
                )));
            }
        }

        for (id, r) in &self.residues.residues {
            check_strength("residue", id, r.strength)?;
            if *id != r.id {
                return Err(FieldError::InvalidSnapshot(format!(
                    "residue key {id} does not match id {}",
                    r.id
                )));
            }
        }
        Ok(())
    }
}

fn check_strength(kind: &str, name: &str, strength: f64) -> Result<()> {
    if !strength.is_finite() || strength < 0.0 {
        return Err(FieldError::InvalidSnapshot(format!(
            "{kind} {name:?} has strength {strength}"
        )));
    }
    Ok(())
}

impl FieldView for FieldSnapshot {
    fn patterns(&self) -> impl Iterator<Item = (&str, f64)> {
        self.patterns.iter().map(|p| (p.content.as_str(), p.strength))
    }

    fn attractors(&self) -> impl Iterator<Item = (&str, f64)> {
        self.attractors
            .iter()
            .map(|a| (a.pattern.as_str(), a.strength))
    }
}

impl Field {
    pub fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot::from_field(self)
    }

    pub fn from_snapshot(snapshot: FieldSnapshot) -> Result<Self> {
        snapshot.into_field()
    }
}

pub fn export_json(field: &Field) -> Result<String> {
    Ok(serde_json::to_string_pretty(&field.snapshot())?)
}

pub fn import_json(json: &str) -> Result<Field> {
    let snapshot: FieldSnapshot = serde_json::from_str(json)?;
    snapshot.into_field()
}
