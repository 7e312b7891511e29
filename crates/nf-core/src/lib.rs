//! Neural field engine.
//!
//! Models context as a field of weighted text fragments (patterns). Strong
//! patterns crystallize into attractors, injections propagate through
//! word-overlap resonance, and every cycle decays the field, more slowly near
//! attractors. A separate residue ledger tracks where fragments came from and
//! what they later touched.
//!
//! Zero I/O. A `Field` is a plain owned struct; callers that share one across
//! sessions must wrap it in their own lock.

pub mod attractor;
pub mod config;
pub mod constants;
pub mod error;
pub mod field;
pub mod metrics;
pub mod pattern;
pub mod render;
pub mod residue;
pub mod resonance;
pub mod serde_compat;
pub mod time;
pub mod tokenizer;
pub mod view;

pub use attractor::{Attractor, AttractorRegistry};
pub use config::{CoherenceStrategy, FieldConfig, MetricsConfig, OverlapNormalization, Tuning};
pub use error::{FieldError, Result};
pub use field::{Field, FieldEvent};
pub use metrics::{FieldMetrics, normalized_entropy};
pub use pattern::{Pattern, PatternStore, blend};
pub use render::ContextRenderer;
pub use residue::{
    Interaction, InteractionKind, ResidueEvent, ResidueSnapshot, ResidueState, ResidueSummary,
    ResidueTracker, SymbolicResidue,
};
pub use resonance::{Encoder, MeasuredResonance, ResonanceCalculator};
pub use serde_compat::{CURRENT_VERSION, FieldSnapshot, export_json, import_json};
pub use tokenizer::{is_blank, preview, tokenize};
pub use view::FieldView;
