/// Default fraction of pattern strength lost per decay cycle.
pub const DEFAULT_DECAY_RATE: f64 = 0.05;

/// Default fraction of injected strength that enters the field.
pub const DEFAULT_BOUNDARY_PERMEABILITY: f64 = 0.8;

/// Default scale applied to raw word-overlap similarity.
pub const DEFAULT_RESONANCE_BANDWIDTH: f64 = 0.6;

/// Default strength a pattern must strictly exceed to form an attractor.
pub const DEFAULT_ATTRACTOR_THRESHOLD: f64 = 0.7;

/// Resonance an attractor must strictly exceed before it pulls an incoming pattern.
pub const ATTRACTOR_PULL_CUTOFF: f64 = 0.2;

/// Blend ratio per unit of resonance when an attractor pulls a pattern.
pub const PULL_BLEND_FACTOR: f64 = 0.3;

/// Attractor strength gained per unit of resonance with a pulled pattern.
pub const PULL_STRENGTH_GAIN: f64 = 0.1;

/// Share of a pattern's strength added per unit of resonance with a fresh injection.
pub const PROPAGATION_FACTOR: f64 = 0.2;

/// Decay protection per unit of resonance with an attractor.
pub const PROTECTION_FACTOR: f64 = 0.5;

/// Upper bound on summed decay protection.
pub const PROTECTION_CAP: f64 = 0.9;

/// Attractors decay at this fraction of the pattern decay rate.
pub const ATTRACTOR_DECAY_FACTOR: f64 = 0.2;

/// Patterns at or below this strength are pruned on decay.
pub const PATTERN_PRUNE_FLOOR: f64 = 0.01;

/// Attractors at or below this strength are pruned on decay.
pub const ATTRACTOR_PRUNE_FLOOR: f64 = 0.1;

/// Measured resonance below this collapses to zero.
pub const DEFAULT_MEASURE_THRESHOLD: f64 = 0.2;

/// Measured resonance at or above the threshold is scaled by this, then clamped to 1.
pub const DEFAULT_MEASURE_AMPLIFICATION: f64 = 1.2;

/// Entries listed per section of the context representation.
pub const DEFAULT_CONTEXT_TOP_K: usize = 5;

/// Characters of pattern text shown before truncation in the context representation.
pub const DEFAULT_PREVIEW_CHARS: usize = 100;

/// Numerical epsilon for near-zero comparisons
pub const EPSILON: f64 = 1e-10;
