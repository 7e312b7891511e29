use std::fmt::Write;

use crate::attractor::AttractorRegistry;
use crate::config::MetricsConfig;
use crate::pattern::PatternStore;
use crate::tokenizer::preview;

/// Renders field state as a text block suitable for a model prompt.
///
/// Output is a pure function of the inputs: strongest attractors, strongest
/// patterns, then a metrics trailer. Equal strengths keep insertion order.
#[derive(Clone, Debug)]
pub struct ContextRenderer {
    top_k: usize,
    preview_chars: usize,
}

impl ContextRenderer {
    pub fn new(top_k: usize, preview_chars: usize) -> Self {
        Self {
            top_k,
            preview_chars,
        }
    }

    pub fn from_config(config: &MetricsConfig) -> Self {
        Self::new(config.top_k, config.preview_chars)
    }

    pub fn render(
        &self,
        attractors: &AttractorRegistry,
        patterns: &PatternStore,
        stability: f64,
    ) -> String {
        let mut out = String::new();

        if !attractors.is_empty() {
            out.push_str("# Field Attractors\n");
            for a in attractors.strongest(self.top_k) {
                let _ = writeln!(
                    out,
                    "- {} (strength {:.2}): {}",
                    a.id,
                    a.strength,
                    preview(&a.pattern, self.preview_chars)
                );
            }
            out.push('\n');
        }

        out.push_str("# Active Patterns\n");
        if patterns.is_empty() {
            out.push_str("- (none)\n");
        }
        for p in patterns.top(self.top_k) {
            let _ = writeln!(
                out,
                "- ({:.2}) {}",
                p.strength,
                preview(&p.content, self.preview_chars)
            );
        }

        out.push_str("\n# Field Metrics\n");
        let _ = writeln!(out, "- Stability: {stability:.2}");
        let _ = writeln!(out, "- Active patterns: {}", patterns.len());
        let _ = write!(out, "- Attractor count: {}", attractors.len());
        out
    }
}
