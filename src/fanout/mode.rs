use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub const MIN_QUERIES_SIMPLE: u32 = 10;
pub const MIN_QUERIES_COMPLEX: u32 = 20;

/// Search surface being simulated. Selects the minimum count and the
/// count band suggested to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// AI Overview: a handful of close follow-ups.
    Simple,
    /// AI Mode: broad multi-aspect exploration.
    #[default]
    Complex,
}

impl Mode {
    /// Name shown to the model inside the prompt.
    pub fn label(self) -> &'static str {
        match self {
            Mode::Simple => "AI Overview (simple)",
            Mode::Complex => "AI Mode (complex)",
        }
    }

    pub fn min_queries(self) -> u32 {
        match self {
            Mode::Simple => MIN_QUERIES_SIMPLE,
            Mode::Complex => MIN_QUERIES_COMPLEX,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Shape of the instruction sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PromptVariant {
    /// Count plan plus query/type/intent/reasoning per item.
    Standard,
    /// Adds required transformation types, routing-format labels and the
    /// no-personal-signals rule.
    #[default]
    Routing,
}

impl PromptVariant {
    pub fn has_routing(self) -> bool {
        matches!(self, PromptVariant::Routing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimums_per_mode() {
        assert_eq!(Mode::Simple.min_queries(), 10);
        assert_eq!(Mode::Complex.min_queries(), 20);
    }

    #[test]
    fn mode_deserializes_from_lowercase() {
        let simple: Mode = serde_json::from_str(r#""simple""#).unwrap();
        assert_eq!(simple, Mode::Simple);
        let variant: PromptVariant = serde_json::from_str(r#""standard""#).unwrap();
        assert_eq!(variant, PromptVariant::Standard);
    }

    #[test]
    fn display_uses_surface_label() {
        assert_eq!(Mode::Complex.to_string(), "AI Mode (complex)");
    }
}
