use serde::{Deserialize, Serialize};

/// Supported LLM providers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAI,
    Anthropic,
    Google,
    Xai,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [Self::OpenAI, Self::Anthropic, Self::Google, Self::Xai];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
            Self::Xai => "xai",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behavioral family of a model within its provider.
///
/// Stored on each registry entry so request shaping is decided at lookup
/// time rather than by matching on model names at call sites.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Standard chat-completion shape.
    #[default]
    Chat,
    /// No `temperature`; `max_completion_tokens` instead of `max_tokens`.
    Reasoning,
    /// Like `Reasoning`, but the system role is forbidden and temperature is fixed.
    ReasoningNoSystem,
    /// Responses call shape: `instructions` field, single `input` string.
    Responses,
}

impl ModelFamily {
    pub fn accepts_temperature(&self) -> bool {
        !matches!(self, Self::Reasoning | Self::ReasoningNoSystem)
    }

    pub fn uses_max_completion_tokens(&self) -> bool {
        matches!(self, Self::Reasoning | Self::ReasoningNoSystem)
    }

    /// Temperature the provider insists on for this family, if any.
    pub fn fixed_temperature(&self) -> Option<f64> {
        match self {
            Self::ReasoningNoSystem => Some(1.0),
            _ => None,
        }
    }
}
