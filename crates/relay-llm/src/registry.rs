//! Model catalogue: pricing, limits and request family per model id.
//!
//! Built once at startup and shared read-only behind an `Arc`.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use relay_core::errors::InteractionError;
use relay_core::provider::{ModelFamily, ProviderKind};

/// Capabilities and pricing of one model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSpec {
    pub provider: ProviderKind,
    #[serde(rename = "id", alias = "modelId")]
    pub model_id: String,
    pub display_name: String,
    #[serde(default)]
    pub family: ModelFamily,
    /// USD per million input tokens.
    pub input_price_per_million_tokens: f64,
    /// USD per million output tokens.
    pub output_price_per_million_tokens: f64,
    pub max_output_tokens: u32,
    pub max_input_tokens: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate model id in catalogue: {0}")]
    DuplicateModel(String),
    #[error("failed to read model catalogue: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse model catalogue: {0}")]
    Json(#[from] serde_json::Error),
}

struct CatalogueEntry {
    provider: ProviderKind,
    id: &'static str,
    name: &'static str,
    family: ModelFamily,
    input: f64,
    output: f64,
    max_output: u32,
    context: u32,
}

#[allow(clippy::too_many_arguments)]
const fn entry(
    provider: ProviderKind,
    id: &'static str,
    name: &'static str,
    family: ModelFamily,
    input: f64,
    output: f64,
    max_output: u32,
    context: u32,
) -> CatalogueEntry {
    CatalogueEntry {
        provider,
        id,
        name,
        family,
        input,
        output,
        max_output,
        context,
    }
}

use ModelFamily::{Chat, Reasoning, ReasoningNoSystem, Responses};
use ProviderKind::{Anthropic, Google, OpenAI, Xai};

static BUILTIN: &[CatalogueEntry] = &[
    entry(OpenAI, "gpt-4o", "GPT-4o", Chat, 2.50, 10.00, 16_384, 128_000),
    entry(OpenAI, "gpt-4o-2024-05-13", "GPT-4o (2024-05-13)", Chat, 5.00, 15.00, 4_096, 128_000),
    entry(OpenAI, "gpt-4o-mini", "GPT-4o mini", Chat, 0.15, 0.60, 16_384, 128_000),
    entry(OpenAI, "gpt-4.1", "GPT-4.1", Chat, 2.00, 8.00, 32_768, 1_047_576),
    entry(OpenAI, "o3", "o3", Reasoning, 2.00, 8.00, 100_000, 200_000),
    entry(OpenAI, "o4-mini", "o4-mini", Reasoning, 1.10, 4.40, 100_000, 200_000),
    entry(OpenAI, "o1-mini", "o1-mini", ReasoningNoSystem, 1.10, 4.40, 65_536, 128_000),
    entry(OpenAI, "o1-preview", "o1-preview", ReasoningNoSystem, 15.00, 60.00, 32_768, 128_000),
    entry(OpenAI, "o1-pro", "o1-pro", Responses, 150.0, 600.0, 100_000, 200_000),
    entry(Anthropic, "claude-sonnet-4-20250514", "Claude Sonnet 4", Chat, 3.00, 15.00, 64_000, 200_000),
    entry(Anthropic, "claude-3-5-sonnet-20241022", "Claude 3.5 Sonnet", Chat, 3.00, 15.00, 8_192, 200_000),
    entry(Anthropic, "claude-3-5-haiku-20241022", "Claude 3.5 Haiku", Chat, 0.80, 4.00, 8_192, 200_000),
    entry(Anthropic, "claude-3-opus-20240229", "Claude 3 Opus", Chat, 15.00, 75.00, 4_096, 200_000),
    entry(Google, "gemini-1.5-pro", "Gemini 1.5 Pro", Chat, 1.25, 5.00, 8_192, 2_000_000),
    entry(Google, "gemini-1.5-flash", "Gemini 1.5 Flash", Chat, 0.075, 0.30, 8_192, 1_000_000),
    entry(Google, "gemini-2.0-flash", "Gemini 2.0 Flash", Chat, 0.10, 0.40, 8_192, 1_048_576),
    entry(Xai, "grok-3", "Grok 3", Chat, 3.00, 15.00, 16_384, 131_072),
    entry(Xai, "grok-3-mini", "Grok 3 Mini", Chat, 0.30, 0.50, 16_384, 131_072),
];

impl From<&CatalogueEntry> for ModelSpec {
    fn from(e: &CatalogueEntry) -> Self {
        Self {
            provider: e.provider,
            model_id: e.id.to_string(),
            display_name: e.name.to_string(),
            family: e.family,
            input_price_per_million_tokens: e.input,
            output_price_per_million_tokens: e.output,
            max_output_tokens: e.max_output,
            max_input_tokens: e.context,
        }
    }
}

/// Read-only catalogue keyed by model id, remembering insertion order.
#[derive(Clone, Debug)]
pub struct ModelRegistry {
    specs: Vec<ModelSpec>,
    index: HashMap<String, usize>,
}

impl ModelRegistry {
    /// Build from a list of specs. Fails on the first repeated model id.
    pub fn from_specs(specs: Vec<ModelSpec>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            if index.insert(spec.model_id.clone(), i).is_some() {
                return Err(RegistryError::DuplicateModel(spec.model_id.clone()));
            }
        }
        Ok(Self { specs, index })
    }

    /// The compiled-in catalogue.
    pub fn builtin() -> Self {
        let specs: Vec<ModelSpec> = BUILTIN.iter().map(ModelSpec::from).collect();
        let index = specs
            .iter()
            .enumerate()
            .map(|(i, s)| (s.model_id.clone(), i))
            .collect();
        Self { specs, index }
    }

    /// Load a catalogue from a JSON array of [`ModelSpec`].
    pub fn from_json_file(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path)?;
        let specs: Vec<ModelSpec> = serde_json::from_str(&content)?;
        Self::from_specs(specs)
    }

    pub fn lookup(&self, model_id: &str) -> Result<&ModelSpec, InteractionError> {
        self.index
            .get(model_id)
            .map(|&i| &self.specs[i])
            .ok_or_else(|| InteractionError::UnsupportedModel(model_id.to_string()))
    }

    pub fn contains(&self, model_id: &str) -> bool {
        self.index.contains_key(model_id)
    }

    /// All models grouped by provider, each group in catalogue order.
    pub fn list_all(&self) -> BTreeMap<ProviderKind, Vec<ModelSpec>> {
        let mut grouped: BTreeMap<ProviderKind, Vec<ModelSpec>> = BTreeMap::new();
        for spec in &self.specs {
            grouped.entry(spec.provider).or_default().push(spec.clone());
        }
        grouped
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
