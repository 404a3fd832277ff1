//! Settings type definitions.
//!
//! Every section implements [`Default`] with production values and is marked
//! `#[serde(default)]`, so a partial JSON file only overrides what it names.

use serde::{Deserialize, Serialize};

use relay_core::provider::ProviderKind;

/// Root settings for the relay service.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    pub server: ServerSettings,
    pub interaction: InteractionSettings,
    pub providers: ProviderEndpoints,
    pub logging: LoggingSettings,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InteractionSettings {
    /// Model used when a request names none.
    pub default_model: String,
    pub default_temperature: f64,
    /// Model hint for the standalone token counter when the caller gives none.
    pub token_count_model: String,
    /// Total time allowed for one provider call.
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Optional JSON file replacing the compiled-in model catalogue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models_file: Option<String>,
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            default_model: "gpt-4o-mini".to_string(),
            default_temperature: 0.7,
            token_count_model: "gpt-3.5-turbo".to_string(),
            request_timeout_secs: 120,
            connect_timeout_secs: 30,
            models_file: None,
        }
    }
}

/// Base URLs for each provider's API.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderEndpoints {
    pub openai: String,
    pub anthropic: String,
    pub google: String,
    pub xai: String,
}

impl ProviderEndpoints {
    pub fn base_url(&self, provider: ProviderKind) -> &str {
        match provider {
            ProviderKind::OpenAI => &self.openai,
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::Google => &self.google,
            ProviderKind::Xai => &self.xai,
        }
    }
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            openai: "https://api.openai.com/v1".to_string(),
            anthropic: "https://api.anthropic.com/v1".to_string(),
            google: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            xai: "https://api.x.ai/v1".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level filter. `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
