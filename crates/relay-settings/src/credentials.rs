//! Provider credentials.
//!
//! Keys are read from the process environment once at startup and injected
//! into the dispatcher; nothing downstream reads env state.

use relay_core::provider::ProviderKind;
use relay_core::security::{env_vars, ApiKey};

/// One optional API key per provider.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    pub openai: Option<ApiKey>,
    pub anthropic: Option<ApiKey>,
    pub google: Option<ApiKey>,
    pub xai: Option<ApiKey>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let key = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(ApiKey::new)
        };
        Self {
            openai: key(env_vars::OPENAI_API_KEY),
            anthropic: key(env_vars::ANTHROPIC_API_KEY),
            google: key(env_vars::GOOGLE_API_KEY),
            xai: key(env_vars::XAI_API_KEY),
        }
    }

    pub fn get(&self, provider: ProviderKind) -> Option<&ApiKey> {
        match provider {
            ProviderKind::OpenAI => self.openai.as_ref(),
            ProviderKind::Anthropic => self.anthropic.as_ref(),
            ProviderKind::Google => self.google.as_ref(),
            ProviderKind::Xai => self.xai.as_ref(),
        }
    }

    pub fn is_configured(&self, provider: ProviderKind) -> bool {
        self.get(provider).is_some()
    }
}
