use secrecy::{ExposeSecret, SecretString};

/// Wraps an API key with secrecy protection (zeroized on drop, redacted in Debug).
#[derive(Clone)]
pub struct ApiKey(pub SecretString);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::from(key.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

/// Environment variable names for each provider's credential.
pub mod env_vars {
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
    pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
    pub const XAI_API_KEY: &str = "XAI_API_KEY";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_debug_redacted() {
        let key = ApiKey::new("sk-proj-12345");
        let debug = format!("{:?}", key);
        assert!(!debug.contains("sk-proj"), "key leaked in debug: {debug}");
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn api_key_expose_secret() {
        let key = ApiKey::new("xai-abc");
        assert_eq!(key.expose(), "xai-abc");
    }
}
