use crate::provider::ProviderKind;

/// Classified failure of a single interaction.
/// No variant is retried; each is surfaced to the caller with its message intact.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum InteractionError {
    // Client input
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),
    #[error("malformed conversation: {0}")]
    MalformedConversation(String),

    // Provider side
    #[error("{provider} call failed: {message}")]
    ProviderCallFailed {
        provider: ProviderKind,
        message: String,
    },
    #[error("{provider} call timed out after {secs}s")]
    ProviderTimeout { provider: ProviderKind, secs: u64 },
    #[error("invalid {provider} response: {message}")]
    InvalidProviderResponse {
        provider: ProviderKind,
        message: String,
    },
}

impl InteractionError {
    /// True when the request itself was at fault rather than the provider.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedModel(_) | Self::MalformedConversation(_)
        )
    }

    pub fn provider(&self) -> Option<ProviderKind> {
        match self {
            Self::ProviderCallFailed { provider, .. }
            | Self::ProviderTimeout { provider, .. }
            | Self::InvalidProviderResponse { provider, .. } => Some(*provider),
            Self::UnsupportedModel(_) | Self::MalformedConversation(_) => None,
        }
    }

    /// Short classification string for logging and error bodies.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::UnsupportedModel(_) => "unsupported_model",
            Self::MalformedConversation(_) => "malformed_conversation",
            Self::ProviderCallFailed { .. } => "provider_call_failed",
            Self::ProviderTimeout { .. } => "provider_timeout",
            Self::InvalidProviderResponse { .. } => "invalid_provider_response",
        }
    }
}
