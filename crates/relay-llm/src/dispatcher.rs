//! Routes a resolved request to the provider that serves its model.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, instrument};

use relay_core::errors::InteractionError;
use relay_core::messages::Message;
use relay_core::provider::ProviderKind;
use relay_settings::{Credentials, RelaySettings};

use crate::providers::{
    AnthropicProvider, CompletionProvider, DispatchRequest, GoogleProvider, OpenAIProvider,
    ProviderClient, ProviderCompletion, ProviderError,
};
use crate::registry::ModelSpec;

/// Provider clients keyed by [`ProviderKind`], built once at startup.
#[derive(Default, Clone)]
pub struct Dispatcher {
    providers: HashMap<ProviderKind, Arc<dyn CompletionProvider>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client for every provider that has credentials.
    pub fn from_settings(
        settings: &RelaySettings,
        credentials: &Credentials,
    ) -> Result<Self, ProviderError> {
        let client = ProviderClient::new(
            settings.interaction.request_timeout_secs,
            settings.interaction.connect_timeout_secs,
        )?;
        let endpoints = &settings.providers;
        let mut dispatcher = Self::new();

        for kind in ProviderKind::ALL {
            let Some(key) = credentials.get(kind).cloned() else {
                continue;
            };
            let base_url = endpoints.base_url(kind);
            let provider: Arc<dyn CompletionProvider> = match kind {
                ProviderKind::OpenAI => Arc::new(OpenAIProvider::new(client.clone(), base_url, key)),
                ProviderKind::Xai => Arc::new(OpenAIProvider::xai(client.clone(), base_url, key)),
                ProviderKind::Anthropic => {
                    Arc::new(AnthropicProvider::new(client.clone(), base_url, key))
                }
                ProviderKind::Google => Arc::new(GoogleProvider::new(client.clone(), base_url, key)),
            };
            dispatcher = dispatcher.with_provider(provider);
        }
        Ok(dispatcher)
    }

    /// Register (or replace) the client for `provider.kind()`.
    pub fn with_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    pub fn is_registered(&self, kind: ProviderKind) -> bool {
        self.providers.contains_key(&kind)
    }

    /// Perform one provider call for `spec`. Failures are logged and classified.
    #[instrument(skip_all, fields(provider = %spec.provider, model = %spec.model_id))]
    pub async fn dispatch(
        &self,
        spec: &ModelSpec,
        messages: &[Message],
        max_output_tokens: u32,
        temperature: f64,
    ) -> Result<ProviderCompletion, InteractionError> {
        let result = match self.providers.get(&spec.provider) {
            Some(provider) => {
                let request = DispatchRequest {
                    spec,
                    messages,
                    max_output_tokens,
                    temperature,
                };
                provider.complete(&request).await
            }
            None => Err(ProviderError::NotConfigured(spec.provider)),
        };

        result.map_err(|e| {
            error!(
                provider = %spec.provider,
                model = %spec.model_id,
                error = %e,
                "provider call failed"
            );
            classify(spec.provider, e)
        })
    }
}

fn classify(provider: ProviderKind, err: ProviderError) -> InteractionError {
    match err {
        ProviderError::Timeout { secs } => InteractionError::ProviderTimeout { provider, secs },
        ProviderError::InvalidResponse(message) => {
            InteractionError::InvalidProviderResponse { provider, message }
        }
        ProviderError::EmptyConversation => {
            InteractionError::MalformedConversation(err.to_string())
        }
        ProviderError::Http(_) | ProviderError::Api { .. } | ProviderError::NotConfigured(_) => {
            InteractionError::ProviderCallFailed {
                provider,
                message: err.to_string(),
            }
        }
    }
}
