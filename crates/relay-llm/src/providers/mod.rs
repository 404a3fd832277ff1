//! # Providers
//!
//! One [`CompletionProvider`] per provider API. Each owns its request shape
//! and response extraction; HTTP transport and error classification are
//! shared through [`ProviderClient`].

pub mod anthropic;
pub mod google;
pub mod openai;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use relay_core::messages::Message;
use relay_core::provider::ProviderKind;

use crate::normalize::NormalizeError;
use crate::registry::ModelSpec;

pub use anthropic::AnthropicProvider;
pub use google::GoogleProvider;
pub use openai::OpenAIProvider;

/// Errors raised inside a provider call, before classification.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Transport failure (connect, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Non-2xx status. `message` is the provider's own diagnostic when present.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Body did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("no valid messages to send to the model")]
    EmptyConversation,

    #[error("{0} provider is not configured")]
    NotConfigured(ProviderKind),
}

impl From<NormalizeError> for ProviderError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::EmptyConversation => Self::EmptyConversation,
        }
    }
}

/// Everything a provider needs for one call.
#[derive(Clone, Copy, Debug)]
pub struct DispatchRequest<'a> {
    pub spec: &'a ModelSpec,
    pub messages: &'a [Message],
    pub max_output_tokens: u32,
    pub temperature: f64,
}

impl DispatchRequest<'_> {
    /// Temperature to put on the wire, if the model family takes one.
    pub fn effective_temperature(&self) -> Option<f64> {
        self.spec
            .family
            .fixed_temperature()
            .or_else(|| self.spec.family.accepts_temperature().then_some(self.temperature))
    }
}

/// Text plus whatever usage the provider reported.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderCompletion {
    pub text: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn complete(
        &self,
        request: &DispatchRequest<'_>,
    ) -> Result<ProviderCompletion, ProviderError>;
}

/// Shared HTTP client with the configured timeouts.
#[derive(Clone, Debug)]
pub struct ProviderClient {
    http: reqwest::Client,
    request_timeout_secs: u64,
}

impl ProviderClient {
    pub fn new(request_timeout_secs: u64, connect_timeout_secs: u64) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(request_timeout_secs))
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            request_timeout_secs,
        })
    }

    /// POST a JSON body and return the parsed JSON response.
    pub async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> Result<Value, ProviderError> {
        let mut req = self
            .http
            .post(url)
            .header("accept", "application/json")
            .json(body);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }

        let response = req.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.classify(e))?;
        debug!(url, status = status.as_u16(), bytes = text.len(), "provider response");

        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: parse_api_error(&text, status.as_u16()),
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| ProviderError::InvalidResponse(format!("body is not JSON: {e}")))
    }

    fn classify(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout {
                secs: self.request_timeout_secs,
            }
        } else {
            ProviderError::Http(err)
        }
    }
}

/// Extract the provider's diagnostic from an error body.
///
/// All supported APIs nest it under `error.message`, with a type or status
/// code beside it.
fn parse_api_error(body: &str, status: u16) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let error = parsed.as_ref().map(|json| &json["error"]);
    match error.and_then(|e| e["message"].as_str()) {
        Some(message) => {
            let code = error
                .and_then(|e| e["type"].as_str().or_else(|| e["status"].as_str()));
            match code {
                Some(code) => format!("{code}: {message}"),
                None => message.to_string(),
            }
        }
        None if body.trim().is_empty() => format!("HTTP {status}"),
        None => format!("HTTP {status}: {body}"),
    }
}

/// Read a token count that may be absent.
pub(crate) fn usage_field(value: &Value, key: &str) -> Option<u64> {
    value.get(key).and_then(Value::as_u64)
}
