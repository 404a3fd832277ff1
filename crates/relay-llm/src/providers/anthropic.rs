//! Anthropic Messages API.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::instrument;

use relay_core::provider::ProviderKind;
use relay_core::security::ApiKey;

use super::{
    usage_field, CompletionProvider, DispatchRequest, ProviderClient, ProviderCompletion,
    ProviderError,
};
use crate::normalize;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: ProviderClient,
    base_url: String,
    api_key: ApiKey,
}

impl AnthropicProvider {
    pub fn new(client: ProviderClient, base_url: impl Into<String>, api_key: ApiKey) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    #[instrument(skip_all, fields(provider = "anthropic", model = %request.spec.model_id))]
    async fn complete(
        &self,
        request: &DispatchRequest<'_>,
    ) -> Result<ProviderCompletion, ProviderError> {
        let body = build_request_body(request)?;
        let response = self
            .client
            .post_json(
                &format!("{}/messages", self.base_url),
                &[
                    ("x-api-key", self.api_key.expose()),
                    ("anthropic-version", ANTHROPIC_VERSION),
                ],
                &body,
            )
            .await?;
        extract(&response)
    }
}

pub(crate) fn build_request_body(request: &DispatchRequest<'_>) -> Result<Value, ProviderError> {
    let messages: Vec<Value> = normalize::strict_alternation(request.messages)?
        .iter()
        .map(|m| json!({"role": m.role.as_str(), "content": m.content}))
        .collect();

    let mut body = json!({
        "model": request.spec.model_id,
        "messages": messages,
        "max_tokens": request.max_output_tokens,
    });
    if let Some(t) = request.effective_temperature() {
        body["temperature"] = json!(t);
    }
    Ok(body)
}

fn extract(response: &Value) -> Result<ProviderCompletion, ProviderError> {
    let blocks = response["content"]
        .as_array()
        .ok_or_else(|| ProviderError::InvalidResponse("missing content array".into()))?;

    let texts: Vec<&str> = blocks
        .iter()
        .filter(|b| b["type"] == "text")
        .filter_map(|b| b["text"].as_str())
        .collect();
    if texts.is_empty() {
        return Err(ProviderError::InvalidResponse("no text blocks in content".into()));
    }

    let usage = &response["usage"];
    Ok(ProviderCompletion {
        text: texts.concat(),
        input_tokens: usage_field(usage, "input_tokens"),
        output_tokens: usage_field(usage, "output_tokens"),
    })
}
