//! Google Gemini `generateContent`.
//!
//! The conversation is flattened into a single user text part.

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

pub struct GoogleProvider {
    client: ProviderClient,
    base_url: String,
    api_key: ApiKey,
}

impl GoogleProvider {
    pub fn new(client: ProviderClient, base_url: impl Into<String>, api_key: ApiKey) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl CompletionProvider for GoogleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    #[instrument(skip_all, fields(provider = "google", model = %request.spec.model_id))]
    async fn complete(
        &self,
        request: &DispatchRequest<'_>,
    ) -> Result<ProviderCompletion, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, request.spec.model_id
        );
        let response = self
            .client
            .post_json(
                &url,
                &[("x-goog-api-key", self.api_key.expose())],
                &build_request_body(request),
            )
            .await?;
        extract(&response)
    }
}

pub(crate) fn build_request_body(request: &DispatchRequest<'_>) -> Value {
    let mut config = json!({"maxOutputTokens": request.max_output_tokens});
    if let Some(t) = request.effective_temperature() {
        config["temperature"] = json!(t);
    }
    json!({
        "contents": [{
            "role": "user",
            "parts": [{"text": normalize::flatten(request.messages)}],
        }],
        "generationConfig": config,
    })
}

fn extract(response: &Value) -> Result<ProviderCompletion, ProviderError> {
    let parts = response["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| {
            ProviderError::InvalidResponse("missing candidates[0].content.parts".into())
        })?;
    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();

    let usage = &response["usageMetadata"];
    Ok(ProviderCompletion {
        text,
        input_tokens: usage_field(usage, "promptTokenCount"),
        output_tokens: usage_field(usage, "candidatesTokenCount"),
    })
}
