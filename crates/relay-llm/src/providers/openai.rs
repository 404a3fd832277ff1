//! OpenAI-compatible chat and responses APIs.
//!
//! Also serves xAI, whose API accepts the same chat-completion shape.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::instrument;

use relay_core::messages::Message;
use relay_core::provider::{ModelFamily, ProviderKind};
use relay_core::security::ApiKey;

use super::{
    usage_field, CompletionProvider, DispatchRequest, ProviderClient, ProviderCompletion,
    ProviderError,
};
use crate::normalize;

pub struct OpenAIProvider {
    kind: ProviderKind,
    client: ProviderClient,
    base_url: String,
    api_key: ApiKey,
}

impl OpenAIProvider {
    pub fn new(client: ProviderClient, base_url: impl Into<String>, api_key: ApiKey) -> Self {
        Self::with_kind(ProviderKind::OpenAI, client, base_url, api_key)
    }

    /// xAI speaks the OpenAI chat protocol at its own base URL.
    pub fn xai(client: ProviderClient, base_url: impl Into<String>, api_key: ApiKey) -> Self {
        Self::with_kind(ProviderKind::Xai, client, base_url, api_key)
    }

    fn with_kind(
        kind: ProviderKind,
        client: ProviderClient,
        base_url: impl Into<String>,
        api_key: ApiKey,
    ) -> Self {
        Self {
            kind,
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ProviderError> {
        let auth = format!("Bearer {}", self.api_key.expose());
        self.client
            .post_json(
                &format!("{}/{path}", self.base_url),
                &[("authorization", auth.as_str())],
                body,
            )
            .await
    }

    async fn chat(&self, request: &DispatchRequest<'_>) -> Result<ProviderCompletion, ProviderError> {
        let body = build_chat_body(request);
        let response = self.post("chat/completions", &body).await?;
        extract_chat(&response)
    }

    async fn responses(
        &self,
        request: &DispatchRequest<'_>,
    ) -> Result<ProviderCompletion, ProviderError> {
        let body = build_responses_body(request);
        let response = self.post("responses", &body).await?;
        extract_responses(&response)
    }
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    #[instrument(skip_all, fields(provider = %self.kind, model = %request.spec.model_id))]
    async fn complete(
        &self,
        request: &DispatchRequest<'_>,
    ) -> Result<ProviderCompletion, ProviderError> {
        match request.spec.family {
            ModelFamily::Responses => self.responses(request).await,
            _ => self.chat(request).await,
        }
    }
}

fn wire_messages(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| json!({"role": m.role.as_str(), "content": m.content}))
        .collect()
}

pub(crate) fn build_chat_body(request: &DispatchRequest<'_>) -> Value {
    let family = request.spec.family;
    let messages = match family {
        ModelFamily::ReasoningNoSystem => normalize::fold_system_into_user(request.messages),
        _ => normalize::hoist_system(request.messages),
    };

    let mut body = Map::new();
    body.insert("model".into(), json!(request.spec.model_id));
    body.insert("messages".into(), Value::Array(wire_messages(&messages)));
    let limit_key = if family.uses_max_completion_tokens() {
        "max_completion_tokens"
    } else {
        "max_tokens"
    };
    body.insert(limit_key.into(), json!(request.max_output_tokens));
    if let Some(t) = request.effective_temperature() {
        body.insert("temperature".into(), json!(t));
    }
    Value::Object(body)
}

pub(crate) fn build_responses_body(request: &DispatchRequest<'_>) -> Value {
    let prompt = normalize::responses_prompt(request.messages);
    let mut body = json!({
        "model": request.spec.model_id,
        "input": prompt.input,
        "max_output_tokens": request.max_output_tokens,
        "text": {"format": {"type": "text"}},
    });
    if let Some(instructions) = prompt.instructions {
        body["instructions"] = json!(instructions);
    }
    if let Some(t) = request.effective_temperature() {
        body["temperature"] = json!(t);
    }
    body
}

fn extract_chat(response: &Value) -> Result<ProviderCompletion, ProviderError> {
    let text = response["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| {
            ProviderError::InvalidResponse("missing choices[0].message.content".into())
        })?;
    let usage = &response["usage"];
    Ok(ProviderCompletion {
        text: text.to_string(),
        input_tokens: usage_field(usage, "prompt_tokens"),
        output_tokens: usage_field(usage, "completion_tokens"),
    })
}

fn extract_responses(response: &Value) -> Result<ProviderCompletion, ProviderError> {
    let text = response["output"]
        .as_array()
        .into_iter()
        .flatten()
        .filter(|item| item["type"] == "message")
        .filter_map(|item| item["content"].as_array())
        .flatten()
        .find(|part| part["type"] == "output_text")
        .and_then(|part| part["text"].as_str())
        .ok_or_else(|| ProviderError::InvalidResponse("no output_text in output".into()))?;
    let usage = &response["usage"];
    Ok(ProviderCompletion {
        text: text.to_string(),
        input_tokens: usage_field(usage, "input_tokens"),
        output_tokens: usage_field(usage, "output_tokens"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ModelRegistry;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request<'a>(
        registry: &'a ModelRegistry,
        model: &str,
        messages: &'a [Message],
    ) -> DispatchRequest<'a> {
        let spec = registry.lookup(model).unwrap();
        DispatchRequest {
            spec,
            messages,
            max_output_tokens: spec.max_output_tokens,
            temperature: 0.7,
        }
    }

    fn client() -> ProviderClient {
        ProviderClient::new(5, 5).unwrap()
    }

    #[test]
    fn chat_body_hoists_system() {
        let registry = ModelRegistry::builtin();
        let messages = [Message::user("hi"), Message::system("be kind")];
        let body = build_chat_body(&request(&registry, "gpt-4o-mini", &messages));
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["max_tokens"], 16384);
        assert_eq!(body["temperature"], 0.7);
        assert!(body.get("max_completion_tokens").is_none());
    }

    #[test]
    fn reasoning_body_drops_temperature() {
        let registry = ModelRegistry::builtin();
        let messages = [Message::system("s"), Message::user("hi")];
        let body = build_chat_body(&request(&registry, "o3", &messages));
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
        assert_eq!(body["max_completion_tokens"], 100000);
        assert_eq!(body["messages"][0]["role"], "system");
    }

    #[test]
    fn no_system_body_folds_system_and_fixes_temperature() {
        let registry = ModelRegistry::builtin();
        let messages = [Message::system("rules"), Message::user("hi")];
        let body = build_chat_body(&request(&registry, "o1-mini", &messages));
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "[System instructions]\nrules");
        assert_eq!(body["temperature"], 1.0);
        assert_eq!(body["max_completion_tokens"], 65536);
    }

    #[test]
    fn responses_body_shape() {
        let registry = ModelRegistry::builtin();
        let messages = [Message::system("rules"), Message::user("hi")];
        let body = build_responses_body(&request(&registry, "o1-pro", &messages));
        assert_eq!(body["instructions"], "rules");
        assert_eq!(body["input"], "User: hi");
        assert_eq!(body["max_output_tokens"], 100000);
        assert_eq!(body["text"]["format"]["type"], "text");
        assert_eq!(body["temperature"], 0.7);
    }

    #[test]
    fn extract_responses_skips_non_message_items() {
        let response = json!({
            "output": [
                {"type": "reasoning", "summary": []},
                {"type": "message", "content": [{"type": "output_text", "text": "answer"}]}
            ],
            "usage": {"input_tokens": 12, "output_tokens": 3}
        });
        let completion = extract_responses(&response).unwrap();
        assert_eq!(completion.text, "answer");
        assert_eq!(completion.input_tokens, Some(12));
        assert_eq!(completion.output_tokens, Some(3));
    }

    #[test]
    fn extract_chat_without_usage() {
        let response = json!({"choices": [{"message": {"role": "assistant", "content": "hey"}}]});
        let completion = extract_chat(&response).unwrap();
        assert_eq!(completion.text, "hey");
        assert_eq!(completion.input_tokens, None);
    }

    #[test]
    fn extract_chat_rejects_missing_content() {
        let err = extract_chat(&json!({"choices": []})).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn chat_call_roundtrip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "gpt-4o-mini"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Hello!"}}],
                "usage": {"prompt_tokens": 9, "completion_tokens": 2}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let registry = ModelRegistry::builtin();
        let messages = [Message::user("hi")];
        let provider = OpenAIProvider::new(client(), server.uri(), ApiKey::new("sk-test"));
        let completion = provider
            .complete(&request(&registry, "gpt-4o-mini", &messages))
            .await
            .unwrap();

        assert_eq!(completion.text, "Hello!");
        assert_eq!(completion.input_tokens, Some(9));
        assert_eq!(completion.output_tokens, Some(2));
    }

    #[tokio::test]
    async fn responses_call_uses_responses_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "output": [{"type": "message", "content": [{"type": "output_text", "text": "deep"}]}],
                "usage": {"input_tokens": 4, "output_tokens": 1}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let registry = ModelRegistry::builtin();
        let messages = [Message::user("think")];
        let provider = OpenAIProvider::new(client(), server.uri(), ApiKey::new("sk-test"));
        let completion = provider
            .complete(&request(&registry, "o1-pro", &messages))
            .await
            .unwrap();
        assert_eq!(completion.text, "deep");
    }

    #[tokio::test]
    async fn xai_uses_chat_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer xai-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "grok says hi"}}]
            })))
            .mount(&server)
            .await;

        let registry = ModelRegistry::builtin();
        let messages = [Message::user("hi")];
        let provider = OpenAIProvider::xai(client(), server.uri(), ApiKey::new("xai-key"));
        assert_eq!(provider.kind(), ProviderKind::Xai);
        let completion = provider
            .complete(&request(&registry, "grok-3", &messages))
            .await
            .unwrap();
        assert_eq!(completion.text, "grok says hi");
    }

    #[tokio::test]
    async fn api_error_message_is_preserved() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let registry = ModelRegistry::builtin();
        let messages = [Message::user("hi")];
        let provider = OpenAIProvider::new(client(), server.uri(), ApiKey::new("bad"));
        let err = provider
            .complete(&request(&registry, "gpt-4o", &messages))
            .await
            .unwrap_err();
        match err {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 401);
                assert!(message.contains("Incorrect API key"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_response_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"choices": [{"message": {"content": "late"}}]}))
                    .set_delay(std::time::Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let registry = ModelRegistry::builtin();
        let messages = [Message::user("hi")];
        let provider = OpenAIProvider::new(
            ProviderClient::new(1, 1).unwrap(),
            server.uri(),
            ApiKey::new("sk"),
        );
        let err = provider
            .complete(&request(&registry, "gpt-4o", &messages))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { secs: 1 }), "got {err:?}");
    }
}
