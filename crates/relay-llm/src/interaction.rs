//! Interaction orchestrator: the public entry point of the crate.
//!
//! Per request: resolve the model, dispatch to its provider, backfill any
//! missing usage with the local token counter, price, return.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use relay_core::errors::InteractionError;
use relay_core::messages::{CompletionRequest, CompletionResult, Message, TokenCounts};
use relay_core::provider::ProviderKind;
use relay_settings::{Credentials, InteractionSettings, RelaySettings};

use crate::cost::calculate_cost;
use crate::dispatcher::Dispatcher;
use crate::providers::ProviderError;
use crate::registry::{ModelRegistry, ModelSpec, RegistryError};
use crate::tokens::{estimate_text_tokens, TiktokenCounter, TokenCounter};

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("failed to build provider client: {0}")]
    Client(#[from] ProviderError),
}

/// Catalogue plus which providers can actually be called.
#[derive(Clone, Debug, Serialize)]
pub struct AvailableModels {
    pub providers: BTreeMap<ProviderKind, Vec<ModelSpec>>,
    pub configured: BTreeMap<ProviderKind, bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCount {
    pub count: usize,
    pub character_count: usize,
}

pub struct Interaction {
    registry: Arc<ModelRegistry>,
    dispatcher: Dispatcher,
    counter: Arc<dyn TokenCounter>,
    defaults: InteractionSettings,
}

impl Interaction {
    pub fn new(
        registry: Arc<ModelRegistry>,
        dispatcher: Dispatcher,
        counter: Arc<dyn TokenCounter>,
        defaults: InteractionSettings,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            counter,
            defaults,
        }
    }

    /// Wire up the production stack: catalogue (compiled-in or from
    /// `modelsFile`), credentialed provider clients, tiktoken counter.
    pub fn from_settings(
        settings: &RelaySettings,
        credentials: &Credentials,
    ) -> Result<Self, SetupError> {
        let registry = match &settings.interaction.models_file {
            Some(path) => {
                info!(path = %path, "loading model catalogue from file");
                ModelRegistry::from_json_file(Path::new(path))?
            }
            None => ModelRegistry::builtin(),
        };
        let dispatcher = Dispatcher::from_settings(settings, credentials)?;
        for kind in ProviderKind::ALL {
            if !credentials.is_configured(kind) {
                warn!(provider = %kind, "no API key configured, provider disabled");
            }
        }
        Ok(Self::new(
            Arc::new(registry),
            dispatcher,
            Arc::new(TiktokenCounter::new()),
            settings.interaction.clone(),
        ))
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    #[instrument(skip_all, fields(model = tracing::field::Empty))]
    pub async fn handle(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResult, InteractionError> {
        let model = request
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.defaults.default_model);
        tracing::Span::current().record("model", model);

        self.run(model, request).await.inspect_err(|e| {
            if e.is_client_error() {
                warn!(model, kind = e.error_kind(), error = %e, "interaction rejected");
            } else {
                warn!(
                    model,
                    provider = ?e.provider(),
                    kind = e.error_kind(),
                    error = %e,
                    "interaction failed"
                );
            }
        })
    }

    async fn run(
        &self,
        model: &str,
        request: &CompletionRequest,
    ) -> Result<CompletionResult, InteractionError> {
        let spec = self.registry.lookup(model)?;
        let temperature = request
            .temperature
            .unwrap_or(self.defaults.default_temperature);

        let completion = self
            .dispatcher
            .dispatch(spec, &request.messages, spec.max_output_tokens, temperature)
            .await?;

        let token_counts = match (completion.input_tokens, completion.output_tokens) {
            (Some(input), Some(output)) => TokenCounts { input, output },
            _ => {
                debug!(model, "provider omitted usage, counting locally");
                self.backfill(model, &request.messages, &completion.text)
                    .await
            }
        };
        let cost = calculate_cost(spec, token_counts.input, token_counts.output);

        info!(
            model,
            provider = %spec.provider,
            input_tokens = token_counts.input,
            output_tokens = token_counts.output,
            cost,
            "interaction complete"
        );

        Ok(CompletionResult {
            response: completion.text,
            model: spec.model_id.clone(),
            token_counts,
            cost,
        })
    }

    async fn backfill(&self, model: &str, messages: &[Message], response: &str) -> TokenCounts {
        let prompt = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let [input, output] = self
            .count_blocking([prompt, response.to_owned()], model)
            .await;
        TokenCounts {
            input: input as u64,
            output: output as u64,
        }
    }

    /// BPE encoding is CPU-bound, so counting runs on the blocking pool.
    /// A panicking counter degrades to the character estimate.
    async fn count_blocking<const N: usize>(&self, texts: [String; N], model: &str) -> [usize; N] {
        let texts = Arc::new(texts);
        let task = {
            let counter = Arc::clone(&self.counter);
            let texts = Arc::clone(&texts);
            let model = model.to_owned();
            tokio::task::spawn_blocking(move || {
                std::array::from_fn(|i| counter.count_tokens(&texts[i], &model))
            })
        };
        match task.await {
            Ok(counts) => counts,
            Err(e) => {
                warn!(model, error = %e, "token counting task failed, using estimate");
                std::array::from_fn(|i| estimate_text_tokens(&texts[i]))
            }
        }
    }

    pub fn available_models(&self) -> AvailableModels {
        AvailableModels {
            providers: self.registry.list_all(),
            configured: ProviderKind::ALL
                .into_iter()
                .map(|kind| (kind, self.dispatcher.is_registered(kind)))
                .collect(),
        }
    }

    /// Count tokens in `text`. With no model, the configured counting model is used.
    pub async fn count_tokens(&self, text: &str, model: Option<&str>) -> TokenCount {
        let model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&self.defaults.token_count_model);
        let [count] = self.count_blocking([text.to_owned()], model).await;
        TokenCount {
            count,
            character_count: text.chars().count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockProvider, MockReply};

    /// One token per whitespace-separated word.
    struct WordCounter;

    impl TokenCounter for WordCounter {
        fn count_tokens(&self, text: &str, _model: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    fn interaction(providers: Vec<Arc<MockProvider>>) -> Interaction {
        let dispatcher = providers
            .into_iter()
            .fold(Dispatcher::new(), |d, p| d.with_provider(p));
        Interaction::new(
            Arc::new(ModelRegistry::builtin()),
            dispatcher,
            Arc::new(WordCounter),
            InteractionSettings::default(),
        )
    }

    fn request(model: Option<&str>, messages: Vec<Message>) -> CompletionRequest {
        CompletionRequest {
            model: model.map(String::from),
            messages,
            temperature: None,
        }
    }

    #[tokio::test]
    async fn reported_usage_is_priced() {
        let mock = Arc::new(MockProvider::new(
            ProviderKind::Anthropic,
            vec![MockReply::with_usage("Sure.", 1000, 500)],
        ));
        let interaction = interaction(vec![mock.clone()]);

        let result = interaction
            .handle(&request(
                Some("claude-3-5-sonnet-20241022"),
                vec![Message::user("Explain lifetimes")],
            ))
            .await
            .unwrap();

        assert_eq!(result.response, "Sure.");
        assert_eq!(result.model, "claude-3-5-sonnet-20241022");
        assert_eq!(result.token_counts, TokenCounts { input: 1000, output: 500 });
        assert!((result.cost - 0.0105).abs() < 1e-12);
    }

    #[tokio::test]
    async fn unsupported_model_never_calls_provider() {
        let mock = Arc::new(MockProvider::new(ProviderKind::OpenAI, vec![MockReply::text("x")]));
        let interaction = interaction(vec![mock.clone()]);

        let err = interaction
            .handle(&request(Some("not-a-real-model"), vec![Message::user("hi")]))
            .await
            .unwrap_err();

        assert_eq!(err, InteractionError::UnsupportedModel("not-a-real-model".into()));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_usage_is_backfilled() {
        let mock = Arc::new(MockProvider::new(
            ProviderKind::Google,
            vec![MockReply::text("three word answer")],
        ));
        let interaction = interaction(vec![mock]);

        let result = interaction
            .handle(&request(
                Some("gemini-1.5-flash"),
                vec![Message::system("be brief"), Message::user("what is rust")],
            ))
            .await
            .unwrap();

        // "be brief what is rust" and "three word answer"
        assert_eq!(result.token_counts, TokenCounts { input: 5, output: 3 });
        let expected = 5.0 / 1e6 * 0.075 + 3.0 / 1e6 * 0.30;
        assert!((result.cost - expected).abs() < 1e-15);
    }

    #[tokio::test]
    async fn partial_usage_recounts_both_sides() {
        let mock = Arc::new(MockProvider::new(
            ProviderKind::OpenAI,
            vec![MockReply::Completion(crate::providers::ProviderCompletion {
                text: "a b".into(),
                input_tokens: Some(999),
                output_tokens: None,
            })],
        ));
        let interaction = interaction(vec![mock]);
        let result = interaction
            .handle(&request(Some("gpt-4o"), vec![Message::user("x y z")]))
            .await
            .unwrap();
        assert_eq!(result.token_counts, TokenCounts { input: 3, output: 2 });
    }

    #[tokio::test]
    async fn defaults_fill_model_and_temperature() {
        let mock = Arc::new(MockProvider::new(
            ProviderKind::OpenAI,
            vec![MockReply::with_usage("ok", 1, 1)],
        ));
        let interaction = interaction(vec![mock.clone()]);

        let result = interaction
            .handle(&request(None, vec![Message::user("hi")]))
            .await
            .unwrap();
        assert_eq!(result.model, "gpt-4o-mini");

        let calls = mock.calls().await;
        assert_eq!(calls[0].model, "gpt-4o-mini");
        assert!((calls[0].temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(calls[0].max_output_tokens, 16384);
    }

    #[tokio::test]
    async fn explicit_temperature_is_forwarded() {
        let mock = Arc::new(MockProvider::new(
            ProviderKind::Xai,
            vec![MockReply::with_usage("ok", 1, 1)],
        ));
        let interaction = interaction(vec![mock.clone()]);
        let mut req = request(Some("grok-3-mini"), vec![Message::user("hi")]);
        req.temperature = Some(0.1);
        interaction.handle(&req).await.unwrap();
        assert!((mock.calls().await[0].temperature - 0.1).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn provider_errors_propagate_classified() {
        let mock = Arc::new(MockProvider::new(
            ProviderKind::OpenAI,
            vec![MockReply::Error(ProviderError::Timeout { secs: 120 })],
        ));
        let interaction = interaction(vec![mock]);
        let err = interaction
            .handle(&request(Some("o3"), vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            InteractionError::ProviderTimeout {
                provider: ProviderKind::OpenAI,
                secs: 120
            }
        );
    }

    #[test]
    fn available_models_reports_configuration() {
        let mock = Arc::new(MockProvider::new(ProviderKind::Anthropic, vec![]));
        let interaction = interaction(vec![mock]);
        let available = interaction.available_models();

        assert!(available.configured[&ProviderKind::Anthropic]);
        assert!(!available.configured[&ProviderKind::OpenAI]);
        assert_eq!(available.providers.len(), 4);

        let json = serde_json::to_value(&available).unwrap();
        assert_eq!(json["configured"]["anthropic"], true);
        assert_eq!(json["providers"]["openai"][0]["id"], "gpt-4o");
    }

    #[tokio::test]
    async fn count_tokens_reports_characters() {
        let interaction = interaction(vec![]);
        let count = interaction.count_tokens("héllo wörld", None).await;
        assert_eq!(count, TokenCount { count: 2, character_count: 11 });
        let json = serde_json::to_value(count).unwrap();
        assert_eq!(json["characterCount"], 11);
    }

    #[test]
    fn from_settings_uses_models_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        std::fs::write(
            &path,
            r#"[{"provider": "openai", "id": "house-model", "displayName": "House",
                 "inputPricePerMillionTokens": 1, "outputPricePerMillionTokens": 2,
                 "maxOutputTokens": 10, "maxInputTokens": 100}]"#,
        )
        .unwrap();

        let mut settings = RelaySettings::default();
        settings.interaction.models_file = Some(path.to_string_lossy().into_owned());
        let interaction = Interaction::from_settings(&settings, &Credentials::default()).unwrap();
        assert!(interaction.registry().contains("house-model"));
        assert!(!interaction.registry().contains("gpt-4o"));
    }

    /// Records which thread each count ran on.
    #[derive(Default)]
    struct ThreadRecorder {
        threads: std::sync::Mutex<Vec<std::thread::ThreadId>>,
    }

    impl TokenCounter for ThreadRecorder {
        fn count_tokens(&self, text: &str, _model: &str) -> usize {
            self.threads.lock().unwrap().push(std::thread::current().id());
            text.len()
        }
    }

    struct PanickingCounter;

    impl TokenCounter for PanickingCounter {
        fn count_tokens(&self, _text: &str, _model: &str) -> usize {
            panic!("encoder unavailable");
        }
    }

    #[tokio::test]
    async fn counting_runs_off_the_runtime_thread() {
        let recorder = Arc::new(ThreadRecorder::default());
        let mock = Arc::new(MockProvider::new(ProviderKind::Google, vec![MockReply::text("ok")]));
        let interaction = Interaction::new(
            Arc::new(ModelRegistry::builtin()),
            Dispatcher::new().with_provider(mock),
            recorder.clone(),
            InteractionSettings::default(),
        );

        interaction.count_tokens("hello", None).await;
        interaction
            .handle(&request(Some("gemini-1.5-flash"), vec![Message::user("hi")]))
            .await
            .unwrap();

        let runtime_thread = std::thread::current().id();
        let threads = recorder.threads.lock().unwrap();
        assert_eq!(threads.len(), 3);
        assert!(threads.iter().all(|t| *t != runtime_thread));
    }

    #[tokio::test]
    async fn panicking_counter_falls_back_to_estimate() {
        let mock = Arc::new(MockProvider::new(
            ProviderKind::OpenAI,
            vec![MockReply::text("abcde")],
        ));
        let interaction = Interaction::new(
            Arc::new(ModelRegistry::builtin()),
            Dispatcher::new().with_provider(mock),
            Arc::new(PanickingCounter),
            InteractionSettings::default(),
        );

        let count = interaction.count_tokens("abcdefgh", None).await;
        assert_eq!(count, TokenCount { count: 2, character_count: 8 });

        let result = interaction
            .handle(&request(Some("gpt-4o"), vec![Message::user("abcd")]))
            .await
            .unwrap();
        assert_eq!(result.token_counts, TokenCounts { input: 1, output: 2 });
    }

    #[test]
    fn from_settings_registers_credentialed_providers_only() {
        let credentials = Credentials::from_lookup(|name| match name {
            "ANTHROPIC_API_KEY" => Some("sk-ant".into()),
            "XAI_API_KEY" => Some("xai".into()),
            _ => None,
        });
        let interaction = Interaction::from_settings(&RelaySettings::default(), &credentials).unwrap();
        let configured = interaction.available_models().configured;
        for kind in ProviderKind::ALL {
            assert_eq!(configured[&kind], credentials.is_configured(kind), "{kind}");
        }
    }
}
