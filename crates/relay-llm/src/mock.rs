use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use relay_core::messages::Message;
use relay_core::provider::ProviderKind;

use crate::providers::{CompletionProvider, DispatchRequest, ProviderCompletion, ProviderError};

/// Pre-programmed replies for deterministic testing without API calls.
pub enum MockReply {
    Completion(ProviderCompletion),
    Error(ProviderError),
    /// Wait, then yield the inner reply.
    Delay(Duration, Box<MockReply>),
}

impl MockReply {
    /// Text with no usage reported.
    pub fn text(text: &str) -> Self {
        Self::Completion(ProviderCompletion {
            text: text.to_string(),
            input_tokens: None,
            output_tokens: None,
        })
    }

    pub fn with_usage(text: &str, input: u64, output: u64) -> Self {
        Self::Completion(ProviderCompletion {
            text: text.to_string(),
            input_tokens: Some(input),
            output_tokens: Some(output),
        })
    }

    pub fn delayed(delay: Duration, inner: MockReply) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// What the mock was asked to do on one call.
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_output_tokens: u32,
    pub temperature: f64,
}

/// Provider that returns queued replies in order and records each call.
pub struct MockProvider {
    kind: ProviderKind,
    replies: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<RecordedCall>>,
    call_count: AtomicUsize,
}

impl MockProvider {
    pub fn new(kind: ProviderKind, replies: Vec<MockReply>) -> Self {
        Self {
            kind,
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn complete(
        &self,
        request: &DispatchRequest<'_>,
    ) -> Result<ProviderCompletion, ProviderError> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        self.calls.lock().await.push(RecordedCall {
            model: request.spec.model_id.clone(),
            messages: request.messages.to_vec(),
            max_output_tokens: request.max_output_tokens,
            temperature: request.temperature,
        });

        let Some(mut reply) = self.replies.lock().await.pop_front() else {
            return Err(ProviderError::InvalidResponse(format!(
                "MockProvider: no reply configured for call {idx}"
            )));
        };

        loop {
            match reply {
                MockReply::Completion(completion) => return Ok(completion),
                MockReply::Error(err) => return Err(err),
                MockReply::Delay(duration, inner) => {
                    tokio::time::sleep(duration).await;
                    reply = *inner;
                }
            }
        }
    }
}
