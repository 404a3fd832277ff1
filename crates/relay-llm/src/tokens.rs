//! Token accounting over plain text.

use std::sync::Arc;

use dashmap::DashMap;
use tiktoken_rs::tokenizer::{get_tokenizer, Tokenizer};
use tiktoken_rs::CoreBPE;
use tracing::{debug, warn};

/// Counts tokens in text for a model hint. Must be total and deterministic.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str, model: &str) -> usize;
}

/// BPE counter backed by `tiktoken-rs`.
///
/// Unknown models fall back to `cl100k_base`. Loaded encodings are cached by
/// name for the life of the counter.
#[derive(Default)]
pub struct TiktokenCounter {
    encodings: DashMap<String, Arc<CoreBPE>>,
}

const FALLBACK: Tokenizer = Tokenizer::Cl100kBase;

impl TiktokenCounter {
    pub fn new() -> Self {
        Self::default()
    }

    fn encoding_for(&self, model: &str) -> Option<Arc<CoreBPE>> {
        let tokenizer = get_tokenizer(model).unwrap_or_else(|| {
            debug!(model, "no tokenizer mapping for model, using cl100k_base");
            FALLBACK
        });
        self.load(tokenizer).or_else(|| {
            if tokenizer == FALLBACK {
                None
            } else {
                self.load(FALLBACK)
            }
        })
    }

    fn load(&self, tokenizer: Tokenizer) -> Option<Arc<CoreBPE>> {
        let key = format!("{tokenizer:?}");
        if let Some(bpe) = self.encodings.get(&key) {
            return Some(Arc::clone(bpe.value()));
        }
        match tiktoken_rs::get_bpe_from_tokenizer(tokenizer) {
            Ok(bpe) => {
                let bpe = Arc::new(bpe);
                self.encodings.insert(key, Arc::clone(&bpe));
                Some(bpe)
            }
            Err(e) => {
                warn!(encoding = %key, error = %e, "failed to load token encoding");
                None
            }
        }
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_tokens(&self, text: &str, model: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        match self.encoding_for(model) {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => estimate_text_tokens(text),
        }
    }
}

/// Rough estimate: one token per four characters, rounded up.
pub fn estimate_text_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}
