//! # relay-llm
//!
//! Provider abstraction layer. A provider-agnostic conversation goes in; a
//! priced [`CompletionResult`](relay_core::messages::CompletionResult) or a
//! classified [`InteractionError`](relay_core::errors::InteractionError)
//! comes out.
//!
//! Leaves first: [`registry`], [`tokens`], [`normalize`], [`providers`],
//! [`dispatcher`], [`cost`], then the [`interaction`] orchestrator.

pub mod cost;
pub mod dispatcher;
pub mod interaction;
pub mod normalize;
pub mod providers;
pub mod registry;
pub mod tokens;

pub mod mock;

pub use dispatcher::Dispatcher;
pub use interaction::{AvailableModels, Interaction, SetupError, TokenCount};
pub use registry::{ModelRegistry, ModelSpec, RegistryError};
pub use tokens::{TiktokenCounter, TokenCounter};
