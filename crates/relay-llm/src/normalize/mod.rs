//! Conversation normalizers, one per provider role discipline.
//!
//! Every function here is pure: it takes the generic conversation and returns
//! the shape a provider accepts, without touching the network.

mod alternating;
mod flattened;
mod flexible;
mod no_system;

pub use alternating::{strict_alternation, ASSIST_PLACEHOLDER, CONTINUE_PLACEHOLDER};
pub use flattened::{flatten, responses_prompt, ResponsesPrompt};
pub use flexible::hoist_system;
pub use no_system::{fold_system_into_user, SYSTEM_INSTRUCTIONS_PREFIX};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("no valid messages to send to the model")]
    EmptyConversation,
}
