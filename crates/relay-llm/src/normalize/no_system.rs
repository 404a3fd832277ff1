use relay_core::messages::{Message, Role};

pub const SYSTEM_INSTRUCTIONS_PREFIX: &str = "[System instructions]";

/// Shape for models that reject the system role: each non-blank system turn
/// becomes a prefixed user turn in place; blank ones are dropped.
pub fn fold_system_into_user(messages: &[Message]) -> Vec<Message> {
    messages
        .iter()
        .filter_map(|m| match m.role {
            Role::System if m.is_blank() => None,
            Role::System => Some(Message::user(format!(
                "{SYSTEM_INSTRUCTIONS_PREFIX}\n{}",
                m.content
            ))),
            _ => Some(m.clone()),
        })
        .collect()
}
