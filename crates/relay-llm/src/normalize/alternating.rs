//! Strict user/assistant alternation with no system role.
//!
//! Guarantees on success:
//! 1. First message is from the user
//! 2. No two adjacent messages share a role
//! 3. No message is blank
//! 4. Output is never empty: a conversation with no usable content becomes a
//!    single placeholder user turn
//!
//! Applying it to an already alternating, user-first conversation with
//! trimmed content returns the input unchanged.

use relay_core::messages::{Message, Role};

use super::NormalizeError;

/// Appended when a conversation ends on an assistant turn.
pub const CONTINUE_PLACEHOLDER: &str =
    "Please continue with the next step based on the previous context.";

/// Prepended when a conversation would otherwise start with the assistant.
pub const ASSIST_PLACEHOLDER: &str = "Please assist me with the following.";

pub fn strict_alternation(messages: &[Message]) -> Result<Vec<Message>, NormalizeError> {
    let mut formatted: Vec<Message> = Vec::with_capacity(messages.len() + 2);
    let mut pending_system = String::new();

    for msg in messages {
        let content = msg.content.trim();
        if content.is_empty() {
            continue;
        }
        match msg.role {
            Role::System => {
                pending_system.push_str(content);
                pending_system.push_str("\n\n");
            }
            Role::User => {
                let content = if pending_system.is_empty() {
                    content.to_string()
                } else {
                    format!("{}{content}", std::mem::take(&mut pending_system))
                };
                formatted.push(Message::user(content));
            }
            Role::Assistant => formatted.push(Message::assistant(content)),
        }
    }

    if formatted.last().is_some_and(|m| m.role == Role::Assistant) {
        formatted.push(Message::user(CONTINUE_PLACEHOLDER));
    }

    if !pending_system.is_empty() {
        match formatted.first_mut() {
            Some(first) if first.role == Role::User => {
                first.content.insert_str(0, &pending_system);
            }
            _ => formatted.insert(0, Message::user(pending_system)),
        }
    }

    if formatted.first().is_none_or(|m| m.role != Role::User) {
        formatted.insert(0, Message::user(ASSIST_PLACEHOLDER));
    }

    let merged = merge_same_role(formatted);
    if merged.is_empty() {
        return Err(NormalizeError::EmptyConversation);
    }
    Ok(merged)
}

fn merge_same_role(messages: Vec<Message>) -> Vec<Message> {
    let mut merged: Vec<Message> = Vec::with_capacity(messages.len());
    for msg in messages {
        match merged.last_mut() {
            Some(last) if last.role == msg.role => {
                last.content.push_str("\n\n");
                last.content.push_str(&msg.content);
            }
            _ => merged.push(msg),
        }
    }
    merged
}
