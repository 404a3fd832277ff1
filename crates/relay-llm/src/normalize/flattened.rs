use relay_core::messages::{Message, Role};

/// Render a whole conversation as one prompt, one `"<Role>: <content>"` line
/// per message.
pub fn flatten(messages: &[Message]) -> String {
    render(messages.iter())
}

/// Request pieces for the responses call shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponsesPrompt {
    /// Non-blank system contents, blank-line separated. `None` when there are none.
    pub instructions: Option<String>,
    /// Remaining turns, flattened.
    pub input: String,
}

pub fn responses_prompt(messages: &[Message]) -> ResponsesPrompt {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System && !m.is_blank())
        .map(|m| m.content.as_str())
        .collect();

    ResponsesPrompt {
        instructions: (!system.is_empty()).then(|| system.join("\n\n")),
        input: render(messages.iter().filter(|m| m.role != Role::System)),
    }
}

fn render<'a>(messages: impl Iterator<Item = &'a Message>) -> String {
    messages
        .map(|m| format!("{}: {}", m.role.label(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}
