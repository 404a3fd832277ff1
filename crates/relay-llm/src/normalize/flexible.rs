use relay_core::messages::{Message, Role};

/// Flexible-role shape: system turns first, everything else untouched.
///
/// Blank system messages are dropped. Relative order within the system
/// group and within the rest is preserved.
pub fn hoist_system(messages: &[Message]) -> Vec<Message> {
    let (system, rest): (Vec<&Message>, Vec<&Message>) =
        messages.iter().partition(|m| m.role == Role::System);

    system
        .into_iter()
        .filter(|m| !m.is_blank())
        .chain(rest)
        .cloned()
        .collect()
}
