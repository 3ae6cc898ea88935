
use tracing::debug;

use super::{Message, Role};
use crate::Result;

/// Character budget applied when none is configured
pub const DEFAULT_HISTORY_BUDGET: usize = 8000;

/// Fail with `InvalidRole` on the first message whose role is not one of
/// `system`, `user` or `assistant`
#[inline]
pub fn validate_roles(messages: &[Message]) -> Result<()> {
    for message in messages {
        message.role.parse::<Role>()?;
    }
    Ok(())
}

/// Size of a message as counted against the budget: the characters of
/// `"role: content"`
#[inline]
pub fn message_size(message: &Message) -> usize {
    message.role.chars().count() + 2 + message.content.chars().count()
}

/// Keep the most recent messages whose combined size fits in `budget`,
/// in chronological order.
///
/// Walks from newest to oldest and stops at the first message that would
/// push the running total over the budget. The newest message is always
/// kept, even when it alone is larger than the budget.
#[inline]
pub fn trim_history(messages: &[Message], budget: usize) -> Vec<Message> {
    let mut total = 0;
    let mut kept = Vec::new();

    for message in messages.iter().rev() {
        total += message_size(message);
        if total > budget && !kept.is_empty() {
            break;
        }
        kept.push(message.clone());
    }

    if kept.len() < messages.len() {
        debug!(
            "Trimmed history from {} to {} messages (budget {})",
            messages.len(),
            kept.len(),
            budget
        );
    }

    kept.reverse();
    kept
}
