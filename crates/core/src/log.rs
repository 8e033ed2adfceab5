//! The per-controller conversation log and its image retention pass.

use crate::message::{Content, ContentPart, Message, Role};

/// Ordered, append-only conversation history.
///
/// Owned by exactly one controller. Besides `append` the only mutators are
/// [`MessageLog::retain_latest_images`] and [`MessageLog::clear`].
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Read-only view, replayed to the vendor on every turn.
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// Empty the log between task attempts.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Total image parts currently held across all messages.
    pub fn image_count(&self) -> usize {
        self.messages.iter().map(|m| m.content.image_count()).sum()
    }

    /// Strip image parts from every user message except the last one.
    ///
    /// A stripped message left with exactly one text part collapses back to
    /// scalar text. Idempotent. Returns the number of image parts removed.
    pub fn retain_latest_images(&mut self) -> usize {
        let Some(last_user) = self.messages.iter().rposition(|m| m.role == Role::User) else {
            return 0;
        };

        let mut removed = 0;
        for (idx, msg) in self.messages.iter_mut().enumerate() {
            if idx == last_user || msg.role != Role::User {
                continue;
            }
            let Content::Parts(parts) = &mut msg.content else {
                continue;
            };

            let before = parts.len();
            parts.retain(|p| !p.is_image());
            removed += before - parts.len();

            let collapsed = match parts.as_slice() {
                [ContentPart::Text { value }] => Some(value.clone()),
                _ => None,
            };
            if let Some(text) = collapsed {
                msg.content = Content::Text(text);
            }
        }

        if removed > 0 {
            tracing::debug!(removed, "Pruned images from history");
        }
        removed
    }
}
