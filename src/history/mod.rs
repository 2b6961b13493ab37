use crate::models::chat::{ Message, Role };

/// Number of most recent messages sent with each completion request.
pub const CONTEXT_WINDOW: usize = 5;

/// Append-only, in-memory log of the messages exchanged in one session.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// The whole conversation when it fits, otherwise only the last
    /// `CONTEXT_WINDOW` messages. System messages are not pinned.
    pub fn context_window(&self) -> &[Message] {
        let start = self.messages.len().saturating_sub(CONTEXT_WINDOW);
        &self.messages[start..]
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

pub fn format_message(message: &Message) -> String {
    let role_display = match message.role() {
        Role::User => "User",
        Role::Assistant => "Assistant",
        Role::System => "System",
    };
    format!("{}: {}", role_display, message.content())
}
