//! Chat history kept on the client and replayed with every message.

use chrono::Utc;
use tracing::debug;

use bioscience_common::entities::{ChatMessage, ChatRequest, ChatResponse, Role};
use bioscience_common::error::ApiError;

use crate::mutation::Mutation;

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Sends `text` with the prior history. Blank input is ignored and yields
    /// `Ok(None)`. The user message stays in the history even if the request
    /// fails.
    pub async fn send(
        &mut self,
        chat: &Mutation<ChatRequest, ChatResponse>,
        text: &str,
    ) -> Result<Option<&ChatMessage>, ApiError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let history = self.messages.clone();
        self.messages.push(ChatMessage {
            role: Role::User,
            content: text.to_string(),
            timestamp: Some(Utc::now().to_rfc3339()),
        });
        debug!(turns = history.len(), "Sending chat message");

        let resp = chat
            .mutate(ChatRequest { message: text.to_string(), history })
            .await?;
        self.messages.push(ChatMessage {
            role: Role::Assistant,
            content: resp.message,
            timestamp: Some(resp.timestamp),
        });
        Ok(self.messages.last())
    }
}
