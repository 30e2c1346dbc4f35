//! Conversation with the assistant.

use crate::api::{ChatReply, ChatRequest};
use crate::error::ApiResult;
use crate::markup::sanitize_text;
use tracing::{debug, info, warn};

pub const APOLOGY: &str = "Sorry, something went wrong. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl ChatRole {
    pub fn label(self) -> &'static str {
        match self {
            ChatRole::User => "You",
            ChatRole::Assistant => "Assistant",
            ChatRole::System => "·",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    conversation_id: Option<String>,
    messages: Vec<ChatMessage>,
    pub input: String,
    waiting: bool,
}

impl ChatSession {
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// An answer is pending; shown as a typing indicator.
    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    /// Switches to a conversation the server created, e.g. by linking a task.
    pub fn open_conversation(&mut self, conversation_id: String, note: impl Into<String>) {
        if self.conversation_id.as_deref() != Some(conversation_id.as_str()) {
            self.messages.clear();
            self.waiting = false;
        }
        self.conversation_id = Some(conversation_id);
        self.push(ChatRole::System, note.into());
    }

    /// Forgets the current conversation; the next message starts a new one.
    pub fn start_new(&mut self) {
        if let Some(id) = self.conversation_id.take() {
            info!(conversation_id = %id, "leaving conversation");
        }
        self.messages.clear();
        self.waiting = false;
    }

    /// Moves the input into the transcript and returns the request to send, or
    /// `None` when there is nothing to send or an answer is still pending.
    pub fn submit(&mut self) -> Option<ChatRequest> {
        if self.waiting {
            return None;
        }
        let message = self.input.trim().to_owned();
        if message.is_empty() {
            return None;
        }
        self.input.clear();
        self.push(ChatRole::User, message.clone());
        self.waiting = true;
        Some(ChatRequest {
            message,
            conversation_id: self.conversation_id.clone(),
        })
    }

    /// Applies the answer to the pending message. An answer that arrives after the
    /// conversation was switched or reset is dropped.
    pub fn receive(&mut self, result: ApiResult<ChatReply>) {
        if !self.waiting {
            debug!("dropping reply for an abandoned conversation");
            return;
        }
        self.waiting = false;
        match result {
            Ok(reply) => {
                if self.conversation_id.is_none() {
                    if let Some(id) = reply.conversation_id {
                        info!(conversation_id = %id, "started conversation");
                        self.conversation_id = Some(id);
                    }
                }
                self.push(ChatRole::Assistant, reply.message);
            }
            Err(error) => {
                warn!(error = %error, "chat message failed");
                self.push(ChatRole::Assistant, APOLOGY.to_owned());
            }
        }
    }

    fn push(&mut self, role: ChatRole, content: String) {
        self.messages.push(ChatMessage {
            role,
            content: sanitize_text(&content),
        });
    }
}
