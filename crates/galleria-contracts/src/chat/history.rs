use std::collections::VecDeque;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_HISTORY: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One `{role, content}` entry handed to a text generator. `images` carries
/// local files the generator should attach to this message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<PathBuf>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.images.push(path.into());
        self
    }
}

/// A stored conversation entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum Turn {
    Human(String),
    Ai(String),
}

impl Turn {
    pub fn content(&self) -> &str {
        match self {
            Self::Human(content) | Self::Ai(content) => content,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::Human(_) => Role::User,
            Self::Ai(_) => Role::Assistant,
        }
    }

    pub fn to_message(&self) -> ChatMessage {
        ChatMessage::new(self.role(), self.content())
    }
}

/// Bounded FIFO log of prior turns for one session.
///
/// The system prompt is prepended to every generator call but is never stored
/// and never counts against `max_history`.
#[derive(Debug, Clone)]
pub struct ConversationState {
    system_prompt: String,
    turns: VecDeque<Turn>,
    max_history: usize,
}

impl ConversationState {
    pub fn new(system_prompt: impl Into<String>, max_history: usize) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            turns: VecDeque::with_capacity(max_history.saturating_add(1)),
            max_history,
        }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.max_history {
            self.turns.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    /// The fixed system turn followed by every stored turn.
    pub fn with_system_prefix(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.turns.len() + 2);
        messages.push(ChatMessage::system(self.system_prompt.clone()));
        messages.extend(self.turns.iter().map(Turn::to_message));
        messages
    }

    /// The messages a generator would see if `pending` were appended now,
    /// without mutating the log.
    pub fn prompt_with(&self, pending: &Turn) -> Vec<ChatMessage> {
        let mut messages = self.with_system_prefix();
        let stored = self.turns.len();
        let evicted = stored - self.max_history.saturating_sub(1).min(stored);
        messages.drain(1..1 + evicted);
        messages.push(pending.to_message());
        messages
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
