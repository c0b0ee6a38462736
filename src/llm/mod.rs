//! Chat model seam: message types, the `ChatModel` trait and its
//! implementations.

pub mod memory;
pub mod openai;

pub use memory::ChatMemory;
pub use openai::OpenAIChatModel;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A language model that answers a conversation with text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the conversation and return the model's reply text.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Single-prompt convenience: one user message in, reply text out.
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.chat(&[ChatMessage::user(prompt)]).await
    }
}
