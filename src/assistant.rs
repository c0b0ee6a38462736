//! Chat assistant backed by the movie graph.
//!
//! Each turn routes the user message, appends any retrieved content to it and
//! sends the memory window plus that message to the chat model.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::llm::{ChatMemory, ChatMessage, ChatModel};
use crate::retrieval::{within, ContentItem, Query, QueryRouter, DEFAULT_MODEL_TIMEOUT};
use crate::Result;

const CONTENT_HEADER: &str = "Answer using the following information:";

/// Append retrieved content to the user message. Unchanged when there is none.
pub fn inject_contents(message: &str, contents: &[ContentItem]) -> String {
    if contents.is_empty() {
        return message.to_string();
    }
    let joined = contents
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{}\n\n{}\n{}", message, CONTENT_HEADER, joined)
}

pub struct Assistant {
    model: Arc<dyn ChatModel>,
    router: QueryRouter,
    memory: ChatMemory,
    timeout: Duration,
}

impl Assistant {
    pub fn new(model: Arc<dyn ChatModel>, router: QueryRouter, memory_window: usize) -> Self {
        Self {
            model,
            router,
            memory: ChatMemory::new(memory_window),
            timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }

    pub fn from_config(config: &Config, model: Arc<dyn ChatModel>, router: QueryRouter) -> Self {
        Self::new(model, router, config.assistant.memory_window).with_timeout(config.llm_timeout())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_system_message(mut self, content: impl Into<String>) -> Self {
        self.memory.add(ChatMessage::system(content));
        self
    }

    pub fn memory(&self) -> &ChatMemory {
        &self.memory
    }

    /// One conversation turn.
    ///
    /// Retrieval or model failures (including an unsupported operation) abort
    /// the turn and leave the memory untouched.
    pub async fn chat(&mut self, message: &str) -> Result<String> {
        let routed = self.router.retrieve(&Query::new(message)).await?;
        let user_message = ChatMessage::user(inject_contents(message, &routed.contents));

        // The window includes the new message; committed only once the model replies.
        let mut window = self.memory.clone();
        window.add(user_message);

        let reply = within(self.timeout, "assistant reply", self.model.chat(&window.messages())).await?;

        window.add(ChatMessage::assistant(reply.clone()));
        self.memory = window;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;
    use crate::retrieval::{QuerySelector, TopicGate};
    use crate::test_support::{seeded_graph, CountingGraph, ScriptedModel};
    use crate::MovieragError;

    async fn assistant(model: Arc<ScriptedModel>, window: usize) -> (Assistant, tempfile::TempDir) {
        let (graph, temp) = seeded_graph().await;
        let graph = Arc::new(CountingGraph::new(Arc::new(graph)));
        let router = QueryRouter::new(
            TopicGate::new(model.clone()),
            Arc::new(QuerySelector::new(model.clone(), graph)),
        );
        (Assistant::new(model, router, window), temp)
    }

    #[test]
    fn test_inject_contents() {
        assert_eq!(inject_contents("Hi", &[]), "Hi");
        let text = inject_contents(
            "Who?",
            &[ContentItem::from_text("Ethan Hawthorne"), ContentItem::from_text("Olivia Sinclair")],
        );
        assert_eq!(
            text,
            "Who?\n\nAnswer using the following information:\nEthan Hawthorne\n\nOlivia Sinclair"
        );
    }

    #[tokio::test]
    async fn test_chat_injects_retrieved_content() {
        let model = Arc::new(ScriptedModel::routing("yes", "Pancake with Lemons", "1"));
        let (mut assistant, _temp) = assistant(model.clone(), 10).await;

        let reply = assistant.chat("Which actors played in Pancake with Lemons?").await.unwrap();
        assert_eq!(reply, "final answer");

        let last = model.conversations().last().cloned().unwrap();
        let final_prompt = &last.last().unwrap().content;
        assert!(final_prompt.contains("Answer using the following information:"));
        assert!(final_prompt.contains("Ethan Hawthorne"));
        assert!(final_prompt.contains("Olivia Sinclair"));
        assert_eq!(assistant.memory().len(), 2);
    }

    #[tokio::test]
    async fn test_off_topic_chat_sends_plain_message() {
        let model = Arc::new(ScriptedModel::routing("no", "", ""));
        let (mut assistant, _temp) = assistant(model.clone(), 10).await;

        assistant.chat("Hi").await.unwrap();
        let last = model.conversations().last().cloned().unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].content, "Hi");
    }

    #[tokio::test]
    async fn test_memory_window_bounds_conversation() {
        let model = Arc::new(ScriptedModel::routing("no", "", ""));
        let (mut assistant, _temp) = assistant(model.clone(), 4).await;

        for i in 0..5 {
            assistant.chat(&format!("message {}", i)).await.unwrap();
        }
        assert_eq!(assistant.memory().len(), 4);

        // the new message counts toward the window
        let last = model.conversations().last().cloned().unwrap();
        assert_eq!(last.len(), 4);
        assert_eq!(last[0].role, Role::Assistant);
        assert_eq!(last[1].content, "message 3");
        assert_eq!(last[3].content, "message 4");
    }

    #[tokio::test]
    async fn test_rejected_operation_fails_turn() {
        let model = Arc::new(ScriptedModel::routing("yes", "Pancake with Lemons", "3"));
        let (mut assistant, _temp) = assistant(model, 10).await;

        let result = assistant.chat("Show me all actors in the database!").await;
        assert!(matches!(result, Err(MovieragError::UnsupportedOperation(_))));
        assert!(assistant.memory().is_empty());
    }

    #[tokio::test]
    async fn test_system_message_sent_first() {
        let model = Arc::new(ScriptedModel::routing("no", "", ""));
        let (assistant, _temp) = assistant(model.clone(), 10).await;
        let mut assistant = assistant.with_system_message("You answer questions about movies.");

        assistant.chat("Hi").await.unwrap();
        let last = model.conversations().last().cloned().unwrap();
        assert_eq!(last[0].role, Role::System);
        assert_eq!(last[1].content, "Hi");
    }
}
