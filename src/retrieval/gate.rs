use std::sync::Arc;
use std::time::Duration;

use super::prompts::{self, TOPIC_GATE};
use super::verdict::{NoSubstringStrategy, Verdict, VerdictStrategy};
use super::{within, DEFAULT_MODEL_TIMEOUT};
use crate::llm::ChatModel;
use crate::Result;

/// Decides whether a question should be answered from the movie graph.
///
/// One model round trip per question; the answer is read by the configured
/// `VerdictStrategy`. Only `Deny` stops the request. `Ambiguous` falls
/// through to the store like an affirmation.
pub struct TopicGate {
    model: Arc<dyn ChatModel>,
    strategy: Box<dyn VerdictStrategy>,
    timeout: Duration,
}

impl TopicGate {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            strategy: Box::new(NoSubstringStrategy),
            timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }

    pub fn with_strategy(mut self, strategy: Box<dyn VerdictStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Ask the classifier and return its reading.
    pub async fn verdict(&self, question: &str) -> Result<Verdict> {
        let prompt = prompts::render(TOPIC_GATE, question);
        let answer = within(self.timeout, "topic gate", self.model.generate(&prompt)).await?;
        let verdict = self.strategy.judge(&answer);
        log::info!(
            "Topic gate answered {:?} -> {:?} ({})",
            answer.to_lowercase(),
            verdict,
            self.strategy.name()
        );
        Ok(verdict)
    }

    /// `false` only when the classifier denied the question.
    pub async fn should_consult_store(&self, question: &str) -> Result<bool> {
        Ok(self.verdict(question).await? != Verdict::Deny)
    }
}
