use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::prompts::{self, CLASSIFY_OPERATION, EXTRACT_TITLE};
use super::{within, ContentItem, ContentRetriever, Query, DEFAULT_MODEL_TIMEOUT, DEFAULT_STORE_TIMEOUT};
use crate::graph::MovieGraph;
use crate::llm::ChatModel;
use crate::{MovieragError, Result};

/// Lookups the selector can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Operation 1: names of the actors in a movie
    ListActors,
    /// Operation 2: number of actors in a movie
    CountActors,
}

impl Operation {
    /// Read the classifier's answer: "1" wins over "2"; anything else is refused.
    pub fn from_answer(answer: &str) -> Result<Self> {
        if answer.contains('1') {
            Ok(Operation::ListActors)
        } else if answer.contains('2') {
            Ok(Operation::CountActors)
        } else {
            Err(MovieragError::UnsupportedOperation(format!(
                "the model tried to make an illegal operation (answered {:?})",
                answer.trim()
            )))
        }
    }
}

/// Hand-written retriever: extracts a movie title, classifies the question
/// into one of two fixed lookups and runs it.
pub struct QuerySelector {
    model: Arc<dyn ChatModel>,
    graph: Arc<dyn MovieGraph>,
    model_timeout: Duration,
    store_timeout: Duration,
    parallel: bool,
}

impl QuerySelector {
    pub fn new(model: Arc<dyn ChatModel>, graph: Arc<dyn MovieGraph>) -> Self {
        Self {
            model,
            graph,
            model_timeout: DEFAULT_MODEL_TIMEOUT,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            parallel: true,
        }
    }

    pub fn with_timeouts(mut self, model_timeout: Duration, store_timeout: Duration) -> Self {
        self.model_timeout = model_timeout;
        self.store_timeout = store_timeout;
        self
    }

    /// Issue title extraction and classification one after the other.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Movie title named in the question, exactly as the model returned it.
    /// Not checked against the store.
    pub async fn extract_title(&self, question: &str) -> Result<String> {
        let prompt = prompts::render(EXTRACT_TITLE, question);
        within(self.model_timeout, "title extraction", self.model.generate(&prompt)).await
    }

    pub async fn classify(&self, question: &str) -> Result<Operation> {
        let prompt = prompts::render(CLASSIFY_OPERATION, question);
        let answer = within(
            self.model_timeout,
            "operation classification",
            self.model.generate(&prompt),
        )
        .await?;
        log::debug!("Operation classifier answered {:?}", answer);
        Operation::from_answer(&answer)
    }

    /// Run `operation` for `title` against the store.
    pub async fn execute(&self, operation: Operation, title: &str) -> Result<Vec<ContentItem>> {
        match operation {
            Operation::ListActors => {
                let actors = within(
                    self.store_timeout,
                    "actor lookup",
                    self.graph.find_actors_by_movie_title(title),
                )
                .await?;
                Ok(actors
                    .into_iter()
                    .map(|actor| ContentItem::from_text(actor.name))
                    .collect())
            }
            Operation::CountActors => {
                let count = within(
                    self.store_timeout,
                    "actor count",
                    self.graph.count_actors_in_movie(title),
                )
                .await?;
                Ok(vec![ContentItem::from_text(count.to_string())])
            }
        }
    }

    /// Extract, classify, execute.
    pub async fn resolve(&self, question: &str) -> Result<Vec<ContentItem>> {
        let (title, operation) = if self.parallel {
            let (title, operation) = tokio::join!(self.extract_title(question), self.classify(question));
            (title?, operation?)
        } else {
            let title = self.extract_title(question).await?;
            (title, self.classify(question).await?)
        };

        log::info!("Selected {:?} for title {:?}", operation, title);
        let items = self.execute(operation, &title).await?;
        log::debug!("{:?} returned {} items", operation, items.len());
        Ok(items)
    }
}

#[async_trait]
impl ContentRetriever for QuerySelector {
    fn name(&self) -> &'static str {
        "selector"
    }

    async fn retrieve(&self, query: &Query) -> Result<Vec<ContentItem>> {
        self.resolve(query.text()).await
    }
}
