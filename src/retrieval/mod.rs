//! Content routing: decide whether a question concerns the movie graph and,
//! if so, which retriever answers it.
//!
//! Flow for one question:
//! gate (model call) -> stop, or retriever -> content items.
//! The selector retriever issues two more model calls (title extraction,
//! operation classification) and then one fixed store lookup.

mod gate;
mod generated;
pub mod prompts;
mod router;
mod selector;
mod verdict;

pub use gate::TopicGate;
pub use generated::GeneratedQueryRetriever;
pub use router::{QueryRouter, Routed};
pub use selector::{Operation, QuerySelector};
pub use verdict::{strategy_for, NoSubstringStrategy, StrictYesNoStrategy, Verdict, VerdictStrategy};

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::{MovieragError, Result};

/// Default deadline for one model round trip.
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(60);
/// Default deadline for one store lookup.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// A user question as seen by the retrievers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// One piece of retrieved text handed back to the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContentItem {
    pub text: String,
}

impl ContentItem {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl fmt::Display for ContentItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A pluggable retrieval step.
#[async_trait]
pub trait ContentRetriever: Send + Sync {
    /// Short identifier used in logs and the query log.
    fn name(&self) -> &'static str;

    async fn retrieve(&self, query: &Query) -> Result<Vec<ContentItem>>;
}

/// Await `fut`, failing with `Timeout` once `limit` has elapsed.
pub(crate) async fn within<T, F>(limit: Duration, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(MovieragError::Timeout(format!("{} exceeded {:?}", what, limit))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_within_passes_result_through() {
        let value = within(Duration::from_secs(1), "noop", async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_within_times_out() {
        let result: Result<()> = within(Duration::from_millis(20), "stalled call", async {
            std::future::pending::<Result<()>>().await
        })
        .await;
        match result {
            Err(MovieragError::Timeout(msg)) => assert!(msg.contains("stalled call")),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_query_and_content() {
        let query = Query::new("Which actors?");
        assert_eq!(query.text(), "Which actors?");
        assert_eq!(ContentItem::from_text("2").to_string(), "2");
    }
}
