use std::sync::Arc;
use std::time::Instant;

use super::gate::TopicGate;
use super::generated::GeneratedQueryRetriever;
use super::selector::QuerySelector;
use super::verdict::strategy_for;
use super::{ContentItem, ContentRetriever, Query};
use crate::audit::{self, ROUTE_FAILED, ROUTE_SKIPPED, ROUTE_STORE};
use crate::config::{Config, RetrieverKind};
use crate::db::Db;
use crate::graph::SqliteMovieGraph;
use crate::llm::ChatModel;
use crate::{MovieragError, Result};

/// Outcome of routing one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    /// Whether the gate let the question through to a retriever
    pub consulted: bool,
    pub retriever: Option<&'static str>,
    pub contents: Vec<ContentItem>,
}

/// A failed request and the retriever that was running, if any.
struct Failure {
    retriever: Option<&'static str>,
    error: MovieragError,
}

/// Gate plus the retriever that serves in-scope questions.
pub struct QueryRouter {
    gate: TopicGate,
    retriever: Arc<dyn ContentRetriever>,
    audit: Option<Db>,
}

impl QueryRouter {
    pub fn new(gate: TopicGate, retriever: Arc<dyn ContentRetriever>) -> Self {
        Self {
            gate,
            retriever,
            audit: None,
        }
    }

    /// Record every routed question in `query_logs`.
    pub fn with_audit(mut self, db: Db) -> Self {
        self.audit = Some(db);
        self
    }

    /// Wire gate and retriever from configuration.
    pub fn from_config(config: &Config, model: Arc<dyn ChatModel>, graph: SqliteMovieGraph) -> Self {
        let model_timeout = config.llm_timeout();
        let store_timeout = config.store_timeout();
        let db = graph.db().clone();

        let gate = TopicGate::new(model.clone())
            .with_strategy(strategy_for(config.retrieval.verdict_strategy))
            .with_timeout(model_timeout);

        let retriever: Arc<dyn ContentRetriever> = match config.retrieval.retriever {
            RetrieverKind::Selector => {
                let selector = QuerySelector::new(model, Arc::new(graph))
                    .with_timeouts(model_timeout, store_timeout);
                if config.retrieval.parallel_classification {
                    Arc::new(selector)
                } else {
                    Arc::new(selector.sequential())
                }
            }
            RetrieverKind::Generated => Arc::new(
                GeneratedQueryRetriever::new(model, db.clone())
                    .with_timeouts(model_timeout, store_timeout)
                    .with_max_rows(config.retrieval.max_generated_rows),
            ),
        };

        log::info!("Routing in-scope questions to the {} retriever", retriever.name());
        Self::new(gate, retriever).with_audit(db)
    }

    /// Retrievers to consult for `query`: none when the gate denies it.
    pub async fn route(&self, query: &Query) -> Result<Vec<Arc<dyn ContentRetriever>>> {
        if self.gate.should_consult_store(query.text()).await? {
            Ok(vec![self.retriever.clone()])
        } else {
            Ok(Vec::new())
        }
    }

    /// Route and retrieve. Failures propagate after being logged.
    pub async fn retrieve(&self, query: &Query) -> Result<Routed> {
        let start = Instant::now();
        let result = self.dispatch(query).await;
        let latency_ms = start.elapsed().as_millis() as i64;

        if let Some(db) = &self.audit {
            let (route, retriever, count, error) = match &result {
                Ok(routed) if routed.consulted => {
                    (ROUTE_STORE, routed.retriever, routed.contents.len(), None)
                }
                Ok(_) => (ROUTE_SKIPPED, None, 0, None),
                Err(failure) => (ROUTE_FAILED, failure.retriever, 0, Some(failure.error.to_string())),
            };
            if let Err(e) = audit::log_query(
                db,
                query.text(),
                route,
                retriever,
                count,
                latency_ms,
                error.as_deref(),
            )
            .await
            {
                log::warn!("Failed to write query log: {}", e);
            }
        }

        result.map_err(|failure| failure.error)
    }

    async fn dispatch(&self, query: &Query) -> std::result::Result<Routed, Failure> {
        let retrievers = self
            .route(query)
            .await
            .map_err(|error| Failure { retriever: None, error })?;
        if retrievers.is_empty() {
            log::info!("Question is off-topic, skipping the movie graph");
            return Ok(Routed {
                consulted: false,
                retriever: None,
                contents: Vec::new(),
            });
        }

        let mut contents = Vec::new();
        let mut used = None;
        for retriever in retrievers {
            let items = retriever.retrieve(query).await.map_err(|error| Failure {
                retriever: Some(retriever.name()),
                error,
            })?;
            contents.extend(items);
            used = Some(retriever.name());
        }
        Ok(Routed {
            consulted: true,
            retriever: used,
            contents,
        })
    }
}
