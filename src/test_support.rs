//! Test doubles shared by unit tests.

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::db::{migrate, Db};
use crate::graph::{Actor, Movie, MovieGraph, SqliteMovieGraph};
use crate::llm::{ChatMessage, ChatModel};
use crate::Result;

pub(crate) const GATE_PREFIX: &str = "Does it make sense";
pub(crate) const TITLE_PREFIX: &str = "Extract movie name";
pub(crate) const OPERATION_PREFIX: &str = "You have access to two queries";
pub(crate) const SQL_PREFIX: &str = "Task: Generate an accurate SQLite";

/// Chat model answering from a closure over the last message, recording every prompt.
pub(crate) struct ScriptedModel {
    respond: Box<dyn Fn(&str) -> String + Send + Sync>,
    prompts: Mutex<Vec<String>>,
    conversations: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub(crate) fn new(respond: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            prompts: Mutex::new(Vec::new()),
            conversations: Mutex::new(Vec::new()),
        }
    }

    /// Answers the gate, title and operation prompts; anything else gets `reply`.
    pub(crate) fn routing(gate: &str, title: &str, operation: &str) -> Self {
        let (gate, title, operation) = (gate.to_string(), title.to_string(), operation.to_string());
        Self::new(move |prompt| {
            if prompt.starts_with(GATE_PREFIX) {
                gate.clone()
            } else if prompt.starts_with(TITLE_PREFIX) {
                title.clone()
            } else if prompt.starts_with(OPERATION_PREFIX) {
                operation.clone()
            } else {
                "final answer".to_string()
            }
        })
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub(crate) fn count_prompts(&self, prefix: &str) -> usize {
        self.prompts().iter().filter(|p| p.starts_with(prefix)).count()
    }

    pub(crate) fn conversations(&self) -> Vec<Vec<ChatMessage>> {
        self.conversations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt.clone());
        self.conversations.lock().unwrap().push(messages.to_vec());
        Ok((self.respond)(&prompt))
    }
}

/// Chat model that never answers.
pub(crate) struct StalledModel;

#[async_trait]
impl ChatModel for StalledModel {
    async fn chat(&self, _messages: &[ChatMessage]) -> Result<String> {
        std::future::pending::<Result<String>>().await
    }
}

/// Wraps a graph and counts every lookup made through it.
pub(crate) struct CountingGraph {
    inner: Arc<dyn MovieGraph>,
    calls: AtomicUsize,
}

impl CountingGraph {
    pub(crate) fn new(inner: Arc<dyn MovieGraph>) -> Self {
        Self { inner, calls: AtomicUsize::new(0) }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MovieGraph for CountingGraph {
    async fn find_actors_by_movie_title(&self, title: &str) -> Result<Vec<Actor>> {
        self.hit();
        self.inner.find_actors_by_movie_title(title).await
    }

    async fn count_actors_in_movie(&self, title: &str) -> Result<u64> {
        self.hit();
        self.inner.count_actors_in_movie(title).await
    }

    async fn find_movies_by_actor_name(&self, name: &str) -> Result<Vec<Movie>> {
        self.hit();
        self.inner.find_movies_by_actor_name(name).await
    }

    async fn find_movies_by_year(&self, year: i32) -> Result<Vec<Movie>> {
        self.hit();
        self.inner.find_movies_by_year(year).await
    }

    async fn find_movies_by_title_containing(&self, title_part: &str) -> Result<Vec<Movie>> {
        self.hit();
        self.inner.find_movies_by_title_containing(title_part).await
    }

    async fn find_movie_by_title(&self, title: &str) -> Result<Option<Movie>> {
        self.hit();
        self.inner.find_movie_by_title(title).await
    }
}

/// Fresh migrated database in a temp dir.
pub(crate) async fn migrated_db() -> (Db, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Db::new(temp_dir.path().join("movies.db"));
    let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
    db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
        .await
        .unwrap();
    (db, temp_dir)
}

/// Migrated database loaded with the demo cast.
pub(crate) async fn seeded_graph() -> (SqliteMovieGraph, TempDir) {
    let (db, temp_dir) = migrated_db().await;
    let graph = SqliteMovieGraph::new(db);
    crate::seed::load(&graph).await.unwrap();
    (graph, temp_dir)
}
