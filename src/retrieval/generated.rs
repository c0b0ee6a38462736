//! Retriever that lets the model write the lookup.
//!
//! The model sees the table layout and a few example statements, answers with
//! one SQL statement, and the statement runs on a `query_only` connection.

use async_trait::async_trait;
use regex::Regex;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use super::prompts::{self, GENERATE_QUERY};
use super::{within, ContentItem, ContentRetriever, Query, DEFAULT_MODEL_TIMEOUT, DEFAULT_STORE_TIMEOUT};
use crate::db::Db;
use crate::llm::ChatModel;
use crate::{MovieragError, Result};

const DEFAULT_MAX_ROWS: usize = 50;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").expect("Invalid regex pattern"))
}

fn select_regex() -> &'static Regex {
    static SELECT: OnceLock<Regex> = OnceLock::new();
    SELECT.get_or_init(|| Regex::new(r"(?i)^(select|with)\b").expect("Invalid regex pattern"))
}

/// Pull a single read statement out of the model's answer.
///
/// Accepts a bare statement or one wrapped in a code fence; a single trailing
/// semicolon is dropped. Anything that is not one SELECT/WITH statement is
/// rejected.
pub(crate) fn extract_statement(answer: &str) -> Result<String> {
    let body = match fence_regex().captures(answer) {
        Some(cap) => cap.get(1).map(|m| m.as_str()).unwrap_or_default(),
        None => answer,
    };
    let statement = body.trim().trim_end_matches(';').trim();

    if statement.is_empty() {
        return Err(MovieragError::UnsafeQuery("model returned no statement".to_string()));
    }
    if statement.contains(';') {
        return Err(MovieragError::UnsafeQuery(format!(
            "multiple statements are not allowed: {}",
            statement
        )));
    }
    if !select_regex().is_match(statement) {
        return Err(MovieragError::UnsafeQuery(format!(
            "only SELECT statements are allowed: {}",
            statement
        )));
    }
    Ok(statement.to_string())
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "null".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

/// Run `sql` and render each row as `column: value, column: value`.
fn run_statement(conn: &Connection, sql: &str, max_rows: usize) -> Result<Vec<ContentItem>> {
    let mut stmt = conn.prepare(sql)?;
    if !stmt.readonly() {
        return Err(MovieragError::UnsafeQuery(format!("statement writes to the database: {}", sql)));
    }
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt.query([])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        if items.len() == max_rows {
            log::warn!("Generated query truncated at {} rows", max_rows);
            break;
        }
        let mut fields = Vec::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            fields.push(format!("{}: {}", column, render_value(row.get_ref(i)?)));
        }
        items.push(ContentItem::from_text(fields.join(", ")));
    }
    Ok(items)
}

pub struct GeneratedQueryRetriever {
    model: Arc<dyn ChatModel>,
    db: Db,
    model_timeout: Duration,
    store_timeout: Duration,
    max_rows: usize,
}

impl GeneratedQueryRetriever {
    pub fn new(model: Arc<dyn ChatModel>, db: Db) -> Self {
        Self {
            model,
            db,
            model_timeout: DEFAULT_MODEL_TIMEOUT,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }

    pub fn with_timeouts(mut self, model_timeout: Duration, store_timeout: Duration) -> Self {
        self.model_timeout = model_timeout;
        self.store_timeout = store_timeout;
        self
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows.max(1);
        self
    }
}

#[async_trait]
impl ContentRetriever for GeneratedQueryRetriever {
    fn name(&self) -> &'static str {
        "generated"
    }

    async fn retrieve(&self, query: &Query) -> Result<Vec<ContentItem>> {
        let prompt = prompts::render(GENERATE_QUERY, query.text());
        let answer = within(self.model_timeout, "query generation", self.model.generate(&prompt)).await?;
        let sql = extract_statement(&answer)?;
        log::info!("Generated query: {}", sql);

        let max_rows = self.max_rows;
        within(
            self.store_timeout,
            "generated query",
            self.db
                .with_read_only_connection(move |conn| run_statement(conn, &sql, max_rows)),
        )
        .await
    }
}
