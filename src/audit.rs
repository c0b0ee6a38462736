//! Query log: one row per routed question.

use chrono::Utc;
use rusqlite::params;
use serde::Serialize;
use uuid::Uuid;

use crate::db::Db;
use crate::error::{MovieragError, Result};

/// Route names recorded in `query_logs.route`.
pub const ROUTE_SKIPPED: &str = "skipped";
pub const ROUTE_STORE: &str = "store";
pub const ROUTE_FAILED: &str = "failed";

#[derive(Debug, Clone, Serialize)]
pub struct QueryLogEntry {
    pub query_id: String,
    pub timestamp: String,
    pub query_text: String,
    pub route: String,
    pub retriever: Option<String>,
    pub result_count: i64,
    pub latency_ms: Option<i64>,
    pub error_message: Option<String>,
}

/// Record a routed question.
///
/// Returns the generated query_id (UUID).
pub async fn log_query(
    db: &Db,
    query_text: &str,
    route: &str,
    retriever: Option<&str>,
    result_count: usize,
    latency_ms: i64,
    error_message: Option<&str>,
) -> Result<String> {
    let query_id = Uuid::new_v4().to_string();
    let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

    let id = query_id.clone();
    let text = query_text.to_string();
    let route = route.to_string();
    let retriever = retriever.map(String::from);
    let err = error_message.map(String::from);
    let count = result_count as i64;

    db.with_connection(move |conn| {
        conn.execute(
            r#"
            INSERT INTO query_logs (
                query_id, timestamp, query_text, route,
                retriever, result_count, latency_ms, error_message
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![id, timestamp, text, route, retriever, count, latency_ms, err],
        )?;
        Ok::<(), MovieragError>(())
    })
    .await?;

    Ok(query_id)
}

/// Most recent entries first.
pub async fn recent_queries(db: &Db, limit: usize) -> Result<Vec<QueryLogEntry>> {
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(
            r#"
            SELECT query_id, timestamp, query_text, route,
                   retriever, result_count, latency_ms, error_message
            FROM query_logs
            ORDER BY timestamp DESC, rowid DESC
            LIMIT ?1
            "#,
        )?;
        let entries = stmt
            .query_map([limit as i64], |row| {
                Ok(QueryLogEntry {
                    query_id: row.get(0)?,
                    timestamp: row.get(1)?,
                    query_text: row.get(2)?,
                    route: row.get(3)?,
                    retriever: row.get(4)?,
                    result_count: row.get(5)?,
                    latency_ms: row.get(6)?,
                    error_message: row.get(7)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
            .map_err(MovieragError::Database)?;
        Ok(entries)
    })
    .await
}
