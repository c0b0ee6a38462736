use movierag::{config::Config, db::Db, error::MovieragError};

/// Calculate percentile from sorted values
fn percentile(sorted_values: &[i64], p: f64) -> i64 {
    if sorted_values.is_empty() {
        return 0;
    }
    let index = ((sorted_values.len() - 1) as f64 * p).ceil() as usize;
    sorted_values[index.min(sorted_values.len() - 1)]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.movierag.log_level.as_str()),
    )
    .init();
    let db = Db::new(config.db_path());

    println!("\n=== Movie Graph Routing Statistics ===\n");

    // Routes taken over the last 24 hours
    let stats = db.with_connection(|conn| {
        let mut stmt = conn.prepare(
            r#"
            SELECT
                route,
                retriever,
                COUNT(*) as count,
                AVG(latency_ms) as avg_latency,
                MAX(latency_ms) as max_latency,
                SUM(result_count) as total_results
            FROM query_logs
            WHERE timestamp > datetime('now', '-24 hours')
            GROUP BY route, retriever
            ORDER BY count DESC
            "#
        )?;

        let mut rows = stmt.query([])?;
        let mut results = Vec::new();

        while let Some(row) = rows.next()? {
            results.push((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, Option<f64>>(3)?,
                row.get::<_, Option<i64>>(4)?,
                row.get::<_, Option<i64>>(5)?,
            ));
        }

        Ok::<Vec<_>, MovieragError>(results)
    }).await?;

    if stats.is_empty() {
        println!("No questions routed in the last 24 hours.");
        println!("\nRun `movierag ask <question>` to generate statistics.");
        return Ok(());
    }

    println!("24-Hour Routing by Route and Retriever:\n");
    println!("{:-<76}", "");
    println!(
        "{:<10} {:<12} {:>8} {:>12} {:>12} {:>14}",
        "Route", "Retriever", "Count", "Avg (ms)", "Max (ms)", "Total Results"
    );
    println!("{:-<76}", "");

    for (route, retriever, count, avg_latency, max_latency, total_results) in &stats {
        println!(
            "{:<10} {:<12} {:>8} {:>12} {:>12} {:>14}",
            route,
            retriever.as_deref().unwrap_or("-"),
            count,
            avg_latency.map(|v| v as i64).unwrap_or(0),
            max_latency.unwrap_or(0),
            total_results.unwrap_or(0),
        );
    }
    println!("{:-<76}", "");

    let all_latencies = db.with_connection(|conn| {
        let mut stmt = conn.prepare(
            r#"
            SELECT latency_ms
            FROM query_logs
            WHERE timestamp > datetime('now', '-24 hours')
                AND latency_ms IS NOT NULL
            ORDER BY latency_ms
            "#
        )?;

        let mut rows = stmt.query([])?;
        let mut latencies = Vec::new();

        while let Some(row) = rows.next()? {
            latencies.push(row.get::<_, i64>(0)?);
        }

        Ok::<Vec<i64>, MovieragError>(latencies)
    }).await?;

    if !all_latencies.is_empty() {
        println!("\nLatency Percentiles (Last 24 Hours):\n");
        println!("{:-<40}", "");
        println!("{:<15} {:>15}", "Percentile", "Latency (ms)");
        println!("{:-<40}", "");
        println!("{:<15} {:>15}", "P50", percentile(&all_latencies, 0.50));
        println!("{:<15} {:>15}", "P95", percentile(&all_latencies, 0.95));
        println!("{:<15} {:>15}", "P99", percentile(&all_latencies, 0.99));
        println!("{:-<40}", "");
    }

    // Most recent failures, newest first
    let failures = db.with_connection(|conn| {
        let mut stmt = conn.prepare(
            r#"
            SELECT timestamp, query_text, error_message
            FROM query_logs
            WHERE route = 'failed'
            ORDER BY timestamp DESC, rowid DESC
            LIMIT 5
            "#
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, rusqlite::Error>>()?;
        Ok::<Vec<_>, MovieragError>(rows)
    }).await?;

    if !failures.is_empty() {
        println!("\nRecent Failures:");
        for (timestamp, question, error) in &failures {
            println!("  [{}] {:?}: {}", timestamp, question, error.as_deref().unwrap_or("unknown"));
        }
    }

    let total_stats = db.with_connection(|conn| {
        conn.query_row(
            r#"
            SELECT
                COUNT(*) as total_queries,
                MIN(timestamp) as first_query,
                MAX(timestamp) as last_query
            FROM query_logs
            "#,
            [],
            |row| Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        ).map_err(MovieragError::from)
    }).await?;

    println!("\nTotal Statistics:");
    println!("  Total questions logged: {}", total_stats.0);
    if let Some(first) = total_stats.1 {
        println!("  First question: {}", first);
    }
    if let Some(last) = total_stats.2 {
        println!("  Last question: {}", last);
    }

    println!();

    Ok(())
}
