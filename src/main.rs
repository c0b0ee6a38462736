use anyhow::Result;
use clap::{Parser, Subcommand};
use movierag::db::{migrate, Db};
use movierag::llm::{ChatModel, OpenAIChatModel};
use movierag::{seed, Assistant, Config, MovieGraph, Query, QueryRouter, SqliteMovieGraph};
use std::path::Path;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "movierag")]
#[command(about = "Ask questions about a small movie and actor graph", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply migrations and check the schema (default)
    Verify,
    /// Replace the graph contents with the demo movies and actors
    Seed,
    /// Route one question and print the retrieved content
    Ask {
        question: String,
    },
    /// Run assistant turns, one per message, in a single conversation
    Chat {
        #[arg(required = true)]
        messages: Vec<String>,
    },
    /// Look up movies directly in the graph
    Movies {
        #[arg(long, conflicts_with_all = ["year", "title"])]
        actor: Option<String>,
        #[arg(long, conflicts_with = "title")]
        year: Option<i32>,
        /// Case-insensitive partial title
        #[arg(long)]
        title: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?;

    // RUST_LOG wins over movierag.log_level
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.movierag.log_level.as_str())
    ).init();

    let db = Db::new(config.db_path());

    let migrations_dir = Path::new("migrations");
    db.with_connection(|conn| migrate::run_migrations(conn, migrations_dir))
        .await?;

    let graph = SqliteMovieGraph::new(db.clone());

    match cli.command.unwrap_or(Command::Verify) {
        Command::Verify => verify_database_schema(&db).await?,
        Command::Seed => seed::load(&graph).await?,
        Command::Ask { question } => {
            let router = QueryRouter::from_config(&config, build_model(&config)?, graph);
            let routed = router.retrieve(&Query::new(question)).await?;
            if !routed.consulted {
                println!("Off-topic question: the movie graph was not consulted.");
            } else if routed.contents.is_empty() {
                println!("No matching content.");
            } else {
                for item in &routed.contents {
                    println!("{}", item);
                }
            }
        }
        Command::Chat { messages } => {
            let model = build_model(&config)?;
            let router = QueryRouter::from_config(&config, model.clone(), graph);
            let mut assistant = Assistant::from_config(&config, model, router);
            for message in messages {
                println!("> {}", message);
                let reply = assistant.chat(&message).await?;
                println!("{}\n", reply);
            }
        }
        Command::Movies { actor, year, title } => {
            let movies = if let Some(name) = actor {
                graph.find_movies_by_actor_name(&name).await?
            } else if let Some(year) = year {
                graph.find_movies_by_year(year).await?
            } else if let Some(part) = title {
                graph.find_movies_by_title_containing(&part).await?
            } else {
                anyhow::bail!("Usage: movies --actor <name> | --year <year> | --title <part>");
            };
            if movies.is_empty() {
                println!("No movies found.");
            }
            for movie in movies {
                println!("{} ({})", movie.title, movie.date_created);
            }
        }
    }

    Ok(())
}

fn build_model(config: &Config) -> Result<Arc<dyn ChatModel>> {
    let model = OpenAIChatModel::from_config(&config.llm)?;
    log::info!("Chat model: {} via {}", config.llm.model, config.llm.base_url);
    Ok(Arc::new(model))
}

/// Verify that all expected database objects exist
async fn verify_database_schema(db: &Db) -> Result<()> {
    use movierag::MovieragError;

    db.with_connection(|conn| {
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        let expected_tables = ["actors", "appearances", "movies", "query_logs", "schema_migrations"];
        let mut all_tables_exist = true;
        for table in &expected_tables {
            if tables.iter().any(|t| t == table) {
                log::debug!("✓ Table exists: {}", table);
            } else {
                log::error!("Missing table: {}", table);
                all_tables_exist = false;
            }
        }
        if !all_tables_exist {
            return Err(MovieragError::Config("Not all required tables exist".to_string()));
        }

        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%'")?;
        let indexes: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        for index_name in ["idx_appearances_movie", "idx_appearances_actor"] {
            if indexes.iter().any(|i| i == index_name) {
                log::debug!("✓ Index exists: {}", index_name);
            } else {
                log::warn!("Index not found: {}", index_name);
            }
        }

        let foreign_keys: i32 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        if foreign_keys != 1 {
            return Err(MovieragError::Config("Foreign keys not enabled".to_string()));
        }

        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(MovieragError::Config(format!("Database integrity check failed: {}", integrity)));
        }

        let movies: i64 = conn.query_row("SELECT COUNT(*) FROM movies", [], |row| row.get(0))?;
        let actors: i64 = conn.query_row("SELECT COUNT(*) FROM actors", [], |row| row.get(0))?;
        log::info!("✓ Database OK: {} movies, {} actors", movies, actors);
        if movies == 0 {
            log::info!("Graph is empty. Run `movierag seed` to load the demo data.");
        }

        Ok(())
    })
    .await?;

    Ok(())
}
