//! SQLite-backed movie graph.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Actor, Cast, Movie, MovieGraph, PLAYED_IN};
use crate::db::Db;
use crate::{MovieragError, Result};

const CLEAR_ALL: &str = "DELETE FROM appearances; DELETE FROM actors; DELETE FROM movies;";

/// Movie graph stored in the `movies`, `actors` and `appearances` tables.
#[derive(Debug, Clone)]
pub struct SqliteMovieGraph {
    db: Db,
}

fn movie_from_row(row: &Row<'_>) -> rusqlite::Result<Movie> {
    Ok(Movie {
        title: row.get(0)?,
        date_created: row.get(1)?,
    })
}

fn collect_movies(conn: &Connection, sql: &str, param: &dyn rusqlite::ToSql) -> Result<Vec<Movie>> {
    let mut stmt = conn.prepare(sql)?;
    let movies = stmt
        .query_map([param], movie_from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
        .map_err(MovieragError::Database)?;
    Ok(movies)
}

impl SqliteMovieGraph {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Insert a movie, or update its creation date if the title exists.
    pub async fn save_movie(&self, movie: &Movie) -> Result<()> {
        let movie = movie.clone();
        self.db
            .with_connection(move |conn| {
                conn.execute(
                    "INSERT INTO movies (title, date_created) VALUES (?1, ?2) \
                     ON CONFLICT(title) DO UPDATE SET date_created = excluded.date_created",
                    params![movie.title, movie.date_created],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn save_actor(&self, actor: &Actor) -> Result<()> {
        let name = actor.name.clone();
        self.db
            .with_connection(move |conn| {
                conn.execute("INSERT OR IGNORE INTO actors (name) VALUES (?1)", params![name])?;
                Ok(())
            })
            .await
    }

    /// Record an appearance. Returns `false` if it was already present.
    pub async fn link(&self, actor_name: &str, movie_title: &str) -> Result<bool> {
        let actor_name = actor_name.to_string();
        let movie_title = movie_title.to_string();
        self.db
            .with_connection(move |conn| {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO appearances (actor_name, movie_title, relation_type) \
                     VALUES (?1, ?2, ?3)",
                    params![actor_name, movie_title, PLAYED_IN],
                )?;
                Ok(inserted == 1)
            })
            .await
    }

    /// Persist a whole cast in one transaction.
    pub async fn save_cast(&self, cast: &Cast) -> Result<()> {
        self.write_cast(cast, false).await
    }

    /// Replace the store contents with `cast` in one transaction.
    ///
    /// On failure the previous contents are kept.
    pub async fn replace_cast(&self, cast: &Cast) -> Result<()> {
        self.write_cast(cast, true).await
    }

    async fn write_cast(&self, cast: &Cast, clear: bool) -> Result<()> {
        let movies: Vec<Movie> = cast.movies().cloned().collect();
        let actors: Vec<String> = cast.actors().map(|a| a.name.clone()).collect();
        let edges: Vec<(String, String)> = cast
            .appearances()
            .map(|e| (e.actor_name.clone(), e.movie_title.clone()))
            .collect();

        self.db
            .with_connection(move |conn| {
                let tx = conn.transaction()?;
                if clear {
                    tx.execute_batch(CLEAR_ALL)?;
                }
                for movie in &movies {
                    tx.execute(
                        "INSERT INTO movies (title, date_created) VALUES (?1, ?2) \
                         ON CONFLICT(title) DO UPDATE SET date_created = excluded.date_created",
                        params![movie.title, movie.date_created],
                    )?;
                }
                for name in &actors {
                    tx.execute("INSERT OR IGNORE INTO actors (name) VALUES (?1)", params![name])?;
                }
                for (actor_name, movie_title) in &edges {
                    tx.execute(
                        "INSERT OR IGNORE INTO appearances (actor_name, movie_title, relation_type) \
                         VALUES (?1, ?2, ?3)",
                        params![actor_name, movie_title, PLAYED_IN],
                    )?;
                }
                tx.commit()?;
                log::debug!(
                    "Saved {} movies, {} actors, {} appearances",
                    movies.len(),
                    actors.len(),
                    edges.len()
                );
                Ok(())
            })
            .await
    }

    /// Remove every movie, actor and appearance.
    pub async fn delete_all(&self) -> Result<()> {
        self.db
            .with_connection(|conn| {
                conn.execute_batch(CLEAR_ALL)?;
                Ok(())
            })
            .await
    }
}

#[async_trait]
impl MovieGraph for SqliteMovieGraph {
    async fn find_actors_by_movie_title(&self, title: &str) -> Result<Vec<Actor>> {
        let title = title.to_string();
        self.db
            .with_connection(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT a.name FROM actors a \
                     JOIN appearances p ON p.actor_name = a.name \
                     WHERE p.movie_title = ?1 AND p.relation_type = ?2 \
                     ORDER BY a.name",
                )?;
                let actors = stmt
                    .query_map(params![title, PLAYED_IN], |row| Ok(Actor { name: row.get(0)? }))?
                    .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
                    .map_err(MovieragError::Database)?;
                Ok(actors)
            })
            .await
    }

    async fn count_actors_in_movie(&self, title: &str) -> Result<u64> {
        let title = title.to_string();
        self.db
            .with_connection(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM appearances WHERE movie_title = ?1 AND relation_type = ?2",
                    params![title, PLAYED_IN],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
    }

    async fn find_movies_by_actor_name(&self, name: &str) -> Result<Vec<Movie>> {
        let name = name.to_string();
        self.db
            .with_connection(move |conn| {
                collect_movies(
                    conn,
                    "SELECT m.title, m.date_created FROM movies m \
                     JOIN appearances p ON p.movie_title = m.title \
                     WHERE p.actor_name = ?1 ORDER BY m.title",
                    &name,
                )
            })
            .await
    }

    async fn find_movies_by_year(&self, year: i32) -> Result<Vec<Movie>> {
        self.db
            .with_connection(move |conn| {
                collect_movies(
                    conn,
                    "SELECT title, date_created FROM movies \
                     WHERE CAST(strftime('%Y', date_created) AS INTEGER) = ?1 ORDER BY title",
                    &year,
                )
            })
            .await
    }

    async fn find_movies_by_title_containing(&self, title_part: &str) -> Result<Vec<Movie>> {
        let part = title_part.to_string();
        self.db
            .with_connection(move |conn| {
                // instr keeps % and _ in the needle literal
                collect_movies(
                    conn,
                    "SELECT title, date_created FROM movies \
                     WHERE instr(lower(title), lower(?1)) > 0 ORDER BY title",
                    &part,
                )
            })
            .await
    }

    async fn find_movie_by_title(&self, title: &str) -> Result<Option<Movie>> {
        let title = title.to_string();
        self.db
            .with_connection(move |conn| {
                let movie = conn
                    .query_row(
                        "SELECT title, date_created FROM movies WHERE title = ?1",
                        params![title],
                        movie_from_row,
                    )
                    .optional()?;
                Ok(movie)
            })
            .await
    }
}
