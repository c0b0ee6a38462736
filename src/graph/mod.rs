//! Movie graph: node types, the appearance edge and the read contract the
//! retrievers depend on.
//!
//! Movies are keyed by title and actors by name. An appearance is a single
//! `PLAYED_IN` edge from actor to movie; both directions are answered from the
//! same edge set.

mod cast;
mod store;

pub use cast::Cast;
pub use store::SqliteMovieGraph;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Relation type recorded on every appearance edge.
pub const PLAYED_IN: &str = "PLAYED_IN";

/// A movie node. `title` is unique within the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub title: String,
    pub date_created: NaiveDate,
}

impl Movie {
    pub fn new(title: impl Into<String>, date_created: NaiveDate) -> Self {
        Self {
            title: title.into(),
            date_created,
        }
    }
}

/// An actor node. `name` is unique within the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
}

impl Actor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One `PLAYED_IN` edge (actor -> movie).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Appearance {
    pub actor_name: String,
    pub movie_title: String,
}

/// Read lookups over the movie graph.
///
/// Title and name matches are exact and case-sensitive, except
/// `find_movies_by_title_containing`.
#[async_trait]
pub trait MovieGraph: Send + Sync {
    /// Actors with an appearance edge to the movie titled `title`.
    async fn find_actors_by_movie_title(&self, title: &str) -> Result<Vec<Actor>>;

    /// Number of actors with an appearance edge to `title`; zero when unknown.
    async fn count_actors_in_movie(&self, title: &str) -> Result<u64>;

    async fn find_movies_by_actor_name(&self, name: &str) -> Result<Vec<Movie>>;

    /// Movies whose creation date falls in `year`.
    async fn find_movies_by_year(&self, year: i32) -> Result<Vec<Movie>>;

    /// Case-insensitive partial title match.
    async fn find_movies_by_title_containing(&self, title_part: &str) -> Result<Vec<Movie>>;

    async fn find_movie_by_title(&self, title: &str) -> Result<Option<Movie>>;
}
