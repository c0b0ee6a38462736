pub mod config;
pub mod error;
pub mod db;
pub mod graph;
pub mod llm;
pub mod retrieval;
pub mod assistant;
pub mod audit;
pub mod seed;

#[cfg(test)]
pub(crate) mod test_support;

pub use assistant::Assistant;
pub use config::Config;
pub use error::{MovieragError, Result};
pub use graph::{Actor, Movie, MovieGraph, SqliteMovieGraph};
pub use retrieval::{ContentItem, ContentRetriever, Query, QueryRouter};
