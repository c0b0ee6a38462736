//! In-memory movie graph used to assemble data before it is persisted.

use std::collections::{BTreeMap, BTreeSet};

use super::{Actor, Appearance, Movie};
use crate::{MovieragError, Result};

/// Movies, actors and the appearance edges between them.
///
/// Edges live in one set keyed (actor, movie). The by-movie view is kept in
/// step by `link`, the only place an edge is inserted.
#[derive(Debug, Default, Clone)]
pub struct Cast {
    movies: BTreeMap<String, Movie>,
    actors: BTreeMap<String, Actor>,
    edges: BTreeSet<Appearance>,
    by_movie: BTreeSet<(String, String)>,
}

impl Cast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a movie keyed by title.
    pub fn add_movie(&mut self, movie: Movie) {
        self.movies.insert(movie.title.clone(), movie);
    }

    /// Insert an actor keyed by name.
    pub fn add_actor(&mut self, actor: Actor) {
        self.actors.insert(actor.name.clone(), actor);
    }

    /// Record that `actor_name` played in `movie_title`.
    ///
    /// Returns `false` when the edge already existed. Both endpoints must have
    /// been added first.
    pub fn link(&mut self, actor_name: &str, movie_title: &str) -> Result<bool> {
        if !self.actors.contains_key(actor_name) {
            return Err(MovieragError::InvalidInput(format!("unknown actor: {}", actor_name)));
        }
        if !self.movies.contains_key(movie_title) {
            return Err(MovieragError::InvalidInput(format!("unknown movie: {}", movie_title)));
        }

        let inserted = self.edges.insert(Appearance {
            actor_name: actor_name.to_string(),
            movie_title: movie_title.to_string(),
        });
        if inserted {
            self.by_movie
                .insert((movie_title.to_string(), actor_name.to_string()));
        }
        Ok(inserted)
    }

    /// Actors appearing in `movie_title`, ordered by name.
    pub fn actors_in(&self, movie_title: &str) -> Vec<&Actor> {
        self.by_movie
            .range((movie_title.to_string(), String::new())..)
            .take_while(|(title, _)| title == movie_title)
            .filter_map(|(_, name)| self.actors.get(name))
            .collect()
    }

    /// Movies `actor_name` appeared in, ordered by title.
    pub fn movies_of(&self, actor_name: &str) -> Vec<&Movie> {
        let start = Appearance {
            actor_name: actor_name.to_string(),
            movie_title: String::new(),
        };
        self.edges
            .range(start..)
            .take_while(|edge| edge.actor_name == actor_name)
            .filter_map(|edge| self.movies.get(&edge.movie_title))
            .collect()
    }

    pub fn movies(&self) -> impl Iterator<Item = &Movie> {
        self.movies.values()
    }

    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    pub fn appearances(&self) -> impl Iterator<Item = &Appearance> {
        self.edges.iter()
    }
}
