//! Demo data: three made-up movies and six made-up actors.
//!
//! The names are invented so a model cannot answer from its training data and
//! has to use the retrieved content.

use chrono::NaiveDate;

use crate::graph::{Actor, Cast, Movie, SqliteMovieGraph};
use crate::{MovieragError, Result};

const MOVIES: &[(&str, (i32, u32, u32))] = &[
    ("Pancake with Lemons", (1994, 9, 22)),
    ("Alpha-Centauri Adventures", (1972, 3, 24)),
    ("Barking Dogs", (1994, 10, 14)),
];

const APPEARANCES: &[(&str, &str)] = &[
    ("Ethan Hawthorne", "Pancake with Lemons"),
    ("Olivia Sinclair", "Pancake with Lemons"),
    ("Marcus Delacroix", "Alpha-Centauri Adventures"),
    ("Sophia Chen", "Alpha-Centauri Adventures"),
    ("Gabriel Rossi", "Barking Dogs"),
    ("Amelia Blackwood", "Barking Dogs"),
];

/// Build the demo cast in memory.
pub fn demo_cast() -> Result<Cast> {
    let mut cast = Cast::new();
    for (title, (y, m, d)) in MOVIES {
        let date = NaiveDate::from_ymd_opt(*y, *m, *d)
            .ok_or_else(|| MovieragError::InvalidInput(format!("bad date for {}", title)))?;
        cast.add_movie(Movie::new(*title, date));
    }
    for (actor, title) in APPEARANCES {
        cast.add_actor(Actor::new(*actor));
        cast.link(actor, title)?;
    }
    Ok(cast)
}

/// Replace the store contents with the demo cast.
pub async fn load(graph: &SqliteMovieGraph) -> Result<()> {
    let cast = demo_cast()?;
    graph.replace_cast(&cast).await?;
    log::info!(
        "Seeded {} movies, {} actors",
        cast.movies().count(),
        cast.actors().count()
    );
    Ok(())
}
