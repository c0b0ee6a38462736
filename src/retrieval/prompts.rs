//! Fixed prompt templates. `{question}` is replaced with the user text.

pub const QUESTION_SLOT: &str = "{question}";

/// Topic gate: is the question about movies or actors?
pub const TOPIC_GATE: &str = "Does it make sense to search the movie and actor database \
and extract additional information based on the provided user query? \
It's vital for you to search the database regarding any questions \
which are associated in any way with a movie and/or actor. \
Answer only 'yes' or 'no'. \
Query: {question}";

pub const EXTRACT_TITLE: &str = "Extract movie name/title from this question: '{question}'. \
It is imperative that you return only the movie name and nothing else";

pub const CLASSIFY_OPERATION: &str = "You have access to two queries: \
1. findActorsByMovieTitle 2. countActorsInMovie. 3. other. \
Based on the question return either number 1 or 2. or 3. Question: '{question}'";

/// Schema-grounded prompt for model-written SQL.
pub const GENERATE_QUERY: &str = r#"Task: Generate an accurate SQLite SELECT statement to query a movie database.

Tables:
1. movies(title TEXT PRIMARY KEY, date_created TEXT as YYYY-MM-DD)
2. actors(name TEXT PRIMARY KEY)
3. appearances(actor_name TEXT REFERENCES actors(name), movie_title TEXT REFERENCES movies(title), relation_type TEXT = 'PLAYED_IN')

An appearance row means the actor played in the movie.

***Example usage***
Find all actors who played in a specific movie:
SELECT actor_name FROM appearances WHERE movie_title = 'Movie Title'

Find all movies an actor has played in:
SELECT m.title, m.date_created FROM movies m JOIN appearances p ON p.movie_title = m.title WHERE p.actor_name = 'Actor Name'

Find movies released in a specific year:
SELECT title FROM movies WHERE strftime('%Y', date_created) = '2023'

Find actors who have worked together in the same movie:
SELECT a1.actor_name, a2.actor_name, a1.movie_title FROM appearances a1 JOIN appearances a2 ON a1.movie_title = a2.movie_title WHERE a1.actor_name < a2.actor_name

Count the number of movies each actor has played in:
SELECT actor_name, COUNT(*) AS movie_count FROM appearances GROUP BY actor_name ORDER BY movie_count DESC

Return only the SQL statement, without explanation.

The user question is:
{question}
"#;

/// Fill the question slot of `template`.
pub fn render(template: &str, question: &str) -> String {
    template.replace(QUESTION_SLOT, question)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_embeds_question() {
        let prompt = render(EXTRACT_TITLE, "Who is in Barking Dogs?");
        assert!(prompt.contains("'Who is in Barking Dogs?'"));
        assert!(!prompt.contains(QUESTION_SLOT));
    }

    #[test]
    fn test_every_template_has_slot() {
        for template in [TOPIC_GATE, EXTRACT_TITLE, CLASSIFY_OPERATION, GENERATE_QUERY] {
            assert!(template.contains(QUESTION_SLOT));
        }
    }
}
