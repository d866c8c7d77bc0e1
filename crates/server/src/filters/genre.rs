//! Filter to keep only movies of the requested genres.

use crate::traits::{Candidate, Filter};
use data_loader::{MovieMetadata, normalize_token};

/// Keeps candidates sharing at least one genre with the request.
///
/// Both sides are compared lowercase with spaces removed, so
/// "Science Fiction" matches "sciencefiction".
pub struct GenreFilter {
    genres: Vec<String>,
}

impl GenreFilter {
    pub fn new<S: AsRef<str>>(genres: &[S]) -> Self {
        Self {
            genres: genres.iter().map(|g| normalize_token(g.as_ref())).collect(),
        }
    }
}

/// True when `movie_genres` and the already-normalized `wanted` overlap
pub(crate) fn genres_overlap(movie_genres: &[String], wanted: &[String]) -> bool {
    movie_genres
        .iter()
        .any(|genre| wanted.contains(&normalize_token(genre)))
}

impl Filter for GenreFilter {
    fn name(&self) -> &str {
        "GenreFilter"
    }

    fn accepts(&self, candidate: &Candidate<'_>, _query: &MovieMetadata) -> bool {
        genres_overlap(&candidate.movie.genres, &self.genres)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::test_movie;

    #[test]
    fn test_genre_filter() {
        let query = test_movie("Query", 7.0, "2000-01-01");
        let mut scifi = test_movie("Alien", 8.0, "1979-01-01");
        scifi.genres = vec!["horror".to_string(), "sciencefiction".to_string()];
        let drama = test_movie("Drama", 8.0, "1979-01-01");

        let filter = GenreFilter::new(&["Science Fiction", "Western"]);
        let accepts = |movie: &MovieMetadata| {
            filter.accepts(
                &Candidate {
                    index: 0,
                    movie,
                    score: 0.5,
                },
                &query,
            )
        };
        assert!(accepts(&scifi));
        assert!(!accepts(&drama));
    }
}
