//! Filter excluding movies made by the query's production company.

use crate::traits::{Candidate, Filter};
use data_loader::MovieMetadata;

/// Removes candidates whose primary company equals the query movie's.
///
/// Movies without a known company are never considered the same company.
pub struct SameCompanyFilter;

impl Filter for SameCompanyFilter {
    fn name(&self) -> &str {
        "SameCompanyFilter"
    }

    fn accepts(&self, candidate: &Candidate<'_>, query: &MovieMetadata) -> bool {
        match (&candidate.movie.primary_company, &query.primary_company) {
            (Some(candidate_company), Some(query_company)) => candidate_company != query_company,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::test_movie;

    #[test]
    fn test_same_company_filter() {
        let query = test_movie("Query", 7.0, "2000-01-01");
        let sibling = test_movie("Sibling", 7.0, "2001-01-01");
        let mut other = test_movie("Other", 7.0, "2001-01-01");
        other.primary_company = Some("Elsewhere".to_string());
        let mut unknown = test_movie("Unknown", 7.0, "2001-01-01");
        unknown.primary_company = None;

        let accepts = |movie: &MovieMetadata| {
            SameCompanyFilter.accepts(
                &Candidate {
                    index: 1,
                    movie,
                    score: 0.5,
                },
                &query,
            )
        };
        assert!(!accepts(&sibling));
        assert!(accepts(&other));
        assert!(accepts(&unknown));
    }
}
