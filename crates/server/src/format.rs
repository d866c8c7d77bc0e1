//! Display helpers shared by every result type.
//!
//! Missing inputs never fail formatting: they render as "Unknown" or "N/A".

use data_loader::MovieMetadata;

pub const UNKNOWN: &str = "Unknown";
pub const NOT_AVAILABLE: &str = "N/A";

const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";
const OVERVIEW_CHARS: usize = 200;

/// "8.3/10", or "Unknown" without a vote average
pub fn rating(vote_average: Option<f32>) -> String {
    match vote_average {
        Some(avg) => format!("{:.1}/10", avg),
        None => UNKNOWN.to_string(),
    }
}

/// Thousands-separated count: 1234567 -> "1,234,567"
pub fn votes(count: u32) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn popularity(popularity: Option<f32>) -> String {
    match popularity {
        Some(p) => format!("{:.1}", p),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn release_date(movie: &MovieMetadata) -> String {
    movie
        .release_date
        .clone()
        .unwrap_or_else(|| UNKNOWN.to_string())
}

pub fn production(movie: &MovieMetadata) -> String {
    movie
        .primary_company
        .clone()
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// First 200 characters followed by "..." when the overview is longer
pub fn overview(overview: Option<&str>) -> String {
    let Some(text) = overview else {
        return NOT_AVAILABLE.to_string();
    };
    if text.chars().count() > OVERVIEW_CHARS {
        let head: String = text.chars().take(OVERVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

pub fn poster_url(poster_path: Option<&str>) -> Option<String> {
    poster_path.map(|path| format!("{}{}", POSTER_BASE_URL, path))
}

/// Whitespace-split title tokens joined by `+`
fn query_terms(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join("+")
}

pub fn google_search_url(title: &str) -> String {
    format!("https://www.google.com/search?q={}+movie", query_terms(title))
}

/// Title page when the IMDB id is known, IMDB search otherwise
pub fn imdb_url(imdb_id: Option<&str>, title: &str) -> String {
    match imdb_id {
        Some(id) => format!("https://www.imdb.com/title/{}", id),
        None => format!("https://www.imdb.com/find?q={}", query_terms(title)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_and_votes() {
        assert_eq!(rating(Some(8.0)), "8.0/10");
        assert_eq!(rating(Some(7.26)), "7.3/10");
        assert_eq!(rating(None), "Unknown");
        assert_eq!(votes(0), "0");
        assert_eq!(votes(999), "999");
        assert_eq!(votes(1000), "1,000");
        assert_eq!(votes(1234567), "1,234,567");
        assert_eq!(popularity(Some(12.34)), "12.3");
        assert_eq!(popularity(None), "N/A");
    }

    #[test]
    fn test_overview_truncation() {
        let long = "x".repeat(250);
        let short = overview(Some(&long));
        assert_eq!(short.chars().count(), 203);
        assert!(short.ends_with("..."));
        assert_eq!(overview(Some("Short plot")), "Short plot");
        assert_eq!(overview(None), "N/A");
    }

    #[test]
    fn test_links() {
        assert_eq!(
            google_search_url("The  Dark Knight"),
            "https://www.google.com/search?q=The+Dark+Knight+movie"
        );
        assert_eq!(
            imdb_url(Some("tt0468569"), "The Dark Knight"),
            "https://www.imdb.com/title/tt0468569"
        );
        assert_eq!(
            imdb_url(None, "The Dark Knight"),
            "https://www.imdb.com/find?q=The+Dark+Knight"
        );
        assert_eq!(
            poster_url(Some("/abc.jpg")).as_deref(),
            Some("https://image.tmdb.org/t/p/w500/abc.jpg")
        );
        assert_eq!(poster_url(None), None);
    }
}
