//! Listing post-processing for search and popular titles.

use chrono::NaiveDate;

use crate::provider::SearchHit;

/// Original languages left out of popular listings.
pub const EXCLUDED_POPULAR_LANGUAGES: &[&str] = &["hi", "ta", "te", "ml", "kn", "bn", "mr", "pa"];

pub const POPULAR_MIN_RATING: f64 = 5.0;
pub const POPULAR_LIMIT: usize = 14;

/// Merge movie and tv search results into one list ordered by rating.
///
/// Hits without a title, or whose release date is missing, unparsable or after
/// `today`, are dropped. Unrated hits sort last; equal ratings keep input order.
pub fn merge_search_results(
    movies: Vec<SearchHit>,
    tv: Vec<SearchHit>,
    today: NaiveDate,
) -> Vec<SearchHit> {
    let mut merged: Vec<SearchHit> = movies
        .into_iter()
        .chain(tv)
        .filter(|hit| !hit.title.trim().is_empty())
        .filter(|hit| released_by(hit, today))
        .collect();

    merged.sort_by(|a, b| {
        let a = a.rating.filter(|r| !r.is_nan()).unwrap_or(f64::NEG_INFINITY);
        let b = b.rating.filter(|r| !r.is_nan()).unwrap_or(f64::NEG_INFINITY);
        b.total_cmp(&a)
    });
    merged
}

fn released_by(hit: &SearchHit, today: NaiveDate) -> bool {
    hit.release_date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .is_some_and(|date| date <= today)
}

/// Trim a provider popular list for display.
pub fn filter_popular(hits: Vec<SearchHit>, limit: usize) -> Vec<SearchHit> {
    hits.into_iter()
        .filter(|hit| {
            !hit.original_language
                .as_deref()
                .is_some_and(|lang| EXCLUDED_POPULAR_LANGUAGES.contains(&lang))
        })
        .filter(|hit| hit.rating.is_some_and(|r| r > POPULAR_MIN_RATING))
        .take(limit)
        .collect()
}
