//! Kinopoisk-compatible secondary catalog, reached through the key-rotation gateway.

use cinebridge_core::normalize::normalize;
use cinebridge_core::types::{CatalogRecord, ResolutionCandidate};
use cinebridge_gateway::Gateway;
use cinebridge_gateway::gateway::genre_labels;
use serde_json::Value;
use tracing::debug;

use crate::MetadataError;
use crate::provider::SecondaryCatalog;

pub struct KinopoiskClient {
    gateway: Gateway,
}

impl KinopoiskClient {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }
}

#[async_trait::async_trait]
impl SecondaryCatalog for KinopoiskClient {
    fn name(&self) -> &str {
        "kinopoisk"
    }

    async fn query_by_ref(
        &self,
        external_ref: &str,
    ) -> Result<Vec<ResolutionCandidate>, MetadataError> {
        let path = format!(
            "/api/v2.2/films?imdbId={}",
            urlencoding::encode(external_ref)
        );
        let data = self.gateway.proxy(&path).await?;
        let candidates = parse_candidates(&data["items"]);
        debug!(external_ref, count = candidates.len(), "lookup by external ref");
        Ok(candidates)
    }

    async fn query_by_title(
        &self,
        title: &str,
    ) -> Result<Vec<ResolutionCandidate>, MetadataError> {
        let path = format!(
            "/api/v2.1/films/search-by-keyword?keyword={}",
            urlencoding::encode(title)
        );
        let data = self.gateway.proxy(&path).await?;
        let candidates = parse_candidates(&data["films"]);
        debug!(title, count = candidates.len(), "lookup by title");
        Ok(candidates)
    }
}

fn parse_candidates(list: &Value) -> Vec<ResolutionCandidate> {
    list.as_array()
        .map(|items| items.iter().map(parse_candidate).collect())
        .unwrap_or_default()
}

/// Ids and years arrive as numbers or strings depending on the endpoint.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn int_field(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Ratings on the keyword endpoint are strings and sometimes percentages ("85%").
fn rating_field(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text_field(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_candidate(item: &Value) -> ResolutionCandidate {
    let native_type = text_field(&item["type"]);
    let genre_hints = genre_labels(item.get("genres"));

    let mut record = CatalogRecord::new(normalize(native_type.as_deref(), &genre_hints));
    record.secondary_id = id_string(&item["kinopoiskId"]).or_else(|| id_string(&item["filmId"]));
    record.title = text_field(&item["nameRu"])
        .or_else(|| text_field(&item["nameEn"]))
        .or_else(|| text_field(&item["nameOriginal"]));
    record.original_title =
        text_field(&item["nameOriginal"]).or_else(|| text_field(&item["nameEn"]));
    record.year = int_field(&item["year"]);
    record.external_ref = text_field(&item["imdbId"]);
    record.genre_hints = genre_hints;
    record.rating_primary = rating_field(&item["ratingImdb"]);
    record.rating_secondary =
        rating_field(&item["ratingKinopoisk"]).or_else(|| rating_field(&item["rating"]));

    ResolutionCandidate::new(record, native_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinebridge_core::types::MediaKind;

    #[test]
    fn parses_items_from_imdb_lookup() {
        let data = serde_json::json!({
            "total": 1,
            "items": [{
                "kinopoiskId": 361,
                "imdbId": "tt0137523",
                "nameRu": "Бойцовский клуб",
                "nameOriginal": "Fight Club",
                "year": 1999,
                "type": "FILM",
                "ratingKinopoisk": 8.7,
                "ratingImdb": 8.8,
                "genres": [{ "genre": "триллер" }, { "genre": "драма" }]
            }]
        });

        let candidates = parse_candidates(&data["items"]);
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.secondary_id(), Some("361"));
        assert_eq!(c.native_type.as_deref(), Some("FILM"));
        assert_eq!(c.record.year, Some(1999));
        assert_eq!(c.record.media_kind, MediaKind::Film);
        assert_eq!(c.record.external_ref.as_deref(), Some("tt0137523"));
        assert_eq!(c.record.rating_secondary, Some(8.7));
        assert!(!c.type_matches);
    }

    #[test]
    fn parses_keyword_search_films() {
        let data = serde_json::json!({
            "keyword": "Во все тяжкие",
            "films": [
                {
                    "filmId": 404900,
                    "nameRu": "Во все тяжкие",
                    "nameEn": "Breaking Bad",
                    "type": "TV_SERIES",
                    "year": "2008",
                    "rating": "8.9",
                    "genres": [{ "genre": "драма" }]
                },
                {
                    "filmId": "12",
                    "nameRu": "Без года",
                    "type": "FILM",
                    "year": "2008-2013",
                    "rating": "85%",
                    "genres": [{ "genre": "мультфильм" }]
                }
            ]
        });

        let candidates = parse_candidates(&data["films"]);
        assert_eq!(candidates.len(), 2);

        assert_eq!(candidates[0].secondary_id(), Some("404900"));
        assert_eq!(candidates[0].record.year, Some(2008));
        assert_eq!(candidates[0].record.media_kind, MediaKind::Series);
        assert_eq!(candidates[0].record.original_title.as_deref(), Some("Breaking Bad"));
        assert_eq!(candidates[0].record.rating_secondary, Some(8.9));

        assert_eq!(candidates[1].secondary_id(), Some("12"));
        assert_eq!(candidates[1].record.year, None);
        assert_eq!(candidates[1].record.rating_secondary, None);
        assert_eq!(candidates[1].record.media_kind, MediaKind::Cartoon);
    }

    #[test]
    fn missing_list_yields_no_candidates() {
        assert!(parse_candidates(&serde_json::json!(null)).is_empty());
        assert!(parse_candidates(&serde_json::json!({})).is_empty());
    }

    #[test]
    fn candidate_without_id_keeps_none() {
        let c = parse_candidate(&serde_json::json!({ "nameRu": "x", "type": "FILM" }));
        assert_eq!(c.secondary_id(), None);
    }
}
