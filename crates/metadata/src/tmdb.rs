//! TMDB (The Movie Database) client, the primary catalog.
//!
//! Uses TMDB API v3: https://developer.themoviedb.org/docs

use cinebridge_core::normalize::{is_animation_label, normalize};
use cinebridge_core::types::{CatalogRecord, PrimaryKind};
use tracing::debug;

use crate::MetadataError;
use crate::provider::{PrimaryCatalog, SearchHit};

const BASE_URL: &str = "https://api.themoviedb.org/3";
const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";

/// TMDB's fixed genre id for animation.
const ANIMATION_GENRE_ID: u64 = 16;

pub struct TmdbClient {
    api_key: String,
    language: String,
    client: reqwest::Client,
}

impl TmdbClient {
    pub fn new(api_key: String, language: String, client: reqwest::Client) -> Self {
        Self {
            api_key,
            language,
            client,
        }
    }

    async fn get_json(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, MetadataError> {
        let mut all_params = vec![
            ("api_key", self.api_key.as_str()),
            ("language", self.language.as_str()),
        ];
        all_params.extend_from_slice(params);

        let url = format!("{BASE_URL}{path}");
        debug!(url = %url, "TMDB request");

        let resp = self
            .client
            .get(&url)
            .query(&all_params)
            .send()
            .await
            .map_err(|e| MetadataError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MetadataError::NotFound);
        }

        if !resp.status().is_success() {
            return Err(MetadataError::Provider(format!(
                "TMDB returned {}",
                resp.status()
            )));
        }

        resp.json()
            .await
            .map_err(|e| MetadataError::Provider(format!("parse JSON: {e}")))
    }
}

#[async_trait::async_trait]
impl PrimaryCatalog for TmdbClient {
    fn name(&self) -> &str {
        "tmdb"
    }

    async fn get_details(
        &self,
        id: &str,
        kind: PrimaryKind,
    ) -> Result<Option<CatalogRecord>, MetadataError> {
        match self.get_json(&format!("/{kind}/{id}"), &[]).await {
            Ok(data) => Ok(parse_details(&data, kind).map(|mut record| {
                record.primary_id.get_or_insert_with(|| id.to_string());
                record
            })),
            Err(MetadataError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_external_ref(
        &self,
        id: &str,
        kind: PrimaryKind,
    ) -> Result<Option<String>, MetadataError> {
        match self.get_json(&format!("/{kind}/{id}/external_ids"), &[]).await {
            Ok(data) => Ok(parse_imdb_id(&data)),
            Err(MetadataError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn search(
        &self,
        kind: PrimaryKind,
        query: &str,
        page: u32,
    ) -> Result<Vec<SearchHit>, MetadataError> {
        let page = page.max(1).to_string();
        let data = self
            .get_json(&format!("/search/{kind}"), &[("query", query), ("page", page.as_str())])
            .await?;
        Ok(parse_listing(&data, kind))
    }

    async fn popular(&self, kind: PrimaryKind) -> Result<Vec<SearchHit>, MetadataError> {
        let data = self.get_json(&format!("/{kind}/popular"), &[]).await?;
        Ok(parse_listing(&data, kind))
    }
}

/// Movies carry `title`/`release_date`, series `name`/`first_air_date`.
fn field_names(kind: PrimaryKind) -> (&'static str, &'static str, &'static str) {
    match kind {
        PrimaryKind::Movie => ("title", "original_title", "release_date"),
        PrimaryKind::Tv => ("name", "original_name", "first_air_date"),
    }
}

fn year_of(date: Option<&str>) -> Option<i32> {
    date.and_then(|d| d.get(..4)).and_then(|y| y.parse().ok())
}

fn non_blank(value: &serde_json::Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_details(data: &serde_json::Value, kind: PrimaryKind) -> Option<CatalogRecord> {
    let (title_field, original_field, date_field) = field_names(kind);
    let title = non_blank(&data[title_field])?;

    let mut genre_hints: Vec<String> = Vec::new();
    let mut animation_by_id = false;
    if let Some(genres) = data["genres"].as_array() {
        for g in genres {
            if g["id"].as_u64() == Some(ANIMATION_GENRE_ID) {
                animation_by_id = true;
            }
            if let Some(name) = non_blank(&g["name"]) {
                genre_hints.push(name);
            }
        }
    }
    if animation_by_id && !genre_hints.iter().any(|g| is_animation_label(g)) {
        genre_hints.push("animation".to_string());
    }

    let mut record =
        CatalogRecord::new(normalize(Some(kind.native_tag()), &genre_hints));
    record.primary_id = data["id"].as_u64().map(|id| id.to_string());
    record.title = Some(title);
    record.original_title = non_blank(&data[original_field]);
    record.year = year_of(data[date_field].as_str());
    record.external_ref = data["imdb_id"]
        .as_str()
        .filter(|id| id.starts_with("tt"))
        .map(str::to_string);
    record.genre_hints = genre_hints;
    record.rating_primary = data["vote_average"].as_f64();
    Some(record)
}

fn parse_imdb_id(data: &serde_json::Value) -> Option<String> {
    data["imdb_id"]
        .as_str()
        .map(str::trim)
        .filter(|id| id.starts_with("tt"))
        .map(str::to_string)
}

fn parse_listing(data: &serde_json::Value, kind: PrimaryKind) -> Vec<SearchHit> {
    let (title_field, original_field, date_field) = field_names(kind);
    let results = data["results"].as_array().cloned().unwrap_or_default();

    results
        .iter()
        .filter_map(|r| {
            let id = r["id"].as_u64()?;
            let genre_hints: Vec<&str> = if r["genre_ids"]
                .as_array()
                .is_some_and(|ids| ids.iter().any(|g| g.as_u64() == Some(ANIMATION_GENRE_ID)))
            {
                vec!["animation"]
            } else {
                Vec::new()
            };
            Some(SearchHit {
                id: id.to_string(),
                primary_kind: kind,
                media_kind: normalize(Some(kind.native_tag()), &genre_hints),
                title: r[title_field].as_str().unwrap_or_default().to_string(),
                original_title: non_blank(&r[original_field]),
                year: year_of(r[date_field].as_str()),
                release_date: non_blank(&r[date_field]),
                rating: r["vote_average"].as_f64(),
                poster_url: r["poster_path"]
                    .as_str()
                    .map(|p| format!("{IMAGE_BASE}/w342{p}")),
                original_language: non_blank(&r["original_language"]),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinebridge_core::types::MediaKind;

    #[test]
    fn parse_movie_details_from_json() {
        let json = serde_json::json!({
            "id": 550,
            "title": "Бойцовский клуб",
            "original_title": "Fight Club",
            "release_date": "1999-10-15",
            "imdb_id": "tt0137523",
            "vote_average": 8.4,
            "genres": [
                { "id": 18, "name": "драма" }
            ]
        });

        let record = parse_details(&json, PrimaryKind::Movie).unwrap();
        assert_eq!(record.primary_id.as_deref(), Some("550"));
        assert_eq!(record.title.as_deref(), Some("Бойцовский клуб"));
        assert_eq!(record.original_title.as_deref(), Some("Fight Club"));
        assert_eq!(record.year, Some(1999));
        assert_eq!(record.media_kind, MediaKind::Film);
        assert_eq!(record.external_ref.as_deref(), Some("tt0137523"));
        assert!(!record.has_animation_hint());
    }

    #[test]
    fn animation_genre_id_marks_cartoon() {
        let json = serde_json::json!({
            "id": 862,
            "title": "История игрушек",
            "release_date": "1995-11-22",
            "genres": [ { "id": 16, "name": "Семейный" } ]
        });

        let record = parse_details(&json, PrimaryKind::Movie).unwrap();
        assert_eq!(record.media_kind, MediaKind::Cartoon);
        assert!(record.has_animation_hint());
    }

    #[test]
    fn parse_series_details_from_json() {
        let json = serde_json::json!({
            "id": 1396,
            "name": "Во все тяжкие",
            "original_name": "Breaking Bad",
            "first_air_date": "2008-01-20",
            "genres": [ { "id": 18, "name": "драма" } ]
        });

        let record = parse_details(&json, PrimaryKind::Tv).unwrap();
        assert_eq!(record.year, Some(2008));
        assert_eq!(record.media_kind, MediaKind::Series);
        assert_eq!(record.original_title.as_deref(), Some("Breaking Bad"));
    }

    #[test]
    fn details_without_title_are_rejected() {
        let json = serde_json::json!({ "id": 1, "name": "wrong kind" });
        assert!(parse_details(&json, PrimaryKind::Movie).is_none());
    }

    #[test]
    fn imdb_id_must_look_like_one() {
        assert_eq!(
            parse_imdb_id(&serde_json::json!({ "imdb_id": "tt0137523" })).as_deref(),
            Some("tt0137523")
        );
        assert!(parse_imdb_id(&serde_json::json!({ "imdb_id": "" })).is_none());
        assert!(parse_imdb_id(&serde_json::json!({ "imdb_id": null })).is_none());
        assert!(parse_imdb_id(&serde_json::json!({ "imdb_id": "nm0000093" })).is_none());
    }

    #[test]
    fn parse_tv_listing() {
        let json = serde_json::json!({
            "results": [
                {
                    "id": 1396,
                    "name": "Во все тяжкие",
                    "original_name": "Breaking Bad",
                    "first_air_date": "2008-01-20",
                    "vote_average": 8.9,
                    "poster_path": "/bb.jpg",
                    "original_language": "en",
                    "genre_ids": [18]
                },
                { "name": "no id" }
            ]
        });

        let hits = parse_listing(&json, PrimaryKind::Tv);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "1396");
        assert_eq!(hits[0].media_kind, MediaKind::Series);
        assert_eq!(hits[0].year, Some(2008));
        assert!(hits[0].poster_url.as_ref().unwrap().ends_with("/w342/bb.jpg"));
    }

    #[test]
    fn animated_movie_listing_is_cartoon() {
        let json = serde_json::json!({
            "results": [
                { "id": 862, "title": "История игрушек", "genre_ids": [16, 10751] }
            ]
        });
        let hits = parse_listing(&json, PrimaryKind::Movie);
        assert_eq!(hits[0].media_kind, MediaKind::Cartoon);
    }
}
