use cinebridge_core::types::{CatalogRecord, MediaKind, PrimaryKind, ResolutionCandidate};

use crate::MetadataError;

/// The canonical metadata source (TMDB).
#[async_trait::async_trait]
pub trait PrimaryCatalog: Send + Sync {
    fn name(&self) -> &str;

    /// Full record for a title, or `None` when the id does not exist.
    async fn get_details(
        &self,
        id: &str,
        kind: PrimaryKind,
    ) -> Result<Option<CatalogRecord>, MetadataError>;

    /// Cross-provider join key (IMDb id) for a title, if the provider knows one.
    async fn get_external_ref(
        &self,
        id: &str,
        kind: PrimaryKind,
    ) -> Result<Option<String>, MetadataError>;

    /// Free-text search within one kind.
    async fn search(
        &self,
        kind: PrimaryKind,
        query: &str,
        page: u32,
    ) -> Result<Vec<SearchHit>, MetadataError>;

    /// Currently popular titles of one kind.
    async fn popular(&self, kind: PrimaryKind) -> Result<Vec<SearchHit>, MetadataError>;
}

/// The catalog used only to obtain a playback-compatible id.
#[async_trait::async_trait]
pub trait SecondaryCatalog: Send + Sync {
    fn name(&self) -> &str;

    /// Titles carrying exactly this external ref. May contain duplicates/variants.
    async fn query_by_ref(
        &self,
        external_ref: &str,
    ) -> Result<Vec<ResolutionCandidate>, MetadataError>;

    /// Free-text title match.
    async fn query_by_title(&self, title: &str)
    -> Result<Vec<ResolutionCandidate>, MetadataError>;
}

/// One row of a listing (search, popular).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub primary_kind: PrimaryKind,
    pub media_kind: MediaKind,
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<i32>,
    #[serde(skip_serializing)]
    pub release_date: Option<String>,
    pub rating: Option<f64>,
    pub poster_url: Option<String>,
    #[serde(skip_serializing)]
    pub original_language: Option<String>,
}
