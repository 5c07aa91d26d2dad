use serde::{Deserialize, Serialize};

/// Shared media classification. Provider-native type strings never travel past
/// [`crate::normalize::normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Film,
    Series,
    Cartoon,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Film => "film",
            Self::Series => "series",
            Self::Cartoon => "cartoon",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The primary provider's own movie/tv split, used to address its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryKind {
    Movie,
    Tv,
}

impl PrimaryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "movie" => Some(Self::Movie),
            "tv" => Some(Self::Tv),
            _ => None,
        }
    }

    /// Native tag fed to the normalizer for records of this kind.
    pub fn native_tag(self) -> &'static str {
        match self {
            Self::Movie => "FILM",
            Self::Tv => "TV_SERIES",
        }
    }
}

impl std::fmt::Display for PrimaryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized view of one title from either provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Canonical primary-provider id. `None` for secondary-provider records
    /// that have not been linked to a primary title.
    pub primary_id: Option<String>,
    pub secondary_id: Option<String>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub year: Option<i32>,
    pub media_kind: MediaKind,
    /// Industry cross-reference (IMDb id), the join key between providers.
    pub external_ref: Option<String>,
    pub genre_hints: Vec<String>,
    pub rating_primary: Option<f64>,
    pub rating_secondary: Option<f64>,
}

impl CatalogRecord {
    pub fn new(media_kind: MediaKind) -> Self {
        Self {
            primary_id: None,
            secondary_id: None,
            title: None,
            original_title: None,
            year: None,
            media_kind,
            external_ref: None,
            genre_hints: Vec::new(),
            rating_primary: None,
            rating_secondary: None,
        }
    }

    pub fn has_animation_hint(&self) -> bool {
        crate::normalize::has_animation_marker(&self.genre_hints)
    }
}

/// A secondary-provider record considered during matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionCandidate {
    pub record: CatalogRecord,
    /// The secondary provider's own type tag, e.g. `TV_SERIES`.
    pub native_type: Option<String>,
    /// Whether `native_type` agrees with the target kind. Derived right before scoring.
    pub type_matches: bool,
}

impl ResolutionCandidate {
    pub fn new(record: CatalogRecord, native_type: Option<String>) -> Self {
        Self {
            record,
            native_type,
            type_matches: false,
        }
    }

    pub fn secondary_id(&self) -> Option<&str> {
        self.record
            .secondary_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
    }
}

/// Why a resolution ended without a secondary id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum UnresolvedReason {
    PrimaryNotFound,
    PrimaryUnavailable(String),
    NoMatch,
}

impl UnresolvedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrimaryNotFound => "primary_not_found",
            Self::PrimaryUnavailable(_) => "primary_unavailable",
            Self::NoMatch => "no_match",
        }
    }
}

impl std::fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PrimaryUnavailable(detail) => write!(f, "primary_unavailable: {detail}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Terminal outcome of the resolution pipeline. Both variants are valid results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolutionResult {
    Resolved {
        secondary_id: String,
        media_kind: MediaKind,
    },
    Unresolved {
        reason: UnresolvedReason,
    },
}

impl ResolutionResult {
    pub fn unresolved(reason: UnresolvedReason) -> Self {
        Self::Unresolved { reason }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    pub fn secondary_id(&self) -> Option<&str> {
        match self {
            Self::Resolved { secondary_id, .. } => Some(secondary_id),
            Self::Unresolved { .. } => None,
        }
    }
}
