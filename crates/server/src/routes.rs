use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use cinebridge_core::error::ApiError;
use cinebridge_core::types::{
    CatalogRecord, MediaKind, PrimaryKind, ResolutionResult, UnresolvedReason,
};
use cinebridge_metadata::discovery::{POPULAR_LIMIT, filter_popular, merge_search_results};
use cinebridge_metadata::provider::SearchHit;
use cinebridge_playback::rewrite::ORIGIN_RELAY_PATH;
use cinebridge_playback::{RelayedAsset, RelayedDocument};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::AppError;
use crate::rate_limit::rate_limit_middleware;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/relay", get(relay))
        .route("/search", get(search))
        .merge(playback_router(&state))
        .nest("/api/v1", api_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn playback_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/stream", get(stream))
        .route("/stream-asset", get(stream_asset))
        .route("/stream-asset/origin/{*path}", get(stream_origin_asset))
        .route("/player", get(player))
        .layer(axum::middleware::from_fn(rate_limit_middleware))
        .layer(Extension(state.stream_limiter.clone()))
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/popular/{kind}", get(popular))
        .route("/watch/{kind}/{id}", get(watch))
}

fn user_agent(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
}

fn required(value: Option<String>, name: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError(ApiError::BadRequest(format!("missing {name}"))))
}

fn parse_kind(raw: &str) -> Result<PrimaryKind, AppError> {
    PrimaryKind::from_str(raw).ok_or_else(|| {
        AppError(ApiError::BadRequest(format!(
            "unknown kind {raw:?}, expected movie or tv"
        )))
    })
}

fn header_value(value: &str, fallback: &'static str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or(HeaderValue::from_static(fallback))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// ---------------------------------------------------------------------------
// Secondary catalog relay
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RelayQuery {
    path: Option<String>,
}

async fn relay(
    State(state): State<AppState>,
    Query(q): Query<RelayQuery>,
) -> Result<Json<Value>, AppError> {
    let path = required(q.path, "path")?;
    let body = state.gateway.proxy(&path).await?;
    Ok(Json(body))
}

// ---------------------------------------------------------------------------
// Playback relay
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct IdQuery {
    id: Option<String>,
}

#[derive(Deserialize)]
struct AssetQuery {
    url: Option<String>,
}

async fn stream(
    State(state): State<AppState>,
    Query(q): Query<IdQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let id = required(q.id, "id")?;
    let RelayedDocument { content_type, body } =
        state.playback.relay(&id, user_agent(&headers)).await?;

    Ok((
        [
            (header::CONTENT_TYPE, header_value(&content_type, "text/html")),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-store, no-cache, must-revalidate"),
            ),
            (header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN")),
        ],
        body,
    )
        .into_response())
}

fn asset_response(asset: RelayedAsset) -> Response {
    (
        [
            (
                header::CONTENT_TYPE,
                header_value(&asset.content_type, "application/octet-stream"),
            ),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static("public, max-age=31536000"),
            ),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
        ],
        asset.body,
    )
        .into_response()
}

async fn stream_asset(
    State(state): State<AppState>,
    Query(q): Query<AssetQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let url = required(q.url, "url")?;
    let asset = state.playback.fetch_asset(&url, user_agent(&headers)).await?;
    Ok(asset_response(asset))
}

/// Wildcard captures are percent-decoded by the router, so the path is taken from the
/// raw request URI instead and forwarded with its escapes intact.
async fn stream_origin_asset(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let path = uri
        .path()
        .strip_prefix(ORIGIN_RELAY_PATH)
        .unwrap_or_else(|| uri.path());
    let path_and_query = match uri.query() {
        Some(q) if !q.is_empty() => format!("{path}?{q}"),
        _ => path.to_string(),
    };
    let asset = state
        .playback
        .fetch_origin_asset(&path_and_query, user_agent(&headers))
        .await?;
    Ok(asset_response(asset))
}

#[derive(Serialize)]
struct PlayerResponse {
    url: String,
}

async fn player(
    State(state): State<AppState>,
    Query(q): Query<IdQuery>,
) -> Result<Response, AppError> {
    let id = required(q.id, "id")?;
    let url = state.playback.player_url(&id)?;
    Ok((
        [
            (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(PlayerResponse { url }),
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SearchQuery {
    keyword: Option<String>,
    page: Option<String>,
}

#[derive(Serialize)]
struct SearchResponse {
    items: Vec<SearchHit>,
    total: usize,
}

async fn search(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> Json<SearchResponse> {
    let empty = || {
        Json(SearchResponse {
            items: Vec::new(),
            total: 0,
        })
    };

    let Some(keyword) = q.keyword.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())
    else {
        return empty();
    };
    let Some(primary) = state.primary.as_ref() else {
        return empty();
    };
    let page = q
        .page
        .and_then(|p| p.trim().parse::<u32>().ok())
        .filter(|p| *p > 0)
        .unwrap_or(1);

    let (movies, tv) = tokio::join!(
        primary.search(PrimaryKind::Movie, &keyword, page),
        primary.search(PrimaryKind::Tv, &keyword, page),
    );
    let movies = movies.unwrap_or_else(|e| {
        warn!(keyword = %keyword, error = %e, "movie search failed");
        Vec::new()
    });
    let tv = tv.unwrap_or_else(|e| {
        warn!(keyword = %keyword, error = %e, "tv search failed");
        Vec::new()
    });

    let items = merge_search_results(movies, tv, chrono::Utc::now().date_naive());
    let total = items.len();
    Json(SearchResponse { items, total })
}

#[derive(Serialize)]
struct PopularResponse {
    items: Vec<SearchHit>,
}

async fn popular(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<PopularResponse>, AppError> {
    let kind = parse_kind(&kind)?;
    let primary = state
        .primary
        .as_ref()
        .ok_or_else(|| ApiError::ConfigurationMissing("TMDB API key".into()))?;

    if let Some(items) = state.popular.get(kind).await {
        return Ok(Json(PopularResponse { items }));
    }

    let hits = primary.popular(kind).await.map_err(|e| ApiError::BadGateway {
        message: "failed to fetch popular titles".into(),
        details: Some(e.to_string()),
    })?;
    let items = filter_popular(hits, POPULAR_LIMIT);
    state.popular.put(kind, items.clone()).await;
    info!(kind = %kind, count = items.len(), "popular list refreshed");

    Ok(Json(PopularResponse { items }))
}

// ---------------------------------------------------------------------------
// Watch
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum PlaybackInfo {
    Resolved {
        secondary_id: String,
        media_kind: MediaKind,
        stream_path: String,
    },
    Unresolved {
        reason: &'static str,
        message: String,
    },
}

impl From<ResolutionResult> for PlaybackInfo {
    fn from(result: ResolutionResult) -> Self {
        match result {
            ResolutionResult::Resolved {
                secondary_id,
                media_kind,
            } => Self::Resolved {
                stream_path: format!("/stream?id={}", urlencoding::encode(&secondary_id)),
                secondary_id,
                media_kind,
            },
            ResolutionResult::Unresolved { reason } => Self::Unresolved {
                reason: reason.as_str(),
                message: match reason {
                    UnresolvedReason::PrimaryNotFound => "title not found".to_string(),
                    UnresolvedReason::PrimaryUnavailable(detail) => {
                        format!("metadata provider unavailable: {detail}")
                    }
                    UnresolvedReason::NoMatch => {
                        "no playable version of this title was found".to_string()
                    }
                },
            },
        }
    }
}

#[derive(Serialize)]
struct WatchResponse {
    metadata: Option<CatalogRecord>,
    playback: PlaybackInfo,
}

async fn watch(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<WatchResponse>, AppError> {
    let kind = parse_kind(&kind)?;
    let id = id.trim().to_string();
    if id.is_empty() {
        return Err(ApiError::BadRequest("missing id".into()).into());
    }
    let Some(resolver) = state.resolver.as_ref() else {
        return Err(ApiError::ConfigurationMissing("TMDB API key".into()).into());
    };

    let (metadata, resolution) = resolver.resolve_with_record(&id, kind).await;

    Ok(Json(WatchResponse {
        metadata,
        playback: resolution.into(),
    }))
}
