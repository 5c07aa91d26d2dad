use reqwest::Url;
use reqwest::header::{ACCEPT, CONTENT_TYPE, REFERER, USER_AGENT};
use tracing::{debug, warn};

use crate::PlaybackError;
use crate::rewrite::{RewriteRules, rewrite_document};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";
const DEFAULT_DOCUMENT_TYPE: &str = "text/html";
const DEFAULT_ASSET_TYPE: &str = "application/octet-stream";

/// Player document after URL rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayedDocument {
    pub content_type: String,
    pub body: String,
}

/// A relayed subresource, passed through byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayedAsset {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Fetches the player and its subresources on behalf of the browser.
#[derive(Clone)]
pub struct PlaybackProxy {
    client: reqwest::Client,
    player_base_url: Option<String>,
    rules: RewriteRules,
}

impl PlaybackProxy {
    pub fn new(
        client: reqwest::Client,
        player_base_url: Option<String>,
        asset_origin: Option<String>,
    ) -> Self {
        Self {
            client,
            player_base_url: player_base_url
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
            rules: RewriteRules::new(asset_origin.as_deref()),
        }
    }

    pub fn rules(&self) -> &RewriteRules {
        &self.rules
    }

    fn base_url(&self) -> Result<&str, PlaybackError> {
        self.player_base_url
            .as_deref()
            .ok_or(PlaybackError::NotConfigured("player base url"))
    }

    /// Embed URL for a secondary id: `{base}?id={id}&n=0`.
    pub fn player_url(&self, secondary_id: &str) -> Result<String, PlaybackError> {
        let base = self.base_url()?;
        let sep = if base.contains('?') { '&' } else { '?' };
        Ok(format!(
            "{base}{sep}id={}&n=0",
            urlencoding::encode(secondary_id.trim())
        ))
    }

    /// Fetch the player document and route its absolute URLs through the relay.
    pub async fn relay(
        &self,
        secondary_id: &str,
        user_agent: Option<&str>,
    ) -> Result<RelayedDocument, PlaybackError> {
        let base = self.base_url()?;
        let url = self.player_url(secondary_id)?;
        debug!(secondary_id, "relaying player document");

        let resp = self.get(&url, base, user_agent).await?;
        let content_type = content_type_of(&resp, DEFAULT_DOCUMENT_TYPE);
        let body = resp
            .text()
            .await
            .map_err(|e| PlaybackError::Network(e.to_string()))?;

        Ok(RelayedDocument {
            content_type,
            body: rewrite_document(&body, &self.rules),
        })
    }

    /// Relay one absolute http(s) subresource.
    pub async fn fetch_asset(
        &self,
        url: &str,
        user_agent: Option<&str>,
    ) -> Result<RelayedAsset, PlaybackError> {
        let parsed = parse_asset_url(url)?;
        let referer = format!("{}/", parsed.origin().ascii_serialization());
        self.fetch_bytes(parsed.as_str(), &referer, user_agent).await
    }

    /// Relay a path (with query) on the first-party asset origin. The path is used
    /// as given, percent-escapes included.
    pub async fn fetch_origin_asset(
        &self,
        path_and_query: &str,
        user_agent: Option<&str>,
    ) -> Result<RelayedAsset, PlaybackError> {
        let origin = self
            .rules
            .asset_origin
            .as_ref()
            .ok_or(PlaybackError::NotConfigured("player asset host"))?;
        let base = origin.base();
        let path = path_and_query.trim_start_matches('/');
        let url = format!("{base}/{path}");
        parse_asset_url(&url)?;
        self.fetch_bytes(&url, &format!("{base}/"), user_agent).await
    }

    async fn fetch_bytes(
        &self,
        url: &str,
        referer: &str,
        user_agent: Option<&str>,
    ) -> Result<RelayedAsset, PlaybackError> {
        let resp = self.get(url, referer, user_agent).await?;
        let content_type = content_type_of(&resp, DEFAULT_ASSET_TYPE);
        let body = resp
            .bytes()
            .await
            .map_err(|e| PlaybackError::Network(e.to_string()))?;
        Ok(RelayedAsset {
            content_type,
            body: body.to_vec(),
        })
    }

    async fn get(
        &self,
        url: &str,
        referer: &str,
        user_agent: Option<&str>,
    ) -> Result<reqwest::Response, PlaybackError> {
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent.unwrap_or(DEFAULT_USER_AGENT))
            .header(REFERER, referer)
            .header(ACCEPT, "*/*")
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "player request failed");
                PlaybackError::Network(e.to_string())
            })?;

        let status = resp.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "player returned non-success");
            return Err(PlaybackError::Upstream {
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }
}

fn parse_asset_url(raw: &str) -> Result<Url, PlaybackError> {
    let url = Url::parse(raw.trim()).map_err(|_| PlaybackError::InvalidUrl(raw.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(PlaybackError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

fn content_type_of(resp: &reqwest::Response, default: &str) -> String {
    resp.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(default)
        .to_string()
}
