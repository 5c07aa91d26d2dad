//! Absolute-URL rewriting so the player document loads everything through us.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Public path of the subresource relay.
pub const ASSET_RELAY_PATH: &str = "/stream-asset";
/// Public path prefix for the first-party asset host.
pub const ORIGIN_RELAY_PATH: &str = "/stream-asset/origin";

static ABSOLUTE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^"'\s]+"#).unwrap());

/// The player's first-party asset origin: scheme plus `host[:port]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetOrigin {
    pub scheme: &'static str,
    pub authority: String,
}

impl AssetOrigin {
    /// Accepts `cdn.player.example` (https assumed) or `http(s)://cdn.player.example[:port]`.
    /// Returns `None` for blank input, other schemes, or anything with a path.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().trim_end_matches('/');
        let (scheme, authority) = match raw.split_once("://") {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("https") => ("https", rest),
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("http") => ("http", rest),
            Some(_) => return None,
            None => ("https", raw),
        };
        if authority.is_empty() || authority.contains(['/', '?', '#', ' ']) {
            return None;
        }
        Some(Self {
            scheme,
            authority: authority.to_ascii_lowercase(),
        })
    }

    /// `scheme://authority`, without a trailing slash.
    pub fn base(&self) -> String {
        format!("{}://{}", self.scheme, self.authority)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteRules {
    /// Origin whose paths are mapped onto [`ORIGIN_RELAY_PATH`].
    pub asset_origin: Option<AssetOrigin>,
}

impl RewriteRules {
    pub fn new(asset_origin: Option<&str>) -> Self {
        Self {
            asset_origin: asset_origin.and_then(AssetOrigin::parse),
        }
    }

    fn rewrite_url(&self, url: &str) -> String {
        if let Some(origin) = &self.asset_origin {
            if let Some(rest) = strip_authority(url, &origin.authority) {
                // The match may swallow further absolute URLs in the query.
                let rest = rewrite_document(rest, self);
                return if rest.starts_with('/') {
                    format!("{ORIGIN_RELAY_PATH}{rest}")
                } else {
                    format!("{ORIGIN_RELAY_PATH}/{rest}")
                };
            }
        }
        format!("{ASSET_RELAY_PATH}?url={}", urlencoding::encode(url))
    }
}

/// Remainder of `url` after `scheme://authority`, when the authority matches.
fn strip_authority<'a>(url: &'a str, authority: &str) -> Option<&'a str> {
    let after_scheme = url.split_once("://")?.1;
    let end = after_scheme
        .find(['/', '?', '#'])
        .unwrap_or(after_scheme.len());
    let (found, rest) = after_scheme.split_at(end);
    found.eq_ignore_ascii_case(authority).then_some(rest)
}

/// Rewrite every absolute http(s) URL in `body`. Output only ever carries relative
/// relay paths, so applying it twice changes nothing.
pub fn rewrite_document(body: &str, rules: &RewriteRules) -> String {
    ABSOLUTE_URL
        .replace_all(body, |caps: &Captures<'_>| rules.rewrite_url(&caps[0]))
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> RewriteRules {
        RewriteRules::new(Some("cdn.player.test"))
    }

    #[test]
    fn external_urls_go_through_asset_relay() {
        let out = rewrite_document(
            r#"<script src="https://static.example.com/app.js?v=2"></script>"#,
            &rules(),
        );
        assert_eq!(
            out,
            r#"<script src="/stream-asset?url=https%3A%2F%2Fstatic.example.com%2Fapp.js%3Fv%3D2"></script>"#
        );
    }

    #[test]
    fn first_party_host_maps_to_origin_path() {
        let out = rewrite_document(
            "load('https://cdn.player.test/video/1.m3u8'); x='http://CDN.player.test'",
            &rules(),
        );
        assert_eq!(
            out,
            "load('/stream-asset/origin/video/1.m3u8'); x='/stream-asset/origin/'"
        );
    }

    #[test]
    fn first_party_path_keeps_its_encoding() {
        let out = rewrite_document("https://cdn.player.test/seg/a%2Fb.ts?sig=x%3Fy", &rules());
        assert_eq!(out, "/stream-asset/origin/seg/a%2Fb.ts?sig=x%3Fy");
    }

    #[test]
    fn urls_nested_in_first_party_query_are_rewritten_too() {
        let out = rewrite_document(
            "https://cdn.player.test/go?next=https://tracker.example.com/p.js",
            &rules(),
        );
        assert_eq!(
            out,
            "/stream-asset/origin/go?next=/stream-asset?url=https%3A%2F%2Ftracker.example.com%2Fp.js"
        );
    }

    #[test]
    fn lookalike_host_is_not_first_party() {
        let out = rewrite_document("https://cdn.player.test.evil.com/a", &rules());
        assert!(out.starts_with("/stream-asset?url="));
    }

    #[test]
    fn third_party_urls_mentioning_the_relay_path_are_still_relayed() {
        let out = rewrite_document("https://tracker.example.com/stream-asset.js", &rules());
        assert_eq!(
            out,
            "/stream-asset?url=https%3A%2F%2Ftracker.example.com%2Fstream-asset.js"
        );
    }

    #[test]
    fn relay_paths_are_left_alone() {
        let body = r#"<img src="/stream-asset?url=https%3A%2F%2Fa.test%2Fx.png"><script src="/stream-asset/origin/p.js"></script>"#;
        assert_eq!(rewrite_document(body, &rules()), body);
    }

    #[test]
    fn rewriting_is_idempotent() {
        let body = r#"<html>
<link href="https://fonts.example.com/css?family=Roboto">
<video src='https://cdn.player.test/v/index.m3u8'></video>
<a href=http://plain.example.org/page>x</a>
<script src="https://cdn.player.test/go?next=https://tracker.example.com/p.js"></script>
<script src="https://ads.example.com/r?to=https://cdn.player.test/x.js"></script>
</html>"#;
        for rules in [rules(), RewriteRules::default()] {
            let once = rewrite_document(body, &rules);
            let twice = rewrite_document(&once, &rules);
            assert_eq!(once, twice);
            assert!(!once.contains("https://"));
            assert!(!once.contains("http://"));
        }
    }

    #[test]
    fn text_without_urls_is_unchanged() {
        let body = "<p>nothing to see</p>";
        assert_eq!(rewrite_document(body, &rules()), body);
    }

    #[test]
    fn asset_origin_parsing() {
        assert_eq!(
            AssetOrigin::parse("CDN.player.test/"),
            Some(AssetOrigin {
                scheme: "https",
                authority: "cdn.player.test".into()
            })
        );
        let local = AssetOrigin::parse("http://127.0.0.1:8081").unwrap();
        assert_eq!(local.base(), "http://127.0.0.1:8081");

        for bad in ["", "  ", "ftp://cdn.player.test", "https://", "cdn.player.test/v"] {
            assert_eq!(AssetOrigin::parse(bad), None, "{bad}");
        }
        assert_eq!(RewriteRules::new(Some("  ")).asset_origin, None);
    }

    #[test]
    fn origin_with_port_matches_only_that_port() {
        let rules = RewriteRules::new(Some("http://127.0.0.1:8081"));
        assert_eq!(
            rewrite_document("http://127.0.0.1:8081/a.ts", &rules),
            "/stream-asset/origin/a.ts"
        );
        let other_port = rewrite_document("http://127.0.0.1:9999/a.ts", &rules);
        assert!(other_port.starts_with("/stream-asset?url="));
    }
}
