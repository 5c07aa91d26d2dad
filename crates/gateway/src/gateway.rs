use std::sync::Arc;

use cinebridge_core::normalize::normalize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::pool::{KeyOrder, KeyPool, ShuffledOrder, redact};
use crate::upstream::Upstream;
use crate::GatewayError;

/// Proxies paths to the secondary API, rotating across the key pool.
#[derive(Clone)]
pub struct Gateway {
    pool: Arc<KeyPool>,
    upstream: Arc<dyn Upstream>,
    order: Arc<dyn KeyOrder>,
}

impl Gateway {
    pub fn new(pool: KeyPool, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            pool: Arc::new(pool),
            upstream,
            order: Arc::new(ShuffledOrder),
        }
    }

    /// Replace the key-order strategy. Quota/404 short-circuits are unaffected.
    pub fn with_order(mut self, order: Arc<dyn KeyOrder>) -> Self {
        self.order = order;
        self
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Fetch `path` (query string included) and return the parsed JSON body.
    pub async fn proxy(&self, path: &str) -> Result<Value, GatewayError> {
        if self.pool.is_empty() {
            return Err(GatewayError::NoKeysConfigured);
        }

        let order = self.order.order(self.pool.keys());
        let mut last_error: Option<String> = None;

        for key in order {
            let key_hint = redact(key);

            let resp = match self.upstream.get(path, key).await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(
                        key = %key_hint,
                        path,
                        error = %e,
                        "secondary API call failed, rotating key"
                    );
                    last_error = Some(e.to_string());
                    continue;
                }
            };

            match resp.status {
                200..=299 => match serde_json::from_str::<Value>(&resp.body) {
                    Ok(mut body) => {
                        normalize_body(&mut body);
                        debug!(key = %key_hint, path, "secondary API call succeeded");
                        return Ok(body);
                    }
                    Err(e) => {
                        warn!(
                            key = %key_hint,
                            path,
                            error = %e,
                            "secondary API returned invalid JSON"
                        );
                        last_error = Some(format!("invalid JSON: {e}"));
                    }
                },
                402 | 429 => {
                    warn!(
                        key = %key_hint,
                        path,
                        status = resp.status,
                        "secondary API quota exceeded"
                    );
                    return Err(GatewayError::QuotaExceeded {
                        details: non_empty(resp.body),
                    });
                }
                404 => {
                    debug!(key = %key_hint, path, "secondary API returned 404");
                    return Err(GatewayError::UpstreamNotFound {
                        details: non_empty(resp.body),
                    });
                }
                status => {
                    warn!(key = %key_hint, path, status, "secondary API key failed, rotating");
                    last_error = Some(match non_empty(resp.body) {
                        Some(body) => format!("upstream returned {status}: {body}"),
                        None => format!("upstream returned {status}"),
                    });
                }
            }
        }

        Err(GatewayError::UpstreamFailure(
            last_error.unwrap_or_else(|| "no upstream response".to_string()),
        ))
    }
}

fn non_empty(body: String) -> Option<String> {
    if body.trim().is_empty() { None } else { Some(body) }
}

/// Rewrite the `type` field of a title object into the shared media kind.
///
/// Only objects carrying a non-null `type` or `genres` are touched. Search
/// envelopes (`{ films: [...] }`) pass through unchanged.
pub fn normalize_body(body: &mut Value) {
    let Some(obj) = body.as_object_mut() else {
        return;
    };

    let has_type = obj.get("type").is_some_and(|t| !t.is_null());
    let has_genres = obj.get("genres").is_some_and(|g| !g.is_null());
    if !has_type && !has_genres {
        return;
    }

    let genres = genre_labels(obj.get("genres"));
    let kind = normalize(obj.get("type").and_then(Value::as_str), &genres);
    obj.insert("type".to_string(), Value::String(kind.as_str().to_string()));
}

/// Genre labels from `[{ "genre": "…" }]`, `[{ "name": "…" }]` or `["…"]`.
pub fn genre_labels(genres: Option<&Value>) -> Vec<String> {
    genres
        .and_then(Value::as_array)
        .map(|gs| {
            gs.iter()
                .filter_map(|g| {
                    g.as_str()
                        .or_else(|| g["genre"].as_str())
                        .or_else(|| g["name"].as_str())
                        .map(str::to_string)
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DeclaredOrder;
    use crate::upstream::{TransportError, UpstreamResponse};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted upstream: one canned answer per key, records every call.
    struct ScriptedUpstream {
        answers: HashMap<String, Result<UpstreamResponse, TransportError>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedUpstream {
        fn new(answers: Vec<(&str, Result<UpstreamResponse, TransportError>)>) -> Arc<Self> {
            Arc::new(Self {
                answers: answers
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Upstream for ScriptedUpstream {
        async fn get(
            &self,
            _path: &str,
            api_key: &str,
        ) -> Result<UpstreamResponse, TransportError> {
            self.calls.lock().unwrap().push(api_key.to_string());
            self.answers
                .get(api_key)
                .cloned()
                .unwrap_or_else(|| Ok(UpstreamResponse::new(500, "unscripted key")))
        }
    }

    fn ok(body: &str) -> Result<UpstreamResponse, TransportError> {
        Ok(UpstreamResponse::new(200, body))
    }

    fn status(code: u16, body: &str) -> Result<UpstreamResponse, TransportError> {
        Ok(UpstreamResponse::new(code, body))
    }

    fn gateway(keys: &str, upstream: Arc<ScriptedUpstream>) -> Gateway {
        Gateway::new(KeyPool::from_csv(keys), upstream).with_order(Arc::new(DeclaredOrder))
    }

    #[tokio::test]
    async fn empty_pool_fails_before_any_call() {
        let upstream = ScriptedUpstream::new(vec![]);
        let gw = gateway("", upstream.clone());
        let err = gw.proxy("/api/v2.2/films/301").await.unwrap_err();
        assert_eq!(err, GatewayError::NoKeysConfigured);
        assert!(upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn quota_on_first_key_stops_rotation() {
        let upstream = ScriptedUpstream::new(vec![
            ("k1", status(429, "limit reached")),
            ("k2", ok("{}")),
            ("k3", ok("{}")),
        ]);
        let gw = gateway("k1,k2,k3", upstream.clone());

        let err = gw.proxy("/api/v2.2/films/301").await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::QuotaExceeded {
                details: Some("limit reached".into())
            }
        );
        assert_eq!(upstream.calls().len(), 1);
    }

    #[tokio::test]
    async fn payment_required_counts_as_quota() {
        let upstream = ScriptedUpstream::new(vec![("k1", status(402, "")), ("k2", ok("{}"))]);
        let gw = gateway("k1,k2", upstream.clone());
        let err = gw.proxy("/x").await.unwrap_err();
        assert_eq!(err, GatewayError::QuotaExceeded { details: None });
        assert_eq!(upstream.calls(), vec!["k1"]);
    }

    #[tokio::test]
    async fn quota_stops_rotation_under_random_order() {
        let upstream = ScriptedUpstream::new(vec![
            ("k1", status(429, "")),
            ("k2", status(429, "")),
            ("k3", status(429, "")),
        ]);
        let gw = Gateway::new(KeyPool::from_csv("k1,k2,k3"), upstream.clone());
        assert!(matches!(
            gw.proxy("/x").await,
            Err(GatewayError::QuotaExceeded { .. })
        ));
        assert_eq!(upstream.calls().len(), 1);
    }

    #[tokio::test]
    async fn generic_failures_rotate_until_success() {
        let upstream = ScriptedUpstream::new(vec![
            ("k1", status(500, "boom")),
            ("k2", status(500, "boom")),
            ("k3", ok(r#"{"kinopoiskId": 361, "nameRu": "Бойцовский клуб"}"#)),
        ]);
        let gw = gateway("k1,k2,k3", upstream.clone());

        let body = gw.proxy("/api/v2.2/films/361").await.unwrap();
        assert_eq!(body["kinopoiskId"], 361);
        assert_eq!(upstream.calls(), vec!["k1", "k2", "k3"]);
    }

    #[tokio::test]
    async fn transport_errors_rotate() {
        let upstream = ScriptedUpstream::new(vec![
            ("k1", Err(TransportError("connection reset".into()))),
            ("k2", ok("[]")),
        ]);
        let gw = gateway("k1,k2", upstream.clone());
        assert_eq!(gw.proxy("/x").await.unwrap(), serde_json::json!([]));
        assert_eq!(upstream.calls().len(), 2);
    }

    #[tokio::test]
    async fn not_found_stops_rotation() {
        let upstream = ScriptedUpstream::new(vec![
            ("k1", status(404, "no such film")),
            ("k2", ok("{}")),
        ]);
        let gw = gateway("k1,k2", upstream.clone());
        let err = gw.proxy("/api/v2.2/films/0").await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::UpstreamNotFound {
                details: Some("no such film".into())
            }
        );
        assert_eq!(upstream.calls().len(), 1);
    }

    #[tokio::test]
    async fn exhausted_pool_reports_last_error() {
        let upstream = ScriptedUpstream::new(vec![
            ("k1", status(500, "first")),
            ("k2", status(503, "second")),
        ]);
        let gw = gateway("k1,k2", upstream.clone());
        let err = gw.proxy("/x").await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::UpstreamFailure("upstream returned 503: second".into())
        );
    }

    #[tokio::test]
    async fn invalid_json_on_success_rotates() {
        let upstream = ScriptedUpstream::new(vec![
            ("k1", ok("<html>oops</html>")),
            ("k2", ok(r#"{"films": []}"#)),
        ]);
        let gw = gateway("k1,k2", upstream.clone());
        let body = gw.proxy("/x").await.unwrap();
        assert_eq!(body, serde_json::json!({"films": []}));
        assert_eq!(upstream.calls().len(), 2);
    }

    #[tokio::test]
    async fn success_body_type_is_normalized() {
        let upstream = ScriptedUpstream::new(vec![(
            "k1",
            ok(r#"{"kinopoiskId": 1, "type": "FILM", "genres": [{"genre": "мультфильм"}]}"#),
        )]);
        let gw = gateway("k1", upstream);
        let body = gw.proxy("/api/v2.2/films/1").await.unwrap();
        assert_eq!(body["type"], "cartoon");
    }

    #[test]
    fn normalize_body_maps_native_types() {
        let mut body = serde_json::json!({ "type": "TV_SERIES", "genres": [] });
        normalize_body(&mut body);
        assert_eq!(body["type"], "series");

        let mut body = serde_json::json!({ "genres": [{ "genre": "драма" }] });
        normalize_body(&mut body);
        assert_eq!(body["type"], "film");
    }

    #[test]
    fn normalize_body_leaves_envelopes_alone() {
        let mut body = serde_json::json!({ "films": [{ "type": "TV_SERIES" }], "type": null });
        let before = body.clone();
        normalize_body(&mut body);
        assert_eq!(body, before);

        let mut arr = serde_json::json!([{ "type": "TV_SERIES" }]);
        let before = arr.clone();
        normalize_body(&mut arr);
        assert_eq!(arr, before);
    }

    #[test]
    fn genre_labels_accepts_several_shapes() {
        let genres =
            serde_json::json!([{ "genre": "аниме" }, { "name": "Drama" }, "комедия", 7]);
        assert_eq!(genre_labels(Some(&genres)), vec!["аниме", "Drama", "комедия"]);
        assert!(genre_labels(None).is_empty());
    }
}
