use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cinebridge_core::types::PrimaryKind;
use cinebridge_metadata::provider::SearchHit;
use tokio::sync::Mutex;

pub const POPULAR_TTL: Duration = Duration::from_secs(10 * 60);

/// In-memory popular lists, one per kind, each with its own expiry.
#[derive(Clone)]
pub struct PopularCache {
    inner: Arc<Mutex<HashMap<PrimaryKind, (Instant, Vec<SearchHit>)>>>,
    ttl: Duration,
}

impl Default for PopularCache {
    fn default() -> Self {
        Self::new(POPULAR_TTL)
    }
}

impl PopularCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn get(&self, kind: PrimaryKind) -> Option<Vec<SearchHit>> {
        let map = self.inner.lock().await;
        map.get(&kind)
            .filter(|(stored_at, _)| stored_at.elapsed() < self.ttl)
            .map(|(_, hits)| hits.clone())
    }

    pub async fn put(&self, kind: PrimaryKind, hits: Vec<SearchHit>) {
        self.inner.lock().await.insert(kind, (Instant::now(), hits));
    }
}
