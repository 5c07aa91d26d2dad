//! Cross-provider id resolution.
//!
//! primary id → primary record + external ref (concurrently) → secondary lookup
//! by ref → title fallback (localized, then original) → resolved or unresolved.
//! Stage failures never abort the pipeline; they count as "no result".

use std::sync::Arc;
use std::time::Instant;

use cinebridge_core::types::{
    CatalogRecord, PrimaryKind, ResolutionCandidate, ResolutionResult, UnresolvedReason,
};

use crate::observe::{ResolutionObserver, Stage, StageOutcome, TracingObserver};
use crate::provider::{PrimaryCatalog, SecondaryCatalog};
use crate::scorer::{MatchTarget, Scorer, mark_type_matches};

pub struct Resolver {
    primary: Arc<dyn PrimaryCatalog>,
    secondary: Arc<dyn SecondaryCatalog>,
    scorer: Scorer,
    observer: Arc<dyn ResolutionObserver>,
}

impl Resolver {
    pub fn new(primary: Arc<dyn PrimaryCatalog>, secondary: Arc<dyn SecondaryCatalog>) -> Self {
        Self {
            primary,
            secondary,
            scorer: Scorer::default(),
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_scorer(mut self, scorer: Scorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ResolutionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub async fn resolve(&self, primary_id: &str, kind: PrimaryKind) -> ResolutionResult {
        self.resolve_with_record(primary_id, kind).await.1
    }

    /// Like [`Resolver::resolve`], also handing back the primary record it fetched
    /// (`None` when the primary catalog had nothing or failed).
    pub async fn resolve_with_record(
        &self,
        primary_id: &str,
        kind: PrimaryKind,
    ) -> (Option<CatalogRecord>, ResolutionResult) {
        let started = Instant::now();
        let (record, result) = match self.fetch_record(primary_id, kind).await {
            Ok((record, external_ref)) => {
                let result = self.find_secondary(primary_id, &record, external_ref).await;
                (Some(record), result)
            }
            Err(result) => (None, result),
        };
        self.observer.finished(primary_id, &result, started.elapsed());
        (record, result)
    }

    /// Primary record plus its external ref, fetched concurrently.
    async fn fetch_record(
        &self,
        primary_id: &str,
        kind: PrimaryKind,
    ) -> Result<(CatalogRecord, Option<String>), ResolutionResult> {
        let obs = &self.observer;

        obs.stage_entered(primary_id, Stage::FetchPrimary);
        obs.stage_entered(primary_id, Stage::FetchExternalRef);
        let fetch_started = Instant::now();
        let (details, external_ref) = tokio::join!(
            self.primary.get_details(primary_id, kind),
            self.primary.get_external_ref(primary_id, kind),
        );
        let fetch_elapsed = fetch_started.elapsed();

        let record = match details {
            Ok(Some(record)) => {
                let outcome = StageOutcome::Hit;
                obs.stage_exited(primary_id, Stage::FetchPrimary, &outcome, fetch_elapsed);
                record
            }
            Ok(None) => {
                let outcome = StageOutcome::Empty;
                obs.stage_exited(primary_id, Stage::FetchPrimary, &outcome, fetch_elapsed);
                return Err(ResolutionResult::unresolved(UnresolvedReason::PrimaryNotFound));
            }
            Err(e) => {
                let detail = e.to_string();
                obs.stage_exited(
                    primary_id,
                    Stage::FetchPrimary,
                    &StageOutcome::Failed(detail.clone()),
                    fetch_elapsed,
                );
                return Err(ResolutionResult::unresolved(
                    UnresolvedReason::PrimaryUnavailable(detail),
                ));
            }
        };

        // The details payload may already carry the ref (movies expose imdb_id).
        let (external_ref, outcome) = match external_ref {
            Ok(Some(r)) => (Some(r), StageOutcome::Hit),
            Ok(None) => match record.external_ref.clone() {
                Some(r) => (Some(r), StageOutcome::Hit),
                None => (None, StageOutcome::Empty),
            },
            Err(e) => (record.external_ref.clone(), StageOutcome::Failed(e.to_string())),
        };
        obs.stage_exited(primary_id, Stage::FetchExternalRef, &outcome, fetch_elapsed);
        Ok((record, external_ref))
    }

    /// Ref lookup first, then each fallback title, stopping at the first pick.
    async fn find_secondary(
        &self,
        primary_id: &str,
        record: &CatalogRecord,
        external_ref: Option<String>,
    ) -> ResolutionResult {
        let obs = &self.observer;
        let target = MatchTarget::from_record(record);

        if let Some(external_ref) = external_ref {
            obs.stage_entered(primary_id, Stage::QueryBySecondaryRef);
            let stage_started = Instant::now();
            let (outcome, hit) = match self.secondary.query_by_ref(&external_ref).await {
                Ok(candidates) => match self.pick(candidates, &target) {
                    Some(hit) => (StageOutcome::Hit, Some(hit)),
                    None => (StageOutcome::Empty, None),
                },
                Err(e) => (StageOutcome::Failed(e.to_string()), None),
            };
            let elapsed = stage_started.elapsed();
            obs.stage_exited(primary_id, Stage::QueryBySecondaryRef, &outcome, elapsed);
            if let Some(result) = hit {
                return result;
            }
        }

        for title in fallback_titles(record) {
            obs.stage_entered(primary_id, Stage::FallbackTitleSearch);
            let stage_started = Instant::now();
            let (outcome, hit) = match self.secondary.query_by_title(&title).await {
                Ok(candidates) => match self.pick(candidates, &target) {
                    Some(hit) => (StageOutcome::Hit, Some(hit)),
                    None => (StageOutcome::Empty, None),
                },
                Err(e) => (StageOutcome::Failed(e.to_string()), None),
            };
            let elapsed = stage_started.elapsed();
            obs.stage_exited(primary_id, Stage::FallbackTitleSearch, &outcome, elapsed);
            if let Some(result) = hit {
                return result;
            }
        }

        ResolutionResult::unresolved(UnresolvedReason::NoMatch)
    }

    fn pick(
        &self,
        mut candidates: Vec<ResolutionCandidate>,
        target: &MatchTarget,
    ) -> Option<ResolutionResult> {
        mark_type_matches(&mut candidates, target.media_kind);
        let best = self.scorer.select_best(&candidates, target)?;
        Some(ResolutionResult::Resolved {
            secondary_id: best.secondary_id()?.to_string(),
            media_kind: best.record.media_kind,
        })
    }
}

/// Localized title first, then the original when it differs.
fn fallback_titles(record: &CatalogRecord) -> Vec<String> {
    let mut titles: Vec<String> = Vec::new();
    for t in [&record.title, &record.original_title].into_iter().flatten() {
        let t = t.trim();
        if t.is_empty() {
            continue;
        }
        if titles.iter().any(|seen| seen.to_lowercase() == t.to_lowercase()) {
            continue;
        }
        titles.push(t.to_string());
    }
    titles
}
