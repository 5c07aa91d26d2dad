use std::time::Duration;

use cinebridge_core::types::ResolutionResult;
use tracing::{debug, info, warn};

/// Pipeline stages of one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    FetchPrimary,
    FetchExternalRef,
    QueryBySecondaryRef,
    FallbackTitleSearch,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FetchPrimary => "fetch_primary",
            Self::FetchExternalRef => "fetch_external_ref",
            Self::QueryBySecondaryRef => "query_by_secondary_ref",
            Self::FallbackTitleSearch => "fallback_title_search",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a stage ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Produced what the next step needs.
    Hit,
    /// Ran fine, nothing usable.
    Empty,
    /// Failed; the pipeline treats it like `Empty`.
    Failed(String),
}

/// Receives structured progress events from the resolver.
pub trait ResolutionObserver: Send + Sync {
    fn stage_entered(&self, primary_id: &str, stage: Stage);

    fn stage_exited(
        &self,
        primary_id: &str,
        stage: Stage,
        outcome: &StageOutcome,
        elapsed: Duration,
    );

    fn finished(&self, primary_id: &str, result: &ResolutionResult, elapsed: Duration);
}

/// Default observer: leveled `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ResolutionObserver for TracingObserver {
    fn stage_entered(&self, primary_id: &str, stage: Stage) {
        debug!(primary_id, stage = %stage, "resolution stage entered");
    }

    fn stage_exited(
        &self,
        primary_id: &str,
        stage: Stage,
        outcome: &StageOutcome,
        elapsed: Duration,
    ) {
        let elapsed_ms = elapsed.as_millis() as u64;
        match outcome {
            StageOutcome::Hit => {
                debug!(
                    primary_id,
                    stage = %stage,
                    elapsed_ms,
                    outcome = "hit",
                    "resolution stage exited"
                )
            }
            StageOutcome::Empty => {
                debug!(
                    primary_id,
                    stage = %stage,
                    elapsed_ms,
                    outcome = "empty",
                    "resolution stage exited"
                )
            }
            StageOutcome::Failed(error) => {
                warn!(
                    primary_id,
                    stage = %stage,
                    elapsed_ms,
                    error = %error,
                    "resolution stage failed"
                )
            }
        }
    }

    fn finished(&self, primary_id: &str, result: &ResolutionResult, elapsed: Duration) {
        let elapsed_ms = elapsed.as_millis() as u64;
        match result {
            ResolutionResult::Resolved {
                secondary_id,
                media_kind,
            } => info!(
                primary_id,
                secondary_id = %secondary_id,
                media_kind = %media_kind,
                elapsed_ms,
                "resolved secondary id"
            ),
            ResolutionResult::Unresolved { reason } => info!(
                primary_id,
                reason = %reason,
                elapsed_ms,
                "no secondary id, playback unavailable"
            ),
        }
    }
}
