//! Candidate scoring for cross-provider matching.
//!
//! Type agreement dominates, then year proximity, then an animation nudge.
//! Ties go to the earliest candidate.

use cinebridge_core::normalize::is_episodic_tag;
use cinebridge_core::types::{CatalogRecord, MediaKind, ResolutionCandidate};
use serde::{Deserialize, Serialize};

/// Scoring constants. Defaults reproduce the tuned production policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub type_match: i64,
    pub type_mismatch: i64,
    pub same_year: i64,
    pub adjacent_year: i64,
    pub near_year: i64,
    pub near_year_max_distance: i64,
    /// Subtracted once per year beyond `near_year_max_distance`.
    pub year_distance_penalty: i64,
    pub animation_wanted: i64,
    pub animation_unwanted: i64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            type_match: 1000,
            type_mismatch: -500,
            same_year: 80,
            adjacent_year: 60,
            near_year: 30,
            near_year_max_distance: 3,
            year_distance_penalty: 10,
            animation_wanted: 25,
            animation_unwanted: -5,
        }
    }
}

/// What the winning candidate should look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchTarget {
    pub media_kind: MediaKind,
    pub year: Option<i32>,
    pub wants_animation: bool,
}

impl MatchTarget {
    pub fn from_record(record: &CatalogRecord) -> Self {
        Self {
            media_kind: record.media_kind,
            year: record.year,
            wants_animation: record.has_animation_hint(),
        }
    }
}

/// Derive `type_matches` for every candidate: series-vs-not against the target.
pub fn mark_type_matches(candidates: &mut [ResolutionCandidate], target: MediaKind) {
    let wants_series = target == MediaKind::Series;
    for c in candidates.iter_mut() {
        let episodic = c.native_type.as_deref().is_some_and(is_episodic_tag);
        c.type_matches = episodic == wants_series;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Scorer {
    weights: ScoreWeights,
}

impl Scorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    pub fn score(&self, candidate: &ResolutionCandidate, target: &MatchTarget) -> i64 {
        let w = &self.weights;
        let mut score = if candidate.type_matches {
            w.type_match
        } else {
            w.type_mismatch
        };

        if let (Some(want), Some(got)) = (target.year, candidate.record.year) {
            let d = (i64::from(got) - i64::from(want)).abs();
            score += match d {
                0 => w.same_year,
                1 => w.adjacent_year,
                d if d <= w.near_year_max_distance => w.near_year,
                d => -w.year_distance_penalty * d,
            };
        }

        if candidate.record.has_animation_hint() {
            score += if target.wants_animation {
                w.animation_wanted
            } else {
                w.animation_unwanted
            };
        }

        score
    }

    /// Highest-scoring usable candidate. Type-matched candidates are preferred
    /// as a pool; when none match, every usable candidate competes.
    pub fn select_best<'a>(
        &self,
        candidates: &'a [ResolutionCandidate],
        target: &MatchTarget,
    ) -> Option<&'a ResolutionCandidate> {
        let usable: Vec<&ResolutionCandidate> = candidates
            .iter()
            .filter(|c| c.secondary_id().is_some())
            .collect();

        let pool: Vec<&ResolutionCandidate> = if usable.iter().any(|c| c.type_matches) {
            usable.into_iter().filter(|c| c.type_matches).collect()
        } else {
            usable
        };

        let mut best: Option<(&ResolutionCandidate, i64)> = None;
        for c in pool {
            let score = self.score(c, target);
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((c, score));
            }
        }
        best.map(|(c, _)| c)
    }
}

/// [`Scorer::select_best`] with default weights.
pub fn select_best<'a>(
    candidates: &'a [ResolutionCandidate],
    target: &MatchTarget,
) -> Option<&'a ResolutionCandidate> {
    Scorer::default().select_best(candidates, target)
}
