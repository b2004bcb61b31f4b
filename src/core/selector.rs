/// Motif selection — candidate pooling with logged broadening, required
/// families, bucket diversity, then a greedy synergy-aware fill.

use log::{debug, warn};
use rustc_hash::FxHashSet;
use std::cmp::Ordering;
use thiserror::Error;

use crate::core::catalog::Catalog;
use crate::core::config::EngineConfig;
use crate::core::encounter::resolve_fragment;
use crate::core::scorer::Scorer;
use crate::schema::history::HistoryState;
use crate::schema::motif::MotifEntry;
use crate::schema::request::{
    Broadening, Role, SelectedMotif, SelectionOutcome, SelectionRequest,
};

#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    #[error("insufficient candidates: {reason}")]
    InsufficientCandidates { reason: String },
}

/// A candidate with its base score (terms that do not depend on the picks).
#[derive(Debug, Clone, Copy)]
struct Candidate<'c> {
    entry: &'c MotifEntry,
    base: f32,
}

#[derive(Debug, Clone, Copy)]
struct Pick<'c> {
    entry: &'c MotifEntry,
    score: f32,
}

/// Highest score first; equal scores fall back to id order.
fn rank(a_score: f32, a: &MotifEntry, b_score: f32, b: &MotifEntry) -> Ordering {
    b_score
        .partial_cmp(&a_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.id.cmp(&b.id))
}

pub struct Selector<'a> {
    config: &'a EngineConfig,
    scorer: Scorer<'a>,
}

impl<'a> Selector<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self {
            config,
            scorer: Scorer::new(config),
        }
    }

    pub fn select(
        &self,
        catalog: &Catalog,
        req: &SelectionRequest,
        hist: &HistoryState,
    ) -> Result<SelectionOutcome, SelectionError> {
        if catalog.is_empty() {
            return Err(SelectionError::InsufficientCandidates {
                reason: "catalog is empty".to_string(),
            });
        }
        if req.count < self.config.min_count {
            return Err(SelectionError::InsufficientCandidates {
                reason: format!(
                    "requested {} motifs, minimum is {}",
                    req.count, self.config.min_count
                ),
            });
        }
        let count = req.count.min(self.config.max_count);

        // 1. Candidate pool, broadened step by step when empty.
        let (pool, broadened) = self.candidate_pool(catalog, req);

        // 2. Base scores with an empty selection.
        let mut candidates: Vec<Candidate<'_>> = pool
            .into_iter()
            .map(|entry| Candidate {
                entry,
                base: self.scorer.score(entry, req, hist, &[]),
            })
            .collect();
        candidates.sort_by(|a, b| rank(a.base, a.entry, b.base, b.entry));

        let mut picks: Vec<Pick<'_>> = Vec::with_capacity(count);

        // 3. Required families, in request order.
        if let Some(required) = &req.required_categories {
            let mut handled: FxHashSet<&str> = FxHashSet::default();
            for family in required {
                if picks.len() >= count {
                    break;
                }
                if !handled.insert(family.as_str()) {
                    continue;
                }
                match self.best_base(&candidates, &picks, |e| &e.family == family) {
                    Some(pick) => {
                        debug!("required family '{}' -> {}", family, pick.entry.id);
                        picks.push(pick);
                    }
                    None => warn!("no available candidate for required family '{}'", family),
                }
            }
        }

        // 4. At least one pick from each diversity bucket.
        for bucket in [&self.config.buckets.primary, &self.config.buckets.secondary] {
            if bucket.is_empty() || picks.len() >= count {
                continue;
            }
            let covered = picks.iter().any(|p| bucket.contains(&p.entry.family));
            if covered {
                continue;
            }
            if let Some(pick) = self.best_base(&candidates, &picks, |e| bucket.contains(&e.family))
            {
                debug!("bucket diversity -> {}", pick.entry.id);
                picks.push(pick);
            }
        }

        // 5-6. Greedy fill, re-scoring synergy against the current picks.
        let mut diversity_override_used = false;
        while picks.len() < count {
            let selected: Vec<&MotifEntry> = picks.iter().map(|p| p.entry).collect();
            let mut ranked: Vec<Pick<'_>> = candidates
                .iter()
                .filter(|c| Self::admissible(c.entry, &picks))
                .map(|c| Pick {
                    entry: c.entry,
                    score: self.scorer.score(c.entry, req, hist, &selected),
                })
                .collect();
            if ranked.is_empty() {
                break;
            }
            ranked.sort_by(|a, b| rank(a.score, a.entry, b.score, b.entry));

            let mut choice = ranked[0];
            if !diversity_override_used && Self::distinct_families(&picks) < 2 {
                let represented: FxHashSet<&str> =
                    picks.iter().map(|p| p.entry.family.as_str()).collect();
                if represented.contains(choice.entry.family.as_str()) {
                    if let Some(alt) = ranked
                        .iter()
                        .find(|p| !represented.contains(p.entry.family.as_str()))
                    {
                        debug!(
                            "diversity override: {} instead of {}",
                            alt.entry.id, choice.entry.id
                        );
                        choice = *alt;
                        diversity_override_used = true;
                    }
                }
            }

            debug!("fill -> {} ({:.3})", choice.entry.id, choice.score);
            picks.push(choice);
        }

        let partial = picks.len() < count;
        if partial {
            warn!(
                "only {} of {} requested motifs available for outcome '{}'",
                picks.len(),
                count,
                req.outcome
            );
        }

        // 7-8. Roles by position, then stage and fragment.
        let motifs = picks
            .iter()
            .enumerate()
            .map(|(index, pick)| self.finish(index, pick, hist))
            .collect();

        Ok(SelectionOutcome {
            motifs,
            requested: count,
            partial,
            broadened,
        })
    }

    fn candidate_pool<'c>(
        &self,
        catalog: &'c Catalog,
        req: &SelectionRequest,
    ) -> (Vec<&'c MotifEntry>, Vec<Broadening>) {
        let excluded: FxHashSet<&str> = req.exclude_ids.iter().map(String::as_str).collect();
        let available: Vec<&MotifEntry> = catalog
            .sorted()
            .into_iter()
            .filter(|e| !excluded.contains(e.id.as_str()))
            .collect();

        let outcome_ok = |e: &MotifEntry| self.scorer.matches_outcome(e, &req.outcome);
        let phase_ok =
            |e: &MotifEntry| req.journey_phases.is_empty() || e.phase_overlap(&req.journey_phases) > 0;

        let mut broadened = Vec::new();

        let strict: Vec<&MotifEntry> = available
            .iter()
            .copied()
            .filter(|e| outcome_ok(*e) && phase_ok(*e))
            .collect();
        if !strict.is_empty() {
            return (strict, broadened);
        }

        warn!(
            "no motifs match outcome '{}' in phases {:?}; dropping phase filter",
            req.outcome, req.journey_phases
        );
        broadened.push(Broadening::PhaseFilterDropped);
        let outcome_only: Vec<&MotifEntry> =
            available.iter().copied().filter(|e| outcome_ok(*e)).collect();
        if !outcome_only.is_empty() {
            return (outcome_only, broadened);
        }

        warn!(
            "no motifs match outcome '{}'; dropping outcome filter",
            req.outcome
        );
        broadened.push(Broadening::OutcomeFilterDropped);
        (available, broadened)
    }

    /// Best remaining candidate by base score among those matching `filter`.
    fn best_base<'c, F>(
        &self,
        candidates: &[Candidate<'c>],
        picks: &[Pick<'c>],
        filter: F,
    ) -> Option<Pick<'c>>
    where
        F: Fn(&MotifEntry) -> bool,
    {
        // candidates are already in rank order
        candidates
            .iter()
            .find(|c| filter(c.entry) && Self::admissible(c.entry, picks))
            .map(|c| Pick {
                entry: c.entry,
                score: c.base,
            })
    }

    /// Not yet picked and not in conflict with any pick.
    fn admissible(entry: &MotifEntry, picks: &[Pick<'_>]) -> bool {
        picks
            .iter()
            .all(|p| p.entry.id != entry.id && !p.entry.conflicts_with(entry))
    }

    fn distinct_families(picks: &[Pick<'_>]) -> usize {
        picks
            .iter()
            .map(|p| p.entry.family.as_str())
            .collect::<FxHashSet<_>>()
            .len()
    }

    fn finish(&self, index: usize, pick: &Pick<'_>, hist: &HistoryState) -> SelectedMotif {
        let entry = pick.entry;
        let total = hist.total_encounters(&entry.id);
        let stage = self.config.thresholds.stage(total);
        let fragment = resolve_fragment(entry, stage, total);

        SelectedMotif {
            motif_id: entry.id.clone(),
            name: entry.name.clone(),
            family: entry.family.clone(),
            role: Role::for_position(index),
            encounter_stage: fragment.stage,
            relationship_level: self.config.thresholds.level(total),
            content_fragment: fragment.content,
            score: pick.score,
            used_fallback: fragment.used_fallback,
        }
    }
}
