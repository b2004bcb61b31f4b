/// Candidate scoring — the sum of independently capped terms.

use rustc_hash::FxHashSet;

use crate::core::config::EngineConfig;
use crate::schema::history::HistoryState;
use crate::schema::motif::MotifEntry;
use crate::schema::request::SelectionRequest;

/// Per-term contributions to a candidate's score.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub outcome: f32,
    pub phase: f32,
    pub relationship: f32,
    pub recency: f32,
    pub usage: f32,
    pub rotation: f32,
    pub synergy: f32,
}

impl ScoreBreakdown {
    /// Sum of all terms, clamped to be non-negative.
    pub fn total(&self) -> f32 {
        let sum = self.outcome
            + self.phase
            + self.relationship
            + self.recency
            + self.usage
            + self.rotation
            + self.synergy;
        sum.max(0.0)
    }
}

/// Scores candidates for a request against the listener's history.
pub struct Scorer<'a> {
    config: &'a EngineConfig,
}

impl<'a> Scorer<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    pub fn score(
        &self,
        candidate: &MotifEntry,
        req: &SelectionRequest,
        hist: &HistoryState,
        already_selected: &[&MotifEntry],
    ) -> f32 {
        self.breakdown(candidate, req, hist, already_selected).total()
    }

    pub fn breakdown(
        &self,
        candidate: &MotifEntry,
        req: &SelectionRequest,
        hist: &HistoryState,
        already_selected: &[&MotifEntry],
    ) -> ScoreBreakdown {
        ScoreBreakdown {
            outcome: self.outcome_term(candidate, &req.outcome),
            phase: self.phase_term(candidate, &req.journey_phases),
            relationship: if req.prefer_recurring {
                self.relationship_term(candidate, hist)
            } else {
                0.0
            },
            recency: self.recency_term(candidate, hist),
            usage: self.usage_term(candidate, hist),
            rotation: self.rotation_term(candidate, hist),
            synergy: self.synergy_term(candidate, already_selected),
        }
    }

    /// True if the candidate serves the outcome directly or through a
    /// related outcome.
    pub fn matches_outcome(&self, candidate: &MotifEntry, outcome: &str) -> bool {
        self.outcome_term(candidate, outcome) > 0.0
    }

    fn outcome_term(&self, candidate: &MotifEntry, outcome: &str) -> f32 {
        if candidate.supports_outcome(outcome) {
            return self.config.weights.outcome_match;
        }
        let related = candidate
            .outcome_alignment
            .iter()
            .any(|aligned| self.config.outcomes_related(outcome, aligned));
        if related {
            self.config.weights.related_outcome
        } else {
            0.0
        }
    }

    fn phase_term(&self, candidate: &MotifEntry, phases: &[String]) -> f32 {
        let requested: FxHashSet<&String> = phases.iter().collect();
        if requested.is_empty() {
            return 0.0;
        }
        let overlap = candidate.phase_overlap(requested.iter().copied());
        self.config.weights.phase_overlap * overlap as f32 / requested.len() as f32
    }

    fn relationship_term(&self, candidate: &MotifEntry, hist: &HistoryState) -> f32 {
        let level = self
            .config
            .thresholds
            .level(hist.total_encounters(&candidate.id));
        match level {
            2 | 3 => self.config.weights.familiar_bonus,
            4 => self.config.weights.mastered_bonus,
            _ => 0.0,
        }
    }

    fn recency_term(&self, candidate: &MotifEntry, hist: &HistoryState) -> f32 {
        let window = self.config.cooldown_window;
        match hist.cooldowns.sessions_since_use(&candidate.id) {
            Some(since) if since < window => {
                -self.config.weights.recency_penalty * (1.0 - since as f32 / window as f32)
            }
            _ => 0.0,
        }
    }

    fn usage_term(&self, candidate: &MotifEntry, hist: &HistoryState) -> f32 {
        let uses = hist.total_encounters(&candidate.id);
        if uses == 0 {
            self.config.weights.novelty_bonus
        } else if uses > self.config.repetition_ceiling {
            -self.config.weights.overuse_penalty
        } else {
            0.0
        }
    }

    fn rotation_term(&self, candidate: &MotifEntry, hist: &HistoryState) -> f32 {
        let penalty = self.config.weights.family_rotation_penalty;
        if penalty > 0.0
            && hist
                .cooldowns
                .last_session_families()
                .iter()
                .any(|f| f == &candidate.family)
        {
            -penalty
        } else {
            0.0
        }
    }

    /// Synergy bonus (capped) and conflict penalty against the current picks.
    pub fn synergy_term(&self, candidate: &MotifEntry, already_selected: &[&MotifEntry]) -> f32 {
        let weights = &self.config.weights;
        let mut bonus = 0.0;
        let mut penalty = 0.0;
        for selected in already_selected {
            if candidate.synergies.contains(&selected.id) {
                bonus += weights.synergy_bonus;
            }
            if candidate.conflicts.contains(&selected.id) {
                penalty += weights.conflict_penalty;
            }
        }
        f32::min(bonus, weights.synergy_cap) - penalty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::updater::HistoryUpdater;
    use crate::schema::history::SessionStamp;

    fn elder() -> MotifEntry {
        MotifEntry::new("guide.elder", "The Elder", "guide")
            .with_outcome("healing")
            .with_phase("journey")
            .with_phase("return")
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    fn used_in_sessions(config: &EngineConfig, id: &str, family: &str, n: usize) -> HistoryState {
        let updater = HistoryUpdater::new(config);
        let mut hist = HistoryState::default();
        for i in 0..n {
            hist = updater.apply(
                hist,
                &SessionStamp::now(format!("s{}", i)),
                &[(id.to_string(), family.to_string())],
            );
        }
        hist
    }

    #[test]
    fn outcome_and_phase_terms() {
        let config = EngineConfig::default();
        let scorer = Scorer::new(&config);
        let req = SelectionRequest::new("healing", 3).with_phases(&["journey", "induction"]);
        let b = scorer.breakdown(&elder(), &req, &HistoryState::default(), &[]);
        assert!(approx(b.outcome, 1.0));
        assert!(approx(b.phase, 0.15));
        assert!(approx(b.usage, 0.1));
        assert!(approx(b.total(), 1.25));
    }

    #[test]
    fn related_outcome_partial_credit() {
        let config = EngineConfig::archetypes();
        let scorer = Scorer::new(&config);
        let req = SelectionRequest::new("relaxation", 3);
        let b = scorer.breakdown(&elder(), &req, &HistoryState::default(), &[]);
        assert!(approx(b.outcome, 0.4));
        assert!(scorer.matches_outcome(&elder(), "relaxation"));
        assert!(!scorer.matches_outcome(&elder(), "confidence"));
    }

    #[test]
    fn duplicate_requested_phases_count_once() {
        let config = EngineConfig::default();
        let scorer = Scorer::new(&config);
        let req = SelectionRequest::new("healing", 3).with_phases(&["journey", "journey"]);
        let b = scorer.breakdown(&elder(), &req, &HistoryState::default(), &[]);
        assert!(approx(b.phase, 0.3));
    }

    #[test]
    fn recent_use_scores_lower_than_unused() {
        let config = EngineConfig::default();
        let scorer = Scorer::new(&config);
        let used = elder();
        let fresh = MotifEntry::new("guide.twin", "The Twin", "guide")
            .with_outcome("healing")
            .with_phase("journey")
            .with_phase("return");
        let hist = used_in_sessions(&config, "guide.elder", "guide", 3);
        let req = SelectionRequest::new("healing", 3).with_phases(&["journey"]);

        let used_score = scorer.score(&used, &req, &hist, &[]);
        let fresh_score = scorer.score(&fresh, &req, &hist, &[]);
        assert!(
            used_score < fresh_score,
            "recently used {} should be below unused {}",
            used_score,
            fresh_score
        );
        assert!(approx(
            scorer.breakdown(&used, &req, &hist, &[]).recency,
            -0.15
        ));
    }

    #[test]
    fn recency_penalty_decays_over_window() {
        let config = EngineConfig::default();
        let scorer = Scorer::new(&config);
        let mut hist = HistoryState::default();
        let req = SelectionRequest::new("healing", 3);

        hist.cooldowns
            .sessions_since_use
            .insert("guide.elder".to_string(), 1);
        let one = scorer.breakdown(&elder(), &req, &hist, &[]).recency;
        hist.cooldowns
            .sessions_since_use
            .insert("guide.elder".to_string(), 2);
        let two = scorer.breakdown(&elder(), &req, &hist, &[]).recency;
        hist.cooldowns
            .sessions_since_use
            .insert("guide.elder".to_string(), 3);
        let three = scorer.breakdown(&elder(), &req, &hist, &[]).recency;

        assert!(approx(one, -0.1));
        assert!(approx(two, -0.05));
        assert_eq!(three, 0.0);
    }

    #[test]
    fn relationship_bonus_only_when_preferred() {
        let config = EngineConfig::default();
        let scorer = Scorer::new(&config);
        let hist = used_in_sessions(&config, "guide.elder", "guide", 2);

        let preferred = SelectionRequest::new("healing", 3);
        let b = scorer.breakdown(&elder(), &preferred, &hist, &[]);
        assert!(approx(b.relationship, 0.2));

        let not_preferred = SelectionRequest::new("healing", 3).prefer_recurring(false);
        let b = scorer.breakdown(&elder(), &not_preferred, &hist, &[]);
        assert_eq!(b.relationship, 0.0);
    }

    #[test]
    fn mastered_and_overused() {
        let config = EngineConfig::default();
        let scorer = Scorer::new(&config);
        let hist = used_in_sessions(&config, "guide.elder", "guide", 7);
        let req = SelectionRequest::new("healing", 3);
        let b = scorer.breakdown(&elder(), &req, &hist, &[]);
        assert!(approx(b.relationship, 0.1));
        assert!(approx(b.usage, -0.2));
    }

    #[test]
    fn synergy_and_conflict_against_selection() {
        let config = EngineConfig::default();
        let scorer = Scorer::new(&config);
        let forest = MotifEntry::new("nature.forest", "Old Forest", "nature");
        let river = MotifEntry::new("nature.river", "River", "nature");
        let storm = MotifEntry::new("nature.storm", "Storm", "nature");
        let candidate = elder()
            .with_synergy("nature.forest")
            .with_synergy("nature.river")
            .with_synergy("nature.storm")
            .with_conflict("nature.storm");

        assert_eq!(scorer.synergy_term(&candidate, &[]), 0.0);
        assert!(approx(scorer.synergy_term(&candidate, &[&forest]), 0.2));
        // bonus capped at 0.4, conflict subtracts in full
        assert!(approx(
            scorer.synergy_term(&candidate, &[&forest, &river, &storm]),
            -0.1
        ));
    }

    #[test]
    fn score_never_negative() {
        let config = EngineConfig::default();
        let scorer = Scorer::new(&config);
        let rival = MotifEntry::new("shadow.double", "The Double", "shadow");
        let candidate = MotifEntry::new("guide.elder", "The Elder", "guide")
            .with_conflict("shadow.double");
        let hist = used_in_sessions(&config, "guide.elder", "guide", 8);
        let req = SelectionRequest::new("sleep", 3);
        assert_eq!(scorer.score(&candidate, &req, &hist, &[&rival]), 0.0);
    }

    #[test]
    fn rotation_penalty_when_enabled() {
        let config = EngineConfig::anchors();
        let scorer = Scorer::new(&config);
        let hist = used_in_sessions(&config, "breath.box", "breath", 1);
        let wave = MotifEntry::new("breath.wave", "Wave", "breath");
        let req = SelectionRequest::new("sleep", 3);
        let b = scorer.breakdown(&wave, &req, &hist, &[]);
        assert!(approx(b.rotation, -0.05));

        let default_config = EngineConfig::default();
        let b = Scorer::new(&default_config).breakdown(&wave, &req, &hist, &[]);
        assert_eq!(b.rotation, 0.0);
    }
}
