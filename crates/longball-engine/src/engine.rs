// Matchup engine: provider seams, single-pair evaluation and parallel
// lineup evaluation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, ResultCache};
use crate::config::{EngineConfig, ValidationError};
use crate::model::{
    ArsenalProfile, ContactProfile, GameLogEntry, PlayerIdentity, PlayerKey,
    PlayerSeasonAggregate, PriorSeasonStats, YearlyMetrics,
};
use crate::report::{DataQuality, MatchupDetails, MatchupScoreResult};
use crate::scoring::arsenal::{analyze_arsenal, arsenal_score};
use crate::scoring::composite::{
    batter_overall, composite_score, contextual_component, historical_component, iso_trend,
    outcome_probabilities, pitcher_overall, recent_component, ComponentScores,
};
use crate::scoring::game_log::analyze_game_log;
use crate::scoring::signals::evaluate_signals;
use crate::scoring::trends::{
    analyze_yearly_trends, historical_bonus, recent_bonus, recent_form, HISTORICAL_METRICS,
};

// ---------------------------------------------------------------------------
// Provider traits
// ---------------------------------------------------------------------------

/// Season-level batting data keyed by player.
pub trait SeasonDataProvider {
    /// Game log in ascending date order.
    fn game_log(&self, player: &PlayerKey) -> Option<&[GameLogEntry]>;
    fn prior_season(&self, player: &PlayerKey) -> Option<&PriorSeasonStats>;
    fn yearly_metrics(&self, player: &PlayerKey) -> Option<&YearlyMetrics>;
}

/// Pitch-type tables and batted-ball quality.
pub trait ArsenalProvider {
    /// The batter's results against each pitch type.
    fn batter_arsenal(&self, batter: &PlayerKey) -> Option<&ArsenalProfile>;
    /// The pitcher's usage and allowed results per pitch type.
    fn pitcher_arsenal(&self, pitcher: &PlayerKey) -> Option<&ArsenalProfile>;
    fn batter_contact(&self, batter: &PlayerKey) -> Option<&ContactProfile>;
    fn pitcher_contact(&self, pitcher: &PlayerKey) -> Option<&ContactProfile>;
}

pub trait RosterProvider {
    fn identity(&self, player: &PlayerKey) -> Option<&PlayerIdentity>;
    /// Non-pitchers rostered for `team`, in a stable order.
    fn team_batters(&self, team: &str) -> Vec<PlayerKey>;
}

/// Everything the engine reads, behind one bound.
pub trait MatchupData: SeasonDataProvider + ArsenalProvider + RosterProvider + Sync {}

impl<T> MatchupData for T where T: SeasonDataProvider + ArsenalProvider + RosterProvider + Sync {}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("batter {0} is unknown to every data provider")]
    UnknownBatter(PlayerKey),

    #[error("pitcher {0} is unknown to every data provider")]
    UnknownPitcher(PlayerKey),
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct MatchupEngine<D> {
    config: EngineConfig,
    data: D,
    cache: Option<ResultCache>,
}

impl<D: MatchupData> MatchupEngine<D> {
    /// Validate `config` and build an engine over `data`. A zero cache TTL
    /// turns memoization off.
    pub fn new(config: EngineConfig, data: D) -> Result<Self, ValidationError> {
        config.validate()?;
        let cache = (config.cache_ttl_secs > 0)
            .then(|| ResultCache::new(Duration::from_secs(config.cache_ttl_secs)));
        Ok(MatchupEngine {
            config,
            data,
            cache,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn cache(&self) -> Option<&ResultCache> {
        self.cache.as_ref()
    }

    /// Score one pairing. Never fails: an evaluation error degrades to a
    /// neutral result flagged `insufficient_data`.
    pub fn evaluate_matchup(
        &self,
        batter: &PlayerKey,
        pitcher: &PlayerKey,
        as_of: NaiveDate,
    ) -> MatchupScoreResult {
        let key = CacheKey::new(batter, pitcher, as_of);
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(&key)) {
            debug!(%batter, %pitcher, %as_of, "matchup cache hit");
            return (*hit).clone();
        }

        let result = match self.try_evaluate_matchup(batter, pitcher, as_of) {
            Ok(result) => result,
            Err(e) => {
                warn!(%batter, %pitcher, %as_of, "evaluation degraded to neutral: {e}");
                self.neutral_result(batter, pitcher, as_of)
            }
        };

        if let Some(cache) = &self.cache {
            cache.insert(key, Arc::new(result.clone()));
        }
        result
    }

    /// Score every batter against `pitcher` in parallel, best first. Ties
    /// go to the batter whose name sorts first.
    pub fn evaluate_lineup(
        &self,
        pitcher: &PlayerKey,
        batters: &[PlayerKey],
        as_of: NaiveDate,
    ) -> Vec<MatchupScoreResult> {
        let mut results: Vec<MatchupScoreResult> = batters
            .par_iter()
            .map(|batter| self.evaluate_matchup(batter, pitcher, as_of))
            .collect();
        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.batter.name.cmp(&b.batter.name))
        });
        info!(
            %pitcher,
            %as_of,
            batters = results.len(),
            degraded = results.iter().filter(|r| r.quality.insufficient_data).count(),
            "lineup evaluated"
        );
        results
    }

    /// Look up `team`'s batters on the roster and evaluate them.
    pub fn evaluate_team(
        &self,
        pitcher: &PlayerKey,
        team: &str,
        as_of: NaiveDate,
    ) -> Vec<MatchupScoreResult> {
        let batters = self.data.team_batters(team);
        if batters.is_empty() {
            warn!(team, "no rostered batters found");
        }
        self.evaluate_lineup(pitcher, &batters, as_of)
    }

    /// Full evaluation without the neutral fallback or the cache.
    pub fn try_evaluate_matchup(
        &self,
        batter: &PlayerKey,
        pitcher: &PlayerKey,
        as_of: NaiveDate,
    ) -> Result<MatchupScoreResult, EvaluationError> {
        if !self.knows_batter(batter) {
            return Err(EvaluationError::UnknownBatter(batter.clone()));
        }
        if !self.knows_pitcher(pitcher) {
            return Err(EvaluationError::UnknownPitcher(pitcher.clone()));
        }

        let cfg = &self.config;
        let t = &cfg.thresholds;
        let mut substitutions = Vec::new();

        let batter_id = self.data.identity(batter);
        let pitcher_hand = self.data.identity(pitcher).and_then(|p| p.throws);
        let batter_hand = match (batter_id.and_then(|b| b.bats), pitcher_hand) {
            (Some(bats), Some(throws)) => Some(bats.batting_side_against(throws)),
            (bats, _) => bats,
        };

        // Season and game log
        let log = self.data.game_log(batter).unwrap_or(&[]);
        let season = PlayerSeasonAggregate::from_game_log(
            batter,
            log.iter().filter(|e| e.date <= as_of),
        );
        let history = analyze_game_log(log, as_of, t.trailing_window_games);
        let batter_pa = season.plate_appearances_approx();
        let prior = self.data.prior_season(batter);

        // Arsenal
        let empty = ArsenalProfile::default();
        let batter_arsenal = self.data.batter_arsenal(batter);
        let pitcher_arsenal = self.data.pitcher_arsenal(pitcher);
        if batter_arsenal.is_none() {
            substitutions.push("batter.arsenal".to_string());
        }
        if pitcher_arsenal.is_none() {
            substitutions.push("pitcher.arsenal".to_string());
        }
        let arsenal = analyze_arsenal(
            batter_arsenal.unwrap_or(&empty),
            pitcher_arsenal.unwrap_or(&empty),
            &cfg.baseline,
            t.min_pitch_usage_pct,
        );
        // A missing table is already recorded as a whole.
        substitutions.extend(
            arsenal.substitution_labels(batter_arsenal.is_some(), pitcher_arsenal.is_some()),
        );
        let arsenal_sub = arsenal_score(
            &arsenal,
            &cfg.baseline,
            &cfg.ranges,
            cfg.factors.arsenal_hitter_share,
        );

        // Overall blends
        let no_contact = ContactProfile::default();
        let batter_contact = self.data.batter_contact(batter).unwrap_or(&no_contact);
        let pitcher_contact = self.data.pitcher_contact(pitcher).unwrap_or(&no_contact);
        let batter_sample = batter_contact.plate_appearances.unwrap_or(batter_pa);
        let batter_detail = batter_overall(
            batter_contact,
            season.isolated_power(),
            Some(batter_sample),
            cfg,
            &mut substitutions,
        );
        let pitcher_detail = pitcher_overall(pitcher_contact, cfg, &mut substitutions);

        // Contextual
        let signals = evaluate_signals(&season, &history, prior, &cfg.baseline, t);
        let iso = iso_trend(prior, batter_detail.adj_iso, batter_pa, cfg);
        let contextual = contextual_component(&batter_detail, &pitcher_detail, &signals, iso, cfg);

        // Trends
        let yearly = self.data.yearly_metrics(batter);
        let historical_trends = yearly
            .map(|y| analyze_yearly_trends(y, as_of.year(), HISTORICAL_METRICS))
            .unwrap_or_default();
        let hist_bonus = historical_bonus(&historical_trends);
        let rec_bonus = recent_bonus(history.trailing.as_ref());
        let form = recent_form(
            history.trailing.as_ref(),
            yearly,
            as_of.year(),
            &cfg.baseline,
            &cfg.ranges,
        );

        let components = ComponentScores {
            arsenal_matchup: arsenal_sub,
            batter_overall: batter_detail.score,
            pitcher_overall: pitcher_detail.score,
            historical_trend: historical_component(hist_bonus),
            recent_performance: recent_component(rec_bonus),
            contextual: contextual.score,
        };
        let score = composite_score(
            &components,
            &cfg.weights,
            signals.is_active,
            t.inactive_dampening,
        );
        let outcomes = outcome_probabilities(score, batter_pa, &cfg.outcomes);

        debug!(
            %batter,
            %pitcher,
            score,
            arsenal = arsenal_sub,
            contextual = contextual.score,
            active = signals.is_active,
            "matchup scored"
        );

        Ok(MatchupScoreResult {
            batter: batter.clone(),
            pitcher: pitcher.clone(),
            batter_hand,
            pitcher_hand,
            as_of,
            score,
            components,
            outcomes,
            quality: DataQuality {
                batter_pa,
                low_sample_warning: batter_pa < t.pa_warning,
                substitutions,
                insufficient_data: false,
            },
            details: MatchupDetails {
                season: Some(season),
                history: Some(history),
                signals: Some(signals),
                arsenal: Some(arsenal),
                batter_overall: Some(batter_detail),
                pitcher_overall: Some(pitcher_detail),
                contextual: Some(contextual),
                historical_trends,
                historical_bonus: hist_bonus,
                recent_bonus: rec_bonus,
                recent_form: form,
            },
        })
    }

    fn knows_batter(&self, batter: &PlayerKey) -> bool {
        self.data.identity(batter).is_some()
            || self.data.game_log(batter).is_some()
            || self.data.batter_arsenal(batter).is_some()
            || self.data.batter_contact(batter).is_some()
    }

    fn knows_pitcher(&self, pitcher: &PlayerKey) -> bool {
        self.data.identity(pitcher).is_some()
            || self.data.pitcher_arsenal(pitcher).is_some()
            || self.data.pitcher_contact(pitcher).is_some()
    }

    /// All components at 50. Damped when the batter's own log shows
    /// inactivity; an unknown batter has no log and is left undamped.
    fn neutral_result(
        &self,
        batter: &PlayerKey,
        pitcher: &PlayerKey,
        as_of: NaiveDate,
    ) -> MatchupScoreResult {
        let t = &self.config.thresholds;
        let (is_active, batter_pa) = match self.data.game_log(batter) {
            Some(log) => {
                let history = analyze_game_log(log, as_of, t.trailing_window_games);
                let active = history
                    .days_since_last_played
                    .is_some_and(|days| days <= t.inactivity_days);
                let pa = PlayerSeasonAggregate::from_game_log(
                    batter,
                    log.iter().filter(|e| e.date <= as_of),
                )
                .plate_appearances_approx();
                (active, pa)
            }
            None => (true, 0),
        };

        let components = ComponentScores::neutral();
        let score = composite_score(
            &components,
            &self.config.weights,
            is_active,
            t.inactive_dampening,
        );

        MatchupScoreResult {
            batter: batter.clone(),
            pitcher: pitcher.clone(),
            batter_hand: self.data.identity(batter).and_then(|b| b.bats),
            pitcher_hand: self.data.identity(pitcher).and_then(|p| p.throws),
            as_of,
            score,
            components,
            outcomes: outcome_probabilities(score, batter_pa, &self.config.outcomes),
            quality: DataQuality {
                batter_pa,
                low_sample_warning: batter_pa < t.pa_warning,
                substitutions: Vec::new(),
                insufficient_data: true,
            },
            details: MatchupDetails::default(),
        }
    }
}
