// Composite scoring: batter/pitcher overall blends, the contextual
// component, the weighted composite and outcome probabilities.

use serde::Serialize;

use crate::config::{ComponentWeights, EngineConfig, Metric, OutcomeModel};
use crate::model::{ContactProfile, PriorSeasonStats};
use crate::scoring::normalize::{normalize, shrink, NEUTRAL_SCORE};
use crate::scoring::signals::ContextualSignals;
use crate::scoring::trends::{HISTORICAL_BONUS_CAP, RECENT_BONUS_CAP};

/// Hitter side of the exit-velocity matchup blend.
const EV_HITTER_SHARE: f64 = 0.6;

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// The six sub-scores, each on 0-100 with 50 as neutral.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComponentScores {
    pub arsenal_matchup: f64,
    pub batter_overall: f64,
    pub pitcher_overall: f64,
    pub historical_trend: f64,
    pub recent_performance: f64,
    pub contextual: f64,
}

impl ComponentScores {
    pub fn neutral() -> Self {
        ComponentScores {
            arsenal_matchup: NEUTRAL_SCORE,
            batter_overall: NEUTRAL_SCORE,
            pitcher_overall: NEUTRAL_SCORE,
            historical_trend: NEUTRAL_SCORE,
            recent_performance: NEUTRAL_SCORE,
            contextual: NEUTRAL_SCORE,
        }
    }

    pub fn weighted_sum(&self, w: &ComponentWeights) -> f64 {
        w.arsenal_matchup * self.arsenal_matchup
            + w.batter_overall * self.batter_overall
            + w.pitcher_overall * self.pitcher_overall
            + w.historical_trend * self.historical_trend
            + w.recent_performance * self.recent_performance
            + w.contextual * self.contextual
    }
}

/// Map a symmetric bonus in `[-cap, cap]` onto 0-100 around 50.
fn bonus_to_score(bonus: f64, cap: f64) -> f64 {
    (NEUTRAL_SCORE + NEUTRAL_SCORE * bonus / cap).clamp(0.0, 100.0)
}

pub fn historical_component(bonus: f64) -> f64 {
    bonus_to_score(bonus, HISTORICAL_BONUS_CAP)
}

pub fn recent_component(bonus: f64) -> f64 {
    bonus_to_score(bonus, RECENT_BONUS_CAP)
}

/// Weighted composite clamped to 0-100, then damped when inactive.
pub fn composite_score(
    components: &ComponentScores,
    weights: &ComponentWeights,
    is_active: bool,
    inactive_dampening: f64,
) -> f64 {
    let score = components.weighted_sum(weights).clamp(0.0, 100.0);
    if is_active {
        score
    } else {
        score * inactive_dampening
    }
}

// ---------------------------------------------------------------------------
// Overall blends
// ---------------------------------------------------------------------------

/// Shrunk and normalized season rates behind the overall blends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallDetail {
    pub adj_iso: Option<f64>,
    pub adj_barrel_rate: f64,
    pub adj_hard_hit_rate: f64,
    pub norm_iso: Option<f64>,
    pub norm_barrel_rate: f64,
    pub norm_hard_hit_rate: f64,
    pub score: f64,
}

/// Value or league baseline, noting the substitution.
fn or_baseline(
    value: Option<f64>,
    baseline: f64,
    label: &str,
    substitutions: &mut Vec<String>,
) -> f64 {
    match value.filter(|v| v.is_finite()) {
        Some(v) => v,
        None => {
            substitutions.push(label.to_string());
            baseline
        }
    }
}

/// Batter overall: weighted blend of shrunk ISO, barrel and hard-hit rate.
///
/// `sample_pa` drives shrinkage; `None` leaves the rates unshrunk.
pub fn batter_overall(
    contact: &ContactProfile,
    season_iso: Option<f64>,
    sample_pa: Option<u32>,
    config: &EngineConfig,
    substitutions: &mut Vec<String>,
) -> OverallDetail {
    let b = &config.baseline;
    let k = config.thresholds.confidence_pa;
    let f = &config.factors;
    let n = sample_pa.map(f64::from);

    let iso = or_baseline(contact.iso.or(season_iso), b.iso, "batter.iso", substitutions);
    let barrel = or_baseline(contact.barrel_rate, b.barrel_rate, "batter.barrel_rate", substitutions);
    let hard_hit = or_baseline(
        contact.hard_hit_rate,
        b.hard_hit_rate,
        "batter.hard_hit_rate",
        substitutions,
    );

    let adj_iso = shrink(Some(iso), n, b.iso, k).unwrap_or(iso);
    let adj_barrel = shrink(Some(barrel), n, b.barrel_rate, k).unwrap_or(barrel);
    let adj_hard_hit = shrink(Some(hard_hit), n, b.hard_hit_rate, k).unwrap_or(hard_hit);

    let r = &config.ranges;
    let norm_iso = normalize(Some(adj_iso), Metric::Iso, r, true);
    let norm_barrel = normalize(Some(adj_barrel), Metric::BarrelRate, r, true);
    let norm_hard_hit = normalize(Some(adj_hard_hit), Metric::HardHitRate, r, true);

    let total_weight = f.batter_iso + f.batter_barrel + f.batter_hard_hit;
    let score = if total_weight > 0.0 {
        (f.batter_iso * norm_iso + f.batter_barrel * norm_barrel + f.batter_hard_hit * norm_hard_hit)
            / total_weight
    } else {
        NEUTRAL_SCORE
    };

    OverallDetail {
        adj_iso: Some(adj_iso),
        adj_barrel_rate: adj_barrel,
        adj_hard_hit_rate: adj_hard_hit,
        norm_iso: Some(norm_iso),
        norm_barrel_rate: norm_barrel,
        norm_hard_hit_rate: norm_hard_hit,
        score,
    }
}

/// Pitcher overall from allowed barrel and hard-hit rate. Higher allowed
/// rates score higher (better for the batter).
pub fn pitcher_overall(
    contact: &ContactProfile,
    config: &EngineConfig,
    substitutions: &mut Vec<String>,
) -> OverallDetail {
    let b = &config.baseline;
    let k = config.thresholds.confidence_pa;
    let f = &config.factors;
    let n = contact.plate_appearances.map(f64::from);

    let barrel = or_baseline(contact.barrel_rate, b.barrel_rate, "pitcher.barrel_rate", substitutions);
    let hard_hit = or_baseline(
        contact.hard_hit_rate,
        b.hard_hit_rate,
        "pitcher.hard_hit_rate",
        substitutions,
    );

    let adj_barrel = shrink(Some(barrel), n, b.barrel_rate, k).unwrap_or(barrel);
    let adj_hard_hit = shrink(Some(hard_hit), n, b.hard_hit_rate, k).unwrap_or(hard_hit);

    let r = &config.ranges;
    let norm_barrel = normalize(Some(adj_barrel), Metric::BarrelRate, r, true);
    let norm_hard_hit = normalize(Some(adj_hard_hit), Metric::HardHitRate, r, true);

    let total_weight = f.pitcher_barrel_allowed + f.pitcher_hard_hit_allowed;
    let score = if total_weight > 0.0 {
        (f.pitcher_barrel_allowed * norm_barrel + f.pitcher_hard_hit_allowed * norm_hard_hit)
            / total_weight
    } else {
        NEUTRAL_SCORE
    };

    OverallDetail {
        adj_iso: None,
        adj_barrel_rate: adj_barrel,
        adj_hard_hit_rate: adj_hard_hit,
        norm_iso: None,
        norm_barrel_rate: norm_barrel,
        norm_hard_hit_rate: norm_hard_hit,
        score,
    }
}

// ---------------------------------------------------------------------------
// Contextual
// ---------------------------------------------------------------------------

/// Current shrunk ISO against last season's ISO.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IsoTrend {
    pub prior_iso: f64,
    pub current_iso: f64,
    pub change: f64,
    pub raw_score: f64,
}

/// Season ISO trend, gated on enough AB last season and PA this season.
pub fn iso_trend(
    prior: Option<&PriorSeasonStats>,
    current_adj_iso: Option<f64>,
    current_pa: u32,
    config: &EngineConfig,
) -> Option<IsoTrend> {
    let t = &config.thresholds;
    let prior = prior.filter(|p| p.at_bats >= t.min_prior_ab_for_iso_trend)?;
    if current_pa < t.min_current_pa_for_iso_trend {
        return None;
    }
    let prior_iso = prior.isolated_power()?;
    let current_iso = current_adj_iso?;
    let change = current_iso - prior_iso;
    Some(IsoTrend {
        prior_iso,
        current_iso,
        change,
        raw_score: change * t.iso_trend_slope,
    })
}

/// Raw sub-signals of the contextual component and its 0-100 score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextualBreakdown {
    /// Hard-hit matchup relative to a league-average pairing, in [-50, 50].
    pub ev_matchup: f64,
    pub due_for_hr_ab: f64,
    pub due_for_hr_hits: f64,
    pub iso_trend: Option<IsoTrend>,
    pub heating_up: f64,
    pub cold_batter: f64,
    /// Factor-weighted sum of sub-signal ratios.
    pub total: f64,
    pub score: f64,
}

fn ratio_or_zero(value: f64, scale: f64) -> f64 {
    if scale.abs() < f64::EPSILON {
        0.0
    } else {
        value / scale
    }
}

pub fn contextual_component(
    batter: &OverallDetail,
    pitcher: &OverallDetail,
    signals: &ContextualSignals,
    iso: Option<IsoTrend>,
    config: &EngineConfig,
) -> ContextualBreakdown {
    let f = &config.factors;
    let t = &config.thresholds;

    let base_hh = normalize(
        Some(config.baseline.hard_hit_rate),
        Metric::HardHitRate,
        &config.ranges,
        true,
    );
    let ev_matchup = EV_HITTER_SHARE * (batter.norm_hard_hit_rate - base_hh)
        + (1.0 - EV_HITTER_SHARE) * (pitcher.norm_hard_hit_rate - base_hh);

    let iso_raw = iso.map(|i| i.raw_score).unwrap_or(0.0);

    let total = f.ev_matchup * ratio_or_zero(ev_matchup, NEUTRAL_SCORE)
        + f.due_for_hr_ab * ratio_or_zero(signals.due_for_hr_score, t.ab_due_ceiling)
        + f.due_for_hr_hits * ratio_or_zero(signals.due_for_hr_hits_score, t.hits_due_ceiling)
        + f.iso_trend * ratio_or_zero(iso_raw, 20.0)
        + f.heating_up * ratio_or_zero(signals.heating_up_score, t.heating_up_score)
        + f.cold_batter * ratio_or_zero(signals.cold_batter_score, t.cold_batter_penalty);

    ContextualBreakdown {
        ev_matchup,
        due_for_hr_ab: signals.due_for_hr_score,
        due_for_hr_hits: signals.due_for_hr_hits_score,
        iso_trend: iso,
        heating_up: signals.heating_up_score,
        cold_batter: signals.cold_batter_score,
        total,
        score: (NEUTRAL_SCORE + f.contextual_scale * total).clamp(0.0, 100.0),
    }
}

// ---------------------------------------------------------------------------
// Outcome probabilities
// ---------------------------------------------------------------------------

/// Percent-unit outcome estimates derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutcomeProbabilities {
    pub home_run: f64,
    pub hit: f64,
    pub reach_base: f64,
    pub strikeout: f64,
}

pub fn outcome_probabilities(score: f64, plate_appearances: u32, model: &OutcomeModel) -> OutcomeProbabilities {
    let f = score / 100.0;
    OutcomeProbabilities {
        home_run: model.home_run.evaluate(f, plate_appearances),
        hit: model.hit.evaluate(f, plate_appearances),
        reach_base: model.reach_base.evaluate(f, plate_appearances),
        strikeout: model.strikeout.evaluate(f, plate_appearances),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::signals::{ContactTrend, HeatLevel, HrPace, PaceSource};

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn quiet_signals() -> ContextualSignals {
        ContextualSignals {
            pace: HrPace {
                hr_per_ab: 1.0 / 45.0,
                ab_per_hr: 45.0,
                hits_per_hr: 10.0,
                source: PaceSource::Default,
            },
            due_ratio: 0.0,
            due_for_hr_score: 0.0,
            due_for_hr_hits_score: 0.0,
            contact_trend: ContactTrend::NotApplicable,
            heating_up_score: 0.0,
            cold_batter_score: 0.0,
            is_active: true,
            is_due: false,
            heat_level: HeatLevel::Normal,
        }
    }

    fn league_average_contact() -> ContactProfile {
        let b = EngineConfig::default().baseline;
        ContactProfile {
            iso: Some(b.iso),
            barrel_rate: Some(b.barrel_rate),
            hard_hit_rate: Some(b.hard_hit_rate),
            plate_appearances: Some(300),
        }
    }

    #[test]
    fn neutral_components_score_fifty() {
        let w = ComponentWeights::default();
        let score = composite_score(&ComponentScores::neutral(), &w, true, 0.3);
        assert!(approx_eq(score, 50.0, 1e-9));
    }

    #[test]
    fn inactive_is_damped() {
        let w = ComponentWeights::default();
        let active = composite_score(&ComponentScores::neutral(), &w, true, 0.3);
        let inactive = composite_score(&ComponentScores::neutral(), &w, false, 0.3);
        assert!(approx_eq(inactive, active * 0.3, 1e-12));
    }

    #[test]
    fn composite_clamps_to_range() {
        let w = ComponentWeights::default();
        let mut c = ComponentScores::neutral();
        c.arsenal_matchup = 500.0;
        assert_eq!(composite_score(&c, &w, true, 0.3), 100.0);
    }

    #[test]
    fn bonus_mapping_hits_the_ends() {
        assert_eq!(historical_component(25.0), 100.0);
        assert_eq!(historical_component(-25.0), 0.0);
        assert_eq!(historical_component(0.0), 50.0);
        assert!(approx_eq(recent_component(6.0), 60.0, 1e-9));
        assert_eq!(recent_component(-30.0), 0.0);
    }

    #[test]
    fn missing_contact_substitutes_baseline() {
        let config = EngineConfig::default();
        let mut subs = Vec::new();
        let detail = batter_overall(&ContactProfile::default(), None, Some(0), &config, &mut subs);
        assert_eq!(subs.len(), 3);
        assert!(approx_eq(detail.adj_barrel_rate, config.baseline.barrel_rate, 1e-12));
        assert!(approx_eq(detail.adj_hard_hit_rate, config.baseline.hard_hit_rate, 1e-12));
    }

    #[test]
    fn season_iso_fills_missing_contact_iso() {
        let config = EngineConfig::default();
        let mut subs = Vec::new();
        let detail = batter_overall(&ContactProfile::default(), Some(0.250), None, &config, &mut subs);
        assert!(approx_eq(detail.adj_iso.unwrap(), 0.250, 1e-12));
        assert!(!subs.iter().any(|s| s == "batter.iso"));
    }

    #[test]
    fn shrinkage_pulls_small_samples_toward_baseline() {
        let config = EngineConfig::default();
        let contact = ContactProfile {
            barrel_rate: Some(0.18),
            ..league_average_contact()
        };
        let mut subs = Vec::new();
        let small = batter_overall(&contact, None, Some(10), &config, &mut subs);
        let large = batter_overall(&contact, None, Some(600), &config, &mut subs);
        assert!(small.adj_barrel_rate < large.adj_barrel_rate);
        assert!(small.score < large.score);
    }

    #[test]
    fn pitcher_allowing_hard_contact_scores_higher() {
        let config = EngineConfig::default();
        let mut subs = Vec::new();
        let soft = ContactProfile {
            barrel_rate: Some(0.04),
            hard_hit_rate: Some(0.30),
            ..ContactProfile::default()
        };
        let hard = ContactProfile {
            barrel_rate: Some(0.12),
            hard_hit_rate: Some(0.48),
            ..ContactProfile::default()
        };
        let s = pitcher_overall(&soft, &config, &mut subs).score;
        let h = pitcher_overall(&hard, &config, &mut subs).score;
        assert!(h > s);
        assert!(subs.is_empty());
    }

    #[test]
    fn league_average_pairing_has_neutral_context() {
        let config = EngineConfig::default();
        let mut subs = Vec::new();
        let batter = batter_overall(&league_average_contact(), None, Some(300), &config, &mut subs);
        let pitcher = pitcher_overall(&league_average_contact(), &config, &mut subs);
        let ctx = contextual_component(&batter, &pitcher, &quiet_signals(), None, &config);
        assert!(approx_eq(ctx.ev_matchup, 0.0, 1e-9));
        assert!(approx_eq(ctx.score, 50.0, 1e-9));
    }

    #[test]
    fn due_signal_lifts_context() {
        let config = EngineConfig::default();
        let mut subs = Vec::new();
        let batter = batter_overall(&league_average_contact(), None, Some(300), &config, &mut subs);
        let pitcher = pitcher_overall(&league_average_contact(), &config, &mut subs);
        let mut signals = quiet_signals();
        signals.due_for_hr_score = 25.0;
        let ctx = contextual_component(&batter, &pitcher, &signals, None, &config);
        // 0.5 * 25 / 25 = 0.5 -> 50 + 20 * 0.5 = 60
        assert!(approx_eq(ctx.score, 60.0, 1e-9));
    }

    #[test]
    fn iso_trend_requires_samples() {
        let config = EngineConfig::default();
        let prior = PriorSeasonStats {
            at_bats: 400,
            avg: Some(0.250),
            slg: Some(0.450),
            ..PriorSeasonStats::default()
        };
        let trend = iso_trend(Some(&prior), Some(0.230), 100, &config).unwrap();
        assert!(approx_eq(trend.change, 0.030, 1e-9));
        assert!(approx_eq(trend.raw_score, 4.5, 1e-9));

        assert!(iso_trend(Some(&prior), Some(0.230), 10, &config).is_none());
        let thin = PriorSeasonStats { at_bats: 20, ..prior };
        assert!(iso_trend(Some(&thin), Some(0.230), 100, &config).is_none());
    }

    #[test]
    fn outcome_probabilities_are_bounded() {
        let model = OutcomeModel::default();
        for score in [0.0, 25.0, 50.0, 75.0, 100.0] {
            for pa in [0, 100, 600, 10_000] {
                let p = outcome_probabilities(score, pa, &model);
                assert!((0.5..=40.0).contains(&p.home_run));
                assert!((5.0..=60.0).contains(&p.hit));
                assert!((8.0..=70.0).contains(&p.reach_base));
                assert!((10.0..=80.0).contains(&p.strikeout));
            }
        }
    }

    #[test]
    fn strikeout_falls_as_score_rises() {
        let model = OutcomeModel::default();
        let low = outcome_probabilities(20.0, 200, &model);
        let high = outcome_probabilities(90.0, 200, &model);
        assert!(high.strikeout < low.strikeout);
        assert!(high.home_run > low.home_run);
    }
}
