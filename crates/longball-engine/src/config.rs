// Engine configuration: component weights, factor weights, heuristic
// thresholds, league baseline, metric ranges and outcome lines.
//
// Every table deserializes from TOML with per-field defaults, so a config
// file only needs to list the values it overrides.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Validation error
// ---------------------------------------------------------------------------

/// A configuration value that would silently bias scores if accepted.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid engine config `{field}`: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Tolerance for the component weights summing to 1.0.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Metrics and ranges
// ---------------------------------------------------------------------------

/// A metric the engine knows how to normalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Slg,
    Iso,
    HardHitRate,
    BarrelRate,
    Woba,
    KRate,
    HitRate,
    HrRate,
    Obp,
}

impl Metric {
    /// Key used in the `[ranges]` table.
    pub fn key(&self) -> &'static str {
        match self {
            Metric::Slg => "slg",
            Metric::Iso => "iso",
            Metric::HardHitRate => "hard_hit_rate",
            Metric::BarrelRate => "barrel_rate",
            Metric::Woba => "woba",
            Metric::KRate => "k_rate",
            Metric::HitRate => "hit_rate",
            Metric::HrRate => "hr_rate",
            Metric::Obp => "obp",
        }
    }
}

/// Metrics the composite score normalizes. Each needs a range.
///
/// `woba`, `k_rate`, `hit_rate`, `hr_rate` and `obp` only feed the
/// recent-form view in the result details; without a range they fall back
/// to `value * 100`.
pub const NORMALIZED_METRICS: &[Metric] = &[
    Metric::Slg,
    Metric::Iso,
    Metric::HardHitRate,
    Metric::BarrelRate,
];

/// Effective (min, max) range for linear rescaling to 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricRange {
    pub min: f64,
    pub max: f64,
}

impl MetricRange {
    pub const fn new(min: f64, max: f64) -> Self {
        MetricRange { min, max }
    }
}

/// Range table keyed by [`Metric::key`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricRanges(BTreeMap<String, MetricRange>);

impl MetricRanges {
    pub fn empty() -> Self {
        MetricRanges(BTreeMap::new())
    }

    pub fn get(&self, metric: Metric) -> Option<MetricRange> {
        self.0.get(metric.key()).copied()
    }

    pub fn set(&mut self, metric: Metric, range: MetricRange) {
        self.0.insert(metric.key().to_string(), range);
    }

    pub fn remove(&mut self, metric: Metric) -> Option<MetricRange> {
        self.0.remove(metric.key())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricRange)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Default for MetricRanges {
    fn default() -> Self {
        let mut ranges = MetricRanges::empty();
        ranges.set(Metric::Slg, MetricRange::new(0.250, 0.650));
        ranges.set(Metric::Iso, MetricRange::new(0.050, 0.350));
        ranges.set(Metric::HardHitRate, MetricRange::new(0.20, 0.60));
        ranges.set(Metric::BarrelRate, MetricRange::new(0.02, 0.20));
        ranges.set(Metric::Woba, MetricRange::new(0.1, 0.6));
        ranges.set(Metric::KRate, MetricRange::new(0.05, 0.5));
        ranges.set(Metric::HitRate, MetricRange::new(0.1, 0.5));
        ranges.set(Metric::HrRate, MetricRange::new(0.0, 0.15));
        ranges.set(Metric::Obp, MetricRange::new(0.2, 0.5));
        ranges
    }
}

// ---------------------------------------------------------------------------
// League baseline
// ---------------------------------------------------------------------------

/// League-average reference values. Used for shrinkage and as the
/// substitute for any missing player stat. `k_rate` and `bb_rate` are the
/// reference for the recent-form deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeagueBaseline {
    pub avg: f64,
    pub slg: f64,
    pub iso: f64,
    pub k_rate: f64,
    pub bb_rate: f64,
    pub hard_hit_rate: f64,
    /// Barrels per batted-ball event.
    pub barrel_rate: f64,
    /// Barrels per plate appearance. Informational only; no input carries
    /// barrels per PA, so scoring reads `barrel_rate`.
    pub barrel_pa_rate: f64,
}

impl Default for LeagueBaseline {
    fn default() -> Self {
        LeagueBaseline {
            avg: 0.245,
            slg: 0.400,
            iso: 0.155,
            k_rate: 0.22,
            bb_rate: 0.08,
            hard_hit_rate: 0.35,
            barrel_rate: 0.06,
            barrel_pa_rate: 0.035,
        }
    }
}

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

/// Weights of the six composite components. Must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentWeights {
    pub arsenal_matchup: f64,
    pub batter_overall: f64,
    pub pitcher_overall: f64,
    pub historical_trend: f64,
    pub recent_performance: f64,
    pub contextual: f64,
}

impl ComponentWeights {
    pub fn sum(&self) -> f64 {
        self.arsenal_matchup
            + self.batter_overall
            + self.pitcher_overall
            + self.historical_trend
            + self.recent_performance
            + self.contextual
    }

    fn fields(&self) -> [(&'static str, f64); 6] {
        [
            ("weights.arsenal_matchup", self.arsenal_matchup),
            ("weights.batter_overall", self.batter_overall),
            ("weights.pitcher_overall", self.pitcher_overall),
            ("weights.historical_trend", self.historical_trend),
            ("weights.recent_performance", self.recent_performance),
            ("weights.contextual", self.contextual),
        ]
    }
}

impl Default for ComponentWeights {
    fn default() -> Self {
        ComponentWeights {
            arsenal_matchup: 0.40,
            batter_overall: 0.15,
            pitcher_overall: 0.10,
            historical_trend: 0.05,
            recent_performance: 0.10,
            contextual: 0.20,
        }
    }
}

/// Weights used inside individual components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorWeights {
    pub batter_iso: f64,
    pub batter_barrel: f64,
    pub batter_hard_hit: f64,
    pub pitcher_barrel_allowed: f64,
    pub pitcher_hard_hit_allowed: f64,
    pub ev_matchup: f64,
    pub due_for_hr_ab: f64,
    pub due_for_hr_hits: f64,
    pub heating_up: f64,
    pub cold_batter: f64,
    pub iso_trend: f64,
    /// Share of the arsenal sub-score driven by the hitter side; the pitcher
    /// side gets the remainder.
    pub arsenal_hitter_share: f64,
    /// Points of contextual sub-score per unit of weighted contextual signal.
    pub contextual_scale: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        FactorWeights {
            batter_iso: 1.5,
            batter_barrel: 2.5,
            batter_hard_hit: 1.2,
            pitcher_barrel_allowed: 2.0,
            pitcher_hard_hit_allowed: 1.0,
            ev_matchup: 1.0,
            due_for_hr_ab: 0.5,
            due_for_hr_hits: 0.3,
            heating_up: 0.4,
            cold_batter: 0.4,
            iso_trend: 0.8,
            arsenal_hitter_share: 0.6,
            contextual_scale: 20.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Heuristic cut-offs and shape constants for every component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Pitch types below this usage percentage are ignored.
    pub min_pitch_usage_pct: f64,
    /// PA at which a player's own rate and the baseline carry equal weight.
    pub confidence_pa: f64,
    /// Results for batters under this PA carry a low-sample warning.
    pub pa_warning: u32,
    pub min_recent_pa_for_contact: u32,
    pub trailing_window_games: usize,

    pub min_prior_ab_for_pace: u32,
    pub min_current_ab_for_pace: u32,
    pub default_ab_per_hr: f64,
    pub default_hits_per_hr: f64,
    pub ab_deficit_multiplier: f64,
    pub ab_due_slope: f64,
    pub ab_due_ceiling: f64,
    pub hits_deficit_multiplier: f64,
    pub hits_due_slope: f64,
    pub hits_due_ceiling: f64,
    pub hot_due_ratio: f64,
    pub very_hot_due_ratio: f64,

    pub heating_up_margin: f64,
    pub cold_margin: f64,
    pub heating_up_power_fraction: f64,
    pub heating_up_score: f64,
    pub cold_batter_penalty: f64,

    pub inactivity_days: i64,
    pub inactive_dampening: f64,

    pub min_prior_ab_for_iso_trend: u32,
    pub min_current_pa_for_iso_trend: u32,
    pub iso_trend_slope: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            min_pitch_usage_pct: 5.0,
            confidence_pa: 100.0,
            pa_warning: 50,
            min_recent_pa_for_contact: 20,
            trailing_window_games: 10,

            min_prior_ab_for_pace: 50,
            min_current_ab_for_pace: 30,
            default_ab_per_hr: 45.0,
            default_hits_per_hr: 10.0,
            ab_deficit_multiplier: 1.25,
            ab_due_slope: 20.0,
            ab_due_ceiling: 25.0,
            hits_deficit_multiplier: 1.5,
            hits_due_slope: 15.0,
            hits_due_ceiling: 20.0,
            hot_due_ratio: 1.25,
            very_hot_due_ratio: 1.8,

            heating_up_margin: 0.050,
            cold_margin: 0.060,
            heating_up_power_fraction: 0.4,
            heating_up_score: 15.0,
            cold_batter_penalty: 20.0,

            inactivity_days: 10,
            inactive_dampening: 0.3,

            min_prior_ab_for_iso_trend: 30,
            min_current_pa_for_iso_trend: 15,
            iso_trend_slope: 150.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome lines
// ---------------------------------------------------------------------------

/// `clamp(intercept + score_slope * f + pa_slope * pa, floor, ceiling)`,
/// where `f` is the composite score over 100. Values are percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeLine {
    pub intercept: f64,
    pub score_slope: f64,
    pub pa_slope: f64,
    pub floor: f64,
    pub ceiling: f64,
}

impl OutcomeLine {
    pub fn evaluate(&self, score_fraction: f64, plate_appearances: u32) -> f64 {
        let raw = self.intercept
            + self.score_slope * score_fraction
            + self.pa_slope * plate_appearances as f64;
        raw.clamp(self.floor, self.ceiling)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutcomeModel {
    pub home_run: OutcomeLine,
    pub hit: OutcomeLine,
    pub reach_base: OutcomeLine,
    pub strikeout: OutcomeLine,
}

impl Default for OutcomeModel {
    fn default() -> Self {
        OutcomeModel {
            home_run: OutcomeLine {
                intercept: 0.0,
                score_slope: 10.0,
                pa_slope: 0.005,
                floor: 0.5,
                ceiling: 40.0,
            },
            hit: OutcomeLine {
                intercept: 0.0,
                score_slope: 20.0,
                pa_slope: 0.02,
                floor: 5.0,
                ceiling: 60.0,
            },
            reach_base: OutcomeLine {
                intercept: 0.0,
                score_slope: 25.0,
                pa_slope: 0.03,
                floor: 8.0,
                ceiling: 70.0,
            },
            strikeout: OutcomeLine {
                intercept: 70.0,
                score_slope: -15.0,
                pa_slope: 0.01,
                floor: 10.0,
                ceiling: 80.0,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Assembled engine config
// ---------------------------------------------------------------------------

/// Everything the engine reads. Built once, validated, then shared
/// read-only across evaluations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub weights: ComponentWeights,
    pub factors: FactorWeights,
    pub thresholds: Thresholds,
    pub baseline: LeagueBaseline,
    pub ranges: MetricRanges,
    pub outcomes: OutcomeModel,
    /// Lifetime of memoized results, in seconds. Zero disables reuse.
    pub cache_ttl_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            weights: ComponentWeights::default(),
            factors: FactorWeights::default(),
            thresholds: Thresholds::default(),
            baseline: LeagueBaseline::default(),
            ranges: MetricRanges::default(),
            outcomes: OutcomeModel::default(),
            cache_ttl_secs: 3600,
        }
    }
}

impl EngineConfig {
    /// Startup check for values that would bias every score.
    pub fn validate(&self) -> Result<(), ValidationError> {
        // Component weights
        for (name, val) in self.weights.fields() {
            if !val.is_finite() || val < 0.0 {
                return Err(ValidationError::new(
                    name,
                    format!("must be a finite value >= 0, got {val}"),
                ));
            }
        }
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ValidationError::new(
                "weights",
                format!("component weights must sum to 1.0, got {sum}"),
            ));
        }

        // Factor weights
        let f = &self.factors;
        let factor_fields: &[(&str, f64)] = &[
            ("factors.batter_iso", f.batter_iso),
            ("factors.batter_barrel", f.batter_barrel),
            ("factors.batter_hard_hit", f.batter_hard_hit),
            ("factors.pitcher_barrel_allowed", f.pitcher_barrel_allowed),
            ("factors.pitcher_hard_hit_allowed", f.pitcher_hard_hit_allowed),
            ("factors.ev_matchup", f.ev_matchup),
            ("factors.due_for_hr_ab", f.due_for_hr_ab),
            ("factors.due_for_hr_hits", f.due_for_hr_hits),
            ("factors.heating_up", f.heating_up),
            ("factors.cold_batter", f.cold_batter),
            ("factors.iso_trend", f.iso_trend),
            ("factors.contextual_scale", f.contextual_scale),
        ];
        for (name, val) in factor_fields {
            if !val.is_finite() || *val < 0.0 {
                return Err(ValidationError::new(
                    *name,
                    format!("must be a finite value >= 0, got {val}"),
                ));
            }
        }
        if f.batter_iso + f.batter_barrel + f.batter_hard_hit <= 0.0 {
            return Err(ValidationError::new(
                "factors.batter_*",
                "batter overall blend needs at least one positive weight",
            ));
        }
        if f.pitcher_barrel_allowed + f.pitcher_hard_hit_allowed <= 0.0 {
            return Err(ValidationError::new(
                "factors.pitcher_*",
                "pitcher overall blend needs at least one positive weight",
            ));
        }
        if !(0.0..=1.0).contains(&f.arsenal_hitter_share) {
            return Err(ValidationError::new(
                "factors.arsenal_hitter_share",
                format!("must be between 0.0 and 1.0, got {}", f.arsenal_hitter_share),
            ));
        }

        // Ranges: every normalized metric needs a sane range
        for metric in NORMALIZED_METRICS {
            let Some(range) = self.ranges.get(*metric) else {
                return Err(ValidationError::new(
                    format!("ranges.{}", metric.key()),
                    "missing range for a normalized metric",
                ));
            };
            if !range.min.is_finite() || !range.max.is_finite() || range.min > range.max {
                return Err(ValidationError::new(
                    format!("ranges.{}", metric.key()),
                    format!("invalid range [{}, {}]", range.min, range.max),
                ));
            }
        }

        // Thresholds
        let t = &self.thresholds;
        let positive_fields: &[(&str, f64)] = &[
            ("thresholds.confidence_pa", t.confidence_pa),
            ("thresholds.default_ab_per_hr", t.default_ab_per_hr),
            ("thresholds.default_hits_per_hr", t.default_hits_per_hr),
            ("thresholds.ab_deficit_multiplier", t.ab_deficit_multiplier),
            ("thresholds.hits_deficit_multiplier", t.hits_deficit_multiplier),
        ];
        for (name, val) in positive_fields {
            if !val.is_finite() || *val <= 0.0 {
                return Err(ValidationError::new(
                    *name,
                    format!("must be > 0, got {val}"),
                ));
            }
        }
        if !(0.0..=100.0).contains(&t.min_pitch_usage_pct) {
            return Err(ValidationError::new(
                "thresholds.min_pitch_usage_pct",
                format!("must be between 0 and 100, got {}", t.min_pitch_usage_pct),
            ));
        }
        if t.trailing_window_games == 0 {
            return Err(ValidationError::new(
                "thresholds.trailing_window_games",
                "must be > 0",
            ));
        }
        if t.inactivity_days < 0 {
            return Err(ValidationError::new(
                "thresholds.inactivity_days",
                format!("must be >= 0, got {}", t.inactivity_days),
            ));
        }
        if !(0.0..=1.0).contains(&t.inactive_dampening) {
            return Err(ValidationError::new(
                "thresholds.inactive_dampening",
                format!("must be between 0.0 and 1.0, got {}", t.inactive_dampening),
            ));
        }

        // Baseline rates are fractions
        let b = &self.baseline;
        let baseline_fields: &[(&str, f64)] = &[
            ("baseline.avg", b.avg),
            ("baseline.slg", b.slg),
            ("baseline.iso", b.iso),
            ("baseline.k_rate", b.k_rate),
            ("baseline.bb_rate", b.bb_rate),
            ("baseline.hard_hit_rate", b.hard_hit_rate),
            ("baseline.barrel_rate", b.barrel_rate),
            ("baseline.barrel_pa_rate", b.barrel_pa_rate),
        ];
        for (name, val) in baseline_fields {
            if !(val.is_finite() && *val > 0.0 && *val < 1.0) {
                return Err(ValidationError::new(
                    *name,
                    format!("must be a fraction in (0, 1), got {val}"),
                ));
            }
        }

        // Outcome lines
        let o = &self.outcomes;
        let outcome_fields: &[(&str, OutcomeLine)] = &[
            ("outcomes.home_run", o.home_run),
            ("outcomes.hit", o.hit),
            ("outcomes.reach_base", o.reach_base),
            ("outcomes.strikeout", o.strikeout),
        ];
        for (name, line) in outcome_fields {
            if line.floor > line.ceiling || line.floor < 0.0 || line.ceiling > 100.0 {
                return Err(ValidationError::new(
                    *name,
                    format!(
                        "bounds must satisfy 0 <= floor <= ceiling <= 100, got [{}, {}]",
                        line.floor, line.ceiling
                    ),
                ));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
