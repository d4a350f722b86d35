// Contextual signals: HR pace, due-for-HR scores, contact trend, activity
// and heat level.

use serde::Serialize;

use crate::config::{LeagueBaseline, Thresholds};
use crate::model::{PlayerSeasonAggregate, PriorSeasonStats};
use crate::scoring::game_log::GameLogStats;

// ---------------------------------------------------------------------------
// HR pace
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaceSource {
    PriorSeason,
    CurrentSeason,
    Default,
}

/// Historical home-run pace used as the "expected" side of the due scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HrPace {
    pub hr_per_ab: f64,
    pub ab_per_hr: f64,
    pub hits_per_hr: f64,
    pub source: PaceSource,
}

/// Prior season when it has a homer and enough AB, then the current season
/// under a lower AB bar, then the configured default.
pub fn hr_pace(
    current: &PlayerSeasonAggregate,
    prior: Option<&PriorSeasonStats>,
    t: &Thresholds,
) -> HrPace {
    let (hr_per_ab, source) = match prior {
        Some(p) if p.home_runs > 0 && p.at_bats >= t.min_prior_ab_for_pace => (
            p.home_runs as f64 / p.at_bats as f64,
            PaceSource::PriorSeason,
        ),
        _ if current.home_runs > 0 && current.at_bats >= t.min_current_ab_for_pace => (
            current.home_runs as f64 / current.at_bats as f64,
            PaceSource::CurrentSeason,
        ),
        _ => (1.0 / t.default_ab_per_hr, PaceSource::Default),
    };

    let hits_per_hr = match prior {
        Some(p) if p.home_runs > 0 && p.hits > 0 => p.hits as f64 / p.home_runs as f64,
        _ if current.home_runs > 0 => current.hits as f64 / current.home_runs as f64,
        _ => t.default_hits_per_hr,
    };

    HrPace {
        hr_per_ab,
        ab_per_hr: 1.0 / hr_per_ab,
        hits_per_hr,
        source,
    }
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContactTrend {
    #[serde(rename = "Heating Up")]
    HeatingUp,
    #[serde(rename = "Cold")]
    Cold,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl ContactTrend {
    pub fn label(&self) -> &'static str {
        match self {
            ContactTrend::HeatingUp => "Heating Up",
            ContactTrend::Cold => "Cold",
            ContactTrend::NotApplicable => "N/A",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HeatLevel {
    Normal,
    Due,
    Hot,
    #[serde(rename = "Very Hot")]
    VeryHot,
    #[serde(rename = "Due (Inactive)")]
    DueInactive,
}

impl HeatLevel {
    pub fn label(&self) -> &'static str {
        match self {
            HeatLevel::Normal => "Normal",
            HeatLevel::Due => "Due",
            HeatLevel::Hot => "Hot",
            HeatLevel::VeryHot => "Very Hot",
            HeatLevel::DueInactive => "Due (Inactive)",
        }
    }
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextualSignals {
    pub pace: HrPace,
    /// AB since last HR over expected AB per HR.
    pub due_ratio: f64,
    pub due_for_hr_score: f64,
    pub due_for_hr_hits_score: f64,
    pub contact_trend: ContactTrend,
    pub heating_up_score: f64,
    /// Zero or negative.
    pub cold_batter_score: f64,
    pub is_active: bool,
    pub is_due: bool,
    pub heat_level: HeatLevel,
}

/// `min((observed / expected - multiplier) * slope, ceiling)` once observed
/// passes `expected * multiplier`, else 0.
fn deficit_score(observed: u32, expected: f64, multiplier: f64, slope: f64, ceiling: f64) -> f64 {
    if expected <= 0.0 {
        return 0.0;
    }
    let observed = observed as f64;
    if observed > expected * multiplier {
        ((observed / expected - multiplier) * slope).min(ceiling)
    } else {
        0.0
    }
}

pub fn evaluate_signals(
    current: &PlayerSeasonAggregate,
    history: &GameLogStats,
    prior: Option<&PriorSeasonStats>,
    baseline: &LeagueBaseline,
    t: &Thresholds,
) -> ContextualSignals {
    let pace = hr_pace(current, prior, t);

    let due_for_hr_score = deficit_score(
        history.at_bats_since_last_hr,
        pace.ab_per_hr,
        t.ab_deficit_multiplier,
        t.ab_due_slope,
        t.ab_due_ceiling,
    );
    let due_for_hr_hits_score = deficit_score(
        history.hits_since_last_hr,
        pace.hits_per_hr,
        t.hits_deficit_multiplier,
        t.hits_due_slope,
        t.hits_due_ceiling,
    );
    let due_ratio = history.at_bats_since_last_hr as f64 / pace.ab_per_hr;

    let mut contact_trend = ContactTrend::NotApplicable;
    let mut heating_up_score = 0.0;
    let mut cold_batter_score = 0.0;
    if let Some(w) = history
        .trailing
        .as_ref()
        .filter(|w| w.plate_appearances >= t.min_recent_pa_for_contact)
    {
        if w.hit_rate > baseline.avg + t.heating_up_margin
            && w.hr_per_pa < pace.hr_per_ab * t.heating_up_power_fraction
        {
            contact_trend = ContactTrend::HeatingUp;
            heating_up_score = t.heating_up_score;
        } else if w.hit_rate < baseline.avg - t.cold_margin {
            contact_trend = ContactTrend::Cold;
            cold_batter_score = -t.cold_batter_penalty;
        }
    }

    let is_active = match history.days_since_last_played {
        Some(days) if history.games_played > 0 => days <= t.inactivity_days,
        _ => false,
    };
    let is_due = due_for_hr_score > 0.0 || due_for_hr_hits_score > 0.0;

    let heat_level = if !is_due {
        HeatLevel::Normal
    } else if !is_active {
        HeatLevel::DueInactive
    } else if due_ratio >= t.very_hot_due_ratio {
        HeatLevel::VeryHot
    } else if due_ratio >= t.hot_due_ratio {
        HeatLevel::Hot
    } else {
        HeatLevel::Due
    };

    ContextualSignals {
        pace,
        due_ratio,
        due_for_hr_score,
        due_for_hr_hits_score,
        contact_trend,
        heating_up_score,
        cold_batter_score,
        is_active,
        is_due,
        heat_level,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
