// Matchup result record and its two projections: a flat row for CSV and
// storage, and a nested explanation for detail views.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{Handedness, PlayerKey, PlayerSeasonAggregate};
use crate::scoring::arsenal::{ArsenalMatchup, PitchMatchup};
use crate::scoring::composite::{
    ComponentScores, ContextualBreakdown, OutcomeProbabilities, OverallDetail,
};
use crate::scoring::game_log::{GameLogStats, TrailingWindow};
use crate::scoring::signals::ContextualSignals;
use crate::scoring::trends::{MetricTrend, RecentForm};

// ---------------------------------------------------------------------------
// Result record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataQuality {
    pub batter_pa: u32,
    pub low_sample_warning: bool,
    /// Inputs replaced by league baseline values, e.g. `batter.barrel_rate`.
    pub substitutions: Vec<String>,
    /// Set when evaluation failed and the result is a neutral placeholder.
    pub insufficient_data: bool,
}

/// Intermediate numbers kept for explanation. Empty on neutral results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchupDetails {
    pub season: Option<PlayerSeasonAggregate>,
    pub history: Option<GameLogStats>,
    pub signals: Option<ContextualSignals>,
    pub arsenal: Option<ArsenalMatchup>,
    pub batter_overall: Option<OverallDetail>,
    pub pitcher_overall: Option<OverallDetail>,
    pub contextual: Option<ContextualBreakdown>,
    pub historical_trends: BTreeMap<String, MetricTrend>,
    pub historical_bonus: f64,
    pub recent_bonus: f64,
    pub recent_form: Option<RecentForm>,
}

/// One scored batter-pitcher pairing. Built once per evaluation and not
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchupScoreResult {
    pub batter: PlayerKey,
    pub pitcher: PlayerKey,
    pub batter_hand: Option<Handedness>,
    pub pitcher_hand: Option<Handedness>,
    pub as_of: NaiveDate,
    pub score: f64,
    pub components: ComponentScores,
    pub outcomes: OutcomeProbabilities,
    pub quality: DataQuality,
    pub details: MatchupDetails,
}

// ---------------------------------------------------------------------------
// Flat row
// ---------------------------------------------------------------------------

/// CSV-ready projection of a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupRow {
    pub batter_name: String,
    pub batter_team: String,
    pub pitcher_name: String,
    pub pitcher_team: String,
    pub batter_hand: String,
    pub pitcher_hand: String,
    pub as_of: NaiveDate,
    pub score: f64,
    pub arsenal_matchup: f64,
    pub batter_overall: f64,
    pub pitcher_overall: f64,
    pub historical_trend: f64,
    pub recent_performance: f64,
    pub contextual: f64,
    pub hr_probability: f64,
    pub hit_probability: f64,
    pub reach_base_probability: f64,
    pub strikeout_probability: f64,
    pub batter_pa: u32,
    pub games_since_last_hr: Option<u32>,
    pub ab_since_last_hr: Option<u32>,
    pub h_since_last_hr: Option<u32>,
    pub expected_ab_per_hr: Option<f64>,
    pub due_for_hr_score: Option<f64>,
    pub due_for_hr_hits_score: Option<f64>,
    pub contact_trend: String,
    pub heat_level: String,
    pub is_active: Option<bool>,
    pub low_sample_warning: bool,
    pub insufficient_data: bool,
    pub substitutions: String,
}

fn hand_code(hand: Option<Handedness>) -> String {
    hand.map(|h| h.code().to_string()).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Explanation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DueFactor<'a> {
    pub signals: &'a ContextualSignals,
    pub games_since_last_hr: u32,
    pub days_since_last_hr: i64,
    pub at_bats_since_last_hr: u32,
    pub hits_since_last_hr: u32,
    pub last_hr_date: Option<NaiveDate>,
    pub days_since_last_played: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalSection<'a> {
    pub bonus: f64,
    pub trends: &'a BTreeMap<String, MetricTrend>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentSection<'a> {
    pub bonus: f64,
    pub window: Option<&'a TrailingWindow>,
    pub form: Option<&'a RecentForm>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArsenalSection<'a> {
    pub hitter_weighted_slg: f64,
    pub pitcher_weighted_slg: f64,
    pub pitches: &'a [PitchMatchup],
}

/// Nested view of a result for detail panels. Borrows from the result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchupExplanation<'a> {
    pub batter: &'a PlayerKey,
    pub pitcher: &'a PlayerKey,
    pub as_of: NaiveDate,
    pub score: f64,
    pub components: &'a ComponentScores,
    pub outcomes: &'a OutcomeProbabilities,
    pub quality: &'a DataQuality,
    pub season: Option<&'a PlayerSeasonAggregate>,
    pub arsenal: Option<ArsenalSection<'a>>,
    pub batter_overall: Option<&'a OverallDetail>,
    pub pitcher_overall: Option<&'a OverallDetail>,
    pub due_factor: Option<DueFactor<'a>>,
    pub contextual: Option<&'a ContextualBreakdown>,
    pub historical: HistoricalSection<'a>,
    pub recent: RecentSection<'a>,
}

impl MatchupScoreResult {
    pub fn to_row(&self) -> MatchupRow {
        let history = self.details.history.as_ref();
        let signals = self.details.signals.as_ref();
        MatchupRow {
            batter_name: self.batter.name.clone(),
            batter_team: self.batter.team.clone(),
            pitcher_name: self.pitcher.name.clone(),
            pitcher_team: self.pitcher.team.clone(),
            batter_hand: hand_code(self.batter_hand),
            pitcher_hand: hand_code(self.pitcher_hand),
            as_of: self.as_of,
            score: self.score,
            arsenal_matchup: self.components.arsenal_matchup,
            batter_overall: self.components.batter_overall,
            pitcher_overall: self.components.pitcher_overall,
            historical_trend: self.components.historical_trend,
            recent_performance: self.components.recent_performance,
            contextual: self.components.contextual,
            hr_probability: self.outcomes.home_run,
            hit_probability: self.outcomes.hit,
            reach_base_probability: self.outcomes.reach_base,
            strikeout_probability: self.outcomes.strikeout,
            batter_pa: self.quality.batter_pa,
            games_since_last_hr: history.map(|h| h.games_since_last_hr),
            ab_since_last_hr: history.map(|h| h.at_bats_since_last_hr),
            h_since_last_hr: history.map(|h| h.hits_since_last_hr),
            expected_ab_per_hr: signals.map(|s| s.pace.ab_per_hr),
            due_for_hr_score: signals.map(|s| s.due_for_hr_score),
            due_for_hr_hits_score: signals.map(|s| s.due_for_hr_hits_score),
            contact_trend: signals
                .map(|s| s.contact_trend.label())
                .unwrap_or("N/A")
                .to_string(),
            heat_level: signals
                .map(|s| s.heat_level.label())
                .unwrap_or("Normal")
                .to_string(),
            is_active: signals.map(|s| s.is_active),
            low_sample_warning: self.quality.low_sample_warning,
            insufficient_data: self.quality.insufficient_data,
            substitutions: self.quality.substitutions.join(";"),
        }
    }

    pub fn explain(&self) -> MatchupExplanation<'_> {
        let d = &self.details;
        let due_factor = match (d.signals.as_ref(), d.history.as_ref()) {
            (Some(signals), Some(h)) => Some(DueFactor {
                signals,
                games_since_last_hr: h.games_since_last_hr,
                days_since_last_hr: h.days_since_last_hr,
                at_bats_since_last_hr: h.at_bats_since_last_hr,
                hits_since_last_hr: h.hits_since_last_hr,
                last_hr_date: h.last_hr_date,
                days_since_last_played: h.days_since_last_played,
            }),
            _ => None,
        };

        MatchupExplanation {
            batter: &self.batter,
            pitcher: &self.pitcher,
            as_of: self.as_of,
            score: self.score,
            components: &self.components,
            outcomes: &self.outcomes,
            quality: &self.quality,
            season: d.season.as_ref(),
            arsenal: d.arsenal.as_ref().map(|a| ArsenalSection {
                hitter_weighted_slg: a.hitter_weighted_slg,
                pitcher_weighted_slg: a.pitcher_weighted_slg,
                pitches: &a.breakdown,
            }),
            batter_overall: d.batter_overall.as_ref(),
            pitcher_overall: d.pitcher_overall.as_ref(),
            due_factor,
            contextual: d.contextual.as_ref(),
            historical: HistoricalSection {
                bonus: d.historical_bonus,
                trends: &d.historical_trends,
            },
            recent: RecentSection {
                bonus: d.recent_bonus,
                window: d.history.as_ref().and_then(|h| h.trailing.as_ref()),
                form: d.recent_form.as_ref(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutcomeModel;
    use crate::scoring::composite::outcome_probabilities;

    fn make_neutral() -> MatchupScoreResult {
        MatchupScoreResult {
            batter: PlayerKey::new("Alex Example", "AAA"),
            pitcher: PlayerKey::new("Pat Sample", "BBB"),
            batter_hand: Some(Handedness::Left),
            pitcher_hand: None,
            as_of: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            score: 50.0,
            components: ComponentScores::neutral(),
            outcomes: outcome_probabilities(50.0, 0, &OutcomeModel::default()),
            quality: DataQuality {
                insufficient_data: true,
                substitutions: vec!["batter.iso".into(), "pitcher.arsenal".into()],
                ..DataQuality::default()
            },
            details: MatchupDetails::default(),
        }
    }

    #[test]
    fn row_flattens_identity_and_flags() {
        let row = make_neutral().to_row();
        assert_eq!(row.batter_name, "Alex Example");
        assert_eq!(row.batter_hand, "L");
        assert_eq!(row.pitcher_hand, "");
        assert!(row.insufficient_data);
        assert_eq!(row.substitutions, "batter.iso;pitcher.arsenal");
        assert_eq!(row.contact_trend, "N/A");
        assert_eq!(row.heat_level, "Normal");
        assert!(row.games_since_last_hr.is_none());
    }

    #[test]
    fn explanation_serializes_nested() {
        let result = make_neutral();
        let json = serde_json::to_value(result.explain()).unwrap();
        assert_eq!(json["batter"]["name"], "Alex Example");
        assert_eq!(json["components"]["arsenal_matchup"], 50.0);
        assert!(json["due_factor"].is_null());
        assert_eq!(json["quality"]["insufficient_data"], true);
    }
}
