// Pitch-arsenal matchup: usage-weighted SLG for both sides of a pairing.

use serde::Serialize;

use crate::config::{LeagueBaseline, Metric, MetricRanges};
use crate::model::{ArsenalProfile, PitchTypeStats};
use crate::scoring::normalize::{normalize, NEUTRAL_SCORE};

/// One side's numbers for a single pitch type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PitchSide {
    pub batting_average: Option<f64>,
    pub slugging: Option<f64>,
    pub woba: Option<f64>,
    pub hard_hit_rate: Option<f64>,
    pub whiff_rate: Option<f64>,
    /// True when the league SLG stood in for a missing value.
    pub substituted: bool,
}

impl PitchSide {
    fn from_stats(stats: Option<&PitchTypeStats>) -> Self {
        match stats {
            Some(s) => PitchSide {
                batting_average: s.batting_average,
                slugging: s.slugging,
                woba: s.woba,
                hard_hit_rate: s.hard_hit_rate,
                whiff_rate: s.whiff_rate,
                substituted: s.slugging.is_none(),
            },
            None => PitchSide {
                substituted: true,
                ..PitchSide::default()
            },
        }
    }
}

/// Per-pitch entry of the matchup breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitchMatchup {
    pub pitch_type: String,
    pub pitch_name: Option<String>,
    pub usage_pct: f64,
    pub hitter: PitchSide,
    pub pitcher: PitchSide,
}

/// Output of [`analyze_arsenal`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArsenalMatchup {
    pub hitter_weighted_slg: f64,
    pub pitcher_weighted_slg: f64,
    /// Sum of usage fractions that qualified. Zero means no usable pitch.
    pub total_weight: f64,
    pub breakdown: Vec<PitchMatchup>,
}

impl ArsenalMatchup {
    /// True when no pitch cleared the usage threshold.
    pub fn is_empty(&self) -> bool {
        self.total_weight <= 0.0
    }

    pub fn substitution_count(&self) -> usize {
        self.breakdown
            .iter()
            .map(|p| p.hitter.substituted as usize + p.pitcher.substituted as usize)
            .sum()
    }

    /// One `<side>.arsenal.<PITCH>` label per substituted side of each
    /// pitch, batter side first. Sides switched off are skipped.
    pub fn substitution_labels(&self, hitter: bool, pitcher: bool) -> Vec<String> {
        let batter_side = self
            .breakdown
            .iter()
            .filter(|p| hitter && p.hitter.substituted)
            .map(|p| format!("batter.arsenal.{}", p.pitch_type));
        let pitcher_side = self
            .breakdown
            .iter()
            .filter(|p| pitcher && p.pitcher.substituted)
            .map(|p| format!("pitcher.arsenal.{}", p.pitch_type));
        batter_side.chain(pitcher_side).collect()
    }
}

/// Weight each qualifying pitch of the pitcher's arsenal by usage and
/// accumulate SLG for the batter (vs that pitch) and the pitcher (allowed
/// on that pitch). Missing values on either side use the league SLG.
///
/// Iteration follows the arsenal's ordered map, so summation order is
/// fixed for a given input.
pub fn analyze_arsenal(
    batter: &ArsenalProfile,
    pitcher: &ArsenalProfile,
    baseline: &LeagueBaseline,
    min_usage_pct: f64,
) -> ArsenalMatchup {
    let mut hitter_sum = 0.0;
    let mut pitcher_sum = 0.0;
    let mut total_weight = 0.0;
    let mut breakdown = Vec::new();

    for (pitch_type, stats) in &pitcher.pitches {
        let usage = stats.usage_pct.unwrap_or(0.0).max(0.0);
        if usage < min_usage_pct || usage <= 0.0 {
            continue;
        }
        let weight = usage / 100.0;
        let batter_stats = batter.get(pitch_type);

        let hitter_slg = batter_stats
            .and_then(|s| s.slugging)
            .unwrap_or(baseline.slg);
        let pitcher_slg = stats.slugging.unwrap_or(baseline.slg);

        hitter_sum += hitter_slg * weight;
        pitcher_sum += pitcher_slg * weight;
        total_weight += weight;

        breakdown.push(PitchMatchup {
            pitch_type: pitch_type.clone(),
            pitch_name: stats.pitch_name.clone(),
            usage_pct: usage,
            hitter: PitchSide::from_stats(batter_stats),
            pitcher: PitchSide::from_stats(Some(stats)),
        });
    }

    if total_weight <= 0.0 {
        return ArsenalMatchup {
            hitter_weighted_slg: baseline.slg,
            pitcher_weighted_slg: baseline.slg,
            total_weight: 0.0,
            breakdown,
        };
    }

    ArsenalMatchup {
        hitter_weighted_slg: hitter_sum / total_weight,
        pitcher_weighted_slg: pitcher_sum / total_weight,
        total_weight,
        breakdown,
    }
}

/// Arsenal sub-score on 0-100, anchored at 50 when both weighted figures
/// equal the league SLG.
pub fn arsenal_score(
    matchup: &ArsenalMatchup,
    baseline: &LeagueBaseline,
    ranges: &MetricRanges,
    hitter_share: f64,
) -> f64 {
    if matchup.is_empty() {
        return NEUTRAL_SCORE;
    }
    let base = normalize(Some(baseline.slg), Metric::Slg, ranges, true);
    let hitter = normalize(Some(matchup.hitter_weighted_slg), Metric::Slg, ranges, true);
    let pitcher = normalize(Some(matchup.pitcher_weighted_slg), Metric::Slg, ranges, true);
    let raw = NEUTRAL_SCORE
        + hitter_share * (hitter - base)
        + (1.0 - hitter_share) * (pitcher - base);
    raw.clamp(0.0, 100.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn make_pitch(usage: Option<f64>, slg: Option<f64>) -> PitchTypeStats {
        PitchTypeStats {
            usage_pct: usage,
            slugging: slg,
            ..PitchTypeStats::default()
        }
    }

    fn make_arsenal(pitches: &[(&str, Option<f64>, Option<f64>)]) -> ArsenalProfile {
        let mut arsenal = ArsenalProfile::default();
        for (pt, usage, slg) in pitches {
            arsenal.insert(*pt, make_pitch(*usage, *slg));
        }
        arsenal
    }

    #[test]
    fn single_pitch_full_usage_is_exact() {
        let baseline = LeagueBaseline::default();
        let pitcher = make_arsenal(&[("FF", Some(100.0), Some(0.380))]);
        let batter = make_arsenal(&[("FF", None, Some(0.512))]);
        let m = analyze_arsenal(&batter, &pitcher, &baseline, 5.0);
        assert_eq!(m.hitter_weighted_slg, 0.512);
        assert_eq!(m.pitcher_weighted_slg, 0.380);
        assert_eq!(m.breakdown.len(), 1);
    }

    #[test]
    fn missing_batter_pitch_uses_baseline() {
        let baseline = LeagueBaseline::default();
        let pitcher = make_arsenal(&[("SL", Some(100.0), Some(0.300))]);
        let batter = ArsenalProfile::default();
        let m = analyze_arsenal(&batter, &pitcher, &baseline, 5.0);
        assert_eq!(m.hitter_weighted_slg, baseline.slg);
        assert!(m.breakdown[0].hitter.substituted);
        assert!(!m.breakdown[0].pitcher.substituted);
        assert_eq!(m.substitution_count(), 1);
    }

    #[test]
    fn substitution_labels_name_side_and_pitch() {
        let baseline = LeagueBaseline::default();
        let pitcher = make_arsenal(&[
            ("FF", Some(60.0), Some(0.400)),
            ("SL", Some(40.0), None),
        ]);
        let batter = make_arsenal(&[("FF", None, Some(0.500))]);
        let m = analyze_arsenal(&batter, &pitcher, &baseline, 5.0);
        assert_eq!(
            m.substitution_labels(true, true),
            vec!["batter.arsenal.SL", "pitcher.arsenal.SL"]
        );
        assert_eq!(m.substitution_labels(false, true), vec!["pitcher.arsenal.SL"]);
        assert!(m.substitution_labels(false, false).is_empty());
    }

    #[test]
    fn low_usage_and_negative_usage_excluded() {
        let baseline = LeagueBaseline::default();
        let pitcher = make_arsenal(&[
            ("FF", Some(60.0), Some(0.400)),
            ("CU", Some(4.9), Some(0.900)),
            ("KN", Some(-10.0), Some(0.900)),
            ("SL", Some(40.0), Some(0.300)),
        ]);
        let batter = make_arsenal(&[("FF", None, Some(0.500)), ("SL", None, Some(0.250))]);
        let m = analyze_arsenal(&batter, &pitcher, &baseline, 5.0);
        assert_eq!(m.breakdown.len(), 2);
        assert!(approx_eq(m.total_weight, 1.0, 1e-12));
        // 0.6 * 0.5 + 0.4 * 0.25 = 0.40
        assert!(approx_eq(m.hitter_weighted_slg, 0.40, 1e-12));
        // 0.6 * 0.4 + 0.4 * 0.3 = 0.36
        assert!(approx_eq(m.pitcher_weighted_slg, 0.36, 1e-12));
    }

    #[test]
    fn empty_arsenal_is_neutral() {
        let baseline = LeagueBaseline::default();
        let ranges = MetricRanges::default();
        let pitcher = make_arsenal(&[("CU", Some(3.0), Some(0.9))]);
        let m = analyze_arsenal(&ArsenalProfile::default(), &pitcher, &baseline, 5.0);
        assert!(m.is_empty());
        assert_eq!(m.hitter_weighted_slg, baseline.slg);
        assert_eq!(m.pitcher_weighted_slg, baseline.slg);
        assert_eq!(arsenal_score(&m, &baseline, &ranges, 0.6), 50.0);
    }

    #[test]
    fn baseline_matchup_scores_fifty() {
        let baseline = LeagueBaseline::default();
        let ranges = MetricRanges::default();
        let pitcher = make_arsenal(&[("FF", Some(100.0), Some(baseline.slg))]);
        let batter = make_arsenal(&[("FF", None, Some(baseline.slg))]);
        let m = analyze_arsenal(&batter, &pitcher, &baseline, 5.0);
        assert_eq!(arsenal_score(&m, &baseline, &ranges, 0.6), 50.0);
    }

    #[test]
    fn strong_hitter_against_hittable_pitcher_scores_high() {
        let baseline = LeagueBaseline::default();
        let ranges = MetricRanges::default();
        let pitcher = make_arsenal(&[("FF", Some(100.0), Some(0.550))]);
        let batter = make_arsenal(&[("FF", None, Some(0.600))]);
        let m = analyze_arsenal(&batter, &pitcher, &baseline, 5.0);
        let score = arsenal_score(&m, &baseline, &ranges, 0.6);
        assert!(score > 75.0, "score was {score}");
        assert!(score <= 100.0);
    }
}
