// Year-over-year trends and the two bonus signals built from trends:
// the historical bonus (+-25) and the recent-performance bonus (+-30).

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::{LeagueBaseline, Metric, MetricRanges};
use crate::model::YearlyMetrics;
use crate::scoring::game_log::{TrailingWindow, TrendDirection};
use crate::scoring::normalize::normalize;

/// Yearly metrics examined for the historical trend.
pub const HISTORICAL_METRICS: &[&str] = &["slg", "woba"];

pub const HISTORICAL_BONUS_CAP: f64 = 25.0;
pub const RECENT_BONUS_CAP: f64 = 30.0;

// Consistency bands for the historical bonus (population std of yearly values).
const CONSISTENT_STD: f64 = 0.03;
const VOLATILE_STD: f64 = 0.12;
const CONSISTENT_POINTS: f64 = 5.0;
const CONSISTENT_DECLINE_POINTS: f64 = -3.0;
const VOLATILE_POINTS: f64 = -3.0;

// Recent-performance bonus rules.
const HR_TREND_UP_SLOPE: f64 = 15.0;
const HR_TREND_DOWN_SLOPE: f64 = 12.0;
const HR_PER_PA_STRONG: (f64, f64) = (0.05, 20.0);
const HR_PER_PA_GOOD: (f64, f64) = (0.03, 10.0);
const HR_PER_PA_WEAK: (f64, f64) = (0.01, -10.0);
const HR_PER_PA_WEAK_MIN_PA: u32 = 20;
const AVG_HOT: (f64, f64) = (0.300, 15.0);
const AVG_WARM: (f64, f64) = (0.275, 8.0);
const AVG_COLD: (f64, f64) = (0.200, -12.0);
const AVG_COLD_MIN_AB: u32 = 10;
const HIT_RATE_JUMP: (f64, f64) = (0.050, 10.0);

// ---------------------------------------------------------------------------
// Historical trend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricTrend {
    pub direction: TrendDirection,
    pub magnitude: f64,
    pub early_value: f64,
    pub recent_value: f64,
    /// Population standard deviation across every year.
    pub consistency_std: f64,
    pub years: usize,
}

/// Per-metric trend over the seasons strictly before `before_year`.
/// Metrics with fewer than two seasons of data are left out.
pub fn analyze_yearly_trends(
    yearly: &YearlyMetrics,
    before_year: i32,
    metrics: &[&str],
) -> BTreeMap<String, MetricTrend> {
    let mut trends = BTreeMap::new();

    for metric in metrics {
        let values: Vec<f64> = yearly
            .range(..before_year)
            .filter_map(|(_, row)| row.get(*metric).copied())
            .filter(|v| v.is_finite())
            .collect();
        if values.len() < 2 {
            continue;
        }

        let (Some(&early), Some(&recent)) = (values.first(), values.last()) else {
            continue;
        };
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        trends.insert(
            metric.to_string(),
            MetricTrend {
                direction: TrendDirection::compare(recent, early),
                magnitude: (recent - early).abs(),
                early_value: early,
                recent_value: recent,
                consistency_std: variance.sqrt(),
                years: values.len(),
            },
        );
    }

    trends
}

/// Average of per-metric impact (+-magnitude * 100) plus average
/// consistency points, capped at +-25.
pub fn historical_bonus(trends: &BTreeMap<String, MetricTrend>) -> f64 {
    if trends.is_empty() {
        return 0.0;
    }

    let mut impact = 0.0;
    let mut consistency = 0.0;
    for trend in trends.values() {
        let scaled = trend.magnitude * 100.0;
        match trend.direction {
            TrendDirection::Improving => impact += scaled,
            TrendDirection::Declining => impact -= scaled,
            TrendDirection::Stable => {}
        }

        if trend.consistency_std < CONSISTENT_STD {
            consistency += if trend.direction == TrendDirection::Declining {
                CONSISTENT_DECLINE_POINTS
            } else {
                CONSISTENT_POINTS
            };
        } else if trend.consistency_std > VOLATILE_STD {
            consistency += VOLATILE_POINTS;
        }
    }

    let n = trends.len() as f64;
    (impact / n + consistency / n).clamp(-HISTORICAL_BONUS_CAP, HISTORICAL_BONUS_CAP)
}

// ---------------------------------------------------------------------------
// Recent performance
// ---------------------------------------------------------------------------

/// Bonus from the trailing window: HR-rate trend, HR-rate level, average
/// level and a contact jump. Fewer than two games scores 0.
pub fn recent_bonus(window: Option<&TrailingWindow>) -> f64 {
    let Some(w) = window.filter(|w| w.games >= 2) else {
        return 0.0;
    };

    let mut bonus = 0.0;

    if let Some(trend) = &w.hr_trend {
        match trend.direction {
            TrendDirection::Improving => bonus += HR_TREND_UP_SLOPE * trend.magnitude * 100.0,
            TrendDirection::Declining => bonus -= HR_TREND_DOWN_SLOPE * trend.magnitude * 100.0,
            TrendDirection::Stable => {}
        }
    }

    if w.hr_per_pa > HR_PER_PA_STRONG.0 {
        bonus += HR_PER_PA_STRONG.1;
    } else if w.hr_per_pa > HR_PER_PA_GOOD.0 {
        bonus += HR_PER_PA_GOOD.1;
    } else if w.hr_per_pa < HR_PER_PA_WEAK.0 && w.plate_appearances > HR_PER_PA_WEAK_MIN_PA {
        bonus += HR_PER_PA_WEAK.1;
    }

    if w.avg_avg > AVG_HOT.0 {
        bonus += AVG_HOT.1;
    } else if w.avg_avg > AVG_WARM.0 {
        bonus += AVG_WARM.1;
    } else if w.avg_avg < AVG_COLD.0 && w.at_bats > AVG_COLD_MIN_AB {
        bonus += AVG_COLD.1;
    }

    if let Some(trend) = &w.hit_rate_trend {
        if trend.direction == TrendDirection::Improving && trend.magnitude > HIT_RATE_JUMP.0 {
            bonus += HIT_RATE_JUMP.1;
        }
    }

    bonus.clamp(-RECENT_BONUS_CAP, RECENT_BONUS_CAP)
}

// ---------------------------------------------------------------------------
// Recent form
// ---------------------------------------------------------------------------

/// Trailing-window rates on the 0-100 scale, plus strikeout and walk rates
/// against the league. Shown alongside the score; never folded into it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentForm {
    pub hit_rate_score: f64,
    pub hr_rate_score: f64,
    pub obp_score: f64,
    /// Fewer strikeouts score higher.
    pub k_rate_score: f64,
    /// Window K% minus league K%.
    pub k_rate_vs_league: f64,
    /// Window BB% minus league BB%.
    pub bb_rate_vs_league: f64,
    /// Most recent prior-season wOBA on the woba range.
    pub woba_score: Option<f64>,
}

/// Needs a trailing window with at least one plate appearance.
pub fn recent_form(
    window: Option<&TrailingWindow>,
    yearly: Option<&YearlyMetrics>,
    before_year: i32,
    baseline: &LeagueBaseline,
    ranges: &MetricRanges,
) -> Option<RecentForm> {
    let w = window.filter(|w| w.plate_appearances > 0)?;
    let last_woba = yearly.and_then(|y| {
        y.range(..before_year)
            .rev()
            .find_map(|(_, row)| row.get("woba").copied())
    });
    Some(RecentForm {
        hit_rate_score: normalize(Some(w.hit_rate), Metric::HitRate, ranges, true),
        hr_rate_score: normalize(Some(w.hr_rate), Metric::HrRate, ranges, true),
        obp_score: normalize(Some(w.obp_calc), Metric::Obp, ranges, true),
        k_rate_score: normalize(Some(w.k_rate), Metric::KRate, ranges, false),
        k_rate_vs_league: w.k_rate - baseline.k_rate,
        bb_rate_vs_league: w.bb_rate - baseline.bb_rate,
        woba_score: last_woba.map(|v| normalize(Some(v), Metric::Woba, ranges, true)),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::game_log::Trend;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn make_yearly(rows: &[(i32, f64, f64)]) -> YearlyMetrics {
        rows.iter()
            .map(|(year, slg, woba)| {
                let mut m = BTreeMap::new();
                m.insert("slg".to_string(), *slg);
                m.insert("woba".to_string(), *woba);
                (*year, m)
            })
            .collect()
    }

    fn make_window(games: usize, pa: u32, ab: u32, hr_per_pa: f64, avg_avg: f64) -> TrailingWindow {
        TrailingWindow {
            games,
            at_bats: ab,
            hits: 0,
            home_runs: 0,
            walks: 0,
            strikeouts: 0,
            plate_appearances: pa,
            hit_rate: avg_avg,
            hr_rate: 0.0,
            hr_per_pa,
            k_rate: 0.0,
            bb_rate: 0.0,
            obp_calc: 0.0,
            avg_avg,
            hr_trend: None,
            hit_rate_trend: None,
        }
    }

    #[test]
    fn yearly_trend_uses_first_and_last_season() {
        let yearly = make_yearly(&[(2022, 0.400, 0.320), (2023, 0.450, 0.330), (2024, 0.480, 0.340)]);
        let trends = analyze_yearly_trends(&yearly, 2025, HISTORICAL_METRICS);
        let slg = &trends["slg"];
        assert_eq!(slg.direction, TrendDirection::Improving);
        assert!(approx_eq(slg.magnitude, 0.08, 1e-12));
        assert_eq!(slg.years, 3);
    }

    #[test]
    fn current_and_later_seasons_excluded() {
        let yearly = make_yearly(&[(2024, 0.400, 0.320), (2025, 0.600, 0.400)]);
        let trends = analyze_yearly_trends(&yearly, 2025, HISTORICAL_METRICS);
        assert!(trends.is_empty());
    }

    #[test]
    fn historical_bonus_rewards_consistent_improvement() {
        // Both metrics +0.02, std 0.01 -> impact 2, consistency +5 each
        let yearly = make_yearly(&[(2023, 0.400, 0.320), (2024, 0.420, 0.340)]);
        let trends = analyze_yearly_trends(&yearly, 2025, HISTORICAL_METRICS);
        let bonus = historical_bonus(&trends);
        assert!(approx_eq(bonus, 7.0, 1e-9), "bonus was {bonus}");
    }

    #[test]
    fn historical_bonus_is_capped() {
        let yearly = make_yearly(&[(2023, 0.200, 0.200), (2024, 0.700, 0.600)]);
        let trends = analyze_yearly_trends(&yearly, 2025, HISTORICAL_METRICS);
        assert_eq!(historical_bonus(&trends), HISTORICAL_BONUS_CAP);
    }

    #[test]
    fn historical_bonus_empty_is_zero() {
        assert_eq!(historical_bonus(&BTreeMap::new()), 0.0);
    }

    #[test]
    fn recent_bonus_needs_two_games() {
        assert_eq!(recent_bonus(None), 0.0);
        let w = make_window(1, 5, 4, 0.2, 0.5);
        assert_eq!(recent_bonus(Some(&w)), 0.0);
    }

    #[test]
    fn recent_bonus_hot_streak() {
        // hr_per_pa .06 -> +20, avg .310 -> +15 => 35 capped to 30
        let w = make_window(10, 45, 40, 0.06, 0.310);
        assert_eq!(recent_bonus(Some(&w)), RECENT_BONUS_CAP);
    }

    #[test]
    fn recent_bonus_cold_streak() {
        // hr_per_pa 0 with 40 PA -> -10, avg .150 with 36 AB -> -12
        let w = make_window(10, 40, 36, 0.0, 0.150);
        assert!(approx_eq(recent_bonus(Some(&w)), -22.0, 1e-9));
    }

    #[test]
    fn recent_bonus_trend_terms() {
        let mut w = make_window(10, 18, 16, 0.02, 0.250);
        w.hr_trend = Some(Trend::between(0.04, 0.0));
        w.hit_rate_trend = Some(Trend::between(0.32, 0.20));
        // 15 * 0.04 * 100 = 60 -> with +10 contact jump, capped at 30
        assert_eq!(recent_bonus(Some(&w)), RECENT_BONUS_CAP);

        w.hr_trend = Some(Trend::between(0.0, 0.01));
        w.hit_rate_trend = None;
        // -12 * 0.01 * 100 = -12
        assert!(approx_eq(recent_bonus(Some(&w)), -12.0, 1e-9));
    }

    #[test]
    fn recent_form_scores_window_rates() {
        let mut w = make_window(10, 40, 36, 0.025, 0.300);
        w.hit_rate = 0.300;
        w.hr_rate = 0.075;
        w.obp_calc = 0.350;
        w.k_rate = 0.275;
        w.bb_rate = 0.10;
        let yearly = make_yearly(&[(2023, 0.420, 0.330), (2024, 0.450, 0.350), (2025, 0.500, 0.600)]);
        let ranges = MetricRanges::default();

        let form = recent_form(Some(&w), Some(&yearly), 2025, &LeagueBaseline::default(), &ranges).unwrap();
        // hit_rate .1-.5, hr_rate 0-.15, obp .2-.5, k_rate .05-.5 inverted
        assert!(approx_eq(form.hit_rate_score, 50.0, 1e-9));
        assert!(approx_eq(form.hr_rate_score, 50.0, 1e-9));
        assert!(approx_eq(form.obp_score, 50.0, 1e-9));
        assert!(approx_eq(form.k_rate_score, 50.0, 1e-9));
        assert!(approx_eq(form.k_rate_vs_league, 0.055, 1e-12));
        assert!(approx_eq(form.bb_rate_vs_league, 0.02, 1e-12));
        // 2024 wOBA .350 on .1-.6; 2025 is the current season
        assert!(approx_eq(form.woba_score.unwrap(), 50.0, 1e-9));
    }

    #[test]
    fn recent_form_needs_plate_appearances() {
        let baseline = LeagueBaseline::default();
        let ranges = MetricRanges::default();
        assert!(recent_form(None, None, 2025, &baseline, &ranges).is_none());
        let empty = make_window(1, 0, 0, 0.0, 0.0);
        assert!(recent_form(Some(&empty), None, 2025, &baseline, &ranges).is_none());
        let w = make_window(3, 12, 11, 0.0, 0.250);
        assert!(recent_form(Some(&w), None, 2025, &baseline, &ranges)
            .unwrap()
            .woba_score
            .is_none());
    }
}
