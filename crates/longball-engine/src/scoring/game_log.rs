// Game-log history: HR droughts, activity, and trailing-window rates with a
// recent-half vs earlier-half trend.

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::GameLogEntry;

// ---------------------------------------------------------------------------
// Trend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

impl TrendDirection {
    pub fn compare(recent: f64, earlier: f64) -> Self {
        if recent > earlier {
            TrendDirection::Improving
        } else if recent < earlier {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "improving",
            TrendDirection::Declining => "declining",
            TrendDirection::Stable => "stable",
        }
    }
}

/// Recent value against an earlier value of the same rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trend {
    pub direction: TrendDirection,
    pub magnitude: f64,
    pub recent: f64,
    pub earlier: f64,
}

impl Trend {
    pub fn between(recent: f64, earlier: f64) -> Self {
        Trend {
            direction: TrendDirection::compare(recent, earlier),
            magnitude: (recent - earlier).abs(),
            recent,
            earlier,
        }
    }
}

// ---------------------------------------------------------------------------
// Trailing window
// ---------------------------------------------------------------------------

/// Rates over the last N played games. Ratios with a zero denominator are 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrailingWindow {
    pub games: usize,
    pub at_bats: u32,
    pub hits: u32,
    pub home_runs: u32,
    pub walks: u32,
    pub strikeouts: u32,
    pub plate_appearances: u32,
    pub hit_rate: f64,
    pub hr_rate: f64,
    pub hr_per_pa: f64,
    pub k_rate: f64,
    pub bb_rate: f64,
    pub obp_calc: f64,
    /// Mean of per-game AVG over games with at least one AB.
    pub avg_avg: f64,
    /// HR per PA, recent half vs earlier half.
    pub hr_trend: Option<Trend>,
    pub hit_rate_trend: Option<Trend>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    ab: u32,
    h: u32,
    hr: u32,
    bb: u32,
    k: u32,
    pa: u32,
}

impl Totals {
    fn of(games: &[&GameLogEntry]) -> Self {
        games.iter().fold(Totals::default(), |acc, g| Totals {
            ab: acc.ab.saturating_add(g.at_bats),
            h: acc.h.saturating_add(g.hits),
            hr: acc.hr.saturating_add(g.home_runs),
            bb: acc.bb.saturating_add(g.walks),
            k: acc.k.saturating_add(g.strikeouts),
            pa: acc.pa.saturating_add(g.plate_appearances_approx()),
        })
    }
}

fn saturating_sum(counts: impl Iterator<Item = u32>) -> u32 {
    counts.fold(0, u32::saturating_add)
}

fn ratio(num: u32, den: u32) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl TrailingWindow {
    /// `games` must be ordered most recent first.
    fn from_recent_first(games: &[&GameLogEntry]) -> Option<Self> {
        if games.is_empty() {
            return None;
        }
        let t = Totals::of(games);

        let with_ab: Vec<f64> = games
            .iter()
            .filter(|g| g.at_bats > 0)
            .map(|g| g.hits as f64 / g.at_bats as f64)
            .collect();
        let avg_avg = if with_ab.is_empty() {
            0.0
        } else {
            with_ab.iter().sum::<f64>() / with_ab.len() as f64
        };

        let (hr_trend, hit_rate_trend) = if games.len() >= 2 {
            let mid = games.len() / 2;
            let recent = Totals::of(&games[..mid]);
            let earlier = Totals::of(&games[mid..]);
            (
                Some(Trend::between(ratio(recent.hr, recent.pa), ratio(earlier.hr, earlier.pa))),
                Some(Trend::between(ratio(recent.h, recent.ab), ratio(earlier.h, earlier.ab))),
            )
        } else {
            (None, None)
        };

        Some(TrailingWindow {
            games: games.len(),
            at_bats: t.ab,
            hits: t.h,
            home_runs: t.hr,
            walks: t.bb,
            strikeouts: t.k,
            plate_appearances: t.pa,
            hit_rate: ratio(t.h, t.ab),
            hr_rate: ratio(t.hr, t.ab),
            hr_per_pa: ratio(t.hr, t.pa),
            k_rate: ratio(t.k, t.pa),
            bb_rate: ratio(t.bb, t.pa),
            obp_calc: ratio(t.h.saturating_add(t.bb), t.pa),
            avg_avg,
            hr_trend,
            hit_rate_trend,
        })
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Drought and activity numbers for one batter as of a date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameLogStats {
    pub games_played: u32,
    pub home_runs_this_season: u32,
    pub games_since_last_hr: u32,
    pub days_since_last_hr: i64,
    pub last_hr_date: Option<NaiveDate>,
    pub last_played_date: Option<NaiveDate>,
    pub days_since_last_played: Option<i64>,
    pub at_bats_since_last_hr: u32,
    pub hits_since_last_hr: u32,
    pub trailing: Option<TrailingWindow>,
}

impl GameLogStats {
    fn empty() -> Self {
        GameLogStats {
            games_played: 0,
            home_runs_this_season: 0,
            games_since_last_hr: 0,
            days_since_last_hr: 0,
            last_hr_date: None,
            last_played_date: None,
            days_since_last_played: None,
            at_bats_since_last_hr: 0,
            hits_since_last_hr: 0,
            trailing: None,
        }
    }
}

/// Walk a chronological log up to and including `as_of`.
///
/// Entries after `as_of` and entries with `did_play == false` are ignored.
/// The log is expected in ascending date order; a final stable sort keeps
/// the result correct when it is not.
pub fn analyze_game_log(log: &[GameLogEntry], as_of: NaiveDate, window_games: usize) -> GameLogStats {
    let mut played: Vec<&GameLogEntry> = log
        .iter()
        .filter(|e| e.did_play && e.date <= as_of)
        .collect();
    played.sort_by_key(|e| e.date);

    let (Some(first), Some(last)) = (played.first(), played.last()) else {
        return GameLogStats::empty();
    };
    let first_date = first.date;
    let last_date = last.date;

    let last_hr_idx = played.iter().rposition(|e| e.home_runs > 0);
    let since: &[&GameLogEntry] = match last_hr_idx {
        Some(i) => &played[i + 1..],
        None => &played[..],
    };

    let (games_since_last_hr, days_since_last_hr, last_hr_date) = match last_hr_idx {
        Some(i) => {
            let hr_date = played[i].date;
            (since.len() as u32, (last_date - hr_date).num_days(), Some(hr_date))
        }
        None => (
            played.len() as u32,
            (last_date - first_date).num_days() + 1,
            None,
        ),
    };

    let window: Vec<&GameLogEntry> = played.iter().rev().take(window_games).copied().collect();

    GameLogStats {
        games_played: played.len() as u32,
        home_runs_this_season: saturating_sum(played.iter().map(|e| e.home_runs)),
        games_since_last_hr,
        days_since_last_hr,
        last_hr_date,
        last_played_date: Some(last_date),
        days_since_last_played: Some((as_of - last_date).num_days()),
        at_bats_since_last_hr: saturating_sum(since.iter().map(|e| e.at_bats)),
        hits_since_last_hr: saturating_sum(since.iter().map(|e| e.hits)),
        trailing: TrailingWindow::from_recent_first(&window),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
