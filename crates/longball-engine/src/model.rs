// Core data model: player identity, game logs, season aggregates, arsenal
// tables and contact profiles.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Canonical lookup key shared by every data provider: `(name, team)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerKey {
    pub name: String,
    pub team: String,
}

impl PlayerKey {
    pub fn new(name: impl Into<String>, team: impl Into<String>) -> Self {
        PlayerKey {
            name: name.into(),
            team: team.into(),
        }
    }
}

impl fmt::Display for PlayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.team)
    }
}

/// Batting or throwing side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handedness {
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "R")]
    Right,
    /// Switch hitter. Only meaningful for the batting side.
    #[serde(rename = "S")]
    Switch,
}

impl Handedness {
    /// Parse the one-letter codes used by roster files. `B` is accepted as
    /// an alias for switch hitters.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "L" => Some(Handedness::Left),
            "R" => Some(Handedness::Right),
            "S" | "B" => Some(Handedness::Switch),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Handedness::Left => "L",
            Handedness::Right => "R",
            Handedness::Switch => "S",
        }
    }

    /// The side a batter actually hits from against a pitcher throwing with
    /// `pitcher_throws`. Switch hitters take the opposite side.
    pub fn batting_side_against(self, pitcher_throws: Handedness) -> Handedness {
        match self {
            Handedness::Switch => match pitcher_throws {
                Handedness::Left => Handedness::Right,
                _ => Handedness::Left,
            },
            side => side,
        }
    }
}

/// Roster entry for a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub key: PlayerKey,
    pub bats: Option<Handedness>,
    pub throws: Option<Handedness>,
}

// ---------------------------------------------------------------------------
// Game log
// ---------------------------------------------------------------------------

/// One player-date-game line. Counts are already coerced to non-negative
/// integers by the ingestion layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLogEntry {
    pub date: NaiveDate,
    pub game_id: String,
    pub did_play: bool,
    pub at_bats: u32,
    pub hits: u32,
    pub doubles: u32,
    pub triples: u32,
    pub home_runs: u32,
    pub walks: u32,
    pub strikeouts: u32,
    pub runs: u32,
    pub rbi: u32,
    pub hit_by_pitch: u32,
    pub sac_flies: u32,
    pub sac_bunts: u32,
}

impl GameLogEntry {
    /// An empty played line for `date`; tests and loaders fill in the counts.
    pub fn played(date: NaiveDate, game_id: impl Into<String>) -> Self {
        GameLogEntry {
            date,
            game_id: game_id.into(),
            did_play: true,
            at_bats: 0,
            hits: 0,
            doubles: 0,
            triples: 0,
            home_runs: 0,
            walks: 0,
            strikeouts: 0,
            runs: 0,
            rbi: 0,
            hit_by_pitch: 0,
            sac_flies: 0,
            sac_bunts: 0,
        }
    }

    /// AB + BB + HBP + SF + SAC.
    pub fn plate_appearances_approx(&self) -> u32 {
        [self.walks, self.hit_by_pitch, self.sac_flies, self.sac_bunts]
            .iter()
            .fold(self.at_bats, |pa, n| pa.saturating_add(*n))
    }
}

// ---------------------------------------------------------------------------
// Season aggregate
// ---------------------------------------------------------------------------

/// Cumulative season counts for one player, built by folding game-log lines
/// in date order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSeasonAggregate {
    pub name: String,
    pub team: String,
    pub games_played: u32,
    pub at_bats: u32,
    pub hits: u32,
    pub doubles: u32,
    pub triples: u32,
    pub home_runs: u32,
    pub walks: u32,
    pub strikeouts: u32,
    pub runs: u32,
    pub rbi: u32,
    pub hit_by_pitch: u32,
    pub sac_flies: u32,
    pub sac_bunts: u32,
}

impl PlayerSeasonAggregate {
    pub fn empty(key: &PlayerKey) -> Self {
        PlayerSeasonAggregate {
            name: key.name.clone(),
            team: key.team.clone(),
            ..Default::default()
        }
    }

    /// Fold a single game line into the aggregate. Unplayed dates are
    /// ignored and counts saturate at `u32::MAX`. Returns the new aggregate
    /// so the fold stays pure.
    pub fn apply(mut self, entry: &GameLogEntry) -> Self {
        if !entry.did_play {
            return self;
        }
        self.games_played = self.games_played.saturating_add(1);
        self.at_bats = self.at_bats.saturating_add(entry.at_bats);
        self.hits = self.hits.saturating_add(entry.hits);
        self.doubles = self.doubles.saturating_add(entry.doubles);
        self.triples = self.triples.saturating_add(entry.triples);
        self.home_runs = self.home_runs.saturating_add(entry.home_runs);
        self.walks = self.walks.saturating_add(entry.walks);
        self.strikeouts = self.strikeouts.saturating_add(entry.strikeouts);
        self.runs = self.runs.saturating_add(entry.runs);
        self.rbi = self.rbi.saturating_add(entry.rbi);
        self.hit_by_pitch = self.hit_by_pitch.saturating_add(entry.hit_by_pitch);
        self.sac_flies = self.sac_flies.saturating_add(entry.sac_flies);
        self.sac_bunts = self.sac_bunts.saturating_add(entry.sac_bunts);
        self
    }

    /// Reduce a full game log. Equivalent to calling [`apply`](Self::apply)
    /// entry by entry, in any batching.
    pub fn from_game_log<'a, I>(key: &PlayerKey, entries: I) -> Self
    where
        I: IntoIterator<Item = &'a GameLogEntry>,
    {
        entries
            .into_iter()
            .fold(Self::empty(key), |agg, entry| agg.apply(entry))
    }

    /// AB + BB + HBP + SF + SAC. Never less than `at_bats`.
    pub fn plate_appearances_approx(&self) -> u32 {
        [self.walks, self.hit_by_pitch, self.sac_flies, self.sac_bunts]
            .iter()
            .fold(self.at_bats, |pa, n| pa.saturating_add(*n))
    }

    pub fn batting_average(&self) -> Option<f64> {
        ratio(self.hits, self.at_bats)
    }

    pub fn slugging(&self) -> Option<f64> {
        if self.at_bats == 0 {
            return None;
        }
        let (h, d, t, hr) = (
            self.hits as f64,
            self.doubles as f64,
            self.triples as f64,
            self.home_runs as f64,
        );
        let singles = (h - d - t - hr).max(0.0);
        let total_bases = singles + 2.0 * d + 3.0 * t + 4.0 * hr;
        Some(total_bases / self.at_bats as f64)
    }

    /// Isolated power, SLG - AVG.
    pub fn isolated_power(&self) -> Option<f64> {
        Some(self.slugging()? - self.batting_average()?)
    }
}

fn ratio(num: u32, den: u32) -> Option<f64> {
    if den == 0 {
        None
    } else {
        Some(num as f64 / den as f64)
    }
}

/// Previous-season line from the roster file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriorSeasonStats {
    pub games: u32,
    pub at_bats: u32,
    pub hits: u32,
    pub home_runs: u32,
    pub avg: Option<f64>,
    pub slg: Option<f64>,
}

impl PriorSeasonStats {
    pub fn isolated_power(&self) -> Option<f64> {
        match (self.slg, self.avg) {
            (Some(slg), Some(avg)) if self.at_bats > 0 => Some(slg - avg),
            _ => None,
        }
    }
}

/// Per-year metric values for one batter (year -> metric name -> value).
pub type YearlyMetrics = BTreeMap<i32, BTreeMap<String, f64>>;

// ---------------------------------------------------------------------------
// Arsenal and contact profiles
// ---------------------------------------------------------------------------

/// Per-pitch-type numbers from one side's perspective. Rates are fractions;
/// usage is a percentage (0-100) and only meaningful on the pitcher side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PitchTypeStats {
    pub pitch_name: Option<String>,
    pub usage_pct: Option<f64>,
    pub batting_average: Option<f64>,
    pub slugging: Option<f64>,
    pub woba: Option<f64>,
    pub hard_hit_rate: Option<f64>,
    pub whiff_rate: Option<f64>,
}

/// A player's arsenal table keyed by pitch-type code (`FF`, `SL`, ...).
///
/// Backed by an ordered map so weighted sums always accumulate in the same
/// order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArsenalProfile {
    pub pitches: BTreeMap<String, PitchTypeStats>,
}

impl ArsenalProfile {
    pub fn get(&self, pitch_type: &str) -> Option<&PitchTypeStats> {
        self.pitches.get(pitch_type)
    }

    pub fn insert(&mut self, pitch_type: impl Into<String>, stats: PitchTypeStats) {
        self.pitches.insert(pitch_type.into(), stats);
    }

    pub fn is_empty(&self) -> bool {
        self.pitches.is_empty()
    }
}

/// Season batted-ball quality. For batters these are the batter's own
/// rates; for pitchers, rates allowed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactProfile {
    pub iso: Option<f64>,
    pub barrel_rate: Option<f64>,
    pub hard_hit_rate: Option<f64>,
    /// Sample behind the rates (PA for batters, batters faced for pitchers).
    pub plate_appearances: Option<u32>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
