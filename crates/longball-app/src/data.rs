// Season data ingestion.
//
// Reads the CSV inputs (game logs, roster, arsenal tables, contact profiles,
// yearly metrics) into an in-memory store that backs every engine provider
// trait. Parsing is lenient: bad numbers are coerced, bad rows are skipped
// with a warning, and only a missing game-log or roster file is fatal.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use longball_engine::model::{
    ArsenalProfile, ContactProfile, GameLogEntry, Handedness, PitchTypeStats, PlayerIdentity,
    PlayerKey, PriorSeasonStats, YearlyMetrics,
};
use longball_engine::{ArsenalProvider, RosterProvider, SeasonDataProvider};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::DataPaths;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One roster line: identity plus the optional prior-season columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub identity: PlayerIdentity,
    pub position: String,
    pub prior: Option<PriorSeasonStats>,
}

impl RosterEntry {
    pub fn is_pitcher(&self) -> bool {
        is_pitcher_position(&self.position)
    }
}

/// Everything loaded from disk, keyed by player.
#[derive(Debug, Clone, Default)]
pub struct SeasonData {
    game_logs: HashMap<PlayerKey, Vec<GameLogEntry>>,
    roster: HashMap<PlayerKey, RosterEntry>,
    batter_arsenals: HashMap<PlayerKey, ArsenalProfile>,
    pitcher_arsenals: HashMap<PlayerKey, ArsenalProfile>,
    batter_contact: HashMap<PlayerKey, ContactProfile>,
    pitcher_contact: HashMap<PlayerKey, ContactProfile>,
    yearly: HashMap<PlayerKey, YearlyMetrics>,
}

impl SeasonData {
    pub fn roster_len(&self) -> usize {
        self.roster.len()
    }

    pub fn logged_players(&self) -> usize {
        self.game_logs.len()
    }

    pub fn roster_entry(&self, player: &PlayerKey) -> Option<&RosterEntry> {
        self.roster.get(player)
    }
}

impl SeasonDataProvider for SeasonData {
    fn game_log(&self, player: &PlayerKey) -> Option<&[GameLogEntry]> {
        self.game_logs.get(player).map(Vec::as_slice)
    }

    fn prior_season(&self, player: &PlayerKey) -> Option<&PriorSeasonStats> {
        self.roster.get(player).and_then(|r| r.prior.as_ref())
    }

    fn yearly_metrics(&self, player: &PlayerKey) -> Option<&YearlyMetrics> {
        self.yearly.get(player)
    }
}

impl ArsenalProvider for SeasonData {
    fn batter_arsenal(&self, batter: &PlayerKey) -> Option<&ArsenalProfile> {
        self.batter_arsenals.get(batter)
    }

    fn pitcher_arsenal(&self, pitcher: &PlayerKey) -> Option<&ArsenalProfile> {
        self.pitcher_arsenals.get(pitcher)
    }

    fn batter_contact(&self, batter: &PlayerKey) -> Option<&ContactProfile> {
        self.batter_contact.get(batter)
    }

    fn pitcher_contact(&self, pitcher: &PlayerKey) -> Option<&ContactProfile> {
        self.pitcher_contact.get(pitcher)
    }
}

impl RosterProvider for SeasonData {
    fn identity(&self, player: &PlayerKey) -> Option<&PlayerIdentity> {
        self.roster.get(player).map(|r| &r.identity)
    }

    fn team_batters(&self, team: &str) -> Vec<PlayerKey> {
        let mut batters: Vec<PlayerKey> = self
            .roster
            .values()
            .filter(|r| r.identity.key.team == team && !r.is_pitcher())
            .map(|r| r.identity.key.clone())
            .collect();
        batters.sort_by(|a, b| a.name.cmp(&b.name));
        batters
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

// Every field is read as text so one malformed cell never rejects the row.
// Unknown columns are ignored.

#[derive(Debug, Deserialize)]
struct RawGameLogRow {
    date: Option<String>,
    game_id: Option<String>,
    name: Option<String>,
    team: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, alias = "AB")]
    ab: Option<String>,
    #[serde(default, alias = "H")]
    h: Option<String>,
    #[serde(default, rename = "2b", alias = "2B")]
    doubles: Option<String>,
    #[serde(default, rename = "3b", alias = "3B")]
    triples: Option<String>,
    #[serde(default, alias = "HR")]
    hr: Option<String>,
    #[serde(default, alias = "BB")]
    bb: Option<String>,
    #[serde(default, alias = "K", alias = "so", alias = "SO")]
    k: Option<String>,
    #[serde(default, alias = "R")]
    r: Option<String>,
    #[serde(default, alias = "RBI")]
    rbi: Option<String>,
    #[serde(default, alias = "HBP")]
    hbp: Option<String>,
    #[serde(default, alias = "SF")]
    sf: Option<String>,
    #[serde(default, alias = "SH", alias = "sac")]
    sh: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRosterRow {
    name: Option<String>,
    team: Option<String>,
    #[serde(default)]
    position: Option<String>,
    #[serde(default)]
    bats: Option<String>,
    #[serde(default)]
    throws: Option<String>,
    #[serde(default)]
    prior_g: Option<String>,
    #[serde(default)]
    prior_ab: Option<String>,
    #[serde(default)]
    prior_h: Option<String>,
    #[serde(default)]
    prior_hr: Option<String>,
    #[serde(default)]
    prior_avg: Option<String>,
    #[serde(default)]
    prior_slg: Option<String>,
}

/// Shared by the batter and pitcher arsenal files. Only the pitcher file
/// carries `pitch_usage`.
#[derive(Debug, Deserialize)]
struct RawArsenalRow {
    name: Option<String>,
    team: Option<String>,
    pitch_type: Option<String>,
    #[serde(default)]
    pitch_name: Option<String>,
    #[serde(default)]
    pitch_usage: Option<String>,
    #[serde(default)]
    ba: Option<String>,
    #[serde(default)]
    slg: Option<String>,
    #[serde(default)]
    woba: Option<String>,
    #[serde(default)]
    hard_hit_percent: Option<String>,
    #[serde(default)]
    whiff_percent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawContactRow {
    name: Option<String>,
    team: Option<String>,
    #[serde(default, alias = "PA")]
    pa: Option<String>,
    #[serde(default)]
    iso: Option<String>,
    #[serde(default)]
    barrel_percent: Option<String>,
    #[serde(default)]
    hard_hit_percent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawYearlyRow {
    name: Option<String>,
    team: Option<String>,
    year: Option<String>,
    metric: Option<String>,
    value: Option<String>,
}

// ---------------------------------------------------------------------------
// Field coercion
// ---------------------------------------------------------------------------

fn text(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Non-negative count. Fractional values round; anything unparseable,
/// negative or non-finite becomes zero.
fn parse_count(field: &Option<String>) -> u32 {
    text(field)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round().min(u32::MAX as f64) as u32)
        .unwrap_or(0)
}

/// Non-negative finite rate, or `None`.
fn parse_rate(field: &Option<String>) -> Option<f64> {
    text(field)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// A 0-100 column read as a fraction.
fn parse_percent(field: &Option<String>) -> Option<f64> {
    parse_rate(field).map(|v| v / 100.0)
}

fn parse_hand(field: &Option<String>) -> Option<Handedness> {
    text(field).and_then(Handedness::from_code)
}

fn player_key(name: &Option<String>, team: &Option<String>) -> Option<PlayerKey> {
    let name = text(name)?;
    Some(PlayerKey::new(name, text(team).unwrap_or_default()))
}

fn is_pitcher_position(position: &str) -> bool {
    matches!(
        position.trim().to_ascii_uppercase().as_str(),
        "P" | "SP" | "RP"
    )
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, for testing)
// ---------------------------------------------------------------------------

fn load_game_logs_from_reader<R: Read>(
    rdr: R,
) -> Result<HashMap<PlayerKey, Vec<GameLogEntry>>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut logs: HashMap<PlayerKey, Vec<GameLogEntry>> = HashMap::new();

    for (idx, result) in reader.deserialize::<RawGameLogRow>().enumerate() {
        let raw = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping malformed game log row {}: {}", idx + 1, e);
                continue;
            }
        };
        let Some(key) = player_key(&raw.name, &raw.team) else {
            warn!("skipping game log row {} with no player name", idx + 1);
            continue;
        };
        let date = match text(&raw.date).map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d")) {
            Some(Ok(d)) => d,
            _ => {
                warn!("skipping game log row {} for {}: bad or missing date", idx + 1, key);
                continue;
            }
        };
        let did_play = !text(&raw.status).is_some_and(|s| s.eq_ignore_ascii_case("DNP"));

        logs.entry(key).or_default().push(GameLogEntry {
            date,
            game_id: text(&raw.game_id).unwrap_or_default().to_string(),
            did_play,
            at_bats: parse_count(&raw.ab),
            hits: parse_count(&raw.h),
            doubles: parse_count(&raw.doubles),
            triples: parse_count(&raw.triples),
            home_runs: parse_count(&raw.hr),
            walks: parse_count(&raw.bb),
            strikeouts: parse_count(&raw.k),
            runs: parse_count(&raw.r),
            rbi: parse_count(&raw.rbi),
            hit_by_pitch: parse_count(&raw.hbp),
            sac_flies: parse_count(&raw.sf),
            sac_bunts: parse_count(&raw.sh),
        });
    }

    for (key, log) in logs.iter_mut() {
        dedup_and_sort(key, log);
    }
    Ok(logs)
}

/// Sort by date and drop repeated (date, game id) lines, keeping the first.
fn dedup_and_sort(key: &PlayerKey, log: &mut Vec<GameLogEntry>) {
    let mut seen: HashSet<(NaiveDate, String)> = HashSet::new();
    let before = log.len();
    log.retain(|e| seen.insert((e.date, e.game_id.clone())));
    if log.len() < before {
        warn!(
            player = %key,
            dropped = before - log.len(),
            "duplicate game log entries dropped"
        );
    }
    log.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.game_id.cmp(&b.game_id)));
}

fn load_roster_from_reader<R: Read>(rdr: R) -> Result<Vec<RosterEntry>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut roster = Vec::new();

    for (idx, result) in reader.deserialize::<RawRosterRow>().enumerate() {
        let raw = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping malformed roster row {}: {}", idx + 1, e);
                continue;
            }
        };
        let Some(key) = player_key(&raw.name, &raw.team) else {
            warn!("skipping roster row {} with no player name", idx + 1);
            continue;
        };

        let has_prior = [
            &raw.prior_g,
            &raw.prior_ab,
            &raw.prior_h,
            &raw.prior_hr,
            &raw.prior_avg,
            &raw.prior_slg,
        ]
        .iter()
        .any(|f| text(f).is_some());
        let prior = has_prior.then(|| PriorSeasonStats {
            games: parse_count(&raw.prior_g),
            at_bats: parse_count(&raw.prior_ab),
            hits: parse_count(&raw.prior_h),
            home_runs: parse_count(&raw.prior_hr),
            avg: parse_rate(&raw.prior_avg),
            slg: parse_rate(&raw.prior_slg),
        });

        roster.push(RosterEntry {
            identity: PlayerIdentity {
                key,
                bats: parse_hand(&raw.bats),
                throws: parse_hand(&raw.throws),
            },
            position: text(&raw.position).unwrap_or_default().to_string(),
            prior,
        });
    }

    Ok(roster)
}

fn load_arsenal_from_reader<R: Read>(
    rdr: R,
) -> Result<HashMap<PlayerKey, ArsenalProfile>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut profiles: HashMap<PlayerKey, ArsenalProfile> = HashMap::new();

    for (idx, result) in reader.deserialize::<RawArsenalRow>().enumerate() {
        let raw = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping malformed arsenal row {}: {}", idx + 1, e);
                continue;
            }
        };
        let Some(key) = player_key(&raw.name, &raw.team) else {
            warn!("skipping arsenal row {} with no player name", idx + 1);
            continue;
        };
        let Some(pitch_type) = text(&raw.pitch_type).map(str::to_ascii_uppercase) else {
            warn!("skipping arsenal row {} for {}: no pitch type", idx + 1, key);
            continue;
        };

        profiles.entry(key).or_default().insert(
            pitch_type,
            PitchTypeStats {
                pitch_name: text(&raw.pitch_name).map(str::to_string),
                usage_pct: parse_rate(&raw.pitch_usage),
                batting_average: parse_rate(&raw.ba),
                slugging: parse_rate(&raw.slg),
                woba: parse_rate(&raw.woba),
                hard_hit_rate: parse_percent(&raw.hard_hit_percent),
                whiff_rate: parse_percent(&raw.whiff_percent),
            },
        );
    }

    Ok(profiles)
}

fn load_contact_from_reader<R: Read>(
    rdr: R,
) -> Result<HashMap<PlayerKey, ContactProfile>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut profiles = HashMap::new();

    for (idx, result) in reader.deserialize::<RawContactRow>().enumerate() {
        let raw = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping malformed contact row {}: {}", idx + 1, e);
                continue;
            }
        };
        let Some(key) = player_key(&raw.name, &raw.team) else {
            warn!("skipping contact row {} with no player name", idx + 1);
            continue;
        };
        let profile = ContactProfile {
            iso: parse_rate(&raw.iso),
            barrel_rate: parse_percent(&raw.barrel_percent),
            hard_hit_rate: parse_percent(&raw.hard_hit_percent),
            plate_appearances: text(&raw.pa).map(|_| parse_count(&raw.pa)),
        };
        // Later rows for the same player replace earlier ones.
        profiles.insert(key, profile);
    }

    Ok(profiles)
}

fn load_yearly_from_reader<R: Read>(
    rdr: R,
) -> Result<HashMap<PlayerKey, YearlyMetrics>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut metrics: HashMap<PlayerKey, YearlyMetrics> = HashMap::new();

    for (idx, result) in reader.deserialize::<RawYearlyRow>().enumerate() {
        let raw = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping malformed yearly metrics row {}: {}", idx + 1, e);
                continue;
            }
        };
        let Some(key) = player_key(&raw.name, &raw.team) else {
            warn!("skipping yearly metrics row {} with no player name", idx + 1);
            continue;
        };
        let (Some(year), Some(metric), Some(value)) = (
            text(&raw.year).and_then(|s| s.parse::<i32>().ok()),
            text(&raw.metric).map(str::to_ascii_lowercase),
            parse_rate(&raw.value),
        ) else {
            continue;
        };

        metrics
            .entry(key)
            .or_default()
            .entry(year)
            .or_insert_with(BTreeMap::new)
            .insert(metric, value);
    }

    Ok(metrics)
}

// ---------------------------------------------------------------------------
// Path-based loaders (public)
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<std::fs::File, DataError> {
    std::fs::File::open(path).map_err(|e| DataError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn csv_error(path: &Path) -> impl FnOnce(csv::Error) -> DataError + '_ {
    move |e| DataError::Csv {
        path: path.display().to_string(),
        source: e,
    }
}

pub fn load_game_logs(path: &Path) -> Result<HashMap<PlayerKey, Vec<GameLogEntry>>, DataError> {
    load_game_logs_from_reader(open(path)?).map_err(csv_error(path))
}

pub fn load_roster(path: &Path) -> Result<Vec<RosterEntry>, DataError> {
    load_roster_from_reader(open(path)?).map_err(csv_error(path))
}

pub fn load_arsenal(path: &Path) -> Result<HashMap<PlayerKey, ArsenalProfile>, DataError> {
    load_arsenal_from_reader(open(path)?).map_err(csv_error(path))
}

pub fn load_contact(path: &Path) -> Result<HashMap<PlayerKey, ContactProfile>, DataError> {
    load_contact_from_reader(open(path)?).map_err(csv_error(path))
}

pub fn load_yearly_metrics(path: &Path) -> Result<HashMap<PlayerKey, YearlyMetrics>, DataError> {
    load_yearly_from_reader(open(path)?).map_err(csv_error(path))
}

/// Load an optional table, treating a missing file as empty.
fn load_optional<T: Default>(
    path: &Path,
    what: &str,
    load: impl FnOnce(&Path) -> Result<T, DataError>,
) -> Result<T, DataError> {
    if !path.exists() {
        warn!(path = %path.display(), "{what} file not found, continuing without it");
        return Ok(T::default());
    }
    load(path)
}

/// Load every input named in `paths`.
///
/// The game log and roster files are required and must contain at least one
/// usable row; the arsenal, contact and yearly files are optional.
pub fn load_all(paths: &DataPaths) -> Result<SeasonData, DataError> {
    let game_logs = load_game_logs(Path::new(&paths.game_logs))?;
    if game_logs.is_empty() {
        return Err(DataError::Validation(format!(
            "no game log rows loaded from {}",
            paths.game_logs
        )));
    }

    let roster_rows = load_roster(Path::new(&paths.roster))?;
    if roster_rows.is_empty() {
        return Err(DataError::Validation(format!(
            "no roster rows loaded from {}",
            paths.roster
        )));
    }
    let mut roster = HashMap::with_capacity(roster_rows.len());
    for entry in roster_rows {
        if let Some(prev) = roster.insert(entry.identity.key.clone(), entry) {
            warn!(player = %prev.identity.key, "duplicate roster entry, keeping the later row");
        }
    }

    let data = SeasonData {
        game_logs,
        roster,
        batter_arsenals: load_optional(
            Path::new(&paths.batter_arsenal),
            "batter arsenal",
            load_arsenal,
        )?,
        pitcher_arsenals: load_optional(
            Path::new(&paths.pitcher_arsenal),
            "pitcher arsenal",
            load_arsenal,
        )?,
        batter_contact: load_optional(
            Path::new(&paths.batter_contact),
            "batter contact",
            load_contact,
        )?,
        pitcher_contact: load_optional(
            Path::new(&paths.pitcher_contact),
            "pitcher contact",
            load_contact,
        )?,
        yearly: load_optional(
            Path::new(&paths.yearly_metrics),
            "yearly metrics",
            load_yearly_metrics,
        )?,
    };

    info!(
        players_with_logs = data.game_logs.len(),
        roster = data.roster.len(),
        batter_arsenals = data.batter_arsenals.len(),
        pitcher_arsenals = data.pitcher_arsenals.len(),
        "season data loaded"
    );
    Ok(data)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
