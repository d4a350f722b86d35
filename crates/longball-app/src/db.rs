// SQLite persistence for scored lineup runs.

use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use longball_engine::model::PlayerKey;
use longball_engine::MatchupRow;
use rusqlite::types::Type;
use rusqlite::{params, Connection};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Header of one saved lineup evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRun {
    pub id: i64,
    pub pitcher: PlayerKey,
    pub opponent: String,
    pub as_of: NaiveDate,
    pub batters: usize,
    pub created_at: String,
}

/// SQLite-backed store for report runs and their per-batter rows.
pub struct ReportStore {
    conn: Mutex<Connection>,
}

impl ReportStore {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS report_runs (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                pitcher_name TEXT NOT NULL,
                pitcher_team TEXT NOT NULL,
                opponent     TEXT NOT NULL,
                as_of        TEXT NOT NULL,
                batters      INTEGER NOT NULL,
                created_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS matchup_results (
                run_id      INTEGER NOT NULL REFERENCES report_runs(id) ON DELETE CASCADE,
                rank        INTEGER NOT NULL,
                batter_name TEXT NOT NULL,
                batter_team TEXT NOT NULL,
                score       REAL NOT NULL,
                row_json    TEXT NOT NULL,
                PRIMARY KEY (run_id, rank)
            );

            CREATE INDEX IF NOT EXISTS idx_report_runs_pitcher
                ON report_runs(pitcher_name, pitcher_team, as_of);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("report store mutex poisoned"))
    }

    /// Save a lineup run and its rows in one transaction. Rows are stored in
    /// the given order, which becomes their rank. Returns the new run id.
    pub fn save_run(
        &self,
        pitcher: &PlayerKey,
        opponent: &str,
        as_of: NaiveDate,
        rows: &[MatchupRow],
    ) -> Result<i64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().context("failed to begin save transaction")?;

        tx.execute(
            "INSERT INTO report_runs (pitcher_name, pitcher_team, opponent, as_of, batters)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                pitcher.name,
                pitcher.team,
                opponent,
                as_of.format(DATE_FORMAT).to_string(),
                rows.len() as i64,
            ],
        )
        .context("failed to insert report run")?;
        let run_id = tx.last_insert_rowid();

        for (rank, row) in rows.iter().enumerate() {
            let row_json = serde_json::to_string(row).context("failed to serialize matchup row")?;
            tx.execute(
                "INSERT INTO matchup_results (run_id, rank, batter_name, batter_team, score, row_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    run_id,
                    rank as i64,
                    row.batter_name,
                    row.batter_team,
                    row.score,
                    row_json,
                ],
            )
            .context("failed to insert matchup result")?;
        }

        tx.commit().context("failed to commit report run")?;
        Ok(run_id)
    }

    /// All saved runs, newest first.
    pub fn list_runs(&self) -> Result<Vec<ReportRun>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, pitcher_name, pitcher_team, opponent, as_of, batters, created_at
                 FROM report_runs ORDER BY id DESC",
            )
            .context("failed to prepare list_runs query")?;

        let runs = stmt
            .query_map([], run_from_row)
            .context("failed to query report runs")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map report run rows")?;

        Ok(runs)
    }

    /// Load a run header and its rows in rank order. Returns `None` if no run
    /// has that id.
    pub fn load_run(&self, run_id: i64) -> Result<Option<(ReportRun, Vec<MatchupRow>)>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, pitcher_name, pitcher_team, opponent, as_of, batters, created_at
                 FROM report_runs WHERE id = ?1",
            )
            .context("failed to prepare load_run query")?;

        let mut runs = stmt
            .query_map(params![run_id], run_from_row)
            .context("failed to query report run")?;
        let run = match runs.next() {
            Some(row_result) => row_result.context("failed to read report run row")?,
            None => return Ok(None),
        };

        let mut stmt = conn
            .prepare("SELECT row_json FROM matchup_results WHERE run_id = ?1 ORDER BY rank")
            .context("failed to prepare matchup_results query")?;
        let rows = stmt
            .query_map(params![run_id], |row| row.get::<_, String>(0))
            .context("failed to query matchup results")?
            .map(|json| {
                let json = json.context("failed to read matchup result row")?;
                serde_json::from_str::<MatchupRow>(&json)
                    .context("failed to deserialize matchup row")
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some((run, rows)))
    }
}

fn run_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReportRun> {
    let as_of: String = row.get(4)?;
    let as_of = NaiveDate::parse_from_str(&as_of, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    let batters: i64 = row.get(5)?;
    Ok(ReportRun {
        id: row.get(0)?,
        pitcher: PlayerKey::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?),
        opponent: row.get(3)?,
        as_of,
        batters: batters.max(0) as usize,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: create a fresh in-memory store for each test.
    fn test_store() -> ReportStore {
        ReportStore::open(":memory:").expect("in-memory database should open")
    }

    fn make_row(name: &str, score: f64) -> MatchupRow {
        MatchupRow {
            batter_name: name.to_string(),
            batter_team: "AAA".to_string(),
            pitcher_name: "Pat Sample".to_string(),
            pitcher_team: "BBB".to_string(),
            batter_hand: "L".to_string(),
            pitcher_hand: "R".to_string(),
            as_of: day(1),
            score,
            arsenal_matchup: 55.0,
            batter_overall: 60.0,
            pitcher_overall: 45.0,
            historical_trend: 50.0,
            recent_performance: 52.5,
            contextual: 48.0,
            hr_probability: 4.1,
            hit_probability: 24.0,
            reach_base_probability: 31.5,
            strikeout_probability: 22.0,
            batter_pa: 310,
            games_since_last_hr: Some(6),
            ab_since_last_hr: Some(21),
            h_since_last_hr: None,
            expected_ab_per_hr: Some(18.5),
            due_for_hr_score: Some(0.0),
            due_for_hr_hits_score: None,
            contact_trend: "Heating Up".to_string(),
            heat_level: "Normal".to_string(),
            is_active: Some(true),
            low_sample_warning: false,
            insufficient_data: false,
            substitutions: String::new(),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, d).unwrap()
    }

    fn pitcher() -> PlayerKey {
        PlayerKey::new("Pat Sample", "BBB")
    }

    #[test]
    fn open_creates_tables() {
        let store = test_store();
        let conn = store.conn().unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"report_runs".to_string()));
        assert!(tables.contains(&"matchup_results".to_string()));
    }

    #[test]
    fn save_and_load_run_round_trip() {
        let store = test_store();
        let rows = vec![make_row("Alex Example", 64.2), make_row("Sam Other", 51.0)];
        let id = store.save_run(&pitcher(), "AAA", day(1), &rows).unwrap();

        let (run, loaded) = store.load_run(id).unwrap().unwrap();
        assert_eq!(run.id, id);
        assert_eq!(run.pitcher, pitcher());
        assert_eq!(run.opponent, "AAA");
        assert_eq!(run.as_of, day(1));
        assert_eq!(run.batters, 2);
        assert!(!run.created_at.is_empty());
        assert_eq!(loaded, rows);
    }

    #[test]
    fn load_missing_run_is_none() {
        let store = test_store();
        assert!(store.load_run(42).unwrap().is_none());
    }

    #[test]
    fn list_runs_newest_first() {
        let store = test_store();
        let first = store
            .save_run(&pitcher(), "AAA", day(1), &[make_row("Alex Example", 60.0)])
            .unwrap();
        let second = store.save_run(&pitcher(), "CCC", day(2), &[]).unwrap();

        let runs = store.list_runs().unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, second);
        assert_eq!(runs[0].batters, 0);
        assert_eq!(runs[1].id, first);
        assert_eq!(runs[1].opponent, "AAA");
    }

    #[test]
    fn rows_keep_saved_order() {
        let store = test_store();
        let rows = vec![
            make_row("Zed Last", 70.0),
            make_row("Alex Example", 70.0),
            make_row("Mid Name", 40.0),
        ];
        let id = store.save_run(&pitcher(), "AAA", day(3), &rows).unwrap();
        let (_, loaded) = store.load_run(id).unwrap().unwrap();
        let names: Vec<&str> = loaded.iter().map(|r| r.batter_name.as_str()).collect();
        assert_eq!(names, vec!["Zed Last", "Alex Example", "Mid Name"]);
    }
}
