// Report orchestration: load data, score a lineup, export and store it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use longball_engine::model::PlayerKey;
use longball_engine::{MatchupEngine, MatchupScoreResult};
use tracing::info;

use crate::config::Config;
use crate::data;
use crate::db::ReportStore;
use crate::export::{self, ReportPaths};

/// One lineup report to produce.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub pitcher: PlayerKey,
    pub opponent: String,
    pub as_of: NaiveDate,
    /// Overrides the configured report directory.
    pub out_dir: Option<PathBuf>,
    pub store: bool,
}

#[derive(Debug)]
pub struct ReportOutcome {
    pub results: Vec<MatchupScoreResult>,
    pub files: ReportPaths,
    /// Set when the run was saved to the report store.
    pub run_id: Option<i64>,
}

/// Produce a report for `request` using the inputs and settings in `config`.
pub fn run_report(config: &Config, request: &ReportRequest) -> Result<ReportOutcome> {
    let season = data::load_all(&config.data_paths).context("failed to load season data")?;
    info!(
        roster = season.roster_len(),
        logged = season.logged_players(),
        "inputs ready"
    );

    let engine = MatchupEngine::new(config.engine.clone(), season)
        .context("invalid engine configuration")?;
    let results = engine.evaluate_team(&request.pitcher, &request.opponent, request.as_of);

    let out_dir = request
        .out_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.report_dir));
    let files = export::write_report(
        &out_dir,
        &request.pitcher,
        &request.opponent,
        request.as_of,
        &results,
    )?;
    info!(csv = %files.csv.display(), json = %files.json.display(), "report written");

    let run_id = if request.store {
        let store = ReportStore::open(&config.db_path).context("failed to open report store")?;
        let rows: Vec<_> = results.iter().map(MatchupScoreResult::to_row).collect();
        let id = store.save_run(&request.pitcher, &request.opponent, request.as_of, &rows)?;
        info!(run_id = id, "report run saved");
        Some(id)
    } else {
        None
    };

    Ok(ReportOutcome {
        results,
        files,
        run_id,
    })
}
