// Longball entry point.
//
// Startup sequence:
// 1. Parse arguments
// 2. Resolve LONGBALL_HOME, write any missing config, load it
// 3. Start the daily log file
// 4. Load data, score the opposing lineup, export and store the run
// 5. Print a ranked summary

use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use longball_app::app::{self, ReportRequest};
use longball_app::{config, logging};
use longball_engine::model::PlayerKey;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "longball")]
#[command(version)]
#[command(about = "Score an opposing lineup against a starting pitcher", long_about = None)]
struct Args {
    /// Starting pitcher's name as it appears in the data files
    #[arg(long, value_name = "NAME")]
    pitcher: String,

    /// Starting pitcher's team
    #[arg(long = "pitcher-team", value_name = "TEAM")]
    pitcher_team: String,

    /// Opposing team whose rostered batters are scored
    #[arg(long, value_name = "TEAM")]
    opponent: String,

    /// Evaluation date (YYYY-MM-DD); defaults to today
    #[arg(long, value_name = "DATE")]
    date: Option<NaiveDate>,

    /// Report directory; defaults to the configured one
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Skip saving the run to the report database
    #[arg(long = "no-store")]
    no_store: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let home = config::home_dir()?;
    // Relative paths in app.toml resolve against the home directory
    std::env::set_current_dir(&home)
        .with_context(|| format!("cannot enter {}", home.display()))?;
    let written = config::write_missing_config(&home)?;
    let config = config::load_config_from(&home).context("failed to load configuration")?;
    let today = chrono::Local::now().date_naive();
    let log_path = logging::init(&home.join(&config.log_dir), &config.log_filter, today)?;
    info!(home = %home.display(), log = %log_path.display(), "longball starting");
    for path in &written {
        info!(path = %path.display(), "wrote default config");
    }

    let request = ReportRequest {
        pitcher: PlayerKey::new(args.pitcher.trim(), args.pitcher_team.trim()),
        opponent: args.opponent.trim().to_string(),
        as_of: args.date.unwrap_or(today),
        out_dir: args.out,
        store: !args.no_store,
    };
    info!(
        pitcher = %request.pitcher,
        opponent = %request.opponent,
        as_of = %request.as_of,
        "evaluating lineup"
    );

    let outcome = match app::run_report(&config, &request) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("report failed: {e:#}");
            return Err(e);
        }
    };

    println!(
        "{} vs {} ({})",
        request.pitcher, request.opponent, request.as_of
    );
    println!(
        "{:>3}  {:<28} {:>6} {:>6} {:>6}  {}",
        "#", "Batter", "Score", "HR%", "Hit%", "Heat"
    );
    for (rank, result) in outcome.results.iter().enumerate() {
        let row = result.to_row();
        let flag = if row.insufficient_data { " *" } else { "" };
        println!(
            "{:>3}  {:<28} {:>6.1} {:>6.1} {:>6.1}  {}{}",
            rank + 1,
            row.batter_name,
            row.score,
            row.hr_probability,
            row.hit_probability,
            row.heat_level,
            flag
        );
    }
    println!();
    println!("csv:  {}", outcome.files.csv.display());
    println!("json: {}", outcome.files.json.display());
    if let Some(id) = outcome.run_id {
        println!("saved as run {id}");
    }

    info!("longball finished");
    Ok(())
}
