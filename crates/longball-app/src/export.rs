// Report export: flat rows as CSV, explanations as pretty JSON.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use longball_engine::model::PlayerKey;
use longball_engine::report::MatchupExplanation;
use longball_engine::{MatchupRow, MatchupScoreResult};

/// Files written by [`write_report`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub csv: PathBuf,
    pub json: PathBuf,
}

/// Write `rows` as CSV with a header line.
pub fn write_rows_csv<W: Write>(writer: W, rows: &[MatchupRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row).context("failed to write CSV row")?;
    }
    wtr.flush().context("failed to flush CSV output")?;
    Ok(())
}

/// Write the nested explanation of every result as one pretty JSON array.
pub fn write_explanations_json<W: Write>(
    mut writer: W,
    results: &[MatchupScoreResult],
) -> Result<()> {
    let explanations: Vec<MatchupExplanation<'_>> =
        results.iter().map(MatchupScoreResult::explain).collect();
    let raw =
        serde_json::to_string_pretty(&explanations).context("failed to serialize explanations")?;
    writer
        .write_all(raw.as_bytes())
        .context("failed to write explanations")?;
    Ok(())
}

/// File stem for a run, e.g. `2025-07-01_pat-sample_vs_aaa`.
pub fn report_stem(pitcher: &PlayerKey, opponent: &str, as_of: NaiveDate) -> String {
    format!(
        "{}_{}_vs_{}",
        as_of.format("%Y-%m-%d"),
        slug(&pitcher.name),
        slug(opponent)
    )
}

fn slug(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

/// Write `<stem>.csv` and `<stem>.json` under `dir`, creating it if needed.
pub fn write_report(
    dir: &Path,
    pitcher: &PlayerKey,
    opponent: &str,
    as_of: NaiveDate,
    results: &[MatchupScoreResult],
) -> Result<ReportPaths> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create report directory {}", dir.display()))?;
    let stem = report_stem(pitcher, opponent, as_of);
    let paths = ReportPaths {
        csv: dir.join(format!("{stem}.csv")),
        json: dir.join(format!("{stem}.json")),
    };

    let rows: Vec<MatchupRow> = results.iter().map(MatchupScoreResult::to_row).collect();
    let csv_file = fs::File::create(&paths.csv)
        .with_context(|| format!("failed to create {}", paths.csv.display()))?;
    write_rows_csv(csv_file, &rows)?;

    let json_file = fs::File::create(&paths.json)
        .with_context(|| format!("failed to create {}", paths.json.display()))?;
    write_explanations_json(json_file, results)?;

    Ok(paths)
}
