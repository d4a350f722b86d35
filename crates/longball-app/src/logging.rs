// Tracing setup: one append-only log file per day under the configured
// log directory.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable that replaces the configured filter outright.
pub const LOG_ENV: &str = "LONGBALL_LOG";

/// Target prefix shared by the binary and both library crates.
const OWN_TARGET: &str = "longball";

/// Expand a bare level such as `debug` so it applies to longball's own
/// targets only, with everything else held at `warn`. Full directive
/// strings (anything with `=` or `,`) pass through unchanged.
pub fn directives(configured: &str) -> String {
    let configured = configured.trim();
    if configured.contains(['=', ',']) {
        configured.to_string()
    } else {
        format!("warn,{OWN_TARGET}={configured}")
    }
}

pub fn log_file(dir: &Path, day: NaiveDate) -> PathBuf {
    dir.join(format!("longball-{}.log", day.format("%Y-%m-%d")))
}

/// Install the global subscriber, appending to today's file in `dir`.
/// Returns the file path.
pub fn init(dir: &Path, configured: &str, day: NaiveDate) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    let path = log_file(dir, day);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(directives(configured)));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(filter)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_level_is_scoped_to_own_targets() {
        assert_eq!(directives("debug"), "warn,longball=debug");
        assert_eq!(directives(" info "), "warn,longball=info");
    }

    #[test]
    fn full_directives_pass_through() {
        assert_eq!(directives("longball_engine=trace"), "longball_engine=trace");
        assert_eq!(directives("info,rusqlite=debug"), "info,rusqlite=debug");
        // Both forms parse
        assert!(EnvFilter::try_new(directives("debug")).is_ok());
        assert!(EnvFilter::try_new(directives("info,rusqlite=debug")).is_ok());
    }

    #[test]
    fn one_file_per_day() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        assert_eq!(
            log_file(Path::new("logs"), day),
            PathBuf::from("logs/longball-2025-06-30.log")
        );
    }
}
