// Library root: the matchup scoring engine. Pure and synchronous; all I/O
// lives in the application crate.

pub mod cache;
pub mod config;
pub mod engine;
pub mod model;
pub mod report;
pub mod scoring;

pub use config::EngineConfig;
pub use engine::{
    ArsenalProvider, EvaluationError, MatchupData, MatchupEngine, RosterProvider,
    SeasonDataProvider,
};
pub use report::{MatchupRow, MatchupScoreResult};
