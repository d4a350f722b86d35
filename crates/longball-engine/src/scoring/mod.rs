// Scoring components: normalization, arsenal matchup, game-log history,
// contextual signals, trends and the composite.

pub mod arsenal;
pub mod composite;
pub mod game_log;
pub mod normalize;
pub mod signals;
pub mod trends;
