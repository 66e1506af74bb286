//! Scrim aggregate: lifecycle status, mode, team rosters and the state
//! document itself. Everything here is pure data plus validation; mutation
//! entry points live in the transition engine.

mod roster;
mod state;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use roster::TeamRoster;
pub use state::{Bucket, ScrimState, MAX_APPLICANTS, MAX_WAITLIST, TEAM_SIZE};

/// Lifecycle phase of a scrim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrimStatus {
    Recruiting,
    TeamBuilding,
    InProgress,
    Finished,
}

impl fmt::Display for ScrimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScrimStatus::Recruiting => "recruiting",
            ScrimStatus::TeamBuilding => "team_building",
            ScrimStatus::InProgress => "in_progress",
            ScrimStatus::Finished => "finished",
        };
        f.write_str(label)
    }
}

/// Game mode. Alters validation rules, not the lifecycle shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrimType {
    Normal,
    /// Champions picked in earlier games of the scrim are banned for later ones.
    Fearless,
    /// Random 5/5 split, no tiers, no positions, no champion selection.
    Aram,
}

impl fmt::Display for ScrimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScrimType::Normal => "normal",
            ScrimType::Fearless => "fearless",
            ScrimType::Aram => "aram",
        };
        f.write_str(label)
    }
}
