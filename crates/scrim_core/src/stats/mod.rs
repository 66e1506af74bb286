//! Aggregate statistics projected from match history.
//!
//! Pure map/reduce over already-validated records; nothing here feeds back
//! into the state machine.

use serde::Serialize;
use std::collections::HashMap;

use crate::models::{MatchRecord, TeamSide};
use crate::scrim::ScrimType;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WinLoss {
    pub wins: u32,
    pub losses: u32,
}

impl WinLoss {
    pub fn games(&self) -> u32 {
        self.wins + self.losses
    }

    pub fn win_rate(&self) -> Option<f64> {
        if self.games() == 0 {
            None
        } else {
            Some(f64::from(self.wins) / f64::from(self.games()))
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserStats {
    pub nickname: String,
    pub record: WinLoss,
    /// Games per champion. Aram games carry no picks and are skipped here.
    pub champions: HashMap<String, u32>,
    /// Win/loss against each opponent faced across the enemy team.
    pub versus: HashMap<String, WinLoss>,
}

pub struct StatsProjector;

impl StatsProjector {
    /// Project per-user aggregates from a slice of match records.
    pub fn project(records: &[MatchRecord]) -> HashMap<String, UserStats> {
        let mut stats: HashMap<String, UserStats> = HashMap::new();

        for record in records {
            for side in [TeamSide::Blue, TeamSide::Red] {
                let won = record.winner == side;
                let own = record.lines_of(side);
                let enemy = record.lines_of(side.opponent());

                for line in own {
                    let entry = stats.entry(line.email.clone()).or_default();
                    entry.nickname = line.nickname.clone();
                    if won {
                        entry.record.wins += 1;
                    } else {
                        entry.record.losses += 1;
                    }
                    if record.scrim_type != ScrimType::Aram {
                        if let Some(champion) = &line.champion {
                            *entry.champions.entry(champion.clone()).or_insert(0) += 1;
                        }
                    }
                    for opponent in enemy {
                        let vs = entry.versus.entry(opponent.email.clone()).or_default();
                        if won {
                            vs.wins += 1;
                        } else {
                            vs.losses += 1;
                        }
                    }
                }
            }
        }
        stats
    }
}
