//! Append-only snapshots of finished games.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::position::{Position, TeamSide};
use crate::scrim::ScrimType;

/// One player's line in a finished game. Champion and position are absent for
/// Aram games, which skip both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLine {
    pub email: String,
    pub nickname: String,
    #[serde(default)]
    pub champion: Option<String>,
    #[serde(default)]
    pub position: Option<Position>,
}

/// Immutable record of one finished game, written in the same transaction
/// that flips the scrim to `Finished`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: String,
    pub scrim_id: String,
    pub scrim_type: ScrimType,
    /// 1-based game counter within the scrim.
    pub game_number: u32,
    pub winner: TeamSide,
    pub blue: Vec<PlayerLine>,
    pub red: Vec<PlayerLine>,
    pub played_at: DateTime<Utc>,
}

impl MatchRecord {
    /// All champion names picked in this game, both sides.
    pub fn picked_champions(&self) -> impl Iterator<Item = &str> {
        self.blue
            .iter()
            .chain(self.red.iter())
            .filter_map(|line| line.champion.as_deref())
    }

    pub fn lines_of(&self, side: TeamSide) -> &[PlayerLine] {
        match side {
            TeamSide::Blue => &self.blue,
            TeamSide::Red => &self.red,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrim::ScrimType;

    fn line(email: &str, champion: Option<&str>) -> PlayerLine {
        PlayerLine {
            email: email.into(),
            nickname: email.split('@').next().unwrap().into(),
            champion: champion.map(Into::into),
            position: None,
        }
    }

    #[test]
    fn picked_champions_spans_both_sides() {
        let record = MatchRecord {
            id: "m1".into(),
            scrim_id: "s1".into(),
            scrim_type: ScrimType::Fearless,
            game_number: 1,
            winner: TeamSide::Blue,
            blue: vec![line("a@x.io", Some("Ahri"))],
            red: vec![line("b@x.io", Some("Garen")), line("c@x.io", None)],
            played_at: Utc::now(),
        };
        let picks: Vec<&str> = record.picked_champions().collect();
        assert_eq!(picks, vec!["Ahri", "Garen"]);
        assert_eq!(record.lines_of(TeamSide::Red).len(), 2);
    }
}
