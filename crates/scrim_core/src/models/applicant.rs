//! Applicant records: one player's registration in a scrim.
//!
//! An `Applicant` travels between the four buckets of a `ScrimState`
//! (applicant pool, waitlist, blue team, red team). The `email` field is the
//! only stable identity; everything else is mutable presentation or
//! per-scrim assignment state.

use serde::{Deserialize, Serialize};

use super::position::Position;

/// Ranked position wishes, or the "anywhere is fine" sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "ranks", rename_all = "snake_case")]
pub enum PositionPreference {
    /// Player accepts any of the five slots.
    All,
    /// 1..=3 distinct positions, most preferred first.
    Ranked(Vec<Position>),
}

impl PositionPreference {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            PositionPreference::All => Ok(()),
            PositionPreference::Ranked(ranks) => {
                if ranks.is_empty() || ranks.len() > 3 {
                    return Err(format!(
                        "position preferences must list 1 to 3 slots, got {}",
                        ranks.len()
                    ));
                }
                for (i, pos) in ranks.iter().enumerate() {
                    if ranks[..i].contains(pos) {
                        return Err(format!("duplicate position preference: {}", pos));
                    }
                }
                Ok(())
            }
        }
    }

    /// Whether this preference allows being seated at `position`.
    pub fn accepts(&self, position: Position) -> bool {
        match self {
            PositionPreference::All => true,
            PositionPreference::Ranked(ranks) => ranks.contains(&position),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, PositionPreference::All)
    }

    /// Preference at the given rank (0 = most preferred), if any.
    pub fn at_rank(&self, rank: usize) -> Option<Position> {
        match self {
            PositionPreference::All => None,
            PositionPreference::Ranked(ranks) => ranks.get(rank).copied(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicant {
    /// Unique identity key across all buckets.
    pub email: String,
    pub nickname: String,
    /// Free-form rank label (e.g. "Gold 2"). Ignored for Aram scrims.
    pub tier: String,
    pub positions: PositionPreference,
    /// Champion picked during the current game, locked once set.
    #[serde(default)]
    pub champion: Option<String>,
    /// Actual slot granted once seated on a team.
    #[serde(default)]
    pub assigned_position: Option<Position>,
}

impl Applicant {
    pub fn new(
        email: impl Into<String>,
        nickname: impl Into<String>,
        tier: impl Into<String>,
        positions: PositionPreference,
    ) -> Self {
        Self {
            email: email.into(),
            nickname: nickname.into(),
            tier: tier.into(),
            positions,
            champion: None,
            assigned_position: None,
        }
    }

    /// Drop per-game assignment state when the player returns to a pool.
    pub fn clear_assignment(&mut self) {
        self.assigned_position = None;
        self.champion = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranked_preferences_reject_duplicates_and_overflow() {
        assert!(PositionPreference::Ranked(vec![Position::Top]).validate().is_ok());
        assert!(PositionPreference::Ranked(vec![Position::Top, Position::Top])
            .validate()
            .is_err());
        assert!(PositionPreference::Ranked(vec![]).validate().is_err());
        assert!(PositionPreference::Ranked(vec![
            Position::Top,
            Position::Jungle,
            Position::Mid,
            Position::Adc,
        ])
        .validate()
        .is_err());
    }

    #[test]
    fn all_preference_accepts_every_slot() {
        for pos in Position::ALL {
            assert!(PositionPreference::All.accepts(pos));
        }
        let ranked = PositionPreference::Ranked(vec![Position::Mid]);
        assert!(ranked.accepts(Position::Mid));
        assert!(!ranked.accepts(Position::Top));
    }

    #[test]
    fn clear_assignment_resets_game_state() {
        let mut a = Applicant::new("a@b.c", "A", "Gold", PositionPreference::All);
        a.champion = Some("Ahri".into());
        a.assigned_position = Some(Position::Mid);
        a.clear_assignment();
        assert!(a.champion.is_none());
        assert!(a.assigned_position.is_none());
    }
}
