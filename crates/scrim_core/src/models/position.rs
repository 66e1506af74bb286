use serde::{Deserialize, Serialize};
use std::fmt;

/// The five named team slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Position {
    Top,
    Jungle,
    Mid,
    Adc,
    Support,
}

impl Position {
    /// Slot order used for display and for filling leftover slots.
    pub const ALL: [Position; 5] = [
        Position::Top,
        Position::Jungle,
        Position::Mid,
        Position::Adc,
        Position::Support,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Position::Top => "TOP",
            Position::Jungle => "JUNGLE",
            Position::Mid => "MID",
            Position::Adc => "ADC",
            Position::Support => "SUPPORT",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which side of the map a team plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamSide {
    Blue,
    Red,
}

impl TeamSide {
    pub fn opponent(&self) -> TeamSide {
        match self {
            TeamSide::Blue => TeamSide::Red,
            TeamSide::Red => TeamSide::Blue,
        }
    }
}

impl fmt::Display for TeamSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamSide::Blue => f.write_str("blue"),
            TeamSide::Red => f.write_str("red"),
        }
    }
}
