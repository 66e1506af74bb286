pub mod applicant;
pub mod match_record;
pub mod position;

pub use applicant::{Applicant, PositionPreference};
pub use match_record::{MatchRecord, PlayerLine};
pub use position::{Position, TeamSide};
