//! Action requests consumed by the transition engine.
//!
//! Every mutation of a scrim document is one of these variants. The payload
//! shapes mirror what request handlers receive from clients; the engine
//! validates them against the freshly-read state, never against anything the
//! client cached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::identity::Role;
use crate::models::{Applicant, MatchRecord, Position, PositionPreference, TeamSide};
use crate::scrim::ScrimState;

/// Registration form for `apply` / `apply_waitlist`.
#[derive(Debug, Clone, PartialEq, Eq, Validate, Serialize, Deserialize)]
pub struct ApplyPayload {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 24))]
    pub nickname: String,
    /// Free-form rank label. May be empty for Aram scrims only.
    #[validate(length(max = 32))]
    pub tier: String,
    pub positions: PositionPreference,
}

impl ApplyPayload {
    pub fn into_applicant(self) -> Applicant {
        Applicant::new(self.email, self.nickname, self.tier, self.positions)
    }
}

/// Full roster overwrite for `update_teams`: slot -> email of an existing
/// participant. Players left out of both maps return to the unassigned pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTeamsPayload {
    pub blue: BTreeMap<Position, String>,
    pub red: BTreeMap<Position, String>,
}

/// One player's final pick line in an `end_game` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerResultEntry {
    pub email: String,
    pub champion: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndGamePayload {
    pub winner: TeamSide,
    /// Exactly one entry per rostered player for Normal/Fearless games.
    /// Ignored for Aram, which records rosters without picks.
    #[serde(default)]
    pub results: Vec<PlayerResultEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Apply(ApplyPayload),
    ApplyWaitlist(ApplyPayload),
    Leave,
    LeaveWaitlist,
    StartTeamBuilding,
    AssignSlot { team: TeamSide, position: Position, email: String },
    UpdateTeams(UpdateTeamsPayload),
    StartGame,
    ResetToRecruiting,
    ResetToTeamBuilding,
    PickChampion { champion: String },
    EndGame(EndGamePayload),
    ResetFearless,
    RemoveMember { email: String },
    Disband,
}

impl Action {
    /// Stable wire name, used in logs and rejection messages.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Apply(_) => "apply",
            Action::ApplyWaitlist(_) => "apply_waitlist",
            Action::Leave => "leave",
            Action::LeaveWaitlist => "leave_waitlist",
            Action::StartTeamBuilding => "start_team_building",
            Action::AssignSlot { .. } => "assign_slot",
            Action::UpdateTeams(_) => "update_teams",
            Action::StartGame => "start_game",
            Action::ResetToRecruiting => "reset_to_recruiting",
            Action::ResetToTeamBuilding => "reset_to_team_building",
            Action::PickChampion { .. } => "pick_champion",
            Action::EndGame(_) => "end_game",
            Action::ResetFearless => "reset_fearless",
            Action::RemoveMember { .. } => "remove_member",
            Action::Disband => "disband",
        }
    }
}

/// Who is acting, with what authority, at what time. Resolved by the
/// coordinator per attempt so the engine stays a pure function of its inputs.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub actor_email: String,
    pub role: Role,
    pub now: DateTime<Utc>,
}

impl ActionContext {
    pub fn new(actor_email: impl Into<String>, role: Role, now: DateTime<Utc>) -> Self {
        Self { actor_email: actor_email.into(), role, now }
    }

    /// Admins and the scrim creator may run privileged actions.
    pub fn is_privileged(&self, state: &ScrimState) -> bool {
        self.role == Role::Admin || self.actor_email == state.creator_email
    }
}

/// Result of a successful transition.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The new document, plus a match record to append in the same commit.
    Updated { state: ScrimState, record: Option<MatchRecord> },
    /// The document must be deleted (disband).
    Deleted,
}
