//! The scrim document: aggregate root persisted as one JSON document.
//!
//! All predicates here are pure. Mutating helpers (`push_applicant`,
//! `vacate_applicant`, ...) uphold local invariants but never check
//! permissions or lifecycle legality; that is the transition engine's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ScrimStatus, ScrimType, TeamRoster};
use crate::error::{Result, ScrimError};
use crate::models::{Applicant, TeamSide};

pub const MAX_APPLICANTS: usize = 10;
pub const MAX_WAITLIST: usize = 10;
pub const TEAM_SIZE: usize = 5;

/// Which of the four disjoint buckets currently holds a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Applicants,
    Waitlist,
    BlueTeam,
    RedTeam,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrimState {
    pub id: String,
    pub title: String,
    pub status: ScrimStatus,
    pub scrim_type: ScrimType,
    /// Immutable owner, set at creation.
    pub creator_email: String,
    /// Active applicant pool; doubles as the unassigned pool during team
    /// building. Insertion-ordered, unique by email, at most 10.
    pub applicants: Vec<Applicant>,
    /// FIFO overflow queue, unique by email, disjoint from `applicants`.
    pub waitlist: Vec<Applicant>,
    pub blue_team: TeamRoster,
    pub red_team: TeamRoster,
    /// Fearless mode ban list: champions picked in earlier games of this
    /// scrim. Grows on every `end_game`, cleared only by `reset_fearless`.
    #[serde(default)]
    pub fearless_used_champions: Vec<String>,
    /// Number of games recorded for this scrim so far.
    #[serde(default)]
    pub match_count: u32,
    #[serde(default)]
    pub winning_team: Option<TeamSide>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ScrimState {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        scrim_type: ScrimType,
        creator_email: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: ScrimStatus::Recruiting,
            scrim_type,
            creator_email: creator_email.into(),
            applicants: Vec::new(),
            waitlist: Vec::new(),
            blue_team: TeamRoster::new(),
            red_team: TeamRoster::new(),
            fearless_used_champions: Vec::new(),
            match_count: 0,
            winning_team: None,
            started_at: None,
            created_at,
        }
    }

    pub fn roster(&self, side: TeamSide) -> &TeamRoster {
        match side {
            TeamSide::Blue => &self.blue_team,
            TeamSide::Red => &self.red_team,
        }
    }

    pub fn roster_mut(&mut self, side: TeamSide) -> &mut TeamRoster {
        match side {
            TeamSide::Blue => &mut self.blue_team,
            TeamSide::Red => &mut self.red_team,
        }
    }

    pub fn bucket_of(&self, email: &str) -> Option<Bucket> {
        if self.applicants.iter().any(|a| a.email == email) {
            Some(Bucket::Applicants)
        } else if self.waitlist.iter().any(|a| a.email == email) {
            Some(Bucket::Waitlist)
        } else if self.blue_team.contains_email(email) {
            Some(Bucket::BlueTeam)
        } else if self.red_team.contains_email(email) {
            Some(Bucket::RedTeam)
        } else {
            None
        }
    }

    pub fn contains_email(&self, email: &str) -> bool {
        self.bucket_of(email).is_some()
    }

    /// Registration gate for the applicant pool.
    pub fn can_apply(&self, email: &str) -> Result<()> {
        if self.contains_email(email) {
            return Err(ScrimError::DuplicateRegistration { email: email.to_string() });
        }
        if self.applicants.len() >= MAX_APPLICANTS {
            return Err(ScrimError::CapacityExceeded {
                bucket: "applicants",
                limit: MAX_APPLICANTS,
            });
        }
        Ok(())
    }

    /// Registration gate for the waitlist.
    pub fn can_join_waitlist(&self, email: &str) -> Result<()> {
        if self.contains_email(email) {
            return Err(ScrimError::DuplicateRegistration { email: email.to_string() });
        }
        if self.waitlist.len() >= MAX_WAITLIST {
            return Err(ScrimError::CapacityExceeded { bucket: "waitlist", limit: MAX_WAITLIST });
        }
        Ok(())
    }

    pub fn push_applicant(&mut self, applicant: Applicant) -> Result<()> {
        self.can_apply(&applicant.email)?;
        self.applicants.push(applicant);
        Ok(())
    }

    pub fn push_waitlist(&mut self, applicant: Applicant) -> Result<()> {
        self.can_join_waitlist(&applicant.email)?;
        self.waitlist.push(applicant);
        Ok(())
    }

    /// Remove `email` from the applicant pool.
    ///
    /// During recruiting, a removal that opens a seat promotes exactly one
    /// player from the waitlist head (FIFO). Never more than one per removal.
    pub fn vacate_applicant(&mut self, email: &str) -> Option<Applicant> {
        let idx = self.applicants.iter().position(|a| a.email == email)?;
        let removed = self.applicants.remove(idx);
        if self.status == ScrimStatus::Recruiting
            && self.applicants.len() < MAX_APPLICANTS
            && !self.waitlist.is_empty()
        {
            let promoted = self.waitlist.remove(0);
            log::debug!("scrim {}: promoted {} from waitlist", self.id, promoted.email);
            self.applicants.push(promoted);
        }
        Some(removed)
    }

    pub fn remove_from_waitlist(&mut self, email: &str) -> Option<Applicant> {
        let idx = self.waitlist.iter().position(|a| a.email == email)?;
        Some(self.waitlist.remove(idx))
    }

    /// Every distinct player currently attached to the scrim's active game
    /// grouping (pool plus both rosters), assignment state cleared.
    pub fn all_participants(&self) -> Vec<Applicant> {
        let mut seen: Vec<Applicant> = Vec::new();
        let pool = self.applicants.iter().cloned();
        let blue = self.blue_team.players().cloned();
        let red = self.red_team.players().cloned();
        for mut player in pool.chain(blue).chain(red) {
            if !seen.iter().any(|p| p.email == player.email) {
                player.clear_assignment();
                seen.push(player);
            }
        }
        seen
    }

    /// Structural invariants that must hold for every reachable state.
    /// Returns the first violation found.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        if self.applicants.len() > MAX_APPLICANTS {
            return Err(format!("applicant pool over capacity: {}", self.applicants.len()));
        }
        if self.waitlist.len() > MAX_WAITLIST {
            return Err(format!("waitlist over capacity: {}", self.waitlist.len()));
        }

        let mut emails: Vec<&str> = Vec::new();
        let buckets = self
            .applicants
            .iter()
            .chain(self.waitlist.iter())
            .chain(self.blue_team.players())
            .chain(self.red_team.players());
        for player in buckets {
            if emails.contains(&player.email.as_str()) {
                return Err(format!("{} appears in more than one bucket", player.email));
            }
            emails.push(&player.email);
        }

        if self.status == ScrimStatus::Recruiting
            && (!self.blue_team.is_empty() || !self.red_team.is_empty())
        {
            return Err("team rosters must be empty while recruiting".to_string());
        }

        for side in [TeamSide::Blue, TeamSide::Red] {
            for player in self.roster(side).players() {
                match player.assigned_position {
                    Some(pos) if self.roster(side).position_of(&player.email) != Some(pos) => {
                        return Err(format!("{} has a stale assigned position", player.email));
                    }
                    None => {
                        return Err(format!("{} is seated without an assigned position", player.email));
                    }
                    _ => {}
                }
            }
        }

        if self.winning_team.is_some() && self.status != ScrimStatus::Finished {
            return Err("winning team set outside finished status".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PositionPreference;

    fn applicant(email: &str) -> Applicant {
        Applicant::new(email, email.split('@').next().unwrap(), "Gold", PositionPreference::All)
    }

    fn recruiting_scrim() -> ScrimState {
        ScrimState::new("s1", "Tuesday scrim", ScrimType::Normal, "owner@x.io", Utc::now())
    }

    #[test]
    fn capacity_gate_rejects_eleventh_applicant() {
        let mut scrim = recruiting_scrim();
        for i in 0..MAX_APPLICANTS {
            scrim.push_applicant(applicant(&format!("p{}@x.io", i))).unwrap();
        }
        let err = scrim.push_applicant(applicant("late@x.io")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::CapacityExceeded);
        assert_eq!(scrim.applicants.len(), MAX_APPLICANTS);
    }

    #[test]
    fn duplicate_registration_rejected_across_buckets() {
        let mut scrim = recruiting_scrim();
        scrim.push_applicant(applicant("p@x.io")).unwrap();
        assert!(scrim.push_waitlist(applicant("p@x.io")).is_err());
        assert!(scrim.push_applicant(applicant("p@x.io")).is_err());
    }

    #[test]
    fn vacate_promotes_exactly_one_fifo() {
        let mut scrim = recruiting_scrim();
        for i in 0..MAX_APPLICANTS {
            scrim.push_applicant(applicant(&format!("p{}@x.io", i))).unwrap();
        }
        scrim.push_waitlist(applicant("first@x.io")).unwrap();
        scrim.push_waitlist(applicant("second@x.io")).unwrap();

        let removed = scrim.vacate_applicant("p3@x.io").unwrap();
        assert_eq!(removed.email, "p3@x.io");
        assert_eq!(scrim.applicants.len(), MAX_APPLICANTS);
        assert!(scrim.applicants.iter().any(|a| a.email == "first@x.io"));
        assert_eq!(scrim.waitlist.len(), 1);
        assert_eq!(scrim.waitlist[0].email, "second@x.io");
    }

    #[test]
    fn vacate_without_waitlist_just_removes() {
        let mut scrim = recruiting_scrim();
        scrim.push_applicant(applicant("p@x.io")).unwrap();
        assert!(scrim.vacate_applicant("p@x.io").is_some());
        assert!(scrim.applicants.is_empty());
        assert!(scrim.vacate_applicant("p@x.io").is_none());
    }

    #[test]
    fn invariants_catch_cross_bucket_duplicates() {
        let mut scrim = recruiting_scrim();
        scrim.push_applicant(applicant("p@x.io")).unwrap();
        scrim.waitlist.push(applicant("p@x.io"));
        assert!(scrim.check_invariants().is_err());
    }

    #[test]
    fn all_participants_deduplicates_and_clears_assignment() {
        let mut scrim = recruiting_scrim();
        scrim.status = ScrimStatus::TeamBuilding;
        scrim.push_applicant(applicant("pool@x.io")).unwrap();
        let _ = scrim
            .blue_team
            .assign(crate::models::Position::Top, applicant("top@x.io"));
        let all = scrim.all_participants();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|a| a.assigned_position.is_none()));
    }
}
