//! The scrim state machine.
//!
//! `TransitionEngine::apply` is a pure function from `(state, action, ctx)`
//! to either a fully computed next state or a typed rejection. It performs no
//! I/O: catalog membership is answered by an injected `ChampionCatalog`, the
//! clock comes in through the `ActionContext`, and randomness (Aram team
//! split only) is supplied by the caller. Handlers clone the incoming state
//! and mutate the clone, so a rejection never leaves partial changes behind.

mod action;

use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;
use validator::Validate;

pub use action::{
    Action, ActionContext, ApplyPayload, EndGamePayload, Outcome, PlayerResultEntry,
    UpdateTeamsPayload,
};

use crate::catalog::ChampionCatalog;
use crate::error::{Result, ScrimError};
use crate::models::{Applicant, MatchRecord, PlayerLine, Position, TeamSide};
use crate::scrim::{Bucket, ScrimState, ScrimStatus, ScrimType, MAX_APPLICANTS, TEAM_SIZE};

#[derive(Debug, Default, Clone, Copy)]
pub struct TransitionEngine;

impl TransitionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compute the next state for one action, or reject it whole.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        state: &ScrimState,
        action: &Action,
        ctx: &ActionContext,
        catalog: &dyn ChampionCatalog,
        rng: &mut R,
    ) -> Result<Outcome> {
        let outcome = match action {
            Action::Apply(payload) => self.register(state, ctx, payload, false)?,
            Action::ApplyWaitlist(payload) => self.register(state, ctx, payload, true)?,
            Action::Leave => self.leave(state, ctx)?,
            Action::LeaveWaitlist => self.leave_waitlist(state, ctx)?,
            Action::StartTeamBuilding => self.start_team_building(state, ctx, rng)?,
            Action::AssignSlot { team, position, email } => {
                self.assign_slot(state, ctx, *team, *position, email)?
            }
            Action::UpdateTeams(payload) => self.update_teams(state, ctx, payload)?,
            Action::StartGame => self.start_game(state, ctx)?,
            Action::ResetToRecruiting => self.reset_to_recruiting(state, ctx)?,
            Action::ResetToTeamBuilding => self.reset_to_team_building(state, ctx)?,
            Action::PickChampion { champion } => {
                self.pick_champion(state, ctx, catalog, champion)?
            }
            Action::EndGame(payload) => self.end_game(state, ctx, catalog, payload)?,
            Action::ResetFearless => self.reset_fearless(state, ctx)?,
            Action::RemoveMember { email } => self.remove_member(state, ctx, email)?,
            Action::Disband => self.disband(state, ctx)?,
        };

        if let Outcome::Updated { state: next, .. } = &outcome {
            debug_assert!(
                next.check_invariants().is_ok(),
                "invariant violated after {}: {:?}",
                action.name(),
                next.check_invariants()
            );
        }
        Ok(outcome)
    }

    fn require_status(
        &self,
        state: &ScrimState,
        action: &'static str,
        allowed: &[ScrimStatus],
    ) -> Result<()> {
        if allowed.contains(&state.status) {
            Ok(())
        } else {
            Err(ScrimError::InvalidStateForAction {
                action,
                reason: format!("scrim is {}", state.status),
            })
        }
    }

    fn require_privilege(
        &self,
        state: &ScrimState,
        ctx: &ActionContext,
        action: &'static str,
    ) -> Result<()> {
        if ctx.is_privileged(state) {
            Ok(())
        } else {
            Err(ScrimError::PermissionDenied { actor: ctx.actor_email.clone(), action })
        }
    }

    fn register(
        &self,
        state: &ScrimState,
        ctx: &ActionContext,
        payload: &ApplyPayload,
        to_waitlist: bool,
    ) -> Result<Outcome> {
        let name = if to_waitlist { "apply_waitlist" } else { "apply" };
        self.require_status(state, name, &[ScrimStatus::Recruiting])?;

        payload
            .validate()
            .map_err(|e| ScrimError::MalformedPayload { reason: e.to_string() })?;
        if payload.email != ctx.actor_email {
            return Err(ScrimError::PermissionDenied {
                actor: ctx.actor_email.clone(),
                action: "register someone else",
            });
        }
        // Aram skips tier and position selection entirely.
        if state.scrim_type != ScrimType::Aram {
            payload
                .positions
                .validate()
                .map_err(|reason| ScrimError::MalformedPayload { reason })?;
            if payload.tier.trim().is_empty() {
                return Err(ScrimError::MalformedPayload {
                    reason: "tier is required".to_string(),
                });
            }
        }

        let mut next = state.clone();
        let applicant = payload.clone().into_applicant();
        if to_waitlist {
            next.push_waitlist(applicant)?;
        } else {
            next.push_applicant(applicant)?;
        }
        log::info!("scrim {}: {} registered ({})", next.id, ctx.actor_email, name);
        Ok(Outcome::Updated { state: next, record: None })
    }

    fn leave(&self, state: &ScrimState, ctx: &ActionContext) -> Result<Outcome> {
        self.require_status(state, "leave", &[ScrimStatus::Recruiting])?;
        let mut next = state.clone();
        next.vacate_applicant(&ctx.actor_email).ok_or_else(|| ScrimError::NotFound {
            what: format!("{} in applicant pool", ctx.actor_email),
        })?;
        Ok(Outcome::Updated { state: next, record: None })
    }

    fn leave_waitlist(&self, state: &ScrimState, ctx: &ActionContext) -> Result<Outcome> {
        self.require_status(state, "leave_waitlist", &[ScrimStatus::Recruiting])?;
        let mut next = state.clone();
        next.remove_from_waitlist(&ctx.actor_email).ok_or_else(|| ScrimError::NotFound {
            what: format!("{} on waitlist", ctx.actor_email),
        })?;
        Ok(Outcome::Updated { state: next, record: None })
    }

    fn start_team_building<R: Rng + ?Sized>(
        &self,
        state: &ScrimState,
        ctx: &ActionContext,
        rng: &mut R,
    ) -> Result<Outcome> {
        self.require_status(state, "start_team_building", &[ScrimStatus::Recruiting])?;
        self.require_privilege(state, ctx, "start_team_building")?;
        if state.applicants.len() != MAX_APPLICANTS {
            return Err(ScrimError::InvalidStateForAction {
                action: "start_team_building",
                reason: format!(
                    "needs exactly {} applicants, has {}",
                    MAX_APPLICANTS,
                    state.applicants.len()
                ),
            });
        }

        let mut next = state.clone();
        let mut pool = std::mem::take(&mut next.applicants);
        if next.scrim_type == ScrimType::Aram {
            pool.shuffle(rng);
            let red_half = pool.split_off(TEAM_SIZE);
            for (pos, player) in Position::ALL.into_iter().zip(pool) {
                let _ = next.blue_team.assign(pos, player);
            }
            for (pos, player) in Position::ALL.into_iter().zip(red_half) {
                let _ = next.red_team.assign(pos, player);
            }
        } else {
            Self::slot_by_preference(&mut next, pool);
        }
        next.status = ScrimStatus::TeamBuilding;
        log::info!("scrim {}: team building started by {}", next.id, ctx.actor_email);
        Ok(Outcome::Updated { state: next, record: None })
    }

    /// Initial 5/5 split for Normal/Fearless scrims: ranked wishes first, by
    /// rank, blue side first when both slots are free; "ALL" players fill any
    /// remaining empty slot; whoever is left takes whatever slot remains so
    /// ten players always yield two full teams.
    fn slot_by_preference(next: &mut ScrimState, pool: Vec<Applicant>) {
        let mut remaining = pool;

        for rank in 0..3 {
            let mut i = 0;
            while i < remaining.len() {
                let Some(pos) = remaining[i].positions.at_rank(rank) else {
                    i += 1;
                    continue;
                };
                if next.blue_team.get(pos).is_none() {
                    let player = remaining.remove(i);
                    let _ = next.blue_team.assign(pos, player);
                } else if next.red_team.get(pos).is_none() {
                    let player = remaining.remove(i);
                    let _ = next.red_team.assign(pos, player);
                } else {
                    i += 1;
                }
            }
        }

        let mut i = 0;
        while i < remaining.len() {
            if !remaining[i].positions.is_all() {
                i += 1;
                continue;
            }
            if let Some(pos) = next.blue_team.empty_slots().first().copied() {
                let player = remaining.remove(i);
                let _ = next.blue_team.assign(pos, player);
            } else if let Some(pos) = next.red_team.empty_slots().first().copied() {
                let player = remaining.remove(i);
                let _ = next.red_team.assign(pos, player);
            } else {
                i += 1;
            }
        }

        for player in remaining {
            if let Some(pos) = next.blue_team.empty_slots().first().copied() {
                let _ = next.blue_team.assign(pos, player);
            } else if let Some(pos) = next.red_team.empty_slots().first().copied() {
                let _ = next.red_team.assign(pos, player);
            }
        }
    }

    fn assign_slot(
        &self,
        state: &ScrimState,
        ctx: &ActionContext,
        team: TeamSide,
        position: Position,
        email: &str,
    ) -> Result<Outcome> {
        self.require_status(state, "assign_slot", &[ScrimStatus::TeamBuilding])?;
        self.require_privilege(state, ctx, "assign_slot")?;

        let mut next = state.clone();
        let player = match next.bucket_of(email) {
            None => {
                return Err(ScrimError::NotFound { what: format!("player {}", email) });
            }
            Some(Bucket::Waitlist) => {
                return Err(ScrimError::InvalidStateForAction {
                    action: "assign_slot",
                    reason: "waitlisted players cannot be seated".to_string(),
                });
            }
            Some(Bucket::Applicants) => next.vacate_applicant(email).unwrap_or_else(|| {
                unreachable!("bucket_of said applicants holds {}", email)
            }),
            Some(Bucket::BlueTeam) => next.blue_team.remove_by_email(email).unwrap_or_else(|| {
                unreachable!("bucket_of said blue team holds {}", email)
            }),
            Some(Bucket::RedTeam) => next.red_team.remove_by_email(email).unwrap_or_else(|| {
                unreachable!("bucket_of said red team holds {}", email)
            }),
        };

        // A displaced occupant goes back to the unassigned pool, never away.
        if let Some(displaced) = next.roster_mut(team).assign(position, player) {
            next.applicants.push(displaced);
        }
        Ok(Outcome::Updated { state: next, record: None })
    }

    fn update_teams(
        &self,
        state: &ScrimState,
        ctx: &ActionContext,
        payload: &UpdateTeamsPayload,
    ) -> Result<Outcome> {
        self.require_status(state, "update_teams", &[ScrimStatus::TeamBuilding])?;
        self.require_privilege(state, ctx, "update_teams")?;

        let mut referenced: Vec<&str> = Vec::new();
        for email in payload.blue.values().chain(payload.red.values()) {
            if referenced.contains(&email.as_str()) {
                return Err(ScrimError::MalformedPayload {
                    reason: format!("{} is seated twice", email),
                });
            }
            referenced.push(email);
        }

        let mut next = state.clone();
        let mut participants = next.all_participants();
        let mut take = |email: &str| -> Result<Applicant> {
            let idx = participants.iter().position(|p| p.email == email).ok_or_else(|| {
                ScrimError::NotFound { what: format!("player {}", email) }
            })?;
            Ok(participants.remove(idx))
        };

        let mut blue = crate::scrim::TeamRoster::new();
        for (&pos, email) in &payload.blue {
            let _ = blue.assign(pos, take(email)?);
        }
        let mut red = crate::scrim::TeamRoster::new();
        for (&pos, email) in &payload.red {
            let _ = red.assign(pos, take(email)?);
        }

        next.blue_team = blue;
        next.red_team = red;
        // Everyone not referenced returns to the unassigned pool.
        next.applicants = participants;
        Ok(Outcome::Updated { state: next, record: None })
    }

    fn start_game(&self, state: &ScrimState, ctx: &ActionContext) -> Result<Outcome> {
        self.require_status(state, "start_game", &[ScrimStatus::TeamBuilding])?;
        self.require_privilege(state, ctx, "start_game")?;
        if !state.blue_team.is_full() || !state.red_team.is_full() {
            return Err(ScrimError::InvalidStateForAction {
                action: "start_game",
                reason: format!(
                    "both teams need {} players (blue {}, red {})",
                    TEAM_SIZE,
                    state.blue_team.player_count(),
                    state.red_team.player_count()
                ),
            });
        }

        let mut next = state.clone();
        next.status = ScrimStatus::InProgress;
        next.started_at = Some(ctx.now);
        next.winning_team = None;
        next.applicants.clear();
        next.waitlist.clear();
        log::info!("scrim {}: game started by {}", next.id, ctx.actor_email);
        Ok(Outcome::Updated { state: next, record: None })
    }

    fn reset_to_recruiting(&self, state: &ScrimState, ctx: &ActionContext) -> Result<Outcome> {
        self.require_status(
            state,
            "reset_to_recruiting",
            &[ScrimStatus::TeamBuilding, ScrimStatus::Finished],
        )?;
        self.require_privilege(state, ctx, "reset_to_recruiting")?;

        let mut next = state.clone();
        let participants = next.all_participants();
        next.blue_team = crate::scrim::TeamRoster::new();
        next.red_team = crate::scrim::TeamRoster::new();
        next.applicants = participants;
        next.waitlist.clear();
        next.status = ScrimStatus::Recruiting;
        next.started_at = None;
        next.winning_team = None;
        log::info!("scrim {}: reset to recruiting by {}", next.id, ctx.actor_email);
        Ok(Outcome::Updated { state: next, record: None })
    }

    fn reset_to_team_building(&self, state: &ScrimState, ctx: &ActionContext) -> Result<Outcome> {
        self.require_status(
            state,
            "reset_to_team_building",
            &[ScrimStatus::InProgress, ScrimStatus::Finished],
        )?;
        self.require_privilege(state, ctx, "reset_to_team_building")?;

        let mut next = state.clone();
        next.status = ScrimStatus::TeamBuilding;
        next.started_at = None;
        next.winning_team = None;
        next.blue_team.clear_champions();
        next.red_team.clear_champions();
        Ok(Outcome::Updated { state: next, record: None })
    }

    fn pick_champion(
        &self,
        state: &ScrimState,
        ctx: &ActionContext,
        catalog: &dyn ChampionCatalog,
        champion: &str,
    ) -> Result<Outcome> {
        self.require_status(state, "pick_champion", &[ScrimStatus::InProgress])?;
        if state.scrim_type == ScrimType::Aram {
            return Err(ScrimError::InvalidStateForAction {
                action: "pick_champion",
                reason: "aram games skip champion selection".to_string(),
            });
        }

        let side = if state.blue_team.contains_email(&ctx.actor_email) {
            TeamSide::Blue
        } else if state.red_team.contains_email(&ctx.actor_email) {
            TeamSide::Red
        } else {
            return Err(ScrimError::NotFound {
                what: format!("{} on a team roster", ctx.actor_email),
            });
        };

        let current = state
            .roster(side)
            .find_by_email(&ctx.actor_email)
            .and_then(|p| p.champion.as_deref());
        if current.is_some() {
            return Err(ScrimError::InvalidStateForAction {
                action: "pick_champion",
                reason: "champion already locked for this game".to_string(),
            });
        }
        if !catalog.contains(champion) {
            return Err(ScrimError::InvalidChampionSelection {
                reason: format!("unknown champion: {}", champion),
            });
        }
        if state.scrim_type == ScrimType::Fearless {
            self.check_fearless_pick(state, champion)?;
            let teammate_dup = state
                .roster(side)
                .players()
                .filter_map(|p| p.champion.as_deref())
                .any(|c| same_champion(c, champion));
            if teammate_dup {
                return Err(ScrimError::InvalidChampionSelection {
                    reason: format!("a teammate already picked {}", champion),
                });
            }
        }

        let mut next = state.clone();
        let position = next.roster(side).position_of(&ctx.actor_email).unwrap_or_else(|| {
            unreachable!("{} was found on the {} roster above", ctx.actor_email, side)
        });
        if let Some(player) = next.roster_mut(side).get_mut(position) {
            player.champion = Some(champion.to_string());
        }
        Ok(Outcome::Updated { state: next, record: None })
    }

    fn check_fearless_pick(&self, state: &ScrimState, champion: &str) -> Result<()> {
        if state
            .fearless_used_champions
            .iter()
            .any(|used| same_champion(used, champion))
        {
            return Err(ScrimError::InvalidChampionSelection {
                reason: format!("{} was already used in this scrim", champion),
            });
        }
        Ok(())
    }

    fn end_game(
        &self,
        state: &ScrimState,
        ctx: &ActionContext,
        catalog: &dyn ChampionCatalog,
        payload: &EndGamePayload,
    ) -> Result<Outcome> {
        self.require_status(state, "end_game", &[ScrimStatus::InProgress])?;
        self.require_privilege(state, ctx, "end_game")?;

        let mut next = state.clone();
        let (blue_lines, red_lines) = if next.scrim_type == ScrimType::Aram {
            (aram_lines(&next.blue_team), aram_lines(&next.red_team))
        } else {
            // Validate everything before touching state: acceptance is
            // all-or-nothing for the whole call.
            self.validate_results(&next, catalog, &payload.results)?;
            let blue = picked_lines(&next.blue_team, &payload.results);
            let red = picked_lines(&next.red_team, &payload.results);
            (blue, red)
        };

        next.match_count += 1;
        let record = MatchRecord {
            id: Uuid::new_v4().to_string(),
            scrim_id: next.id.clone(),
            scrim_type: next.scrim_type,
            game_number: next.match_count,
            winner: payload.winner,
            blue: blue_lines,
            red: red_lines,
            played_at: ctx.now,
        };

        if next.scrim_type == ScrimType::Fearless {
            for pick in record.picked_champions() {
                if !next
                    .fearless_used_champions
                    .iter()
                    .any(|used| same_champion(used, pick))
                {
                    next.fearless_used_champions.push(pick.to_string());
                }
            }
        }
        // Reflect the final picks on the frozen rosters.
        for entry in &payload.results {
            for side in [TeamSide::Blue, TeamSide::Red] {
                if let Some(pos) = next.roster(side).position_of(&entry.email) {
                    if let Some(player) = next.roster_mut(side).get_mut(pos) {
                        player.champion = Some(entry.champion.clone());
                    }
                }
            }
        }

        next.winning_team = Some(payload.winner);
        next.status = ScrimStatus::Finished;
        log::info!(
            "scrim {}: game {} finished, {} wins",
            next.id,
            record.game_number,
            payload.winner
        );
        Ok(Outcome::Updated { state: next, record: Some(record) })
    }

    /// Normal/Fearless result validation: one entry per rostered player,
    /// position matching their slot, every champion known, and for Fearless
    /// no pick colliding with the ban list or another pick of this match.
    fn validate_results(
        &self,
        state: &ScrimState,
        catalog: &dyn ChampionCatalog,
        results: &[PlayerResultEntry],
    ) -> Result<()> {
        let rostered = state.blue_team.player_count() + state.red_team.player_count();
        if results.len() != rostered {
            return Err(ScrimError::MalformedPayload {
                reason: format!("expected {} result lines, got {}", rostered, results.len()),
            });
        }

        let mut seen: Vec<&str> = Vec::new();
        for entry in results {
            if seen.contains(&entry.email.as_str()) {
                return Err(ScrimError::MalformedPayload {
                    reason: format!("duplicate result line for {}", entry.email),
                });
            }
            seen.push(&entry.email);

            let slot = state
                .blue_team
                .position_of(&entry.email)
                .or_else(|| state.red_team.position_of(&entry.email))
                .ok_or_else(|| ScrimError::MalformedPayload {
                    reason: format!("{} is not on either roster", entry.email),
                })?;
            if slot != entry.position {
                return Err(ScrimError::MalformedPayload {
                    reason: format!(
                        "{} plays {} but the result says {}",
                        entry.email, slot, entry.position
                    ),
                });
            }
            if !catalog.contains(&entry.champion) {
                return Err(ScrimError::InvalidChampionSelection {
                    reason: format!("unknown champion: {}", entry.champion),
                });
            }
        }

        if state.scrim_type == ScrimType::Fearless {
            for (i, entry) in results.iter().enumerate() {
                let dup_in_match = results[..i]
                    .iter()
                    .any(|other| same_champion(&other.champion, &entry.champion));
                if dup_in_match {
                    return Err(ScrimError::InvalidChampionSelection {
                        reason: format!("{} is picked twice in this match", entry.champion),
                    });
                }
                self.check_fearless_pick(state, &entry.champion)?;
            }
        }
        Ok(())
    }

    fn reset_fearless(&self, state: &ScrimState, ctx: &ActionContext) -> Result<Outcome> {
        if state.scrim_type != ScrimType::Fearless {
            return Err(ScrimError::InvalidStateForAction {
                action: "reset_fearless",
                reason: "only fearless scrims track used champions".to_string(),
            });
        }
        self.require_status(
            state,
            "reset_fearless",
            &[ScrimStatus::InProgress, ScrimStatus::Finished],
        )?;
        self.require_privilege(state, ctx, "reset_fearless")?;

        let mut next = state.clone();
        next.fearless_used_champions.clear();
        log::info!("scrim {}: fearless ban list cleared by {}", next.id, ctx.actor_email);
        Ok(Outcome::Updated { state: next, record: None })
    }

    fn remove_member(
        &self,
        state: &ScrimState,
        ctx: &ActionContext,
        email: &str,
    ) -> Result<Outcome> {
        self.require_status(
            state,
            "remove_member",
            &[ScrimStatus::Recruiting, ScrimStatus::TeamBuilding, ScrimStatus::InProgress],
        )?;
        self.require_privilege(state, ctx, "remove_member")?;

        let mut next = state.clone();
        let removed = match next.bucket_of(email) {
            Some(Bucket::Applicants) => next.vacate_applicant(email),
            Some(Bucket::Waitlist) => next.remove_from_waitlist(email),
            Some(Bucket::BlueTeam) => next.blue_team.remove_by_email(email),
            Some(Bucket::RedTeam) => next.red_team.remove_by_email(email),
            None => None,
        };
        removed.ok_or_else(|| ScrimError::NotFound { what: format!("player {}", email) })?;
        log::info!("scrim {}: {} removed by {}", next.id, email, ctx.actor_email);
        Ok(Outcome::Updated { state: next, record: None })
    }

    fn disband(&self, state: &ScrimState, ctx: &ActionContext) -> Result<Outcome> {
        self.require_privilege(state, ctx, "disband")?;
        log::info!("scrim {}: disbanded by {}", state.id, ctx.actor_email);
        Ok(Outcome::Deleted)
    }
}

/// Champion names compare case-insensitively; catalogs and clients disagree
/// on casing more often than on spelling.
fn same_champion(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn aram_lines(roster: &crate::scrim::TeamRoster) -> Vec<PlayerLine> {
    roster
        .players()
        .map(|p| PlayerLine {
            email: p.email.clone(),
            nickname: p.nickname.clone(),
            champion: None,
            position: None,
        })
        .collect()
}

fn picked_lines(
    roster: &crate::scrim::TeamRoster,
    results: &[PlayerResultEntry],
) -> Vec<PlayerLine> {
    roster
        .players()
        .map(|p| {
            let entry = results.iter().find(|r| r.email == p.email);
            PlayerLine {
                email: p.email.clone(),
                nickname: p.nickname.clone(),
                champion: entry.map(|r| r.champion.clone()),
                position: p.assigned_position,
            }
        })
        .collect()
}
