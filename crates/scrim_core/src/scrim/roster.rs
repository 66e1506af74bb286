use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Applicant, Position};

/// One team's five named slots.
///
/// A slot assignment never discards a player: `assign` hands any displaced
/// occupant back to the caller, who is responsible for returning them to the
/// applicant pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRoster {
    slots: BTreeMap<Position, Applicant>,
}

impl TeamRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seat `applicant` at `position`, returning the displaced occupant if
    /// the slot was taken. The displaced player's assignment state is cleared.
    pub fn assign(&mut self, position: Position, mut applicant: Applicant) -> Option<Applicant> {
        applicant.assigned_position = Some(position);
        let displaced = self.slots.insert(position, applicant);
        displaced.map(|mut d| {
            d.clear_assignment();
            d
        })
    }

    pub fn remove(&mut self, position: Position) -> Option<Applicant> {
        self.slots.remove(&position).map(|mut a| {
            a.clear_assignment();
            a
        })
    }

    pub fn remove_by_email(&mut self, email: &str) -> Option<Applicant> {
        let position = self.position_of(email)?;
        self.remove(position)
    }

    pub fn get(&self, position: Position) -> Option<&Applicant> {
        self.slots.get(&position)
    }

    pub fn get_mut(&mut self, position: Position) -> Option<&mut Applicant> {
        self.slots.get_mut(&position)
    }

    pub fn position_of(&self, email: &str) -> Option<Position> {
        self.slots
            .iter()
            .find(|(_, a)| a.email == email)
            .map(|(pos, _)| *pos)
    }

    pub fn contains_email(&self, email: &str) -> bool {
        self.position_of(email).is_some()
    }

    pub fn find_by_email(&self, email: &str) -> Option<&Applicant> {
        self.slots.values().find(|a| a.email == email)
    }

    pub fn players(&self) -> impl Iterator<Item = &Applicant> {
        self.slots.values()
    }

    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut Applicant> {
        self.slots.values_mut()
    }

    pub fn emails(&self) -> Vec<String> {
        self.slots.values().map(|a| a.email.clone()).collect()
    }

    pub fn empty_slots(&self) -> Vec<Position> {
        Position::ALL
            .iter()
            .copied()
            .filter(|pos| !self.slots.contains_key(pos))
            .collect()
    }

    pub fn player_count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == super::TEAM_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Empty the roster, returning every player with assignment state cleared.
    pub fn drain(&mut self) -> Vec<Applicant> {
        let slots = std::mem::take(&mut self.slots);
        slots
            .into_values()
            .map(|mut a| {
                a.clear_assignment();
                a
            })
            .collect()
    }

    /// Drop champion picks without unseating anyone (game aborted).
    pub fn clear_champions(&mut self) {
        for player in self.slots.values_mut() {
            player.champion = None;
        }
    }
}
