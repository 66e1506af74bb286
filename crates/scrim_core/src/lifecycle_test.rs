//! End-to-end lifecycle tests: coordinator + store + engine together.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use chrono::Utc;
use proptest::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand::SeedableRng;

use crate::catalog::StaticCatalog;
use crate::coordinator::{CoordinatorConfig, ExecuteResult, TransactionCoordinator};
use crate::engine::{
    Action, ActionContext, ApplyPayload, EndGamePayload, Outcome, PlayerResultEntry,
    TransitionEngine,
};
use crate::error::ErrorKind;
use crate::identity::{Role, StaticRoleProvider};
use crate::models::{PositionPreference, TeamSide};
use crate::scrim::{ScrimState, ScrimStatus, ScrimType, MAX_APPLICANTS};
use crate::store::{DocumentStore, MemoryStore, StoreError, VersionedDoc, WriteOp};

const CREATOR: &str = "owner@x.io";

const CHAMPS: [&str; 20] = [
    "Ahri", "Garen", "Lux", "Jinx", "Thresh", "LeeSin", "Yasuo", "Orianna", "Ezreal", "Leona",
    "Darius", "Ziggs", "Vayne", "Nautilus", "Syndra", "Riven", "Sona", "Zed", "Kaisa", "Braum",
];

fn payload(email: &str) -> ApplyPayload {
    ApplyPayload {
        email: email.to_string(),
        nickname: email.split('@').next().unwrap().to_string(),
        tier: "Gold 2".to_string(),
        positions: PositionPreference::All,
    }
}

fn coordinator() -> TransactionCoordinator<MemoryStore> {
    TransactionCoordinator::new(
        MemoryStore::new(),
        Box::new(StaticRoleProvider::new(["admin@x.io"])),
        Box::new(StaticCatalog::of(CHAMPS)),
    )
}

fn recruit_ten(coord: &TransactionCoordinator<MemoryStore>, scrim_id: &str) {
    for i in 0..MAX_APPLICANTS {
        let email = format!("p{}@x.io", i);
        coord
            .execute(scrim_id, &email, Action::Apply(payload(&email)))
            .unwrap();
    }
}

fn results_for(state: &ScrimState) -> Vec<PlayerResultEntry> {
    state
        .blue_team
        .players()
        .chain(state.red_team.players())
        .zip(CHAMPS)
        .map(|(player, champion)| PlayerResultEntry {
            email: player.email.clone(),
            champion: champion.to_string(),
            position: player.assigned_position.unwrap(),
        })
        .collect()
}

#[test]
fn full_lifecycle_from_recruiting_to_match_history() {
    let coord = coordinator();
    let scrim = coord.create_scrim("tuesday scrim", ScrimType::Normal, CREATOR).unwrap();
    recruit_ten(&coord, &scrim.id);

    coord.execute(&scrim.id, CREATOR, Action::StartTeamBuilding).unwrap();
    let building = coord.fetch(&scrim.id).unwrap();
    assert_eq!(building.status, ScrimStatus::TeamBuilding);
    assert!(building.applicants.is_empty());
    assert!(building.blue_team.is_full() && building.red_team.is_full());

    coord.execute(&scrim.id, CREATOR, Action::StartGame).unwrap();
    let live = coord.fetch(&scrim.id).unwrap();
    assert_eq!(live.status, ScrimStatus::InProgress);
    assert!(live.started_at.is_some());

    let results = results_for(&live);
    coord
        .execute(
            &scrim.id,
            CREATOR,
            Action::EndGame(EndGamePayload { winner: TeamSide::Blue, results: results.clone() }),
        )
        .unwrap();

    let finished = coord.fetch(&scrim.id).unwrap();
    assert_eq!(finished.status, ScrimStatus::Finished);
    assert_eq!(finished.winning_team, Some(TeamSide::Blue));

    let history = coord.match_history(&scrim.id).unwrap();
    assert_eq!(history.len(), 1);
    let record = &history[0];
    assert_eq!(record.winner, TeamSide::Blue);
    assert_eq!(record.blue.len() + record.red.len(), 10);
    for entry in &results {
        let line = record
            .blue
            .iter()
            .chain(record.red.iter())
            .find(|l| l.email == entry.email)
            .unwrap();
        assert_eq!(line.champion.as_deref(), Some(entry.champion.as_str()));
        assert_eq!(line.position, Some(entry.position));
    }
}

#[test]
fn rejected_end_game_commits_nothing() {
    let coord = coordinator();
    let scrim = coord.create_scrim("fearless night", ScrimType::Fearless, CREATOR).unwrap();
    recruit_ten(&coord, &scrim.id);
    coord.execute(&scrim.id, CREATOR, Action::StartTeamBuilding).unwrap();
    coord.execute(&scrim.id, CREATOR, Action::StartGame).unwrap();

    let live = coord.fetch(&scrim.id).unwrap();
    let mut results = results_for(&live);
    results[0].champion = "NotAChampion".to_string();
    let err = coord
        .execute(
            &scrim.id,
            CREATOR,
            Action::EndGame(EndGamePayload { winner: TeamSide::Blue, results }),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidChampionSelection);

    // No status flip, no record, no ban-list growth.
    let after = coord.fetch(&scrim.id).unwrap();
    assert_eq!(after.status, ScrimStatus::InProgress);
    assert!(after.fearless_used_champions.is_empty());
    assert!(coord.match_history(&scrim.id).unwrap().is_empty());
}

#[test]
fn non_privileged_transitions_are_denied_without_side_effects() {
    let coord = coordinator();
    let scrim = coord.create_scrim("tuesday scrim", ScrimType::Normal, CREATOR).unwrap();
    recruit_ten(&coord, &scrim.id);

    let err = coord
        .execute(&scrim.id, "p0@x.io", Action::StartTeamBuilding)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert_eq!(coord.fetch(&scrim.id).unwrap().status, ScrimStatus::Recruiting);

    // The configured site admin may drive the scrim without owning it.
    coord
        .execute(&scrim.id, "admin@x.io", Action::StartTeamBuilding)
        .unwrap();
    assert_eq!(coord.fetch(&scrim.id).unwrap().status, ScrimStatus::TeamBuilding);
}

#[test]
fn racing_applies_never_overfill_the_pool() {
    let coord = Arc::new(coordinator());
    let scrim = coord.create_scrim("busy scrim", ScrimType::Normal, CREATOR).unwrap();
    for i in 0..MAX_APPLICANTS - 1 {
        let email = format!("p{}@x.io", i);
        coord.execute(&scrim.id, &email, Action::Apply(payload(&email))).unwrap();
    }

    let mut handles = Vec::new();
    for email in ["race1@x.io", "race2@x.io", "race3@x.io"] {
        let coord = Arc::clone(&coord);
        let scrim_id = scrim.id.clone();
        handles.push(std::thread::spawn(move || {
            coord.execute(&scrim_id, email, Action::Apply(payload(email)))
        }));
    }
    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let admitted = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(admitted, 1, "exactly one racer may take the last seat");
    for rejected in outcomes.iter().filter(|r| r.is_err()) {
        assert_eq!(rejected.as_ref().unwrap_err().kind(), ErrorKind::CapacityExceeded);
    }
    assert_eq!(coord.fetch(&scrim.id).unwrap().applicants.len(), MAX_APPLICANTS);
}

#[test]
fn disband_deletes_the_document() {
    let coord = coordinator();
    let scrim = coord.create_scrim("short-lived", ScrimType::Normal, CREATOR).unwrap();
    let result = coord.execute(&scrim.id, CREATOR, Action::Disband).unwrap();
    assert!(matches!(result, ExecuteResult::Deleted));

    let err = coord.fetch(&scrim.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

/// Store wrapper that makes the first N commits conflict, to exercise the
/// coordinator's reread-and-retry loop.
struct FlakyStore {
    inner: MemoryStore,
    conflicts_left: AtomicI32,
}

impl FlakyStore {
    fn new(conflicts: i32) -> Self {
        Self { inner: MemoryStore::new(), conflicts_left: AtomicI32::new(conflicts) }
    }
}

impl DocumentStore for FlakyStore {
    fn read(&self, collection: &str, id: &str) -> Result<Option<VersionedDoc>, StoreError> {
        self.inner.read(collection, id)
    }

    fn list(&self, collection: &str) -> Result<Vec<(String, VersionedDoc)>, StoreError> {
        self.inner.list(collection)
    }

    fn commit(&self, writes: Vec<WriteOp>) -> Result<(), StoreError> {
        if self.conflicts_left.fetch_sub(1, Ordering::SeqCst) > 0 {
            return Err(StoreError::Conflict { collection: "scrims".into(), id: "forced".into() });
        }
        self.inner.commit(writes)
    }
}

fn flaky_coordinator(conflicts: i32) -> TransactionCoordinator<FlakyStore> {
    TransactionCoordinator::new(
        FlakyStore::new(conflicts),
        Box::new(StaticRoleProvider::no_admins()),
        Box::new(StaticCatalog::of(CHAMPS)),
    )
}

#[test]
fn transient_conflicts_are_retried_with_fresh_reads() {
    let coord = flaky_coordinator(0);
    let scrim = coord.create_scrim("flaky", ScrimType::Normal, CREATOR).unwrap();

    coord.store().conflicts_left.store(2, Ordering::SeqCst);
    coord
        .execute(&scrim.id, "p0@x.io", Action::Apply(payload("p0@x.io")))
        .unwrap();
    assert_eq!(coord.fetch(&scrim.id).unwrap().applicants.len(), 1);
}

#[test]
fn retry_exhaustion_surfaces_transient_failure() {
    let coord = flaky_coordinator(0);
    let scrim = coord.create_scrim("flaky", ScrimType::Normal, CREATOR).unwrap();

    coord.store().conflicts_left.store(i32::MAX, Ordering::SeqCst);
    let err = coord
        .execute(&scrim.id, "p0@x.io", Action::Apply(payload("p0@x.io")))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransientFailure);
    assert!(err.is_transient());
}

#[test]
fn coordinator_honors_custom_retry_budget() {
    let coord = TransactionCoordinator::with_config(
        FlakyStore::new(0),
        Box::new(StaticRoleProvider::no_admins()),
        Box::new(StaticCatalog::of(CHAMPS)),
        CoordinatorConfig { max_attempts: 1 },
    );
    let scrim = coord.create_scrim("flaky", ScrimType::Normal, CREATOR).unwrap();
    coord.store().conflicts_left.store(1, Ordering::SeqCst);

    let err = coord
        .execute(&scrim.id, "p0@x.io", Action::Apply(payload("p0@x.io")))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransientFailure);
}

proptest! {
    /// Random interleavings of the recruiting-phase actions can never break
    /// the capacity or disjointness invariants.
    #[test]
    fn invariants_hold_under_random_action_sequences(
        ops in proptest::collection::vec((0u8..6u8, 0usize..12usize), 0..50)
    ) {
        let engine = TransitionEngine::new();
        let catalog = StaticCatalog::of(CHAMPS);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut state = ScrimState::new("s1", "prop scrim", ScrimType::Normal, CREATOR, Utc::now());

        for (code, idx) in ops {
            let email = format!("p{}@x.io", idx);
            let (action, actor) = match code {
                0 => (Action::Apply(payload(&email)), email.clone()),
                1 => (Action::ApplyWaitlist(payload(&email)), email.clone()),
                2 => (Action::Leave, email.clone()),
                3 => (Action::LeaveWaitlist, email.clone()),
                4 => (Action::RemoveMember { email: email.clone() }, CREATOR.to_string()),
                _ => (Action::StartTeamBuilding, CREATOR.to_string()),
            };
            let ctx = ActionContext::new(&actor, Role::Member, Utc::now());
            if let Ok(Outcome::Updated { state: next, .. }) =
                engine.apply(&state, &action, &ctx, &catalog, &mut rng)
            {
                prop_assert!(next.check_invariants().is_ok(), "{:?}", next.check_invariants());
                prop_assert!(next.applicants.len() <= MAX_APPLICANTS);
                state = next;
            }
        }
    }
}
