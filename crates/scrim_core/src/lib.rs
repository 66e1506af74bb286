//! # scrim_core - Scrim Lifecycle Coordination Engine
//!
//! This library coordinates ad-hoc 5v5 practice-match sessions: players
//! apply, get split into two teams, play, and results land in an append-only
//! match history. The heart of the crate is an explicit state machine
//! (`TransitionEngine`) over a versioned scrim document, wrapped in an
//! optimistic-concurrency coordinator so competing requests on the same
//! scrim serialize cleanly.
//!
//! ## Layers
//! - `models` / `scrim`: pure data plus invariants, no I/O
//! - `engine`: one exhaustive transition function per action
//! - `store` + `coordinator`: atomic read-compute-write against a
//!   transactional document store
//! - `catalog`, `identity`, `stats`: external reference data, role checks,
//!   and history projections

// Game-flow entry points take several context parameters (actor, clock,
// catalog) on purpose; the engine stays a pure function of its inputs.
#![allow(clippy::too_many_arguments)]

pub mod catalog;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod identity;
pub mod models;
pub mod scrim;
pub mod stats;
pub mod store;

#[cfg(test)]
mod lifecycle_test;

pub use coordinator::{CoordinatorConfig, ExecuteResult, TransactionCoordinator};
pub use engine::{
    Action, ActionContext, ApplyPayload, EndGamePayload, Outcome, PlayerResultEntry,
    TransitionEngine, UpdateTeamsPayload,
};
pub use error::{ErrorKind, Result, ScrimError};
pub use models::{Applicant, MatchRecord, PlayerLine, Position, PositionPreference, TeamSide};
pub use scrim::{ScrimState, ScrimStatus, ScrimType, TeamRoster};
pub use stats::{StatsProjector, UserStats, WinLoss};
