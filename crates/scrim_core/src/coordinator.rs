//! Transactional glue between the pure engine and the document store.
//!
//! Every mutation is an optimistic read-compute-write cycle: read the scrim
//! document at its current version, run the engine on that fresh state, then
//! commit the new document (plus any match record) conditionally on the
//! version still matching. A concurrent writer makes the commit conflict and
//! the whole cycle reruns from a fresh read, so client-cached state never
//! feeds a decision. Engine rejections are final and never retried.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::catalog::ChampionCatalog;
use crate::engine::{Action, ActionContext, Outcome, TransitionEngine};
use crate::error::{Result, ScrimError};
use crate::identity::RoleProvider;
use crate::models::MatchRecord;
use crate::scrim::{ScrimState, ScrimType};
use crate::store::{
    DocumentStore, StoreError, WriteOp, MATCHES_COLLECTION, SCRIMS_COLLECTION,
};

#[derive(Debug, Clone, Copy)]
pub struct CoordinatorConfig {
    /// Optimistic retry budget per action before giving up.
    pub max_attempts: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self { max_attempts: 5 }
    }
}

#[derive(Debug, Clone)]
pub enum ExecuteResult {
    Updated(ScrimState),
    Deleted,
}

pub struct TransactionCoordinator<S: DocumentStore> {
    store: S,
    roles: Box<dyn RoleProvider>,
    catalog: Box<dyn ChampionCatalog>,
    engine: TransitionEngine,
    config: CoordinatorConfig,
}

impl<S: DocumentStore> TransactionCoordinator<S> {
    pub fn new(store: S, roles: Box<dyn RoleProvider>, catalog: Box<dyn ChampionCatalog>) -> Self {
        Self::with_config(store, roles, catalog, CoordinatorConfig::default())
    }

    pub fn with_config(
        store: S,
        roles: Box<dyn RoleProvider>,
        catalog: Box<dyn ChampionCatalog>,
        config: CoordinatorConfig,
    ) -> Self {
        Self { store, roles, catalog, engine: TransitionEngine::new(), config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Seed a new recruiting scrim document and return it.
    pub fn create_scrim(
        &self,
        title: &str,
        scrim_type: ScrimType,
        creator_email: &str,
    ) -> Result<ScrimState> {
        let id = Uuid::new_v4().to_string();
        let state = ScrimState::new(id.clone(), title, scrim_type, creator_email, Utc::now());
        let data = serde_json::to_value(&state).map_err(StoreError::from)?;
        self.store
            .commit(vec![WriteOp::put(SCRIMS_COLLECTION, &id, None, data)])?;
        log::info!("scrim {} created by {} ({})", id, creator_email, scrim_type);
        Ok(state)
    }

    /// Run one action against a scrim, with the wall clock.
    pub fn execute(&self, scrim_id: &str, actor_email: &str, action: Action) -> Result<ExecuteResult> {
        self.execute_at(scrim_id, actor_email, action, Utc::now())
    }

    /// Run one action with an explicit timestamp (deterministic tests).
    pub fn execute_at(
        &self,
        scrim_id: &str,
        actor_email: &str,
        action: Action,
        now: DateTime<Utc>,
    ) -> Result<ExecuteResult> {
        let mut rng = rand::thread_rng();
        for attempt in 1..=self.config.max_attempts {
            let doc = self
                .store
                .read(SCRIMS_COLLECTION, scrim_id)?
                .ok_or_else(|| ScrimError::NotFound { what: format!("scrim {}", scrim_id) })?;
            let state: ScrimState =
                serde_json::from_value(doc.data.clone()).map_err(StoreError::from)?;

            let ctx = ActionContext::new(actor_email, self.roles.role_of(actor_email), now);
            let outcome =
                self.engine.apply(&state, &action, &ctx, self.catalog.as_ref(), &mut rng)?;

            let (writes, result) = match outcome {
                Outcome::Updated { state: next, record } => {
                    let data = serde_json::to_value(&next).map_err(StoreError::from)?;
                    let mut writes =
                        vec![WriteOp::put(SCRIMS_COLLECTION, scrim_id, Some(doc.version), data)];
                    if let Some(record) = &record {
                        let record_data = serde_json::to_value(record).map_err(StoreError::from)?;
                        writes.push(WriteOp::put(MATCHES_COLLECTION, &record.id, None, record_data));
                    }
                    (writes, ExecuteResult::Updated(next))
                }
                Outcome::Deleted => {
                    let writes =
                        vec![WriteOp::delete(SCRIMS_COLLECTION, scrim_id, Some(doc.version))];
                    (writes, ExecuteResult::Deleted)
                }
            };

            match self.store.commit(writes) {
                Ok(()) => {
                    log::debug!(
                        "scrim {}: {} committed on attempt {}",
                        scrim_id,
                        action.name(),
                        attempt
                    );
                    return Ok(result);
                }
                Err(StoreError::Conflict { .. }) => {
                    log::debug!(
                        "scrim {}: {} conflicted on attempt {}, rereading",
                        scrim_id,
                        action.name(),
                        attempt
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
        log::warn!(
            "scrim {}: {} gave up after {} attempts",
            scrim_id,
            action.name(),
            self.config.max_attempts
        );
        Err(ScrimError::TransientFailure { attempts: self.config.max_attempts })
    }

    /// Read-only snapshot of a scrim document.
    pub fn fetch(&self, scrim_id: &str) -> Result<ScrimState> {
        let doc = self
            .store
            .read(SCRIMS_COLLECTION, scrim_id)?
            .ok_or_else(|| ScrimError::NotFound { what: format!("scrim {}", scrim_id) })?;
        let state = serde_json::from_value(doc.data).map_err(StoreError::from)?;
        Ok(state)
    }

    /// All recorded games for a scrim, oldest first.
    pub fn match_history(&self, scrim_id: &str) -> Result<Vec<MatchRecord>> {
        let mut records: Vec<MatchRecord> = Vec::new();
        for (_, doc) in self.store.list(MATCHES_COLLECTION)? {
            let record: MatchRecord =
                serde_json::from_value(doc.data).map_err(StoreError::from)?;
            if record.scrim_id == scrim_id {
                records.push(record);
            }
        }
        records.sort_by_key(|r| r.game_number);
        Ok(records)
    }
}
