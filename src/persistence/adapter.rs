//! Loads and saves the store state under one named slot

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::PersistenceResult;
use super::kv::KeyValueStore;
use super::migrate::{self, MigrationOutcome, CURRENT_VERSION};
use crate::ids::IdGenerator;
use crate::store::StoreState;

/// Slot name used when none is configured
pub const DEFAULT_SLOT: &str = "storage";

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    state: &'a StoreState,
}

#[derive(Deserialize)]
struct RawEnvelope {
    version: u32,
    state: Value,
}

/// Where a loaded state came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Slot was empty; initial state created
    Fresh,
    /// Stored state was already at the current version
    Current,
    /// Stored state went through migration
    Migration(MigrationOutcome),
    /// Stored bytes were not a readable envelope; initial state created
    Corrupted,
}

/// Result of [`PersistenceAdapter::load`]
#[derive(Debug, Clone)]
pub struct LoadedState {
    pub state: StoreState,
    pub outcome: LoadOutcome,
}

/// Serializes the store state into a versioned envelope in one slot
pub struct PersistenceAdapter<B> {
    backend: B,
    slot: String,
}

impl<B: KeyValueStore> PersistenceAdapter<B> {
    pub fn new(backend: B) -> Self {
        Self::with_slot(backend, DEFAULT_SLOT)
    }

    pub fn with_slot(backend: B, slot: impl Into<String>) -> Self {
        Self {
            backend,
            slot: slot.into(),
        }
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Read the slot and produce a current-version state
    ///
    /// Only a backend read failure is an error. Undecodable bytes and
    /// version mismatches resolve to a valid state (see [`LoadOutcome`]).
    pub fn load(&self, ids: &dyn IdGenerator) -> PersistenceResult<LoadedState> {
        let Some(bytes) = self.backend.get(&self.slot)? else {
            info!("No persisted state in slot '{}', starting fresh", self.slot);
            return Ok(LoadedState {
                state: StoreState::initial(ids),
                outcome: LoadOutcome::Fresh,
            });
        };

        let envelope: RawEnvelope = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => return Ok(self.recover_corrupted(&bytes, &e, ids)),
        };

        if envelope.version != CURRENT_VERSION {
            let (state, outcome) = migrate::migrate(envelope.version, envelope.state, ids);
            return Ok(LoadedState {
                state,
                outcome: LoadOutcome::Migration(outcome),
            });
        }

        match serde_json::from_value::<StoreState>(envelope.state) {
            Ok(state) => {
                debug!(
                    "Loaded {} routines, {} workout days, {} exercises from slot '{}'",
                    state.routines.len(),
                    state.workout_days.len(),
                    state.exercises.len(),
                    self.slot
                );
                Ok(LoadedState {
                    state,
                    outcome: LoadOutcome::Current,
                })
            }
            Err(e) => Ok(self.recover_corrupted(&bytes, &e, ids)),
        }
    }

    /// Write the full state to the slot
    pub fn save(&self, state: &StoreState) -> PersistenceResult<()> {
        let bytes = self.encode(state)?;
        self.backend.set(&self.slot, &bytes)?;
        debug!("Saved {} bytes to slot '{}'", bytes.len(), self.slot);
        Ok(())
    }

    /// Serialized envelope for `state`, as it would be written
    pub fn encode(&self, state: &StoreState) -> PersistenceResult<Vec<u8>> {
        let envelope = EnvelopeRef {
            version: CURRENT_VERSION,
            state,
        };
        Ok(serde_json::to_vec(&envelope)?)
    }

    /// Remove the slot entirely
    pub fn clear(&self) -> PersistenceResult<()> {
        self.backend.delete(&self.slot)
    }

    fn recover_corrupted(
        &self,
        bytes: &[u8],
        error: &serde_json::Error,
        ids: &dyn IdGenerator,
    ) -> LoadedState {
        let backup = format!("{}.corrupted.{}", self.slot, Utc::now().timestamp());

        match self.backend.set(&backup, bytes) {
            Ok(()) => warn!(
                "Persisted state corrupted ({}), backed up to '{}'",
                error, backup
            ),
            Err(e) => warn!(
                "Persisted state corrupted ({}), backup to '{}' failed: {}",
                error, backup, e
            ),
        }

        LoadedState {
            state: StoreState::initial(ids),
            outcome: LoadOutcome::Corrupted,
        }
    }
}
