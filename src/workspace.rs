//! A loaded store bound to its persistence slot
//!
//! [`Workspace`] is the lifecycle object the rest of the application is
//! handed: `open` loads (and migrates) the slot, every mutator applies to
//! the in-memory store and then writes the full state back, `close` does a
//! final flush. A failed write is reported through [`Applied`] and never
//! undoes the in-memory mutation.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::ids::{IdGenerator, UuidGenerator};
use crate::persistence::{
    KeyValueStore, LoadOutcome, PersistenceAdapter, PersistenceError, PersistenceResult,
};
use crate::store::{
    EntityStore, Exercise, Prescription, ReferencePolicy, Routine, StoreResult, StoreSnapshot,
    StoreState, WorkoutDay, WorkoutDayExercise,
};

/// Outcome of a mutation: the value it produced plus whether the slot
/// write that followed it succeeded
#[derive(Debug)]
#[must_use = "a failed persistence write is only reported here"]
pub struct Applied<T> {
    value: T,
    persisted: PersistenceResult<()>,
}

impl<T> Applied<T> {
    fn new(value: T, persisted: PersistenceResult<()>) -> Self {
        Self { value, persisted }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn write_error(&self) -> Option<&PersistenceError> {
        self.persisted.as_ref().err()
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted.is_ok()
    }

    /// The value, or the write error if the slot could not be updated
    pub fn into_result(self) -> PersistenceResult<T> {
        self.persisted.map(|()| self.value)
    }

    pub fn into_parts(self) -> (T, PersistenceResult<()>) {
        (self.value, self.persisted)
    }

    /// Take the value, keeping the first write error seen in `first_error`
    pub fn collect_error(self, first_error: &mut PersistenceResult<()>) -> T {
        if let Err(e) = self.persisted {
            if first_error.is_ok() {
                *first_error = Err(e);
            }
        }
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Applied<U> {
        Applied::new(f(self.value), self.persisted)
    }
}

/// Build an [`Applied`] from a value and an accumulated write result
pub fn applied<T>(value: T, persisted: PersistenceResult<()>) -> Applied<T> {
    Applied::new(value, persisted)
}

/// Entity store plus the adapter persisting it
pub struct Workspace<B: KeyValueStore> {
    store: EntityStore,
    adapter: PersistenceAdapter<B>,
    load_outcome: LoadOutcome,
    initial_write: PersistenceResult<()>,
}

impl<B: KeyValueStore> Workspace<B> {
    /// Load the default slot of `backend` with UUID ids and permissive references
    pub fn open(backend: B) -> PersistenceResult<Self> {
        Self::open_with(
            PersistenceAdapter::new(backend),
            Arc::new(UuidGenerator),
            ReferencePolicy::default(),
        )
    }

    /// Load the slot of `adapter`
    ///
    /// Only a backend read failure is an error. A slot that was not read
    /// back exactly is rewritten at the current version; if that write
    /// fails the workspace still opens and the failure is kept in
    /// [`Workspace::initial_write_error`].
    pub fn open_with(
        adapter: PersistenceAdapter<B>,
        ids: Arc<dyn IdGenerator>,
        policy: ReferencePolicy,
    ) -> PersistenceResult<Self> {
        let loaded = adapter.load(ids.as_ref())?;
        debug!(
            "Opened workspace on slot '{}' ({:?})",
            adapter.slot(),
            loaded.outcome
        );

        let mut workspace = Self {
            store: EntityStore::with_ids(loaded.state, ids).with_policy(policy),
            adapter,
            load_outcome: loaded.outcome,
            initial_write: Ok(()),
        };

        if workspace.load_outcome != LoadOutcome::Current {
            workspace.initial_write = workspace.persist(()).into_parts().1;
        }

        Ok(workspace)
    }

    pub fn load_outcome(&self) -> LoadOutcome {
        self.load_outcome
    }

    /// Error from rewriting the slot during `open`, if that write failed
    pub fn initial_write_error(&self) -> Option<&PersistenceError> {
        self.initial_write.as_ref().err()
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn state(&self) -> &StoreState {
        self.store.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.store.subscribe()
    }

    pub fn adapter(&self) -> &PersistenceAdapter<B> {
        &self.adapter
    }

    /// Write the current state to the slot
    pub fn flush(&self) -> PersistenceResult<()> {
        self.adapter.save(self.store.state())
    }

    /// Final flush, returning the state that was persisted
    pub fn close(self) -> PersistenceResult<StoreState> {
        self.flush()?;
        Ok(self.store.into_state())
    }

    pub fn new_routine(&mut self, name: impl Into<String>) -> Applied<Routine> {
        let routine = self.store.new_routine(name);
        self.persist(routine)
    }

    pub fn select_routine(&mut self, id: &str) -> Applied<Option<Routine>> {
        let revision = self.store.revision();
        let routine = self.store.select_routine(id);
        self.persist_if_changed(revision, routine)
    }

    pub fn new_workout_day(
        &mut self,
        routine_id: &str,
        name: impl Into<String>,
        day_order: u32,
    ) -> StoreResult<Applied<WorkoutDay>> {
        let day = self.store.new_workout_day(routine_id, name, day_order)?;
        Ok(self.persist(day))
    }

    pub fn update_workout_day(
        &mut self,
        id: &str,
        name: impl Into<String>,
        day_order: u32,
    ) -> Applied<Option<WorkoutDay>> {
        let revision = self.store.revision();
        let day = self.store.update_workout_day(id, name, day_order);
        self.persist_if_changed(revision, day)
    }

    pub fn new_exercise(
        &mut self,
        name: impl Into<String>,
        description: Option<String>,
        muscle_group: Option<String>,
    ) -> Applied<Exercise> {
        let exercise = self.store.new_exercise(name, description, muscle_group);
        self.persist(exercise)
    }

    pub fn new_workout_day_exercise(
        &mut self,
        workout_day_id: &str,
        exercise_id: &str,
        sets: u32,
        exercise_order: u32,
        prescription: Prescription,
    ) -> StoreResult<Applied<WorkoutDayExercise>> {
        let record = self.store.new_workout_day_exercise(
            workout_day_id,
            exercise_id,
            sets,
            exercise_order,
            prescription,
        )?;
        Ok(self.persist(record))
    }

    pub fn clear_workout_day_exercises(&mut self, workout_day_id: &str) -> Applied<usize> {
        let revision = self.store.revision();
        let removed = self.store.clear_workout_day_exercises(workout_day_id);
        self.persist_if_changed(revision, removed)
    }

    fn persist<T>(&self, value: T) -> Applied<T> {
        let persisted = self.flush();
        if let Err(e) = &persisted {
            warn!("Failed to persist state to slot '{}': {}", self.adapter.slot(), e);
        }
        Applied::new(value, persisted)
    }

    fn persist_if_changed<T>(&self, revision_before: u64, value: T) -> Applied<T> {
        if self.store.revision() == revision_before {
            return Applied::new(value, Ok(()));
        }
        self.persist(value)
    }
}
