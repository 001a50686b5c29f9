//! The entity store: single source of truth for the four collections

use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use super::error::{ReferenceKind, StoreError, StoreResult};
use super::types::*;
use crate::ids::{IdGenerator, UuidGenerator};
use crate::query;

/// Owns the collections and applies every mutation to them
///
/// All mutators take `&mut self`, so there is exactly one writer at a time.
/// Each applied mutation swaps in a new collection value, bumps the revision
/// and publishes a [`StoreSnapshot`] to subscribers.
pub struct EntityStore {
    state: StoreState,
    revision: u64,
    ids: Arc<dyn IdGenerator>,
    policy: ReferencePolicy,
    changes: watch::Sender<StoreSnapshot>,
}

impl EntityStore {
    /// Create a store over existing state with UUID ids and permissive references
    pub fn new(state: StoreState) -> Self {
        Self::with_ids(state, Arc::new(UuidGenerator))
    }

    /// Create a store with a custom id generator
    pub fn with_ids(state: StoreState, ids: Arc<dyn IdGenerator>) -> Self {
        let (changes, _) = watch::channel(StoreSnapshot {
            revision: 0,
            state: state.clone(),
        });

        Self {
            state,
            revision: 0,
            ids,
            policy: ReferencePolicy::default(),
            changes,
        }
    }

    /// Set how foreign keys are checked on creation
    pub fn with_policy(mut self, policy: ReferencePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ReferencePolicy {
        self.policy
    }

    pub fn ids(&self) -> Arc<dyn IdGenerator> {
        Arc::clone(&self.ids)
    }

    /// Current state
    pub fn state(&self) -> &StoreState {
        &self.state
    }

    /// Number of mutations applied since construction
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            revision: self.revision,
            state: self.state.clone(),
        }
    }

    /// Observe every applied mutation
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.changes.subscribe()
    }

    pub fn into_state(self) -> StoreState {
        self.state
    }

    pub fn new_routine(&mut self, name: impl Into<String>) -> Routine {
        let routine = Routine {
            id: self.ids.next_id(),
            name: name.into(),
        };

        self.state.routines = appended(&self.state.routines, routine.clone());
        debug!("Created routine {} ({})", routine.id, routine.name);
        self.publish();

        routine
    }

    /// Make `id` the current routine; `None` when it does not exist
    pub fn select_routine(&mut self, id: &str) -> Option<Routine> {
        let routine = query::get_routine(&self.state.routines, id)?;

        if self.state.selected_routine_id.as_deref() != Some(id) {
            self.state.selected_routine_id = Some(routine.id.clone());
            debug!("Selected routine {}", routine.id);
            self.publish();
        }

        Some(routine)
    }

    pub fn new_workout_day(
        &mut self,
        routine_id: &str,
        name: impl Into<String>,
        day_order: u32,
    ) -> StoreResult<WorkoutDay> {
        self.check_reference(ReferenceKind::Routine, routine_id)?;

        let day = WorkoutDay {
            id: self.ids.next_id(),
            routine_id: routine_id.to_string(),
            name: name.into(),
            day_order,
        };

        self.state.workout_days = appended(&self.state.workout_days, day.clone());
        debug!(
            "Created workout day {} in routine {} at position {}",
            day.id, day.routine_id, day.day_order
        );
        self.publish();

        Ok(day)
    }

    /// Replace the day's name and order; `None` leaves the store untouched
    pub fn update_workout_day(
        &mut self,
        id: &str,
        name: impl Into<String>,
        day_order: u32,
    ) -> Option<WorkoutDay> {
        let index = self.state.workout_days.iter().position(|day| day.id == id)?;

        let updated = WorkoutDay {
            name: name.into(),
            day_order,
            ..self.state.workout_days[index].clone()
        };

        let mut days = self.state.workout_days.as_ref().clone();
        days[index] = updated.clone();
        self.state.workout_days = Arc::new(days);

        debug!("Updated workout day {}", updated.id);
        self.publish();

        Some(updated)
    }

    /// Append a catalog entry. Names are not de-duplicated.
    pub fn new_exercise(
        &mut self,
        name: impl Into<String>,
        description: Option<String>,
        muscle_group: Option<String>,
    ) -> Exercise {
        let exercise = Exercise {
            id: self.ids.next_id(),
            name: name.into(),
            description,
            muscle_group,
        };

        self.state.exercises = appended(&self.state.exercises, exercise.clone());
        debug!("Created exercise {} ({})", exercise.id, exercise.name);
        self.publish();

        exercise
    }

    pub fn new_workout_day_exercise(
        &mut self,
        workout_day_id: &str,
        exercise_id: &str,
        sets: u32,
        exercise_order: u32,
        prescription: Prescription,
    ) -> StoreResult<WorkoutDayExercise> {
        self.check_reference(ReferenceKind::WorkoutDay, workout_day_id)?;
        self.check_reference(ReferenceKind::Exercise, exercise_id)?;

        let record = WorkoutDayExercise {
            id: self.ids.next_id(),
            workout_day_id: workout_day_id.to_string(),
            exercise_id: exercise_id.to_string(),
            sets,
            min_reps: prescription.min_reps,
            max_reps: prescription.max_reps,
            weight: prescription.weight,
            rest_interval_seconds: prescription.rest_interval_seconds,
            exercise_order,
        };

        self.state.workout_day_exercises =
            appended(&self.state.workout_day_exercises, record.clone());
        debug!(
            "Linked exercise {} into workout day {} at position {}",
            record.exercise_id, record.workout_day_id, record.exercise_order
        );
        self.publish();

        Ok(record)
    }

    /// Drop every join record of one workout day, returning how many went
    pub fn clear_workout_day_exercises(&mut self, workout_day_id: &str) -> usize {
        let before = self.state.workout_day_exercises.len();
        let kept: Vec<_> = self
            .state
            .workout_day_exercises
            .iter()
            .filter(|record| record.workout_day_id != workout_day_id)
            .cloned()
            .collect();

        let removed = before - kept.len();
        if removed == 0 {
            return 0;
        }

        self.state.workout_day_exercises = Arc::new(kept);
        debug!(
            "Cleared {} exercises from workout day {}",
            removed, workout_day_id
        );
        self.publish();

        removed
    }

    fn check_reference(&self, kind: ReferenceKind, id: &str) -> StoreResult<()> {
        if self.policy == ReferencePolicy::Permissive {
            return Ok(());
        }

        let exists = match kind {
            ReferenceKind::Routine => self.state.routines.iter().any(|r| r.id == id),
            ReferenceKind::WorkoutDay => self.state.workout_days.iter().any(|d| d.id == id),
            ReferenceKind::Exercise => self.state.exercises.iter().any(|e| e.id == id),
        };

        if exists {
            Ok(())
        } else {
            Err(StoreError::missing(kind, id))
        }
    }

    fn publish(&mut self) {
        self.revision += 1;
        self.changes.send_replace(StoreSnapshot {
            revision: self.revision,
            state: self.state.clone(),
        });
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new(StoreState::empty())
    }
}

/// New collection holding `items` followed by `item`
fn appended<T: Clone>(items: &Arc<Vec<T>>, item: T) -> Arc<Vec<T>> {
    let mut next = Vec::with_capacity(items.len() + 1);
    next.extend(items.iter().cloned());
    next.push(item);
    Arc::new(next)
}
