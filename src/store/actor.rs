//! Async handle serializing access to a workspace
//!
//! A background task owns the [`Workspace`] and processes requests one at a
//! time, in the order they were sent. Each mutation is applied and written to
//! the slot before the next request is looked at, so persisted states land in
//! mutation order even with many concurrent callers.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::error::StoreError;
use super::types::{
    Exercise, Prescription, Routine, StoreSnapshot, StoreState, WorkoutDay, WorkoutDayExercise,
};
use crate::form::{commit_new_workout_day, commit_workout_day_edit, CommitError, WorkoutDayForm};
use crate::persistence::{KeyValueStore, PersistenceError, PersistenceResult};
use crate::workspace::{Applied, Workspace};

pub type ActorResult<T> = Result<T, ActorError>;

#[derive(Error, Debug)]
pub enum ActorError {
    /// The background task has stopped
    #[error("Store task is no longer running")]
    Closed,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

type Reply<T> = oneshot::Sender<T>;

enum Command {
    NewRoutine {
        name: String,
        reply: Reply<Applied<Routine>>,
    },
    SelectRoutine {
        id: String,
        reply: Reply<Applied<Option<Routine>>>,
    },
    NewWorkoutDay {
        routine_id: String,
        name: String,
        day_order: u32,
        reply: Reply<Result<Applied<WorkoutDay>, StoreError>>,
    },
    UpdateWorkoutDay {
        id: String,
        name: String,
        day_order: u32,
        reply: Reply<Applied<Option<WorkoutDay>>>,
    },
    NewExercise {
        name: String,
        description: Option<String>,
        muscle_group: Option<String>,
        reply: Reply<Applied<Exercise>>,
    },
    NewWorkoutDayExercise {
        workout_day_id: String,
        exercise_id: String,
        sets: u32,
        exercise_order: u32,
        prescription: Prescription,
        reply: Reply<Result<Applied<WorkoutDayExercise>, StoreError>>,
    },
    ClearWorkoutDayExercises {
        workout_day_id: String,
        reply: Reply<Applied<usize>>,
    },
    CommitNewDay {
        routine_id: String,
        form: WorkoutDayForm,
        reply: Reply<Result<Applied<WorkoutDay>, CommitError>>,
    },
    CommitEdit {
        workout_day_id: String,
        form: WorkoutDayForm,
        reply: Reply<Result<Option<Applied<WorkoutDay>>, CommitError>>,
    },
    State {
        reply: Reply<StoreState>,
    },
    Flush {
        reply: Reply<PersistenceResult<()>>,
    },
    Shutdown {
        reply: Reply<PersistenceResult<StoreState>>,
    },
}

/// Cloneable front for a workspace owned by a background task
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::UnboundedSender<Command>,
    changes: watch::Receiver<StoreSnapshot>,
    _worker_handle: Arc<JoinHandle<()>>,
}

impl StoreHandle {
    /// Move `workspace` into a new background task
    ///
    /// The task runs until [`Self::shutdown`] is called or every handle has
    /// been dropped; in the latter case the state is flushed one last time.
    pub fn spawn<B>(workspace: Workspace<B>) -> Self
    where
        B: KeyValueStore + 'static,
    {
        let changes = workspace.subscribe();
        let (tx, rx) = mpsc::unbounded_channel();
        let worker_handle = tokio::spawn(run_worker(workspace, rx));

        Self {
            tx,
            changes,
            _worker_handle: Arc::new(worker_handle),
        }
    }

    /// Receiver of every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.changes.clone()
    }

    /// Latest published snapshot, without a round trip to the task
    pub fn snapshot(&self) -> StoreSnapshot {
        self.changes.borrow().clone()
    }

    /// Current state, after every request sent before this one
    pub async fn state(&self) -> ActorResult<StoreState> {
        self.request(|reply| Command::State { reply }).await
    }

    pub async fn new_routine(&self, name: impl Into<String>) -> ActorResult<Applied<Routine>> {
        let name = name.into();
        self.request(|reply| Command::NewRoutine { name, reply })
            .await
    }

    pub async fn select_routine(&self, id: &str) -> ActorResult<Applied<Option<Routine>>> {
        let id = id.to_string();
        self.request(|reply| Command::SelectRoutine { id, reply })
            .await
    }

    pub async fn new_workout_day(
        &self,
        routine_id: &str,
        name: impl Into<String>,
        day_order: u32,
    ) -> ActorResult<Applied<WorkoutDay>> {
        let routine_id = routine_id.to_string();
        let name = name.into();
        let result = self
            .request(|reply| Command::NewWorkoutDay {
                routine_id,
                name,
                day_order,
                reply,
            })
            .await?;
        Ok(result?)
    }

    pub async fn update_workout_day(
        &self,
        id: &str,
        name: impl Into<String>,
        day_order: u32,
    ) -> ActorResult<Applied<Option<WorkoutDay>>> {
        let id = id.to_string();
        let name = name.into();
        self.request(|reply| Command::UpdateWorkoutDay {
            id,
            name,
            day_order,
            reply,
        })
        .await
    }

    pub async fn new_exercise(
        &self,
        name: impl Into<String>,
        description: Option<String>,
        muscle_group: Option<String>,
    ) -> ActorResult<Applied<Exercise>> {
        let name = name.into();
        self.request(|reply| Command::NewExercise {
            name,
            description,
            muscle_group,
            reply,
        })
        .await
    }

    pub async fn new_workout_day_exercise(
        &self,
        workout_day_id: &str,
        exercise_id: &str,
        sets: u32,
        exercise_order: u32,
        prescription: Prescription,
    ) -> ActorResult<Applied<WorkoutDayExercise>> {
        let workout_day_id = workout_day_id.to_string();
        let exercise_id = exercise_id.to_string();
        let result = self
            .request(|reply| Command::NewWorkoutDayExercise {
                workout_day_id,
                exercise_id,
                sets,
                exercise_order,
                prescription,
                reply,
            })
            .await?;
        Ok(result?)
    }

    pub async fn clear_workout_day_exercises(
        &self,
        workout_day_id: &str,
    ) -> ActorResult<Applied<usize>> {
        let workout_day_id = workout_day_id.to_string();
        self.request(|reply| Command::ClearWorkoutDayExercises {
            workout_day_id,
            reply,
        })
        .await
    }

    /// Validate and commit `form` as a new day at the end of `routine_id`
    pub async fn commit_new_workout_day(
        &self,
        routine_id: &str,
        form: WorkoutDayForm,
    ) -> ActorResult<Applied<WorkoutDay>> {
        let routine_id = routine_id.to_string();
        let result = self
            .request(|reply| Command::CommitNewDay {
                routine_id,
                form,
                reply,
            })
            .await?;
        Ok(result?)
    }

    pub async fn commit_workout_day_edit(
        &self,
        workout_day_id: &str,
        form: WorkoutDayForm,
    ) -> ActorResult<Option<Applied<WorkoutDay>>> {
        let workout_day_id = workout_day_id.to_string();
        let result = self
            .request(|reply| Command::CommitEdit {
                workout_day_id,
                form,
                reply,
            })
            .await?;
        Ok(result?)
    }

    pub async fn flush(&self) -> ActorResult<()> {
        let result = self.request(|reply| Command::Flush { reply }).await?;
        Ok(result?)
    }

    /// Stop the task after a final flush, returning the persisted state
    ///
    /// Requests sent after this one fail with [`ActorError::Closed`].
    pub async fn shutdown(&self) -> ActorResult<StoreState> {
        let result = self.request(|reply| Command::Shutdown { reply }).await?;
        Ok(result?)
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> ActorResult<T> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(command(reply))
            .map_err(|_| ActorError::Closed)?;
        response.await.map_err(|_| ActorError::Closed)
    }
}

async fn run_worker<B: KeyValueStore>(
    mut workspace: Workspace<B>,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    info!("Store task started on slot '{}'", workspace.adapter().slot());
    let mut processed = 0u64;

    while let Some(command) = rx.recv().await {
        processed += 1;

        // A dropped reply receiver only means the caller stopped waiting.
        match command {
            Command::NewRoutine { name, reply } => {
                let _ = reply.send(workspace.new_routine(name));
            }
            Command::SelectRoutine { id, reply } => {
                let _ = reply.send(workspace.select_routine(&id));
            }
            Command::NewWorkoutDay {
                routine_id,
                name,
                day_order,
                reply,
            } => {
                let _ = reply.send(workspace.new_workout_day(&routine_id, name, day_order));
            }
            Command::UpdateWorkoutDay {
                id,
                name,
                day_order,
                reply,
            } => {
                let _ = reply.send(workspace.update_workout_day(&id, name, day_order));
            }
            Command::NewExercise {
                name,
                description,
                muscle_group,
                reply,
            } => {
                let _ = reply.send(workspace.new_exercise(name, description, muscle_group));
            }
            Command::NewWorkoutDayExercise {
                workout_day_id,
                exercise_id,
                sets,
                exercise_order,
                prescription,
                reply,
            } => {
                let _ = reply.send(workspace.new_workout_day_exercise(
                    &workout_day_id,
                    &exercise_id,
                    sets,
                    exercise_order,
                    prescription,
                ));
            }
            Command::ClearWorkoutDayExercises {
                workout_day_id,
                reply,
            } => {
                let _ = reply.send(workspace.clear_workout_day_exercises(&workout_day_id));
            }
            Command::CommitNewDay {
                routine_id,
                form,
                reply,
            } => {
                let _ = reply.send(commit_new_workout_day(&mut workspace, &routine_id, &form));
            }
            Command::CommitEdit {
                workout_day_id,
                form,
                reply,
            } => {
                let _ = reply.send(commit_workout_day_edit(
                    &mut workspace,
                    &workout_day_id,
                    &form,
                ));
            }
            Command::State { reply } => {
                let _ = reply.send(workspace.state().clone());
            }
            Command::Flush { reply } => {
                let _ = reply.send(workspace.flush());
            }
            Command::Shutdown { reply } => {
                debug!("Store task shutting down after {} requests", processed);
                let _ = reply.send(workspace.close());
                return;
            }
        }
    }

    // Every handle was dropped without an explicit shutdown.
    if let Err(e) = workspace.flush() {
        warn!("Final flush of store task failed: {}", e);
    }
    debug!("Store task stopped after {} requests", processed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::ExerciseEntry;
    use crate::ids::SequentialIdGenerator;
    use crate::persistence::{MemoryKeyValueStore, PersistenceAdapter};
    use crate::query::get_workout_days_by_routine;
    use crate::store::ReferencePolicy;

    fn spawn_handle(backend: MemoryKeyValueStore) -> StoreHandle {
        let workspace = Workspace::open_with(
            PersistenceAdapter::new(backend),
            Arc::new(SequentialIdGenerator::new("a")),
            ReferencePolicy::Enforce,
        )
        .unwrap();
        StoreHandle::spawn(workspace)
    }

    #[tokio::test]
    async fn test_mutations_round_trip_through_task() {
        let handle = spawn_handle(MemoryKeyValueStore::new());

        let routine = handle.new_routine("PPL").await.unwrap().into_result().unwrap();
        let day = handle
            .new_workout_day(&routine.id, "Push", 1)
            .await
            .unwrap()
            .into_result()
            .unwrap();

        let state = handle.state().await.unwrap();
        assert!(state.routines.contains(&routine));
        assert_eq!(state.workout_days.as_slice(), &[day]);
    }

    #[tokio::test]
    async fn test_store_errors_are_forwarded() {
        let handle = spawn_handle(MemoryKeyValueStore::new());
        let result = handle.new_workout_day("ghost", "Push", 1).await;
        assert!(matches!(result, Err(ActorError::Store(_))));
    }

    #[tokio::test]
    async fn test_concurrent_callers_are_serialized() {
        let handle = spawn_handle(MemoryKeyValueStore::new());
        let routine_id = handle.state().await.unwrap().routines[0].id.clone();

        let tasks: Vec<_> = (1..=10)
            .map(|n| {
                let handle = handle.clone();
                let routine_id = routine_id.clone();
                tokio::spawn(async move {
                    handle
                        .new_workout_day(&routine_id, format!("Day {n}"), n)
                        .await
                        .map(|applied| applied.is_persisted())
                })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap().unwrap());
        }

        let state = handle.state().await.unwrap();
        assert_eq!(get_workout_days_by_routine(&state.workout_days, &routine_id).len(), 10);
    }

    #[tokio::test]
    async fn test_commit_through_handle() {
        let handle = spawn_handle(MemoryKeyValueStore::new());
        let routine_id = handle.state().await.unwrap().routines[0].id.clone();

        let mut form = WorkoutDayForm::named("Legs");
        form.exercises.push(ExerciseEntry::named("Squat", 5));

        let day = handle
            .commit_new_workout_day(&routine_id, form)
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(day.day_order, 1);

        let invalid = handle
            .commit_new_workout_day(&routine_id, WorkoutDayForm::new())
            .await;
        assert!(matches!(
            invalid,
            Err(ActorError::Commit(CommitError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn test_subscribers_see_task_mutations() {
        let handle = spawn_handle(MemoryKeyValueStore::new());
        let mut changes = handle.subscribe();
        let before = handle.snapshot().revision;

        handle.new_routine("Cardio").await.unwrap().into_result().unwrap();

        changes.changed().await.unwrap();
        assert!(changes.borrow().revision > before);
        assert_eq!(handle.snapshot().state.routines.len(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_flushes_and_closes() {
        let backend = MemoryKeyValueStore::new();
        let handle = spawn_handle(backend.clone());
        handle.new_routine("Kept").await.unwrap().into_result().unwrap();

        let final_state = handle.shutdown().await.unwrap();
        assert_eq!(final_state.routines.len(), 2);

        assert!(matches!(handle.state().await, Err(ActorError::Closed)));

        let reopened = spawn_handle(backend);
        let state = reopened.state().await.unwrap();
        assert_eq!(state, final_state);
    }
}
