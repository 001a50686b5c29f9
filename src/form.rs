//! Workout day form: editable entries, validation, and commit
//!
//! A [`WorkoutDayForm`] holds what the user has typed (or what extraction
//! appended) before anything reaches the store. Numeric fields are kept as
//! `f64` so unparsable or fractional input can be reported per field rather
//! than rejected at the type level.

use thiserror::Error;
use tracing::{debug, info};

use crate::extraction::ExerciseDraft;
use crate::persistence::{KeyValueStore, PersistenceResult};
use crate::query::{get_workout_day, get_workout_days_by_routine, resolve_workout_day_program};
use crate::store::{Prescription, StoreError, StoreState, WorkoutDay};
use crate::workspace::{applied, Applied, Workspace};

/// Longest accepted day or exercise name, in characters
pub const MAX_NAME_LENGTH: usize = 100;
/// Sets given to a blank entry
pub const DEFAULT_SETS: f64 = 3.0;

/// One exercise row of the form
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseEntry {
    pub name: String,
    pub sets: f64,
    pub min_reps: Option<f64>,
    pub max_reps: Option<f64>,
    pub weight: Option<f64>,
    pub rest_interval_seconds: Option<f64>,
    pub description: Option<String>,
    pub muscle_group: Option<String>,
}

impl ExerciseEntry {
    pub fn blank() -> Self {
        Self {
            name: String::new(),
            sets: DEFAULT_SETS,
            min_reps: None,
            max_reps: None,
            weight: None,
            rest_interval_seconds: None,
            description: None,
            muscle_group: None,
        }
    }

    pub fn named(name: impl Into<String>, sets: u32) -> Self {
        Self {
            name: name.into(),
            sets: f64::from(sets),
            ..Self::blank()
        }
    }
}

impl Default for ExerciseEntry {
    fn default() -> Self {
        Self::blank()
    }
}

impl From<ExerciseDraft> for ExerciseEntry {
    fn from(draft: ExerciseDraft) -> Self {
        Self {
            name: draft.name,
            sets: f64::from(draft.sets),
            min_reps: non_zero(draft.min_reps),
            max_reps: non_zero(draft.max_reps),
            weight: draft.weight,
            rest_interval_seconds: non_zero(draft.rest_interval_seconds),
            description: non_empty(draft.description),
            muscle_group: non_empty(draft.muscle_group),
        }
    }
}

/// Extraction reports unknown numbers as 0
fn non_zero(value: Option<u32>) -> Option<f64> {
    value.filter(|&v| v != 0).map(f64::from)
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Path of the field, e.g. `name` or `exercises[1].sets`
    pub field: String,
    pub message: String,
}

/// Every rule the form broke, in field order
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Form validation failed: {}", summary(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    /// Messages reported for `field`
    pub fn messages_for(&self, field: &str) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }
}

/// Error committing a form to the workspace
#[derive(Error, Debug)]
pub enum CommitError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A form that passed validation, with store-ready values
#[derive(Debug, Clone, PartialEq)]
pub struct ValidWorkoutDay {
    pub name: String,
    pub exercises: Vec<ValidExercise>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidExercise {
    pub name: String,
    pub description: Option<String>,
    pub muscle_group: Option<String>,
    pub sets: u32,
    pub prescription: Prescription,
}

/// In-progress workout day
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutDayForm {
    pub name: String,
    pub exercises: Vec<ExerciseEntry>,
}

impl WorkoutDayForm {
    /// Empty name and one blank entry
    pub fn new() -> Self {
        Self {
            name: String::new(),
            exercises: vec![ExerciseEntry::blank()],
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exercises: Vec::new(),
        }
    }

    /// Prefill from a stored day and its program, `None` if the day is missing
    pub fn from_workout_day(state: &StoreState, workout_day_id: &str) -> Option<Self> {
        let day = get_workout_day(&state.workout_days, workout_day_id)?;
        let exercises = resolve_workout_day_program(
            &state.exercises,
            &state.workout_day_exercises,
            workout_day_id,
        )
        .into_iter()
        .map(|(record, exercise)| ExerciseEntry {
            name: exercise.name,
            sets: f64::from(record.sets),
            min_reps: record.min_reps.map(f64::from),
            max_reps: record.max_reps.map(f64::from),
            weight: record.weight,
            rest_interval_seconds: record.rest_interval_seconds.map(f64::from),
            description: exercise.description,
            muscle_group: exercise.muscle_group,
        })
        .collect();

        Some(Self {
            name: day.name,
            exercises,
        })
    }

    pub fn push_blank(&mut self) {
        self.exercises.push(ExerciseEntry::blank());
    }

    pub fn append_draft(&mut self, draft: ExerciseDraft) {
        self.exercises.push(draft.into());
    }

    /// Remove the entry at `index`. The last remaining entry is kept.
    pub fn remove(&mut self, index: usize) -> Option<ExerciseEntry> {
        if self.exercises.len() <= 1 || index >= self.exercises.len() {
            return None;
        }
        Some(self.exercises.remove(index))
    }

    pub fn validate(&self) -> Result<ValidWorkoutDay, ValidationErrors> {
        let mut errors = Vec::new();
        let mut push = |field: String, message: &str| {
            errors.push(FieldError {
                field,
                message: message.to_string(),
            })
        };

        let name = self.name.trim();
        if name.is_empty() {
            push("name".to_string(), "Name is required");
        } else if name.chars().count() > MAX_NAME_LENGTH {
            push("name".to_string(), "Name must be less than 100 characters");
        }

        if self.exercises.is_empty() {
            push("exercises".to_string(), "At least one exercise is required");
        }

        let mut valid = Vec::with_capacity(self.exercises.len());
        for (index, entry) in self.exercises.iter().enumerate() {
            let at = |field: &str| format!("exercises[{index}].{field}");

            let entry_name = entry.name.trim();
            if entry_name.is_empty() {
                push(at("name"), "Exercise name is required");
            } else if entry_name.chars().count() > MAX_NAME_LENGTH {
                push(at("name"), "Exercise name must be less than 100 characters");
            }

            let sets = count(entry.sets, 1.0, "Sets", &at("sets"), &mut push);
            let min_reps = entry
                .min_reps
                .and_then(|v| count(v, 1.0, "Min reps", &at("minReps"), &mut push));
            let max_reps = entry
                .max_reps
                .and_then(|v| count(v, 1.0, "Max reps", &at("maxReps"), &mut push));
            if let (Some(min), Some(max)) = (min_reps, max_reps) {
                if max < min {
                    push(at("maxReps"), "Max reps must be at least min reps");
                }
            }
            let rest = entry.rest_interval_seconds.and_then(|v| {
                count(v, 0.0, "Rest interval", &at("restIntervalSeconds"), &mut push)
            });
            let weight = entry.weight.and_then(|v| {
                if v.is_nan() {
                    push(at("weight"), "Weight must be a number");
                    None
                } else if v < 0.0 {
                    push(at("weight"), "Weight must be at least 0");
                    None
                } else {
                    Some(v)
                }
            });

            if let Some(sets) = sets {
                valid.push(ValidExercise {
                    name: entry_name.to_string(),
                    description: entry.description.clone(),
                    muscle_group: entry.muscle_group.clone(),
                    sets,
                    prescription: Prescription {
                        min_reps,
                        max_reps,
                        weight,
                        rest_interval_seconds: rest,
                    },
                });
            }
        }

        if !errors.is_empty() {
            return Err(ValidationErrors { errors });
        }

        Ok(ValidWorkoutDay {
            name: name.to_string(),
            exercises: valid,
        })
    }
}

impl Default for WorkoutDayForm {
    fn default() -> Self {
        Self::new()
    }
}

/// Check a whole-number field with a lower bound
fn count(
    value: f64,
    min: f64,
    label: &str,
    field: &str,
    push: &mut impl FnMut(String, &str),
) -> Option<u32> {
    if !value.is_finite() {
        push(field.to_string(), &format!("{label} must be a number"));
        return None;
    }
    if value < min {
        push(field.to_string(), &format!("{label} must be at least {min}"));
        return None;
    }
    if value.fract() != 0.0 || value > f64::from(u32::MAX) {
        push(field.to_string(), &format!("{label} must be a whole number"));
        return None;
    }
    Some(value as u32)
}

/// Validate `form` and create it as a new day at the end of `routine_id`
pub fn commit_new_workout_day<B: KeyValueStore>(
    workspace: &mut Workspace<B>,
    routine_id: &str,
    form: &WorkoutDayForm,
) -> Result<Applied<WorkoutDay>, CommitError> {
    let valid = form.validate()?;
    let day_order = next_day_order(workspace.state(), routine_id);

    let mut persisted = Ok(());
    let day = workspace
        .new_workout_day(routine_id, valid.name.as_str(), day_order)?
        .collect_error(&mut persisted);

    add_program(workspace, &day, valid.exercises, &mut persisted)?;
    info!("Created workout day '{}' at position {}", day.name, day.day_order);
    Ok(applied(day, persisted))
}

/// Validate `form` and replace the name and program of `workout_day_id`
///
/// The day keeps its position. `None` when the day does not exist.
pub fn commit_workout_day_edit<B: KeyValueStore>(
    workspace: &mut Workspace<B>,
    workout_day_id: &str,
    form: &WorkoutDayForm,
) -> Result<Option<Applied<WorkoutDay>>, CommitError> {
    let valid = form.validate()?;
    let Some(existing) = get_workout_day(&workspace.state().workout_days, workout_day_id) else {
        debug!("Edit of missing workout day {}", workout_day_id);
        return Ok(None);
    };

    let mut persisted = Ok(());
    let day = workspace
        .update_workout_day(&existing.id, valid.name.as_str(), existing.day_order)
        .collect_error(&mut persisted)
        .unwrap_or(existing);

    let removed = workspace
        .clear_workout_day_exercises(&day.id)
        .collect_error(&mut persisted);
    debug!("Replacing {} exercises of workout day {}", removed, day.id);

    add_program(workspace, &day, valid.exercises, &mut persisted)?;
    Ok(Some(applied(day, persisted)))
}

fn next_day_order(state: &StoreState, routine_id: &str) -> u32 {
    let days = get_workout_days_by_routine(&state.workout_days, routine_id).len();
    u32::try_from(days).map_or(u32::MAX, |n| n.saturating_add(1))
}

fn add_program<B: KeyValueStore>(
    workspace: &mut Workspace<B>,
    day: &WorkoutDay,
    exercises: Vec<ValidExercise>,
    persisted: &mut PersistenceResult<()>,
) -> Result<(), StoreError> {
    for (position, entry) in (1u32..).zip(exercises) {
        let exercise = workspace
            .new_exercise(entry.name, entry.description, entry.muscle_group)
            .collect_error(persisted);
        workspace
            .new_workout_day_exercise(&day.id, &exercise.id, entry.sets, position, entry.prescription)?
            .collect_error(persisted);
    }
    Ok(())
}
