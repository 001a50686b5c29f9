//! Side-effect-free lookups over entity collections
//!
//! Every function borrows a slice and returns clones, so callers may hold
//! results across later store mutations. Filters keep input order; the
//! `sorted_*` helpers use a stable sort, so equal positions keep insertion
//! order.

use crate::store::{Exercise, Routine, WorkoutDay, WorkoutDayExercise};

pub fn get_routine(routines: &[Routine], id: &str) -> Option<Routine> {
    routines.iter().find(|routine| routine.id == id).cloned()
}

pub fn get_workout_day(workout_days: &[WorkoutDay], id: &str) -> Option<WorkoutDay> {
    workout_days.iter().find(|day| day.id == id).cloned()
}

pub fn get_exercise(exercises: &[Exercise], id: &str) -> Option<Exercise> {
    exercises.iter().find(|exercise| exercise.id == id).cloned()
}

pub fn get_workout_day_exercise(
    workout_day_exercises: &[WorkoutDayExercise],
    id: &str,
) -> Option<WorkoutDayExercise> {
    workout_day_exercises
        .iter()
        .find(|record| record.id == id)
        .cloned()
}

pub fn get_workout_days_by_routine(
    workout_days: &[WorkoutDay],
    routine_id: &str,
) -> Vec<WorkoutDay> {
    workout_days
        .iter()
        .filter(|day| day.routine_id == routine_id)
        .cloned()
        .collect()
}

pub fn get_workout_day_exercises_by_workout_day(
    workout_day_exercises: &[WorkoutDayExercise],
    workout_day_id: &str,
) -> Vec<WorkoutDayExercise> {
    workout_day_exercises
        .iter()
        .filter(|record| record.workout_day_id == workout_day_id)
        .cloned()
        .collect()
}

/// Days ordered by `day_order`
pub fn sorted_workout_days(workout_days: &[WorkoutDay]) -> Vec<WorkoutDay> {
    let mut days = workout_days.to_vec();
    days.sort_by_key(|day| day.day_order);
    days
}

/// Join records ordered by `exercise_order`
pub fn sorted_workout_day_exercises(
    workout_day_exercises: &[WorkoutDayExercise],
) -> Vec<WorkoutDayExercise> {
    let mut records = workout_day_exercises.to_vec();
    records.sort_by_key(|record| record.exercise_order);
    records
}

/// A day's program in position order, each join record paired with its
/// exercise. Join records whose exercise is missing are skipped.
pub fn resolve_workout_day_program(
    exercises: &[Exercise],
    workout_day_exercises: &[WorkoutDayExercise],
    workout_day_id: &str,
) -> Vec<(WorkoutDayExercise, Exercise)> {
    let records = get_workout_day_exercises_by_workout_day(workout_day_exercises, workout_day_id);

    sorted_workout_day_exercises(&records)
        .into_iter()
        .filter_map(|record| {
            let exercise = get_exercise(exercises, &record.exercise_id)?;
            Some((record, exercise))
        })
        .collect()
}
