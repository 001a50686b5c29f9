//! Entity definitions and the serializable store state

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::ids::IdGenerator;

/// Name given to the routine every fresh store starts with
pub const DEFAULT_ROUTINE_NAME: &str = "My Routine";

/// A named collection of workout days
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Routine {
    pub id: String,
    pub name: String,
}

/// One ordered session within a routine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutDay {
    pub id: String,
    pub routine_id: String,
    pub name: String,
    pub day_order: u32,
}

/// Reusable exercise catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muscle_group: Option<String>,
}

/// Join record placing one exercise at a position in one workout day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutDayExercise {
    pub id: String,
    pub workout_day_id: String,
    pub exercise_id: String,
    pub sets: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_reps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_reps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_interval_seconds: Option<u32>,
    pub exercise_order: u32,
}

/// Optional reps/weight/rest parameters of a join record
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Prescription {
    pub min_reps: Option<u32>,
    pub max_reps: Option<u32>,
    pub weight: Option<f64>,
    pub rest_interval_seconds: Option<u32>,
}

impl Prescription {
    pub fn reps(mut self, min: u32, max: u32) -> Self {
        self.min_reps = Some(min);
        self.max_reps = Some(max);
        self
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn rest_seconds(mut self, seconds: u32) -> Self {
        self.rest_interval_seconds = Some(seconds);
        self
    }
}

/// The four collections plus the current routine selection
///
/// Each collection sits behind an `Arc`. Mutations never touch a collection
/// that has been handed out; they build a new one and swap the pointer, so
/// `Arc::ptr_eq` tells observers exactly which collections changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreState {
    pub routines: Arc<Vec<Routine>>,
    pub workout_days: Arc<Vec<WorkoutDay>>,
    pub exercises: Arc<Vec<Exercise>>,
    pub workout_day_exercises: Arc<Vec<WorkoutDayExercise>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_routine_id: Option<String>,
}

impl StoreState {
    /// State with no records at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// State a brand new installation starts from: one selected routine
    pub fn initial(ids: &dyn IdGenerator) -> Self {
        let routine = Routine {
            id: ids.next_id(),
            name: DEFAULT_ROUTINE_NAME.to_string(),
        };

        Self {
            selected_routine_id: Some(routine.id.clone()),
            routines: Arc::new(vec![routine]),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
            && self.workout_days.is_empty()
            && self.exercises.is_empty()
            && self.workout_day_exercises.is_empty()
    }
}

/// A published view of the store after a mutation
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    /// Incremented once per applied mutation
    pub revision: u64,
    pub state: StoreState,
}

/// Whether foreign keys are checked when records are created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferencePolicy {
    /// Accept any referenced id, existing or not
    #[default]
    Permissive,
    /// Reject records whose references do not resolve
    Enforce,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIdGenerator;
    use serde_json::json;

    #[test]
    fn test_initial_state_has_selected_default_routine() {
        let state = StoreState::initial(&SequentialIdGenerator::new("r"));

        assert_eq!(state.routines.len(), 1);
        assert_eq!(state.routines[0].name, DEFAULT_ROUTINE_NAME);
        assert_eq!(state.selected_routine_id.as_deref(), Some("r-1"));
        assert!(state.workout_days.is_empty());
    }

    #[test]
    fn test_join_record_serializes_camel_case_and_skips_absent() {
        let record = WorkoutDayExercise {
            id: "j1".to_string(),
            workout_day_id: "d1".to_string(),
            exercise_id: "e1".to_string(),
            sets: 3,
            min_reps: Some(8),
            max_reps: None,
            weight: None,
            rest_interval_seconds: Some(90),
            exercise_order: 1,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "j1",
                "workoutDayId": "d1",
                "exerciseId": "e1",
                "sets": 3,
                "minReps": 8,
                "restIntervalSeconds": 90,
                "exerciseOrder": 1
            })
        );
    }

    #[test]
    fn test_exercise_without_optionals_deserializes() {
        let exercise: Exercise =
            serde_json::from_value(json!({ "id": "e1", "name": "Bench Press" })).unwrap();
        assert_eq!(exercise.description, None);
        assert_eq!(exercise.muscle_group, None);
    }

    #[test]
    fn test_prescription_builder() {
        let prescription = Prescription::default()
            .reps(8, 12)
            .weight(20.0)
            .rest_seconds(60);

        assert_eq!(prescription.min_reps, Some(8));
        assert_eq!(prescription.max_reps, Some(12));
        assert_eq!(prescription.weight, Some(20.0));
        assert_eq!(prescription.rest_interval_seconds, Some(60));
    }
}
