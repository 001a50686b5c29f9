//! Testing utilities and fixtures
//!
//! Mocks for the external collaborators (model provider, text recognizer,
//! byte store) plus small builders for populated store states.

pub mod mocks;

pub use mocks::{
    text_response, tool_call_response, FailingKeyValueStore, MockModelClient,
    MockModelClientBuilder, StaticRecognizer,
};

use std::sync::Arc;

use crate::ids::SequentialIdGenerator;
use crate::store::{EntityStore, Prescription, StoreState};

/// Store with deterministic ids, seeded with the default routine
pub fn seeded_store() -> EntityStore {
    EntityStore::with_ids(
        StoreState::initial(&SequentialIdGenerator::new("seed")),
        Arc::new(SequentialIdGenerator::new("id")),
    )
}

/// Default routine with one day holding two exercises
pub fn sample_program() -> EntityStore {
    let mut store = seeded_store();
    let routine_id = store.state().routines[0].id.clone();

    if let Ok(day) = store.new_workout_day(&routine_id, "Day 1", 1) {
        let bench = store.new_exercise("Bench Press", None, Some("Chest".to_string()));
        let squat = store.new_exercise("Squat", None, Some("Legs".to_string()));
        let _ = store.new_workout_day_exercise(
            &day.id,
            &bench.id,
            3,
            1,
            Prescription::default().reps(8, 12).weight(60.0),
        );
        let _ = store.new_workout_day_exercise(
            &day.id,
            &squat.id,
            5,
            2,
            Prescription::default().rest_seconds(180),
        );
    }

    store
}
