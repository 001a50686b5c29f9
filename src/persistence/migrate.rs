//! Versioned migration of persisted state
//!
//! Steps operate on raw JSON: each registered step turns a payload of
//! version `n` into one of version `n + 1`. When no complete chain leads to
//! [`CURRENT_VERSION`], or the migrated payload does not decode, the state
//! is reset to its initial value. Migration never fails.

use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::ids::IdGenerator;
use crate::store::{StoreState, DEFAULT_ROUTINE_NAME};

/// Version tag written by this build
pub const CURRENT_VERSION: u32 = 5;

/// Transforms a version `n` payload into a version `n + 1` payload
pub type MigrationStep = fn(Value, &dyn IdGenerator) -> Option<Value>;

/// How a stored payload was brought to the current version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Every step from `from` up to the current version applied
    Migrated { from: u32 },
    /// Old data discarded in favor of the initial state
    Reset { from: u32 },
}

/// Registered steps keyed by the version they start from
fn step_from(version: u32) -> Option<MigrationStep> {
    match version {
        4 => Some(adopt_flat_days),
        _ => None,
    }
}

/// Bring `state` (tagged `version`) up to the current schema
pub fn migrate(version: u32, state: Value, ids: &dyn IdGenerator) -> (StoreState, MigrationOutcome) {
    match run_chain(version, state, ids) {
        Some(migrated) => {
            info!("Migrated persisted state from version {} to {}", version, CURRENT_VERSION);
            (migrated, MigrationOutcome::Migrated { from: version })
        }
        None => {
            warn!(
                "Discarding persisted state: no migration from version {} to {}",
                version, CURRENT_VERSION
            );
            (
                StoreState::initial(ids),
                MigrationOutcome::Reset { from: version },
            )
        }
    }
}

fn run_chain(version: u32, mut state: Value, ids: &dyn IdGenerator) -> Option<StoreState> {
    if version >= CURRENT_VERSION {
        return None;
    }

    for from in version..CURRENT_VERSION {
        let step = step_from(from)?;
        state = step(state, ids)?;
    }

    serde_json::from_value(state).ok()
}

/// v4 → v5: the flat layout had no routines. Days without a `routineId`
/// move into the first existing routine, or a new default one.
fn adopt_flat_days(state: Value, ids: &dyn IdGenerator) -> Option<Value> {
    let mut object: Map<String, Value> = match state {
        Value::Object(object) => object,
        _ => return None,
    };

    let mut routines = match object.remove("routines") {
        Some(Value::Array(routines)) => routines,
        None | Some(Value::Null) => Vec::new(),
        Some(_) => return None,
    };

    if routines.is_empty() {
        routines.push(json!({ "id": ids.next_id(), "name": DEFAULT_ROUTINE_NAME }));
    }

    let home_id = routines[0].get("id")?.as_str()?.to_string();

    let days = match object.remove("workoutDays") {
        Some(Value::Array(days)) => days,
        None | Some(Value::Null) => Vec::new(),
        Some(_) => return None,
    };

    let days = days
        .into_iter()
        .map(|day| {
            let mut day = match day {
                Value::Object(day) => day,
                _ => return None,
            };
            day.entry("routineId")
                .or_insert_with(|| Value::String(home_id.clone()));
            Some(Value::Object(day))
        })
        .collect::<Option<Vec<_>>>()?;

    object
        .entry("selectedRoutineId")
        .or_insert_with(|| Value::String(home_id.clone()));
    object.insert("routines".to_string(), Value::Array(routines));
    object.insert("workoutDays".to_string(), Value::Array(days));
    for key in ["exercises", "workoutDayExercises"] {
        object.entry(key).or_insert_with(|| Value::Array(Vec::new()));
    }

    Some(Value::Object(object))
}
