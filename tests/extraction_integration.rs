//! Integration tests for importing an exercise sheet into a workout day

use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use workout_planner::extraction::{CaptureFlow, ExtractionPipeline, TextFileRecognizer};
use workout_planner::form::{commit_new_workout_day, WorkoutDayForm};
use workout_planner::ids::SequentialIdGenerator;
use workout_planner::persistence::{MemoryKeyValueStore, PersistenceAdapter};
use workout_planner::query::resolve_workout_day_program;
use workout_planner::store::ReferencePolicy;
use workout_planner::testing::MockModelClient;
use workout_planner::workspace::Workspace;

fn sheet_payload() -> serde_json::Value {
    json!({
        "exercises": [
            {
                "sets": 3, "minReps": 8, "maxReps": 12, "weight": 20,
                "name": "Goblet Squat", "description": "", "muscleGroup": "Legs"
            },
            {
                "sets": 4.0, "maxReps": 10, "weight": 0, "restIntervalSeconds": 90,
                "name": "Pull-up", "description": "Full range", "muscleGroup": "Back"
            }
        ]
    })
}

#[tokio::test]
async fn test_sheet_import_commits_a_day() {
    let temp_dir = TempDir::new().unwrap();
    let sheet = temp_dir.path().join("sheet.txt");
    std::fs::write(&sheet, "GOBLET SQUAT 3x8-12 20kg\nPULL-UP 4x10 90s").unwrap();

    let client = MockModelClient::builder().with_tool_call(sheet_payload()).build();
    let flow = CaptureFlow::new(
        Arc::new(TextFileRecognizer),
        ExtractionPipeline::new(Arc::new(client.clone())),
    );

    let mut form = WorkoutDayForm::named("Lower A");
    let added = flow
        .run(&sheet, &mut form, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(added, 2);
    assert!(client.requests()[0].prompt.contains("PULL-UP 4x10 90s"));

    let mut workspace = Workspace::open_with(
        PersistenceAdapter::new(MemoryKeyValueStore::new()),
        Arc::new(SequentialIdGenerator::new("x")),
        ReferencePolicy::Enforce,
    )
    .unwrap();
    let routine_id = workspace.state().routines[0].id.clone();

    let day = commit_new_workout_day(&mut workspace, &routine_id, &form)
        .unwrap()
        .into_result()
        .unwrap();

    let state = workspace.state();
    let program = resolve_workout_day_program(&state.exercises, &state.workout_day_exercises, &day.id);
    assert_eq!(program.len(), 2);

    let (squat_record, squat) = &program[0];
    assert_eq!(squat.name, "Goblet Squat");
    assert_eq!(squat.description, None);
    assert_eq!(squat_record.min_reps, Some(8));
    assert_eq!(squat_record.weight, Some(20.0));

    let (pull_record, pull) = &program[1];
    assert_eq!(pull.description.as_deref(), Some("Full range"));
    assert_eq!(pull_record.sets, 4);
    assert_eq!(pull_record.rest_interval_seconds, Some(90));
    assert_eq!(pull_record.exercise_order, 2);
}

#[tokio::test]
async fn test_malformed_answer_adds_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let sheet = temp_dir.path().join("sheet.txt");
    std::fs::write(&sheet, "SQUAT 3x8").unwrap();

    let client = MockModelClient::builder()
        .with_tool_call(json!({ "exercises": [{ "sets": -1, "name": "Squat" }] }))
        .build();
    let flow = CaptureFlow::new(
        Arc::new(TextFileRecognizer),
        ExtractionPipeline::new(Arc::new(client)),
    );

    let mut form = WorkoutDayForm::named("Legs");
    assert!(flow
        .run(&sheet, &mut form, &CancellationToken::new())
        .await
        .is_err());
    assert!(form.exercises.is_empty());
}

#[tokio::test]
async fn test_sheet_without_reps_imports_with_unset_counts() {
    let temp_dir = TempDir::new().unwrap();
    let sheet = temp_dir.path().join("sheet.txt");
    std::fs::write(&sheet, "PLANK 3 sets").unwrap();

    let client = MockModelClient::builder()
        .with_tool_call(json!({
            "exercises": [{
                "sets": 3, "minReps": 0, "maxReps": 0, "weight": 0, "restIntervalSeconds": 0,
                "name": "Plank", "description": "", "muscleGroup": ""
            }]
        }))
        .build();
    let flow = CaptureFlow::new(
        Arc::new(TextFileRecognizer),
        ExtractionPipeline::new(Arc::new(client)),
    );

    let mut form = WorkoutDayForm::named("Core");
    flow.run(&sheet, &mut form, &CancellationToken::new())
        .await
        .unwrap();

    let mut workspace = Workspace::open_with(
        PersistenceAdapter::new(MemoryKeyValueStore::new()),
        Arc::new(SequentialIdGenerator::new("z")),
        ReferencePolicy::Enforce,
    )
    .unwrap();
    let routine_id = workspace.state().routines[0].id.clone();

    let day = commit_new_workout_day(&mut workspace, &routine_id, &form)
        .unwrap()
        .into_result()
        .unwrap();

    let state = workspace.state();
    let program = resolve_workout_day_program(&state.exercises, &state.workout_day_exercises, &day.id);
    let (record, exercise) = &program[0];
    assert_eq!(exercise.name, "Plank");
    assert_eq!(exercise.muscle_group, None);
    assert_eq!(record.sets, 3);
    assert_eq!(record.min_reps, None);
    assert_eq!(record.max_reps, None);
    assert_eq!(record.rest_interval_seconds, None);
    assert_eq!(record.weight, Some(0.0));
}
