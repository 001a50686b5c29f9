//! Tests for the extraction pipeline and capture flow

use super::*;
use crate::form::WorkoutDayForm;
use crate::testing::{MockModelClient, StaticRecognizer};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn squat_payload() -> serde_json::Value {
    json!({
        "exercises": [{
            "sets": 3, "minReps": 8, "maxReps": 12, "weight": 20,
            "name": "Squat", "description": "...", "muscleGroup": "Legs"
        }]
    })
}

fn pipeline_with(client: MockModelClient) -> ExtractionPipeline {
    ExtractionPipeline::new(Arc::new(client))
}

#[tokio::test]
async fn test_valid_tool_call_yields_exactly_one_draft() {
    let client = MockModelClient::builder().with_tool_call(squat_payload()).build();
    let pipeline = pipeline_with(client);

    let drafts = pipeline.get_exercises_from_text("SQUAT 3x8-12 20kg").await.unwrap();

    assert_eq!(drafts.len(), 1);
    let draft = &drafts[0];
    assert_eq!(draft.sets, 3);
    assert_eq!(draft.min_reps, Some(8));
    assert_eq!(draft.max_reps, Some(12));
    assert_eq!(draft.weight, Some(20.0));
    assert_eq!(draft.name, "Squat");
    assert_eq!(draft.description, "...");
    assert_eq!(draft.muscle_group, "Legs");
}

#[tokio::test]
async fn test_prose_response_is_rejected() {
    let client = MockModelClient::builder()
        .with_text("Here are your exercises: squat 3x8")
        .build();

    let result = pipeline_with(client).get_exercises_from_text("squat").await;
    assert!(matches!(result, Err(ExtractionError::UnexpectedResponse(_))));
}

#[tokio::test]
async fn test_wrong_tool_name_is_rejected() {
    let mut response = crate::testing::tool_call_response(squat_payload());
    if let Some(ContentBlock::ToolUse { name, .. }) = response.content.first_mut() {
        *name = "other".to_string();
    }
    let client = MockModelClient::builder().with_response(response).build();

    let result = pipeline_with(client).get_exercises_from_text("squat").await;
    assert!(matches!(result, Err(ExtractionError::UnexpectedResponse(_))));
}

#[tokio::test]
async fn test_schema_invalid_payload_is_rejected() {
    let client = MockModelClient::builder()
        .with_tool_call(json!({ "exercises": [{ "sets": "three", "name": "Squat" }] }))
        .build();

    let result = pipeline_with(client).get_exercises_from_text("squat").await;
    assert!(matches!(result, Err(ExtractionError::InvalidPayload(_))));
}

#[tokio::test]
async fn test_model_failure_is_surfaced() {
    let client = MockModelClient::builder()
        .with_error(ModelError::Unauthorized)
        .build();

    let result = pipeline_with(client).get_exercises_from_text("squat").await;
    assert!(matches!(
        result,
        Err(ExtractionError::Model(ModelError::Unauthorized))
    ));
}

#[tokio::test]
async fn test_request_carries_rules_text_and_schema() {
    let client = MockModelClient::builder().with_tool_call(squat_payload()).build();
    let pipeline = pipeline_with(client.clone())
        .with_model("test-model")
        .with_max_tokens(256);

    pipeline.get_exercises_from_text("squat 3x8").await.unwrap();

    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.model, "test-model");
    assert_eq!(request.max_tokens, 256);
    assert_eq!(request.tool.name, TOOL_NAME);
    assert!(request.prompt.ends_with("\n\nsquat 3x8"));
    assert_eq!(request.tool.input_schema, schema::payload_schema());
}

#[tokio::test]
async fn test_blank_text_skips_model_call() {
    let client = MockModelClient::new();
    let drafts = pipeline_with(client.clone())
        .get_exercises_from_text("   \n")
        .await
        .unwrap();

    assert!(drafts.is_empty());
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_cancel_before_response_discards_result() {
    let client = MockModelClient::builder()
        .with_tool_call(squat_payload())
        .with_delay(Duration::from_millis(200))
        .build();
    let pipeline = pipeline_with(client);
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        })
    };

    let result = pipeline
        .get_exercises_from_text_cancellable("squat", &cancel)
        .await;
    canceller.await.unwrap();

    assert!(matches!(result, Err(ExtractionError::Cancelled)));
}

#[tokio::test]
async fn test_already_cancelled_token_wins() {
    let client = MockModelClient::builder().with_tool_call(squat_payload()).build();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = pipeline_with(client)
        .get_exercises_from_text_cancellable("squat", &cancel)
        .await;
    assert!(matches!(result, Err(ExtractionError::Cancelled)));
}

#[tokio::test]
async fn test_capture_flow_appends_drafts_to_form() {
    let client = MockModelClient::builder().with_tool_call(squat_payload()).build();
    let flow = CaptureFlow::new(
        Arc::new(StaticRecognizer::new("SQUAT 3x8-12 20kg")),
        pipeline_with(client),
    );
    let mut form = WorkoutDayForm::new();

    let added = flow
        .run(Path::new("sheet.jpg"), &mut form, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(added, 1);
    assert_eq!(form.exercises.len(), 2);
    let entry = &form.exercises[1];
    assert_eq!(entry.name, "Squat");
    assert_eq!(entry.sets, 3.0);
    assert_eq!(entry.muscle_group.as_deref(), Some("Legs"));
}

#[tokio::test]
async fn test_capture_flow_failure_leaves_form_untouched() {
    let client = MockModelClient::builder().with_text("no tool").build();
    let flow = CaptureFlow::new(Arc::new(StaticRecognizer::new("text")), pipeline_with(client));
    let mut form = WorkoutDayForm::new();
    let before = form.clone();

    let result = flow
        .run(Path::new("sheet.jpg"), &mut form, &CancellationToken::new())
        .await;

    assert!(result.is_err());
    assert_eq!(form, before);
}

#[tokio::test]
async fn test_capture_flow_recognition_failure() {
    let client = MockModelClient::new();
    let flow = CaptureFlow::new(Arc::new(StaticRecognizer::failing()), pipeline_with(client.clone()));
    let mut form = WorkoutDayForm::new();

    let result = flow
        .run(Path::new("blank.jpg"), &mut form, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(ExtractionError::Recognition(_))));
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_text_file_recognizer_reads_file() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("sheet.txt");
    std::fs::write(&path, "Deadlift 5x5").unwrap();

    let text = TextFileRecognizer.recognize_text(&path).await.unwrap();
    assert_eq!(text, "Deadlift 5x5");
}
