//! Target schema of the extraction tool call and its validation

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::ExtractionError;

/// One validated exercise candidate, carried literally from the payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseDraft {
    pub sets: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_reps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_reps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_interval_seconds: Option<u32>,
    pub name: String,
    pub description: String,
    pub muscle_group: String,
}

/// Raw tool input. Numbers stay `f64` here, since models happily
/// write `3.0` for an integer; integrality is checked afterwards.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePayload {
    exercises: Vec<WireExercise>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireExercise {
    sets: f64,
    #[serde(default)]
    min_reps: Option<f64>,
    #[serde(default)]
    max_reps: Option<f64>,
    weight: f64,
    #[serde(default)]
    rest_interval_seconds: Option<f64>,
    name: String,
    description: String,
    muscle_group: String,
}

/// JSON schema sent as the tool's `input_schema`
pub fn payload_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "exercises": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "sets": { "type": "integer", "minimum": 0 },
                        "minReps": { "type": "integer", "minimum": 0 },
                        "maxReps": { "type": "integer", "minimum": 0 },
                        "weight": { "type": "number", "minimum": 0 },
                        "restIntervalSeconds": { "type": "integer", "minimum": 0 },
                        "name": { "type": "string" },
                        "description": { "type": "string" },
                        "muscleGroup": { "type": "string" }
                    },
                    "required": ["sets", "weight", "name", "description", "muscleGroup"]
                }
            }
        },
        "required": ["exercises"]
    })
}

/// Decode and validate a tool call input into drafts, all or nothing
pub fn parse_payload(input: Value) -> Result<Vec<ExerciseDraft>, ExtractionError> {
    let payload: WirePayload = serde_json::from_value(input).map_err(ExtractionError::invalid)?;

    payload
        .exercises
        .into_iter()
        .enumerate()
        .map(|(index, exercise)| exercise.into_draft(index))
        .collect()
}

impl WireExercise {
    fn into_draft(self, index: usize) -> Result<ExerciseDraft, ExtractionError> {
        let at = |field: &str| format!("exercises[{index}].{field}");

        Ok(ExerciseDraft {
            sets: whole(self.sets, || at("sets"))?,
            min_reps: self
                .min_reps
                .map(|v| whole(v, || at("minReps")))
                .transpose()?,
            max_reps: self
                .max_reps
                .map(|v| whole(v, || at("maxReps")))
                .transpose()?,
            weight: Some(non_negative(self.weight, || at("weight"))?),
            rest_interval_seconds: self
                .rest_interval_seconds
                .map(|v| whole(v, || at("restIntervalSeconds")))
                .transpose()?,
            name: self.name,
            description: self.description,
            muscle_group: self.muscle_group,
        })
    }
}

fn non_negative(value: f64, field: impl Fn() -> String) -> Result<f64, ExtractionError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ExtractionError::invalid(format!(
            "{} must be a non-negative number, got {}",
            field(),
            value
        )))
    }
}

fn whole(value: f64, field: impl Fn() -> String) -> Result<u32, ExtractionError> {
    let value = non_negative(value, &field)?;

    if value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return Err(ExtractionError::invalid(format!(
            "{} must be a whole number, got {}",
            field(),
            value
        )));
    }

    Ok(value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_payload_produces_literal_draft() {
        let drafts = parse_payload(json!({
            "exercises": [{
                "sets": 3, "minReps": 8, "maxReps": 12, "weight": 20,
                "name": "Squat", "description": "...", "muscleGroup": "Legs"
            }]
        }))
        .unwrap();

        assert_eq!(
            drafts,
            vec![ExerciseDraft {
                sets: 3,
                min_reps: Some(8),
                max_reps: Some(12),
                weight: Some(20.0),
                rest_interval_seconds: None,
                name: "Squat".to_string(),
                description: "...".to_string(),
                muscle_group: "Legs".to_string(),
            }]
        );
    }

    #[test]
    fn test_integral_floats_are_accepted() {
        let drafts = parse_payload(json!({
            "exercises": [{
                "sets": 4.0, "weight": 0, "restIntervalSeconds": 90.0,
                "name": "", "description": "", "muscleGroup": ""
            }]
        }))
        .unwrap();

        assert_eq!(drafts[0].sets, 4);
        assert_eq!(drafts[0].rest_interval_seconds, Some(90));
    }

    #[test]
    fn test_empty_exercise_list_is_valid() {
        assert!(parse_payload(json!({ "exercises": [] })).unwrap().is_empty());
    }

    #[test]
    fn test_schema_violations_are_rejected() {
        let cases = [
            json!({}),
            json!({ "exercises": "Squat" }),
            json!({ "exercises": [{ "sets": 3, "weight": 1, "name": "A", "description": "" }] }),
            json!({ "exercises": [{ "sets": "3", "weight": 1, "name": "A", "description": "", "muscleGroup": "" }] }),
            json!({ "exercises": [{ "sets": 3.5, "weight": 1, "name": "A", "description": "", "muscleGroup": "" }] }),
            json!({ "exercises": [{ "sets": 3, "weight": -5, "name": "A", "description": "", "muscleGroup": "" }] }),
            json!({ "exercises": [{ "sets": 3, "minReps": -1, "weight": 1, "name": "A", "description": "", "muscleGroup": "" }] }),
        ];

        for case in cases {
            let result = parse_payload(case.clone());
            assert!(
                matches!(result, Err(ExtractionError::InvalidPayload(_))),
                "expected rejection for {case}"
            );
        }
    }

    #[test]
    fn test_one_bad_entry_rejects_whole_payload() {
        let result = parse_payload(json!({
            "exercises": [
                { "sets": 3, "weight": 1, "name": "Good", "description": "", "muscleGroup": "" },
                { "sets": 1.5, "weight": 1, "name": "Bad", "description": "", "muscleGroup": "" }
            ]
        }));

        match result {
            Err(ExtractionError::InvalidPayload(msg)) => assert!(msg.contains("exercises[1].sets")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_schema_requires_core_fields() {
        let schema = payload_schema();
        let required = &schema["properties"]["exercises"]["items"]["required"];
        assert_eq!(
            required,
            &json!(["sets", "weight", "name", "description", "muscleGroup"])
        );
    }
}
