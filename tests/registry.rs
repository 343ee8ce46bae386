mod common;

use common::*;
use pathopredict::error::PredictionError;
use pathopredict::features::category_store::CategoryStore;
use pathopredict::features::frame::Record;
use pathopredict::model::model_manager::ModelRegistry;
use pathopredict::model::model_utils::ModelKind;
use serde_json::{json, Value};

fn records(values: Vec<Value>) -> Vec<Record> {
    serde_json::from_value(Value::Array(values)).unwrap()
}

#[tokio::test]
async fn direct_predictions_match_record_count_and_order() {
    let fixture = Fixture::new();
    let registry = fixture.registry().await;

    let input = vec![panel_record(1, 0), panel_record(0, 0), panel_record(0, 1)];
    let predictions = registry.predict(PANEL_MODEL, &records(input.clone())).unwrap();
    assert_eq!(predictions, SPECIES.map(String::from).to_vec());

    let mut reversed = input;
    reversed.reverse();
    let mut expected = predictions.clone();
    expected.reverse();
    assert_eq!(registry.predict(PANEL_MODEL, &records(reversed)).unwrap(), expected);
}

#[tokio::test]
async fn encoded_predictions_are_known_labels() {
    let fixture = Fixture::new();
    let registry = fixture.registry().await;

    let input = records(vec![
        mic_record("Escherichia coli", "France", "Amikacin"),
        mic_record("Klebsiella pneumoniae", "Germany", "Meropenem"),
        mic_record("Escherichia coli", "Germany", "Meropenem"),
        mic_record("Escherichia coli", "Atlantis", "Unobtainium"),
    ]);
    let predictions = registry.predict(MIC_MODEL, &input).unwrap();
    assert_eq!(predictions, vec!["<=0.5", "1", ">=16", "<=0.5"]);
    assert!(predictions.iter().all(|p| MIC_CLASSES.contains(&p.as_str())));
}

#[tokio::test]
async fn repeated_predictions_are_identical() {
    let fixture = Fixture::new();
    let registry = fixture.registry().await;

    let input = records(vec![
        mic_record("Martian bacillus", "France", "Meropenem"),
        mic_record("Klebsiella pneumoniae", "France", "Amikacin"),
    ]);
    let first = registry.predict(MIC_MODEL, &input).unwrap();
    let second = registry.predict(MIC_MODEL, &input).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn categorical_column_missing_from_request_is_rejected() {
    let fixture = Fixture::new();
    let registry = fixture.registry().await;

    let input = records(vec![json!({"Species": "Escherichia coli", "Antibiotic": "Amikacin", "Year": 2019})]);
    let err = registry.predict(MIC_MODEL, &input).unwrap_err();
    assert!(matches!(err, PredictionError::FeatureShapeMismatch(_)));
}

#[tokio::test]
async fn category_keys_match_training_columns() {
    let fixture = Fixture::new();
    let registry = fixture.registry().await;

    let spec = registry.categories().load(MIC_MODEL).unwrap();
    assert_eq!(spec.column_names(), vec!["Species", "Country", "Antibiotic"]);
}

#[tokio::test]
async fn encoded_model_without_label_encoder_fails_startup() {
    let fixture = Fixture::new();
    std::fs::remove_file(fixture.models_dir().join(MIC_MODEL).join("label_encoder.json")).unwrap();

    let result = ModelRegistry::load(
        &fixture.models_dir(),
        CategoryStore::new(fixture.categories_dir()),
        &[(PANEL_MODEL, ModelKind::Direct), (MIC_MODEL, ModelKind::Encoded)],
    )
    .await;
    assert!(result.is_err());
}
