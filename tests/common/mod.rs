#![allow(dead_code)]

use pathopredict::features::category_store::CategoryStore;
use pathopredict::model::model_manager::ModelRegistry;
use pathopredict::model::model_utils::ModelKind;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const PANEL_MODEL: &str = "rf_8_panel_enterobac_100";
pub const MIC_MODEL: &str = "mic_classification_best";

pub const PANEL_FEATURES: [&str; 8] = ["ONPG", "ADH", "LDC", "ODC", "CIT", "H2S", "URE", "IND"];
pub const SPECIES: [&str; 3] = [
    "Escherichia coli",
    "Klebsiella pneumoniae",
    "Proteus mirabilis",
];
pub const MIC_CLASSES: [&str; 3] = ["<=0.5", "1", ">=16"];

/// Models and category files laid out the way the service expects them.
pub struct Fixture {
    pub home: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let home = tempfile::tempdir().unwrap();
        let models = home.path().join("models");
        let categories = home.path().join("category_features_unique_values");
        fs::create_dir_all(&categories).unwrap();

        write_json(&models.join(PANEL_MODEL).join("ensemble.json"), &panel_forest());
        write_json(&models.join(MIC_MODEL).join("ensemble.json"), &mic_forest());
        write_json(
            &models.join(MIC_MODEL).join("label_encoder.json"),
            &json!({ "classes": MIC_CLASSES }),
        );
        write_json(
            &models.join(MIC_MODEL).join("config.json"),
            &json!({ "backend": "tree_ensemble" }),
        );
        write_json(
            &categories.join(format!("{MIC_MODEL}.json")),
            &mic_categories(),
        );

        Fixture { home }
    }

    pub fn models_dir(&self) -> std::path::PathBuf {
        self.home.path().join("models")
    }

    pub fn categories_dir(&self) -> std::path::PathBuf {
        self.home.path().join("category_features_unique_values")
    }

    pub async fn registry(&self) -> ModelRegistry {
        ModelRegistry::load(
            &self.models_dir(),
            CategoryStore::new(self.categories_dir()),
            &[
                (PANEL_MODEL, ModelKind::Direct),
                (MIC_MODEL, ModelKind::Encoded),
            ],
        )
        .await
        .unwrap()
    }
}

fn write_json(path: &Path, value: &Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

/// Indole positive points to E. coli, urease positive to Proteus.
fn panel_forest() -> Value {
    json!({
        "aggregation": "vote",
        "decision": "less_or_equal",
        "feature_names": PANEL_FEATURES,
        "n_classes": 3,
        "classes": SPECIES,
        "trees": [
            {"nodes": [
                {"kind": "numeric", "feature": 7, "threshold": 0.5, "left": 1, "right": 2},
                {"kind": "leaf", "value": [0.1, 0.8, 0.1]},
                {"kind": "leaf", "value": [0.8, 0.1, 0.1]}
            ]},
            {"nodes": [
                {"kind": "numeric", "feature": 6, "threshold": 0.5, "left": 1, "right": 2},
                {"kind": "leaf", "value": [0.6, 0.2, 0.2]},
                {"kind": "leaf", "value": [0.0, 0.0, 1.0]}
            ]}
        ]
    })
}

/// Meropenem raises the MIC class, Klebsiella and unseen species lean to "1".
fn mic_forest() -> Value {
    json!({
        "aggregation": "softmax",
        "feature_names": ["Species", "Country", "Antibiotic", "Year"],
        "n_classes": 3,
        "base_score": 0.5,
        "trees": [
            {"class_index": 0, "nodes": [
                {"kind": "categorical", "feature": 2, "categories": [1], "left": 1, "right": 2, "default_left": true},
                {"kind": "leaf", "value": [1.0]},
                {"kind": "leaf", "value": [-1.0]}
            ]},
            {"class_index": 1, "nodes": [
                {"kind": "categorical", "feature": 0, "categories": [1], "left": 1, "right": 2, "default_left": false},
                {"kind": "leaf", "value": [0.0]},
                {"kind": "leaf", "value": [1.5]}
            ]},
            {"class_index": 2, "nodes": [
                {"kind": "categorical", "feature": 2, "categories": [1], "left": 1, "right": 2, "default_left": true},
                {"kind": "leaf", "value": [0.0]},
                {"kind": "leaf", "value": [1.0]}
            ]}
        ]
    })
}

pub fn mic_categories() -> Value {
    json!({
        "Species": ["Escherichia coli", "Klebsiella pneumoniae"],
        "Country": ["France", "Germany"],
        "Antibiotic": ["Amikacin", "Meropenem"]
    })
}

pub fn panel_record(indole: u8, urease: u8) -> Value {
    json!({
        "ONPG": 1, "ADH": 0, "LDC": 1, "ODC": 1,
        "CIT": 0, "H2S": 0, "URE": urease, "IND": indole
    })
}

pub fn mic_record(species: &str, country: &str, antibiotic: &str) -> Value {
    json!({
        "Species": species,
        "Country": country,
        "Antibiotic": antibiotic,
        "Year": 2019
    })
}
