use crate::model::model_utils::ModelKind;
use std::path::PathBuf;

const DEFAULT_HOME_DIR: &str = ".";
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";

/// Models served by the prediction API. Every entry must load at startup.
pub const REGISTERED_MODELS: &[(&str, ModelKind)] = &[
    ("rf_8_panel_enterobac_100", ModelKind::Direct),
    ("rf_20_panel_enterobac_100", ModelKind::Direct),
    ("mic_classification_best", ModelKind::Encoded),
    ("mic_i_classification_best", ModelKind::Encoded),
    ("gene_bin_classification_best", ModelKind::Encoded),
    ("gene_mult_classification_best", ModelKind::Encoded),
];

pub fn home_dir() -> PathBuf {
    std::env::var("PATHOPREDICT_HOME")
        .unwrap_or_else(|_| DEFAULT_HOME_DIR.to_string())
        .into()
}

pub fn default_models_dir() -> PathBuf {
    home_dir().join("models")
}

pub fn default_categories_dir() -> PathBuf {
    home_dir().join("category_features_unique_values")
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub host: String,
    pub port: u16,
    pub models_dir: PathBuf,
    pub categories_dir: PathBuf,
    pub allowed_origins: Vec<String>,
}

/// Looks up the family of a registered model.
pub fn registered_kind(name: &str) -> Option<ModelKind> {
    REGISTERED_MODELS
        .iter()
        .find(|(registered, _)| *registered == name)
        .map(|(_, kind)| *kind)
}
