use super::traits::model_trait::Estimator;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    TreeEnsemble,
    Onnx,
}

/// Artifact family of a registered model.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Estimator emits the final labels.
    Direct,
    /// Estimator emits class codes decoded through a [`LabelDecoder`].
    Encoded,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Direct => write!(f, "direct"),
            ModelKind::Encoded => write!(f, "encoded"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predictions {
    Labels(Vec<String>),
    Codes(Vec<i64>),
}

impl Predictions {
    pub fn len(&self) -> usize {
        match self {
            Predictions::Labels(labels) => labels.len(),
            Predictions::Codes(codes) => codes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Renders a JSON scalar the way a label is shown to clients: strings
/// verbatim, everything else in its JSON form.
pub fn label_from_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_string(),
        other => other.to_string(),
    }
}

/// Maps class codes back to the labels the estimator was trained on.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(from = "LabelEncoderFile")]
pub struct LabelDecoder {
    classes: Vec<String>,
}

#[derive(Deserialize)]
struct LabelEncoderFile {
    classes: Vec<Value>,
}

impl From<LabelEncoderFile> for LabelDecoder {
    fn from(file: LabelEncoderFile) -> Self {
        LabelDecoder::new(file.classes.iter().map(label_from_value).collect())
    }
}

impl LabelDecoder {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Decodes every code, or returns the first code that does not index
    /// into the known classes.
    pub fn decode(&self, codes: &[i64]) -> Result<Vec<String>, i64> {
        codes
            .iter()
            .map(|&code| {
                usize::try_from(code)
                    .ok()
                    .and_then(|i| self.classes.get(i))
                    .cloned()
                    .ok_or(code)
            })
            .collect()
    }
}

pub enum ModelArtifact {
    Direct(Box<dyn Estimator>),
    Encoded {
        estimator: Box<dyn Estimator>,
        labels: LabelDecoder,
    },
}

impl ModelArtifact {
    pub fn kind(&self) -> ModelKind {
        match self {
            ModelArtifact::Direct(_) => ModelKind::Direct,
            ModelArtifact::Encoded { .. } => ModelKind::Encoded,
        }
    }
}

/// Per-model `config.json`. Every field is optional on disk.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ArtifactConfig {
    #[serde(default = "default_backend")]
    pub backend: Backend,
    #[serde(default)]
    pub model_file: Option<String>,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    #[serde(default = "default_input_name")]
    pub input_name: String,
    #[serde(default = "default_output_name")]
    pub output_name: String,
    #[serde(default = "default_serialization_version")]
    pub serialization_version: u32,
}

fn default_backend() -> Backend {
    Backend::TreeEnsemble
}

fn default_input_name() -> String {
    String::from("float_input")
}

fn default_output_name() -> String {
    String::from("label")
}

fn default_serialization_version() -> u32 {
    1
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        ArtifactConfig {
            backend: default_backend(),
            model_file: None,
            feature_names: None,
            input_name: default_input_name(),
            output_name: default_output_name(),
            serialization_version: default_serialization_version(),
        }
    }
}

impl ArtifactConfig {
    /// Reads `config.json` from a model directory, falling back to defaults
    /// when the file is absent.
    pub async fn from_dir(model_dir: &Path) -> anyhow::Result<Self> {
        let config_path = model_dir.join("config.json");
        if !tokio::fs::try_exists(&config_path).await? {
            return Ok(ArtifactConfig::default());
        }

        let raw = tokio::fs::read_to_string(&config_path)
            .await
            .with_context(|| format!("reading {}", config_path.display()))?;
        let config: ArtifactConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parsing {}", config_path.display()))?;
        if config.serialization_version != 1 {
            anyhow::bail!(
                "unsupported serialization version {} in {}",
                config.serialization_version,
                config_path.display()
            );
        }

        Ok(config)
    }

    pub fn model_file(&self) -> &str {
        match (&self.model_file, self.backend) {
            (Some(file), _) => file.as_str(),
            (None, Backend::TreeEnsemble) => "ensemble.json",
            (None, Backend::Onnx) => "model.onnx",
        }
    }
}
