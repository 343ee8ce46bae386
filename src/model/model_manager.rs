use super::backends::onnx::onnx_classifier::OnnxClassifier;
use super::backends::tree::tree_ensemble::TreeEnsembleModel;
use super::model_utils::{
    ArtifactConfig, Backend, LabelDecoder, ModelArtifact, ModelKind, Predictions,
};
use super::traits::model_trait::Estimator;
use crate::error::PredictionError;
use crate::features::category_store::CategoryStore;
use crate::features::frame::{Frame, Record};
use anyhow::Context;
use futures::future::try_join_all;
use log::{debug, info};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

/// Name-keyed set of loaded models. Built once at startup and only read
/// afterwards, so request handlers share it without locking.
pub struct ModelRegistry {
    models: HashMap<String, ModelArtifact>,
    categories: CategoryStore,
}

impl ModelRegistry {
    pub fn new(
        models: impl IntoIterator<Item = (String, ModelArtifact)>,
        categories: CategoryStore,
    ) -> Self {
        Self {
            models: models.into_iter().collect(),
            categories,
        }
    }

    /// Loads every listed artifact from `models_dir`. Any failure aborts the
    /// whole load.
    pub async fn load(
        models_dir: &Path,
        categories: CategoryStore,
        models: &[(&str, ModelKind)],
    ) -> anyhow::Result<Self> {
        let start = Instant::now();
        let loaded = try_join_all(models.iter().map(|(name, kind)| async move {
            let artifact = load_artifact(&models_dir.join(*name), *kind)
                .await
                .with_context(|| format!("failed to load model '{name}'"))?;
            info!("model '{name}' ({kind}) ready");
            Ok::<_, anyhow::Error>((name.to_string(), artifact))
        }))
        .await?;
        info!("{} models loaded in {:?}", loaded.len(), start.elapsed());

        Ok(Self::new(loaded, categories))
    }

    pub fn categories(&self) -> &CategoryStore {
        &self.categories
    }

    /// Registered models and their families, sorted by name.
    pub fn models(&self) -> Vec<(String, ModelKind)> {
        let mut models: Vec<(String, ModelKind)> = self
            .models
            .iter()
            .map(|(name, artifact)| (name.clone(), artifact.kind()))
            .collect();
        models.sort_by(|a, b| a.0.cmp(&b.0));
        models
    }

    /// Predicts one label per record, in record order.
    pub fn predict(&self, name: &str, records: &[Record]) -> Result<Vec<String>, PredictionError> {
        let artifact = self
            .models
            .get(name)
            .ok_or_else(|| PredictionError::ModelNotFound(name.to_string()))?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut frame = Frame::from_records(records);
        debug!(
            "predicting {} rows with '{}' from columns {:?}",
            frame.n_rows(),
            name,
            frame.column_names()
        );

        match artifact {
            ModelArtifact::Direct(estimator) => {
                match run_estimator(name, estimator.as_ref(), &frame)? {
                    Predictions::Labels(labels) => Ok(labels),
                    Predictions::Codes(codes) => Ok(codes.iter().map(|c| c.to_string()).collect()),
                }
            }
            ModelArtifact::Encoded { estimator, labels } => {
                let spec = self
                    .categories
                    .load(name)
                    .map_err(|e| PredictionError::from_category_error(name, e))?;
                frame.apply_categories(&spec)?;

                let codes = match run_estimator(name, estimator.as_ref(), &frame)? {
                    Predictions::Codes(codes) => codes,
                    Predictions::Labels(_) => {
                        return Err(PredictionError::UnexpectedOutput {
                            model: name.to_string(),
                            reason: "labels where class codes were expected".to_string(),
                        })
                    }
                };
                labels
                    .decode(&codes)
                    .map_err(|code| PredictionError::InvalidClassCode {
                        model: name.to_string(),
                        code,
                        n_classes: labels.classes().len(),
                    })
            }
        }
    }
}

fn run_estimator(
    name: &str,
    estimator: &dyn Estimator,
    frame: &Frame,
) -> Result<Predictions, PredictionError> {
    let features = frame.to_features(estimator.feature_names())?;
    let predictions = estimator
        .predict(features.view())
        .map_err(|e| PredictionError::PredictionFailure(e.to_string()))?;
    if predictions.len() != frame.n_rows() {
        return Err(PredictionError::UnexpectedOutput {
            model: name.to_string(),
            reason: format!(
                "{} predictions for {} rows",
                predictions.len(),
                frame.n_rows()
            ),
        });
    }
    Ok(predictions)
}

/// Loads one model directory as the given artifact family.
pub async fn load_artifact(model_dir: &Path, kind: ModelKind) -> anyhow::Result<ModelArtifact> {
    if !tokio::fs::try_exists(model_dir).await? {
        anyhow::bail!("model directory {:?} does not exist", model_dir);
    }
    let config = ArtifactConfig::from_dir(model_dir).await?;
    let model_path = model_dir.join(config.model_file());

    let mut estimator: Box<dyn Estimator> = match config.backend {
        Backend::TreeEnsemble => Box::new(TreeEnsembleModel::new()),
        Backend::Onnx => {
            let feature_names = config.feature_names.clone().ok_or_else(|| {
                anyhow::anyhow!("onnx model in {:?} needs feature_names in config.json", model_dir)
            })?;
            Box::new(OnnxClassifier::new(
                feature_names,
                config.input_name.clone(),
                config.output_name.clone(),
            ))
        }
    };
    estimator.load_model(&model_path).await?;

    match kind {
        ModelKind::Direct => Ok(ModelArtifact::Direct(estimator)),
        ModelKind::Encoded => {
            let encoder_path = model_dir.join("label_encoder.json");
            let raw = tokio::fs::read_to_string(&encoder_path)
                .await
                .with_context(|| format!("reading {}", encoder_path.display()))?;
            let labels: LabelDecoder = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", encoder_path.display()))?;
            if labels.classes().is_empty() {
                anyhow::bail!("{} lists no classes", encoder_path.display());
            }
            Ok(ModelArtifact::Encoded { estimator, labels })
        }
    }
}
