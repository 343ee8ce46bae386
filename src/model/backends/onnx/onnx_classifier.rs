use crate::model::model_utils::Predictions;
use crate::model::traits::model_trait::ModelTrait;
use anyhow;
use async_trait::async_trait;
use log::{debug, info, warn};
use ndarray::ArrayView2;
use ort::{CPUExecutionProvider, GraphOptimizationLevel, Session};
use std::sync::Once;
use std::thread::available_parallelism;
use std::{path::Path, time::Instant};

static ORT_ENV: Once = Once::new();

/// Classifier exported to ONNX (skl2onnx / onnxmltools). The graph takes a
/// single float tensor of shape `[rows, features]` and emits one label per
/// row, either as int64 class codes or as strings.
pub struct OnnxClassifier {
    model: Option<Session>,
    feature_names: Vec<String>,
    input_name: String,
    output_name: String,
}

impl OnnxClassifier {
    pub fn new(feature_names: Vec<String>, input_name: String, output_name: String) -> Self {
        Self {
            model: None,
            feature_names,
            input_name,
            output_name,
        }
    }
}

#[async_trait]
impl ModelTrait for OnnxClassifier {
    async fn load_model(&mut self, model_path: &Path) -> anyhow::Result<()> {
        ORT_ENV.call_once(|| {
            if let Err(e) = ort::init()
                .with_name("pathopredict")
                .with_execution_providers([CPUExecutionProvider::default().build()])
                .commit()
            {
                warn!("failed to initialize ORT environment, using defaults: {e}");
            }
        });

        let start = Instant::now();
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(available_parallelism()?.get())?
            .commit_from_file(model_path)?;

        if !session.inputs.iter().any(|i| i.name == self.input_name) {
            anyhow::bail!(
                "{:?} has no input named '{}'",
                model_path,
                self.input_name
            );
        }
        if !session.outputs.iter().any(|o| o.name == self.output_name) {
            anyhow::bail!(
                "{:?} has no output named '{}'",
                model_path,
                self.output_name
            );
        }
        info!("onnx model loaded from {:?} in {:?}", model_path, start.elapsed());

        self.model = Some(session);
        Ok(())
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, features: ArrayView2<f32>) -> anyhow::Result<Predictions> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("onnx model is not loaded"))?;

        let start = Instant::now();
        let outputs = model.run(ort::inputs![self.input_name.as_str() => features.to_owned()]?)?;
        debug!("actual inference took: {:?}", start.elapsed());

        let output = &outputs[self.output_name.as_str()];
        if let Ok(codes) = output.try_extract_tensor::<i64>() {
            return Ok(Predictions::Codes(codes.iter().copied().collect()));
        }
        let labels = output.try_extract_string_tensor()?;
        Ok(Predictions::Labels(labels.iter().cloned().collect()))
    }
}
