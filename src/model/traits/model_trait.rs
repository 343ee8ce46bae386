use crate::model::model_utils::Predictions;
use anyhow;
use async_trait::async_trait;
use ndarray::ArrayView2;
use std::path::Path;

#[async_trait]
pub trait ModelTrait {
    async fn load_model(&mut self, model_path: &Path) -> anyhow::Result<()>;

    /// Feature columns in the order the estimator expects them.
    fn feature_names(&self) -> &[String];

    /// Runs a forward pass over one row per record. Rows with missing
    /// values carry `NaN` in the corresponding cell.
    fn predict(&self, features: ArrayView2<f32>) -> anyhow::Result<Predictions>;
}

pub trait Estimator: ModelTrait + Send + Sync {}
impl<T> Estimator for T where T: ModelTrait + Send + Sync {}
