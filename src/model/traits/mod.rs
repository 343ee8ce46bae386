pub mod model_trait;
