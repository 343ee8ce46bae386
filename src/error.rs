use crate::features::category_store::CategoryError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body of every error response.
#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Model {0} not found.")]
    ModelNotFound(String),

    /// Input columns are missing or hold values that cannot become features.
    #[error("{0}")]
    FeatureShapeMismatch(String),

    #[error("{0}")]
    PredictionFailure(String),

    #[error("model {0} has no category metadata")]
    MissingCategorySpec(String),

    #[error("model {model} produced class code {code}, but its label encoder knows {n_classes} classes")]
    InvalidClassCode {
        model: String,
        code: i64,
        n_classes: usize,
    },

    #[error("model {model} produced unexpected output: {reason}")]
    UnexpectedOutput { model: String, reason: String },

    #[error("{0}")]
    Internal(String),
}

impl PredictionError {
    pub fn from_category_error(model: &str, err: CategoryError) -> Self {
        match err {
            CategoryError::NotFound(_) => PredictionError::MissingCategorySpec(model.to_string()),
            other => PredictionError::Internal(other.to_string()),
        }
    }
}

impl ResponseError for PredictionError {
    fn status_code(&self) -> StatusCode {
        match self {
            PredictionError::ModelNotFound(_) => StatusCode::NOT_FOUND,
            PredictionError::FeatureShapeMismatch(_) | PredictionError::PredictionFailure(_) => {
                StatusCode::BAD_REQUEST
            }
            PredictionError::MissingCategorySpec(_)
            | PredictionError::InvalidClassCode { .. }
            | PredictionError::UnexpectedOutput { .. }
            | PredictionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            detail: self.to_string(),
        })
    }
}

impl ResponseError for CategoryError {
    fn status_code(&self) -> StatusCode {
        match self {
            CategoryError::NotFound(_) => StatusCode::NOT_FOUND,
            CategoryError::Io { .. } | CategoryError::Malformed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            detail: self.to_string(),
        })
    }
}
