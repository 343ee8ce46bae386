use super::category_spec::{apply_category_spec, CategoryCode, CategorySpec};
use crate::error::PredictionError;
use ndarray::Array2;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One input row: column name to scalar value.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone)]
enum Column {
    Raw(Vec<Value>),
    Categorical(Vec<CategoryCode>),
}

/// Column-oriented view of a batch of records. Columns are the union of the
/// record keys in first-seen order; a key absent from a record is `null`.
#[derive(Debug, Clone)]
pub struct Frame {
    names: Vec<String>,
    columns: HashMap<String, Column>,
    n_rows: usize,
}

impl Frame {
    pub fn from_records(records: &[Record]) -> Self {
        let n_rows = records.len();
        let mut names: Vec<String> = Vec::new();
        let mut columns: HashMap<String, Column> = HashMap::new();

        for (row, record) in records.iter().enumerate() {
            for (key, value) in record {
                let column = columns.entry(key.clone()).or_insert_with(|| {
                    names.push(key.clone());
                    Column::Raw(vec![Value::Null; n_rows])
                });
                if let Column::Raw(values) = column {
                    values[row] = value.clone();
                }
            }
        }

        Frame {
            names,
            columns,
            n_rows,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Replaces every column named in `spec` with its category codes.
    pub fn apply_categories(&mut self, spec: &CategorySpec) -> Result<(), PredictionError> {
        for (name, recorded) in spec.columns() {
            let column = self.columns.get_mut(name).ok_or_else(|| {
                PredictionError::FeatureShapeMismatch(format!("column '{name}' is missing"))
            })?;
            if let Column::Raw(values) = column {
                *column = Column::Categorical(apply_category_spec(values, recorded));
            }
        }
        Ok(())
    }

    /// Builds the `[rows, features]` matrix in `feature_names` order.
    pub fn to_features(&self, feature_names: &[String]) -> Result<Array2<f32>, PredictionError> {
        let missing: Vec<&str> = feature_names
            .iter()
            .filter(|name| !self.columns.contains_key(name.as_str()))
            .map(|name| name.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(PredictionError::FeatureShapeMismatch(format!(
                "columns are missing: {}",
                missing.join(", ")
            )));
        }

        let mut features = Array2::<f32>::zeros((self.n_rows, feature_names.len()));
        for (j, name) in feature_names.iter().enumerate() {
            match &self.columns[name.as_str()] {
                Column::Categorical(codes) => {
                    for (i, code) in codes.iter().enumerate() {
                        features[[i, j]] = code.as_feature();
                    }
                }
                Column::Raw(values) => {
                    for (i, value) in values.iter().enumerate() {
                        features[[i, j]] = numeric_feature(name, value)?;
                    }
                }
            }
        }
        Ok(features)
    }
}

fn numeric_feature(column: &str, value: &Value) -> Result<f32, PredictionError> {
    match value {
        Value::Null => Ok(f32::NAN),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64().map(|f| f as f32).ok_or_else(|| {
            PredictionError::FeatureShapeMismatch(format!(
                "column '{column}': {n} is not representable as a float"
            ))
        }),
        Value::String(s) => s.trim().parse::<f32>().map_err(|_| {
            PredictionError::FeatureShapeMismatch(format!(
                "column '{column}': could not convert string to float: '{s}'"
            ))
        }),
        Value::Array(_) | Value::Object(_) => Err(PredictionError::FeatureShapeMismatch(
            format!("column '{column}': expected a scalar, got {value}"),
        )),
    }
}
