use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Position of a value inside a column's training-time vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryCode {
    Known(usize),
    /// Value absent from the vocabulary, or missing altogether.
    Unknown,
}

impl CategoryCode {
    /// Unknown codes reach the estimator as missing values.
    pub fn as_feature(self) -> f32 {
        match self {
            CategoryCode::Known(code) => code as f32,
            CategoryCode::Unknown => f32::NAN,
        }
    }
}

/// Training-time category vocabulary of every categorical column of a model,
/// in the order it was stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct CategorySpec {
    columns: Vec<(String, Vec<Value>)>,
}

impl CategorySpec {
    pub fn new(columns: Vec<(String, Vec<Value>)>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.columns
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn get(&self, column: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, values)| values.as_slice())
    }
}

impl TryFrom<Map<String, Value>> for CategorySpec {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let columns = map
            .into_iter()
            .map(|(column, values)| match values {
                Value::Array(values) => Ok((column, values)),
                other => Err(format!(
                    "categories of column '{column}' must be a list, got {other}"
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CategorySpec { columns })
    }
}

impl From<CategorySpec> for Map<String, Value> {
    fn from(spec: CategorySpec) -> Self {
        spec.columns
            .into_iter()
            .map(|(column, values)| (column, Value::Array(values)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CategoryKey {
    Text(String),
    Number(u64),
    Flag(bool),
}

impl CategoryKey {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(CategoryKey::Text(s.clone())),
            Value::Number(n) => n.as_f64().map(|f| {
                // 1 and 1.0 are the same category, and so are 0.0 and -0.0
                let f = if f == 0.0 { 0.0 } else { f };
                CategoryKey::Number(f.to_bits())
            }),
            Value::Bool(b) => Some(CategoryKey::Flag(*b)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// Coerces a column into the closed vocabulary recorded at training time.
///
/// Values that match a recorded category take its index; everything else,
/// nulls included, becomes [`CategoryCode::Unknown`]. Strings only match
/// strings and numbers only match numbers.
pub fn apply_category_spec(column: &[Value], recorded_values: &[Value]) -> Vec<CategoryCode> {
    let mut vocabulary: HashMap<CategoryKey, usize> = HashMap::with_capacity(recorded_values.len());
    for (i, value) in recorded_values.iter().enumerate() {
        if let Some(key) = CategoryKey::of(value) {
            vocabulary.entry(key).or_insert(i);
        }
    }

    column
        .iter()
        .map(|value| {
            CategoryKey::of(value)
                .and_then(|key| vocabulary.get(&key).copied())
                .map_or(CategoryCode::Unknown, CategoryCode::Known)
        })
        .collect()
}
