use crate::model::model_utils::{label_from_value, Predictions};
use crate::model::traits::model_trait::ModelTrait;
use anyhow::{self, Context};
use async_trait::async_trait;
use log::{debug, info};
use ndarray::{ArrayView1, ArrayView2};
use rayon::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Instant;

/// How tree outputs are combined into a class decision.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Random forest: leaves hold class distributions, averaged over trees.
    Vote,
    /// Multi-class boosting: one scalar leaf per tree added to its class margin.
    Softmax,
    /// Binary boosting: a single margin, positive means class 1.
    Logistic,
}

/// Comparison used by numeric splits to send a row to the left child.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    #[default]
    LessThan,
    LessOrEqual,
}

impl Decision {
    fn goes_left(self, value: f32, threshold: f32) -> bool {
        match self {
            Decision::LessThan => value < threshold,
            Decision::LessOrEqual => value <= threshold,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Numeric {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
        #[serde(default)]
        default_left: bool,
    },
    /// Rows whose category code is listed go right, others go left.
    Categorical {
        feature: usize,
        categories: Vec<u32>,
        left: usize,
        right: usize,
        #[serde(default)]
        default_left: bool,
    },
    Leaf {
        value: Vec<f32>,
    },
}

#[derive(Deserialize, Debug, Clone)]
pub struct Tree {
    #[serde(default)]
    pub class_index: usize,
    pub nodes: Vec<Node>,
}

impl Tree {
    fn leaf(&self, row: ArrayView1<f32>, decision: Decision) -> &[f32] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Numeric {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let x = row[*feature];
                    idx = if x.is_nan() {
                        if *default_left { *left } else { *right }
                    } else if decision.goes_left(x, *threshold) {
                        *left
                    } else {
                        *right
                    };
                }
                Node::Categorical {
                    feature,
                    categories,
                    left,
                    right,
                    default_left,
                } => {
                    let x = row[*feature];
                    // unknown categories arrive as NaN
                    idx = if x.is_nan() || x < 0.0 || x.fract() != 0.0 {
                        if *default_left { *left } else { *right }
                    } else if categories.contains(&(x as u32)) {
                        *right
                    } else {
                        *left
                    };
                }
            }
        }
    }

    fn validate(&self, n_features: usize, leaf_width: usize) -> anyhow::Result<()> {
        if self.nodes.is_empty() {
            anyhow::bail!("tree has no nodes");
        }
        let n_nodes = self.nodes.len();
        for (idx, node) in self.nodes.iter().enumerate() {
            let (feature, left, right) = match node {
                Node::Leaf { value } => {
                    if value.len() != leaf_width {
                        anyhow::bail!(
                            "leaf {idx} holds {} values, expected {leaf_width}",
                            value.len()
                        );
                    }
                    continue;
                }
                Node::Numeric {
                    feature, left, right, ..
                } => (*feature, *left, *right),
                Node::Categorical {
                    feature, left, right, ..
                } => (*feature, *left, *right),
            };
            if feature >= n_features {
                anyhow::bail!("node {idx} splits on feature {feature} of {n_features}");
            }
            // children strictly after their parent, so traversal always ends
            for child in [left, right] {
                if child <= idx || child >= n_nodes {
                    anyhow::bail!("node {idx} points to invalid child {child}");
                }
            }
        }
        Ok(())
    }
}

/// A trained tree ensemble as exported to JSON.
#[derive(Deserialize, Debug, Clone)]
pub struct Forest {
    pub aggregation: Aggregation,
    #[serde(default)]
    pub decision: Decision,
    pub feature_names: Vec<String>,
    pub n_classes: usize,
    #[serde(default)]
    pub classes: Option<Vec<Value>>,
    #[serde(default)]
    pub base_score: f32,
    pub trees: Vec<Tree>,
}

impl Forest {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.trees.is_empty() {
            anyhow::bail!("ensemble has no trees");
        }
        if self.n_classes < 2 {
            anyhow::bail!("ensemble must separate at least 2 classes");
        }
        if self.aggregation == Aggregation::Logistic && self.n_classes != 2 {
            anyhow::bail!("logistic aggregation needs exactly 2 classes");
        }
        if let Some(classes) = &self.classes {
            if classes.len() != self.n_classes {
                anyhow::bail!(
                    "{} class labels for {} classes",
                    classes.len(),
                    self.n_classes
                );
            }
        }
        let leaf_width = match self.aggregation {
            Aggregation::Vote => self.n_classes,
            Aggregation::Softmax | Aggregation::Logistic => 1,
        };
        for (i, tree) in self.trees.iter().enumerate() {
            if self.aggregation == Aggregation::Softmax && tree.class_index >= self.n_classes {
                anyhow::bail!("tree {i} targets class {}", tree.class_index);
            }
            tree.validate(self.feature_names.len(), leaf_width)
                .with_context(|| format!("tree {i}"))?;
        }
        Ok(())
    }

    pub fn predict_row(&self, row: ArrayView1<f32>) -> usize {
        match self.aggregation {
            Aggregation::Vote => {
                let mut totals = vec![0.0f32; self.n_classes];
                for tree in &self.trees {
                    for (total, p) in totals.iter_mut().zip(tree.leaf(row, self.decision)) {
                        *total += p;
                    }
                }
                argmax(&totals)
            }
            Aggregation::Softmax => {
                let mut margins = vec![self.base_score; self.n_classes];
                for tree in &self.trees {
                    margins[tree.class_index] += tree.leaf(row, self.decision)[0];
                }
                argmax(&margins)
            }
            Aggregation::Logistic => {
                let margin: f32 = self.base_score
                    + self
                        .trees
                        .iter()
                        .map(|tree| tree.leaf(row, self.decision)[0])
                        .sum::<f32>();
                usize::from(margin > 0.0)
            }
        }
    }
}

/// First maximum wins on ties.
fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

pub struct TreeEnsembleModel {
    forest: Option<Forest>,
    labels: Option<Vec<String>>,
}

impl TreeEnsembleModel {
    pub fn new() -> Self {
        Self {
            forest: None,
            labels: None,
        }
    }

    pub fn from_forest(forest: Forest) -> anyhow::Result<Self> {
        let mut model = Self::new();
        model.set_forest(forest)?;
        Ok(model)
    }

    fn set_forest(&mut self, forest: Forest) -> anyhow::Result<()> {
        forest.validate()?;
        self.labels = forest
            .classes
            .as_ref()
            .map(|classes| classes.iter().map(label_from_value).collect());
        self.forest = Some(forest);
        Ok(())
    }
}

#[async_trait]
impl ModelTrait for TreeEnsembleModel {
    async fn load_model(&mut self, model_path: &Path) -> anyhow::Result<()> {
        let start = Instant::now();
        let raw = tokio::fs::read_to_string(model_path)
            .await
            .with_context(|| format!("reading {}", model_path.display()))?;
        let forest: Forest = serde_json::from_str(&raw)
            .with_context(|| format!("parsing {}", model_path.display()))?;
        let n_trees = forest.trees.len();
        self.set_forest(forest)
            .with_context(|| format!("validating {}", model_path.display()))?;
        info!(
            "tree ensemble with {n_trees} trees loaded from {:?} in {:?}",
            model_path,
            start.elapsed()
        );

        Ok(())
    }

    fn feature_names(&self) -> &[String] {
        self.forest
            .as_ref()
            .map(|f| f.feature_names.as_slice())
            .unwrap_or(&[])
    }

    fn predict(&self, features: ArrayView2<f32>) -> anyhow::Result<Predictions> {
        let forest = self
            .forest
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("tree ensemble is not loaded"))?;
        let (n_rows, n_cols) = features.dim();
        if n_cols != forest.feature_names.len() {
            anyhow::bail!(
                "X has {n_cols} features, but the ensemble is expecting {} features as input",
                forest.feature_names.len()
            );
        }

        let start = Instant::now();
        let winners: Vec<usize> = (0..n_rows)
            .into_par_iter()
            .map(|i| forest.predict_row(features.row(i)))
            .collect();
        debug!("ensemble inference over {n_rows} rows took: {:?}", start.elapsed());

        Ok(match &self.labels {
            Some(labels) => Predictions::Labels(winners.iter().map(|&i| labels[i].clone()).collect()),
            None => Predictions::Codes(winners.iter().map(|&i| i as i64).collect()),
        })
    }
}
