extern crate pathopredict;
use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::Array2;
use pathopredict::model::backends::tree::tree_ensemble::{
    Aggregation, Decision, Forest, Node, Tree, TreeEnsembleModel,
};
use pathopredict::model::traits::model_trait::ModelTrait;

const N_FEATURES: usize = 20;
const N_CLASSES: usize = 12;
const DEPTH: usize = 6;

/// Complete binary tree in breadth-first order, so children always follow
/// their parent.
fn synthetic_tree(seed: usize) -> Tree {
    let n_internal = (1 << DEPTH) - 1;
    let n_nodes = (1 << (DEPTH + 1)) - 1;
    let nodes = (0..n_nodes)
        .map(|i| {
            if i < n_internal {
                Node::Numeric {
                    feature: (i * 7 + seed) % N_FEATURES,
                    threshold: 0.5,
                    left: 2 * i + 1,
                    right: 2 * i + 2,
                    default_left: i % 2 == 0,
                }
            } else {
                let mut value = vec![0.0; N_CLASSES];
                value[(i + seed) % N_CLASSES] = 1.0;
                Node::Leaf { value }
            }
        })
        .collect();
    Tree {
        class_index: 0,
        nodes,
    }
}

fn synthetic_forest(n_trees: usize) -> Forest {
    Forest {
        aggregation: Aggregation::Vote,
        decision: Decision::LessOrEqual,
        feature_names: (0..N_FEATURES).map(|i| format!("test_{i}")).collect(),
        n_classes: N_CLASSES,
        classes: None,
        base_score: 0.0,
        trees: (0..n_trees).map(synthetic_tree).collect(),
    }
}

fn benchmark_forest_predict(c: &mut Criterion) {
    let model = TreeEnsembleModel::from_forest(synthetic_forest(100)).unwrap();
    let features = Array2::from_shape_fn((512, N_FEATURES), |(i, j)| ((i * 31 + j) % 2) as f32);

    c.bench_function("forest_predict_512_rows", |b| {
        b.iter(|| model.predict(features.view()).unwrap());
    });
}

criterion_group!(benches, benchmark_forest_predict);
criterion_main!(benches);
