pub mod tree_ensemble;
