pub mod onnx;
pub mod tree;
