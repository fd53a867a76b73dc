//! Model adapters implementing [`crate::predict::Inference`].

mod onnx;

pub use onnx::OnnxModel;
