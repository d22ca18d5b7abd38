mod onnx;

pub use onnx::OnnxEngine;

use crate::error::Result;
use ndarray::Array4;

/// Execution provider preference, passed straight through to the runtime
///
/// This is a preference, not a policy: accelerated providers are registered
/// with CPU as the fallback and the runtime picks what is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionProvider {
    /// Register TensorRT, CUDA and CPU in that order
    Auto,
    Cpu,
    Cuda,
    TensorRt,
}

impl Default for ExecutionProvider {
    fn default() -> Self {
        ExecutionProvider::Auto
    }
}

/// What a loaded model session reports about itself
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Graph input the image tensor is bound to
    pub input_name: String,
    /// Graph output the alpha tensor is read from
    pub output_name: String,
    /// Static spatial input size (width, height), when the graph declares one
    pub input_size: Option<(u32, u32)>,
}

/// Trait for matting inference engines
/// Allows swapping between runtimes (ONNX Runtime, test fakes, etc.)
pub trait InferenceEngine {
    /// Session metadata captured at load time
    fn info(&self) -> &SessionInfo;

    /// Run the network on a prepared input
    ///
    /// # Arguments
    /// * `input` - Normalized planar RGB tensor, shape [1, 3, H, W]
    ///
    /// # Returns
    /// * Alpha tensor with shape [1, 1, H', W'], values nominally 0.0-1.0
    fn run(&mut self, input: Array4<f32>) -> Result<Array4<f32>>;
}
