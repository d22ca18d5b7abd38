use super::{ExecutionProvider, InferenceEngine, SessionInfo};
use crate::error::{MatteError, Result};
use ndarray::{Array4, Axis, Ix4};
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, TensorRTExecutionProvider,
};
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::value::{Tensor, ValueType};
use std::path::Path;

/// ONNX Runtime matting engine
///
/// Wraps one session for the lifetime of the engine; dropping the engine
/// releases the native session.
pub struct OnnxEngine {
    session: Session,
    info: SessionInfo,
}

impl OnnxEngine {
    /// Load an ONNX model into an inference session
    ///
    /// # Arguments
    /// * `model_path` - Path to the ONNX model file
    /// * `provider` - Execution provider preference (CPU is always the fallback)
    pub fn load<P: AsRef<Path>>(model_path: P, provider: ExecutionProvider) -> Result<Self> {
        let path = model_path.as_ref();
        if !path.is_file() {
            return Err(MatteError::ModelLoad {
                path: path.display().to_string(),
                reason: "file not found".to_string(),
            });
        }

        tracing::info!("Loading matting model from {}", path.display());

        let session = build_session(path, provider).map_err(|err| MatteError::ModelLoad {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| MatteError::ModelLoad {
                path: path.display().to_string(),
                reason: "model declares no inputs".to_string(),
            })?;
        let output = session
            .outputs
            .first()
            .ok_or_else(|| MatteError::ModelLoad {
                path: path.display().to_string(),
                reason: "model declares no outputs".to_string(),
            })?;

        let info = SessionInfo {
            input_name: input.name.clone(),
            output_name: output.name.clone(),
            input_size: static_input_size(&input.input_type),
        };

        tracing::info!(
            "Model loaded (input '{}', output '{}')",
            info.input_name,
            info.output_name
        );
        if let Some((width, height)) = info.input_size {
            tracing::debug!("Model declares static input size {}x{}", width, height);
        }

        Ok(Self { session, info })
    }
}

impl InferenceEngine for OnnxEngine {
    fn info(&self) -> &SessionInfo {
        &self.info
    }

    fn run(&mut self, input: Array4<f32>) -> Result<Array4<f32>> {
        let _span = tracing::debug_span!("inference").entered();

        let tensor = Tensor::from_array(input).map_err(|err| MatteError::Inference {
            reason: format!("input tensor rejected: {err}"),
        })?;

        let outputs = self
            .session
            .run(ort::inputs![self.info.input_name.as_str() => tensor])
            .map_err(|err| MatteError::Inference {
                reason: err.to_string(),
            })?;

        let value = outputs
            .get(self.info.output_name.as_str())
            .ok_or_else(|| MatteError::Inference {
                reason: format!("model produced no output named '{}'", self.info.output_name),
            })?;

        let view = value
            .try_extract_array::<f32>()
            .map_err(|err| MatteError::Inference {
                reason: format!("output '{}' is not an f32 tensor: {err}", self.info.output_name),
            })?;

        // Some exporters emit [1, H, W]; insert the channel axis so callers
        // always see [1, 1, H, W]
        let array = view.to_owned();
        let array = match array.ndim() {
            4 => array,
            3 => array.insert_axis(Axis(1)),
            n => {
                return Err(MatteError::Inference {
                    reason: format!("expected a 4-d alpha tensor, got {} dimensions", n),
                })
            }
        };

        array
            .into_dimensionality::<Ix4>()
            .map_err(|err| MatteError::Inference {
                reason: format!("alpha tensor has an unusable shape: {err}"),
            })
    }
}

fn build_session(
    path: &Path,
    provider: ExecutionProvider,
) -> std::result::Result<Session, ort::Error> {
    let builder = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(4)?;
    with_provider(builder, provider)?.commit_from_file(path)
}

/// Register execution providers for the requested preference
///
/// CPU is always appended so inference still works when an accelerated
/// provider is unavailable at runtime.
fn with_provider(
    builder: SessionBuilder,
    provider: ExecutionProvider,
) -> std::result::Result<SessionBuilder, ort::Error> {
    match provider {
        ExecutionProvider::Auto => builder.with_execution_providers([
            TensorRTExecutionProvider::default().build(),
            CUDAExecutionProvider::default().build(),
            CPUExecutionProvider::default().build(),
        ]),
        ExecutionProvider::Cpu => {
            builder.with_execution_providers([CPUExecutionProvider::default().build()])
        }
        ExecutionProvider::Cuda => builder.with_execution_providers([
            CUDAExecutionProvider::default().build(),
            CPUExecutionProvider::default().build(),
        ]),
        ExecutionProvider::TensorRt => builder.with_execution_providers([
            TensorRTExecutionProvider::default().build(),
            CPUExecutionProvider::default().build(),
        ]),
    }
}

/// Spatial size from a static [N, C, H, W] input declaration
///
/// Exporters mark dynamic dimensions as -1 (some as 0); any non-positive
/// spatial dimension means the model accepts variable sizes.
fn static_input_size(input_type: &ValueType) -> Option<(u32, u32)> {
    match input_type {
        ValueType::Tensor { shape, .. } => spatial_size(shape),
        _ => None,
    }
}

fn spatial_size(dimensions: &[i64]) -> Option<(u32, u32)> {
    if dimensions.len() != 4 {
        return None;
    }
    let height = dimensions[2];
    let width = dimensions[3];
    if height > 0 && width > 0 {
        Some((width as u32, height as u32))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_file_is_a_load_error() {
        let err = OnnxEngine::load("/definitely/not/here.onnx", ExecutionProvider::Cpu)
            .err()
            .unwrap();
        assert!(matches!(err, MatteError::ModelLoad { .. }));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn static_shapes_are_reported_width_first() {
        assert_eq!(spatial_size(&[1, 3, 480, 640]), Some((640, 480)));
    }

    #[test]
    fn dynamic_or_odd_shapes_are_ignored() {
        assert_eq!(spatial_size(&[1, 3, -1, -1]), None);
        assert_eq!(spatial_size(&[1, 3, 0, 640]), None);
        assert_eq!(spatial_size(&[1, 3, 512]), None);
        assert_eq!(spatial_size(&[]), None);
    }
}
