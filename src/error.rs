use thiserror::Error;

/// Errors produced by the matting pipeline and its collaborators
#[derive(Debug, Error)]
pub enum MatteError {
    /// Input image or configuration the pipeline cannot work with
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// The model file could not be loaded into an inference session
    #[error("failed to load model '{path}': {reason}")]
    ModelLoad { path: String, reason: String },

    /// Processing was attempted before a successful model load
    #[error("pipeline is not initialized")]
    NotInitialized,

    /// The inference engine failed or produced an unusable output
    #[error("inference failed: {reason}")]
    Inference { reason: String },

    /// Source image and alpha map dimensions do not agree
    #[error(
        "dimension mismatch: image is {image_width}x{image_height}, \
         alpha map is {alpha_width}x{alpha_height}"
    )]
    DimensionMismatch {
        image_width: u32,
        image_height: u32,
        alpha_width: u32,
        alpha_height: u32,
    },
}

pub type Result<T> = std::result::Result<T, MatteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = MatteError::ModelLoad {
            path: "/models/portrait.onnx".to_string(),
            reason: "file not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to load model '/models/portrait.onnx': file not found"
        );

        let err = MatteError::DimensionMismatch {
            image_width: 640,
            image_height: 480,
            alpha_width: 512,
            alpha_height: 512,
        };
        assert_eq!(
            err.to_string(),
            "dimension mismatch: image is 640x480, alpha map is 512x512"
        );
    }
}
