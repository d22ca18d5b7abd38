//! Portrait matting: isolate a person from a photograph and composite the
//! resulting alpha matte back onto the source pixels.
//!
//! A [`ModelProfile`] describes how a matting network wants its input sized
//! and normalized and how its alpha output is applied; the
//! [`InferenceEngine`] trait hides the runtime behind the pipeline. An ONNX
//! Runtime engine ships in [`engine`], so the crate works end to end:
//!
//! ```no_run
//! use mattecut::{ExecutionProvider, MattingPipeline, ModelProfile};
//!
//! # fn main() -> mattecut::Result<()> {
//! let image = image::RgbaImage::new(640, 480);
//! let mut pipeline = MattingPipeline::new(ModelProfile::soft_matte())?;
//! pipeline.initialize("portrait-matting.onnx", ExecutionProvider::Auto)?;
//! let cutout = pipeline.process(&image)?;
//! assert_eq!(cutout.dimensions(), image.dimensions());
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod matting;

pub use engine::{ExecutionProvider, InferenceEngine, OnnxEngine, SessionInfo};
pub use error::{MatteError, Result};
pub use matting::{
    AlphaMap, MattingPipeline, ModelProfile, Normalization, OutputPolicy, PipelineState,
    SizePolicy,
};
