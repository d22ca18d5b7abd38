mod alpha;
mod composite;
mod pipeline;
mod postprocess;
mod preprocess;
mod profile;
mod resample;

pub use alpha::AlphaMap;
pub use composite::{composite, threshold_silhouette};
pub use pipeline::{MattingPipeline, PipelineState};
pub use postprocess::postprocess_alpha;
pub use preprocess::{PreparedInput, Preprocessor};
pub use profile::{
    ModelProfile, Normalization, OutputPolicy, SizePolicy, DEFAULT_REF_SIZE, DEFAULT_THRESHOLD,
};
pub use resample::resize_bilinear;
