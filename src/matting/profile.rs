use crate::error::{MatteError, Result};

/// Default reference size for aspect-preserving resizing
pub const DEFAULT_REF_SIZE: u32 = 512;

/// Default alpha threshold for hard cutouts
pub const DEFAULT_THRESHOLD: f32 = 0.65;

/// How a source image is resized to the network's input resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizePolicy {
    /// Resize to exactly width x height, ignoring aspect ratio
    Fixed { width: u32, height: u32 },
    /// Scale the shorter dimension to ref_size and the longer one
    /// proportionally, then floor both to multiples of 32
    AspectMultipleOf32 { ref_size: u32 },
}

/// How 8-bit channel values map to model input floats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    /// v / 255, range [0, 1]
    ZeroToOne,
    /// 2 * (v / 255) - 1, range [-1, 1]
    SignedUnit,
}

/// How the alpha map is applied when compositing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputPolicy {
    /// Keep the soft alpha values as they are
    Continuous,
    /// Binarize: opaque strictly above the threshold, transparent otherwise
    Thresholded { threshold: f32 },
}

/// Per-model configuration for the matting pipeline
///
/// Captures everything a network family varies: input sizing, input
/// normalization and how its alpha output is applied. Channel order is
/// always planar RGB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelProfile {
    pub size_policy: SizePolicy,
    pub normalization: Normalization,
    pub output_policy: OutputPolicy,
}

impl ModelProfile {
    pub fn new(
        size_policy: SizePolicy,
        normalization: Normalization,
        output_policy: OutputPolicy,
    ) -> Self {
        Self {
            size_policy,
            normalization,
            output_policy,
        }
    }

    /// Profile for soft matting networks taking aspect-preserving,
    /// stride-32 input in [-1, 1] and producing a continuous alpha
    pub fn soft_matte() -> Self {
        Self {
            size_policy: SizePolicy::AspectMultipleOf32 {
                ref_size: DEFAULT_REF_SIZE,
            },
            normalization: Normalization::SignedUnit,
            output_policy: OutputPolicy::Continuous,
        }
    }

    /// Profile for fixed-input segmentation networks with a hard
    /// foreground/background decision
    ///
    /// The 512x512 size is a fallback; when the loaded model declares static
    /// spatial dimensions those take precedence.
    pub fn hard_cutout() -> Self {
        Self {
            size_policy: SizePolicy::Fixed {
                width: 512,
                height: 512,
            },
            normalization: Normalization::ZeroToOne,
            output_policy: OutputPolicy::Thresholded {
                threshold: DEFAULT_THRESHOLD,
            },
        }
    }

    /// Reject size parameters the preprocessor cannot satisfy
    pub fn validate(&self) -> Result<()> {
        match self.size_policy {
            SizePolicy::Fixed { width, height } if width == 0 || height == 0 => {
                Err(MatteError::InvalidInput {
                    reason: format!("fixed input size {}x{} must be positive", width, height),
                })
            }
            SizePolicy::AspectMultipleOf32 { ref_size } if ref_size == 0 => {
                Err(MatteError::InvalidInput {
                    reason: "reference size must be positive".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}
