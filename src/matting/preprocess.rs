use super::profile::{ModelProfile, Normalization, SizePolicy};
use super::resample;
use crate::error::{MatteError, Result};
use image::RgbaImage;
use ndarray::Array4;

/// Model-ready tensor plus the context needed to undo the resize later
pub struct PreparedInput {
    /// Planar RGB floats, shape [1, 3, height, width]
    pub tensor: Array4<f32>,
    /// Source dimensions (width, height)
    pub original_size: (u32, u32),
    /// Dimensions actually fed to the network (width, height)
    pub resized_size: (u32, u32),
}

/// Preprocessor for converting RGBA images to model input tensors
pub struct Preprocessor {
    profile: ModelProfile,
}

impl Preprocessor {
    pub fn new(profile: ModelProfile) -> Result<Self> {
        profile.validate()?;
        Ok(Self { profile })
    }

    /// Resolve the network input dimensions for a given source size
    pub fn target_size(&self, src_width: u32, src_height: u32) -> (u32, u32) {
        match self.profile.size_policy {
            SizePolicy::Fixed { width, height } => (width, height),
            SizePolicy::AspectMultipleOf32 { ref_size } => {
                aspect_multiple_of_32(src_width, src_height, ref_size)
            }
        }
    }

    /// Preprocess an RGBA image into a normalized NCHW tensor
    ///
    /// Steps:
    /// 1. Resize per the profile's size policy
    /// 2. Normalize channel values per the profile
    /// 3. Lay out as planar RGB in NCHW order
    ///
    /// The source alpha channel is never fed to the model.
    pub fn prepare(&self, image: &RgbaImage) -> Result<PreparedInput> {
        let _span = tracing::debug_span!("preprocess").entered();

        let (src_width, src_height) = image.dimensions();
        if src_width == 0 || src_height == 0 {
            return Err(MatteError::InvalidInput {
                reason: "source image has zero dimensions".to_string(),
            });
        }

        let (width, height) = self.target_size(src_width, src_height);
        tracing::debug!("Preparing {}x{} -> {}x{}", src_width, src_height, width, height);

        // Resize if needed
        let resized = if (src_width, src_height) != (width, height) {
            resample::resize_bilinear(image, width, height)?
        } else {
            image.clone()
        };

        // Convert to NCHW tensor and normalize
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
        for y in 0..height {
            for x in 0..width {
                let pixel = resized.get_pixel(x, y);
                tensor[[0, 0, y as usize, x as usize]] = self.normalize(pixel[0]);
                tensor[[0, 1, y as usize, x as usize]] = self.normalize(pixel[1]);
                tensor[[0, 2, y as usize, x as usize]] = self.normalize(pixel[2]);
            }
        }

        Ok(PreparedInput {
            tensor,
            original_size: (src_width, src_height),
            resized_size: (width, height),
        })
    }

    fn normalize(&self, value: u8) -> f32 {
        let unit = value as f32 / 255.0;
        match self.profile.normalization {
            Normalization::ZeroToOne => unit,
            Normalization::SignedUnit => unit * 2.0 - 1.0,
        }
    }
}

/// Scale the shorter dimension to ref_size and the longer one
/// proportionally, then floor both to multiples of 32 (at least 32)
fn aspect_multiple_of_32(width: u32, height: u32, ref_size: u32) -> (u32, u32) {
    let (new_width, new_height) = if width >= height {
        let scaled = (width as f64 / height as f64 * ref_size as f64).floor() as u32;
        (scaled, ref_size)
    } else {
        let scaled = (height as f64 / width as f64 * ref_size as f64).floor() as u32;
        (ref_size, scaled)
    };
    (floor_to_32(new_width), floor_to_32(new_height))
}

fn floor_to_32(value: u32) -> u32 {
    (value - value % 32).max(32)
}
