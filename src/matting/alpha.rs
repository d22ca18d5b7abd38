use crate::error::{MatteError, Result};
use image::GrayImage;

/// Alpha matte at source resolution
///
/// Row-major grid of opacity values, origin top-left: 0.0 = background,
/// 1.0 = foreground. Values are clamped into [0, 1] at construction, so
/// consumers never see out-of-range alpha.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaMap {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl AlphaMap {
    /// Build an alpha map from row-major values, clamping each into [0, 1]
    pub fn new(width: u32, height: u32, mut data: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(MatteError::InvalidInput {
                reason: format!("alpha map size {}x{} must be positive", width, height),
            });
        }
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(MatteError::InvalidInput {
                reason: format!(
                    "alpha buffer holds {} values, {}x{} needs {}",
                    data.len(),
                    width,
                    height,
                    expected
                ),
            });
        }

        for value in &mut data {
            *value = value.clamp(0.0, 1.0);
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Alpha value at (x, y); panics outside the grid
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Flatten to an 8-bit mask, one byte per pixel: round(alpha * 255)
    pub fn to_mask_bytes(&self) -> Vec<u8> {
        self.data.iter().map(|a| (a * 255.0).round() as u8).collect()
    }

    /// Render as a grayscale image for display or export
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([(self.get(x, y) * 255.0).round() as u8])
        })
    }
}
