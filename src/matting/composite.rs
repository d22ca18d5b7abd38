use super::alpha::AlphaMap;
use super::profile::OutputPolicy;
use crate::error::{MatteError, Result};
use image::{Rgba, RgbaImage};

/// Merge a source image with its alpha map into an RGBA result
///
/// Source colors are kept untouched; only the alpha channel is rewritten.
/// Continuous keeps the soft values (byte = round(alpha * 255)); Thresholded
/// makes a hard cut, opaque strictly above the threshold and transparent at
/// or below it.
pub fn composite(source: &RgbaImage, alpha: &AlphaMap, policy: OutputPolicy) -> Result<RgbaImage> {
    let (width, height) = source.dimensions();
    if (width, height) != alpha.dimensions() {
        let (alpha_width, alpha_height) = alpha.dimensions();
        return Err(MatteError::DimensionMismatch {
            image_width: width,
            image_height: height,
            alpha_width,
            alpha_height,
        });
    }

    let mut out = RgbaImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let pixel = source.get_pixel(x, y);
            let value = alpha.get(x, y);
            let alpha_byte = match policy {
                OutputPolicy::Continuous => (value * 255.0).round() as u8,
                OutputPolicy::Thresholded { threshold } => {
                    if value > threshold {
                        255
                    } else {
                        0
                    }
                }
            };
            out.put_pixel(x, y, Rgba([pixel[0], pixel[1], pixel[2], alpha_byte]));
        }
    }

    Ok(out)
}

/// Hard white-on-transparent silhouette of an alpha map
///
/// Fallback rendering for thresholded output when no source colors are
/// available: opaque white strictly above the threshold, fully transparent
/// everywhere else.
pub fn threshold_silhouette(alpha: &AlphaMap, threshold: f32) -> RgbaImage {
    let (width, height) = alpha.dimensions();
    RgbaImage::from_fn(width, height, |x, y| {
        if alpha.get(x, y) > threshold {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alpha_strip(values: Vec<f32>) -> AlphaMap {
        AlphaMap::new(values.len() as u32, 1, values).unwrap()
    }

    #[test]
    fn continuous_policy_writes_soft_alpha() {
        let source = RgbaImage::from_pixel(3, 1, Rgba([10, 20, 30, 77]));
        let alpha = alpha_strip(vec![0.0, 0.5, 1.0]);

        let out = composite(&source, &alpha, OutputPolicy::Continuous).unwrap();
        assert_eq!(out.dimensions(), (3, 1));
        assert_eq!(*out.get_pixel(0, 0), Rgba([10, 20, 30, 0]));
        assert_eq!(*out.get_pixel(1, 0), Rgba([10, 20, 30, 128]));
        assert_eq!(*out.get_pixel(2, 0), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn threshold_is_strictly_greater_than() {
        let source = RgbaImage::from_pixel(3, 1, Rgba([1, 2, 3, 255]));
        let alpha = alpha_strip(vec![0.70, 0.65, 0.50]);
        let policy = OutputPolicy::Thresholded { threshold: 0.65 };

        let out = composite(&source, &alpha, policy).unwrap();
        assert_eq!(out.get_pixel(0, 0)[3], 255);
        assert_eq!(out.get_pixel(1, 0)[3], 0); // boundary value is excluded
        assert_eq!(out.get_pixel(2, 0)[3], 0);
    }

    #[test]
    fn mismatched_dimensions_are_rejected_before_writing() {
        let source = RgbaImage::new(4, 4);
        let alpha = alpha_strip(vec![0.5, 0.5]);

        let err = composite(&source, &alpha, OutputPolicy::Continuous).unwrap_err();
        match err {
            MatteError::DimensionMismatch {
                image_width,
                image_height,
                alpha_width,
                alpha_height,
            } => {
                assert_eq!((image_width, image_height), (4, 4));
                assert_eq!((alpha_width, alpha_height), (2, 1));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn silhouette_is_white_or_transparent_only() {
        let alpha = alpha_strip(vec![0.9, 0.65, 0.1]);
        let out = threshold_silhouette(&alpha, 0.65);

        assert_eq!(*out.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
        assert_eq!(*out.get_pixel(1, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(*out.get_pixel(2, 0), Rgba([0, 0, 0, 0]));
    }
}
