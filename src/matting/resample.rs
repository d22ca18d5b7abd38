use crate::error::{MatteError, Result};
use image::{Rgba, RgbaImage};

/// Resize an RGBA image with bilinear filtering
///
/// Destination pixel centers map to source coordinates
/// (i + 0.5) * src / dst - 0.5, clamped at the edges, and all four channels
/// are interpolated. Returns a clone when the size already matches.
pub fn resize_bilinear(src: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage> {
    if width == 0 || height == 0 {
        return Err(MatteError::InvalidInput {
            reason: format!("resize target {}x{} must be positive", width, height),
        });
    }

    let (src_w, src_h) = src.dimensions();
    if src_w == 0 || src_h == 0 {
        return Err(MatteError::InvalidInput {
            reason: "cannot resize an empty image".to_string(),
        });
    }

    if (src_w, src_h) == (width, height) {
        return Ok(src.clone());
    }

    let x_ratio = src_w as f32 / width as f32;
    let y_ratio = src_h as f32 / height as f32;

    let mut out = RgbaImage::new(width, height);
    for y in 0..height {
        let sy = ((y as f32 + 0.5) * y_ratio - 0.5).clamp(0.0, (src_h - 1) as f32);
        let y0 = sy.floor() as u32;
        let y1 = (y0 + 1).min(src_h - 1);
        let fy = sy - y0 as f32;

        for x in 0..width {
            let sx = ((x as f32 + 0.5) * x_ratio - 0.5).clamp(0.0, (src_w - 1) as f32);
            let x0 = sx.floor() as u32;
            let x1 = (x0 + 1).min(src_w - 1);
            let fx = sx - x0 as f32;

            let p00 = src.get_pixel(x0, y0);
            let p10 = src.get_pixel(x1, y0);
            let p01 = src.get_pixel(x0, y1);
            let p11 = src.get_pixel(x1, y1);

            let mut pixel = [0u8; 4];
            for c in 0..4 {
                let top = p00[c] as f32 + (p10[c] as f32 - p00[c] as f32) * fx;
                let bottom = p01[c] as f32 + (p11[c] as f32 - p01[c] as f32) * fx;
                pixel[c] = (top + (bottom - top) * fy).round() as u8;
            }
            out.put_pixel(x, y, Rgba(pixel));
        }
    }

    Ok(out)
}
