use super::alpha::AlphaMap;
use crate::error::{MatteError, Result};
use ndarray::Array4;

/// Convert a raw model output into an alpha map at source resolution
///
/// Expects the [1, 1, H, W] alpha tensor an engine returns. Upsampling to
/// `original_size` uses nearest-neighbor scale-and-clamp indexing, so a
/// constant field stays exactly constant and edge pixels never read out of
/// bounds. Values are clamped into [0, 1] on the way out.
pub fn postprocess_alpha(raw: &Array4<f32>, original_size: (u32, u32)) -> Result<AlphaMap> {
    let _span = tracing::debug_span!("postprocess").entered();

    let shape = raw.shape();
    if shape[0] != 1 || shape[1] != 1 {
        return Err(MatteError::Inference {
            reason: format!("expected alpha tensor of shape [1, 1, H, W], got {:?}", shape),
        });
    }
    let src_height = shape[2];
    let src_width = shape[3];
    if src_width == 0 || src_height == 0 {
        return Err(MatteError::Inference {
            reason: format!("alpha tensor has empty spatial dimensions {:?}", shape),
        });
    }

    let (dst_width, dst_height) = original_size;
    if dst_width == 0 || dst_height == 0 {
        return Err(MatteError::InvalidInput {
            reason: "alpha target dimensions must be positive".to_string(),
        });
    }

    let mut values = Vec::with_capacity(dst_width as usize * dst_height as usize);
    for y in 0..dst_height as usize {
        let sy = (y * src_height / dst_height as usize).min(src_height - 1);
        for x in 0..dst_width as usize {
            let sx = (x * src_width / dst_width as usize).min(src_width - 1);
            values.push(raw[[0, 0, sy, sx]]);
        }
    }

    AlphaMap::new(dst_width, dst_height, values)
}
