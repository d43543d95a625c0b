use crate::foundation::core::{Affine, Rect, Vec2};
use crate::foundation::error::{ClipframeError, ClipframeResult};

/// Result of fitting a source image into a destination rect with `cover` semantics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoverFit {
    /// Uniform source-to-destination scale.
    pub scale: f64,
    /// Visible part of the source, in source pixel coordinates.
    pub src_crop: Rect,
    /// Destination rect the crop maps onto exactly.
    pub dst: Rect,
}

impl CoverFit {
    /// Source-space to canvas-space transform. Maps `src_crop` onto `dst`.
    pub fn transform(&self) -> Affine {
        Affine::translate(Vec2::new(
            self.dst.x0 - self.src_crop.x0 * self.scale,
            self.dst.y0 - self.src_crop.y0 * self.scale,
        )) * Affine::scale(self.scale)
    }
}

/// Scale `src_w x src_h` to fill `dst` completely, preserving aspect ratio and cropping the
/// overflow evenly on both sides. No bars are ever introduced.
pub fn cover_fit(src_w: f64, src_h: f64, dst: Rect) -> ClipframeResult<CoverFit> {
    let (dw, dh) = (dst.width(), dst.height());
    if !(src_w.is_finite() && src_h.is_finite() && src_w > 0.0 && src_h > 0.0) {
        return Err(ClipframeError::rasterization(format!(
            "cover fit needs a positive source size, got {src_w}x{src_h}"
        )));
    }
    if !(dw.is_finite() && dh.is_finite() && dw > 0.0 && dh > 0.0) {
        return Err(ClipframeError::rasterization(format!(
            "cover fit needs a positive destination size, got {dw}x{dh}"
        )));
    }

    let scale = (dw / src_w).max(dh / src_h);
    // Clamp guards against float drift pushing the crop past the source edge.
    let crop_w = (dw / scale).min(src_w);
    let crop_h = (dh / scale).min(src_h);
    let x0 = (src_w - crop_w) / 2.0;
    let y0 = (src_h - crop_h) / 2.0;

    Ok(CoverFit {
        scale,
        src_crop: Rect::new(x0, y0, x0 + crop_w, y0 + crop_h),
        dst,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/composition/fit.rs"]
mod tests;
