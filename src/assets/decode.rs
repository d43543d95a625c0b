use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::foundation::error::ClipframeResult;
use crate::foundation::math::premultiply_rgba8_in_place;

/// Prepared raster image in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Decode encoded image bytes and convert to premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> ClipframeResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Read and decode an image file.
pub fn load_image_file(path: &Path) -> ClipframeResult<PreparedImage> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("read image '{}'", path.display()))?;
    let bytes_len = bytes.len();
    decode_image(&bytes).map_err(|e| {
        anyhow::anyhow!("{e} (file '{}', {bytes_len} bytes)", path.display()).into()
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
