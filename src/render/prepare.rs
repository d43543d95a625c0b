use std::path::Path;
use std::sync::Arc;

use crate::assets::decode::{PreparedImage, load_image_file};
use crate::assets::locator::SourceLocator;
use crate::assets::text::{ShapedText, TextLayoutEngine, load_font_bytes};
use crate::composition::layers::{Layer, LayerList, TextLayer};
use crate::foundation::core::{Canvas, Rect, Rgba8, Vec2};
use crate::foundation::error::{ClipframeError, ClipframeResult};

/// Template image ready to paint.
#[derive(Clone, Debug)]
pub(crate) struct PreparedImageLayer {
    pub(crate) image: PreparedImage,
    pub(crate) rect: Rect,
}

/// Video window with the decode size the stream must deliver.
#[derive(Clone, Debug)]
pub(crate) struct PreparedVideoLayer {
    pub(crate) source: SourceLocator,
    pub(crate) rect: Rect,
    pub(crate) frame_width: u32,
    pub(crate) frame_height: u32,
}

/// Label container plus shaped lines positioned in canvas space.
#[derive(Clone, Debug)]
pub(crate) struct PreparedLabel {
    pub(crate) box_rect: Rect,
    pub(crate) box_fill: Rgba8,
    pub(crate) box_radius: f64,
    /// `(origin, line)` pairs; glyph positions are relative to `origin`.
    pub(crate) lines: Vec<(Vec2, ShapedText)>,
}

#[derive(Clone, Debug)]
pub(crate) enum PreparedLayer {
    Image(PreparedImageLayer),
    Video(PreparedVideoLayer),
    Label(PreparedLabel),
}

/// A composition with every static asset resolved, ready to rasterize frame after frame.
///
/// Preparing once per job replaces the bundle step of served-composition renderers: template
/// decode, font load and label layout happen here, and per-frame work only touches video pixels.
#[derive(Clone, Debug)]
pub struct PreparedComposition {
    pub(crate) canvas: Canvas,
    pub(crate) background: Rgba8,
    pub(crate) layers: Vec<PreparedLayer>,
    pub(crate) font: Option<Arc<Vec<u8>>>,
}

impl PreparedComposition {
    /// Resolve `layers` into paintable form.
    ///
    /// A template that cannot be loaded is hidden with a warning. A label font that cannot be
    /// loaded, or a label that cannot be laid out inside the canvas, is a
    /// [`ClipframeError::Preparation`].
    #[tracing::instrument(skip_all, fields(layers = layers.layers.len()))]
    pub fn prepare(layers: &LayerList, font_path: &Path) -> ClipframeResult<Self> {
        let canvas = layers.canvas;
        if canvas.width == 0
            || canvas.height == 0
            || canvas.width > u32::from(u16::MAX)
            || canvas.height > u32::from(u16::MAX)
        {
            return Err(ClipframeError::preparation(format!(
                "unsupported canvas size {}x{}",
                canvas.width, canvas.height
            )));
        }

        let mut font: Option<Arc<Vec<u8>>> = None;
        let mut out = Vec::with_capacity(layers.layers.len());
        for layer in &layers.layers {
            match layer {
                Layer::Image(img) => match load_template(&img.source) {
                    Ok(image) => out.push(PreparedLayer::Image(PreparedImageLayer {
                        image,
                        rect: img.rect,
                    })),
                    Err(e) => {
                        tracing::warn!(
                            path = %img.source.display(),
                            error = %e,
                            "template image unavailable, hiding layer"
                        );
                    }
                },
                Layer::Video(v) => {
                    let (frame_width, frame_height) = decode_size(v.rect)?;
                    out.push(PreparedLayer::Video(PreparedVideoLayer {
                        source: v.source.clone(),
                        rect: v.rect,
                        frame_width,
                        frame_height,
                    }));
                }
                Layer::Text(t) => {
                    let bytes = match &font {
                        Some(b) => b.clone(),
                        None => {
                            let b = Arc::new(load_font_bytes(font_path)?);
                            font = Some(b.clone());
                            b
                        }
                    };
                    out.push(PreparedLayer::Label(prepare_label(t, canvas, &bytes)?));
                }
            }
        }

        Ok(Self {
            canvas,
            background: layers.background,
            layers: out,
            font,
        })
    }

    /// Output canvas size.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// `true` when the template image decoded and will be painted.
    pub fn template_loaded(&self) -> bool {
        self.layers
            .iter()
            .any(|l| matches!(l, PreparedLayer::Image(_)))
    }

    /// `true` when a video layer will be painted.
    pub fn has_video(&self) -> bool {
        self.video().is_some()
    }

    /// Label container rect in canvas pixels.
    pub fn label_box(&self) -> Option<Rect> {
        self.layers.iter().find_map(|l| match l {
            PreparedLayer::Label(label) => Some(label.box_rect),
            _ => None,
        })
    }

    pub(crate) fn video(&self) -> Option<&PreparedVideoLayer> {
        self.layers.iter().find_map(|l| match l {
            PreparedLayer::Video(v) => Some(v),
            _ => None,
        })
    }

    pub(crate) fn canvas_u16(&self) -> (u16, u16) {
        // Checked in `prepare`.
        (self.canvas.width as u16, self.canvas.height as u16)
    }
}

fn decode_size(rect: Rect) -> ClipframeResult<(u32, u32)> {
    let w = rect.width().round();
    let h = rect.height().round();
    if !(w >= 1.0 && h >= 1.0 && w <= f64::from(u16::MAX) && h <= f64::from(u16::MAX)) {
        return Err(ClipframeError::preparation(format!(
            "video rect {rect:?} has an unusable size"
        )));
    }
    Ok((w as u32, h as u32))
}

/// Decode the template; images the rasterizer cannot hold count as unavailable.
fn load_template(path: &Path) -> ClipframeResult<PreparedImage> {
    let image = load_image_file(path)?;
    let max = u32::from(u16::MAX);
    if image.width == 0 || image.height == 0 || image.width > max || image.height > max {
        return Err(ClipframeError::preparation(format!(
            "template is {}x{}, outside the supported 1..={max} pixels per side",
            image.width, image.height
        )));
    }
    Ok(image)
}

fn prepare_label(t: &TextLayer, canvas: Canvas, font: &[u8]) -> ClipframeResult<PreparedLabel> {
    let style = &t.style;
    let max_w = style.max_text_width(canvas.width) as f32;
    let mut engine = TextLayoutEngine::new();
    let wrapped = engine
        .shape_wrapped(&t.text, font, style.font_size_px, style.text_color, max_w)
        .map_err(|e| match e {
            ClipframeError::Preparation(_) => e,
            other => ClipframeError::preparation(format!("label layout failed: {other}")),
        })?;

    let box_rect = style.container_rect(
        t.center_x,
        f64::from(wrapped.width),
        f64::from(wrapped.height),
    );
    let bounds = canvas.rect();
    if box_rect.x0 < bounds.x0 - 0.5
        || box_rect.x1 > bounds.x1 + 0.5
        || box_rect.y1 > bounds.y1
    {
        return Err(ClipframeError::preparation(format!(
            "label container {box_rect:?} does not fit the {}x{} canvas",
            canvas.width, canvas.height
        )));
    }

    let mut y = box_rect.y0 + style.padding_y;
    let mut lines = Vec::with_capacity(wrapped.lines.len());
    for line in wrapped.lines {
        let x = t.center_x - f64::from(line.width) / 2.0;
        let h = f64::from(line.height);
        lines.push((Vec2::new(x, y), line));
        y += h;
    }
    tracing::debug!(
        lines = lines.len(),
        font_size = wrapped.font_size,
        box_width = box_rect.width(),
        "label laid out"
    );

    Ok(PreparedLabel {
        box_rect,
        box_fill: style.box_fill,
        box_radius: style.box_radius,
        lines,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/prepare.rs"]
mod tests;
