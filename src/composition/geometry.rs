use serde::{Deserialize, Serialize};

use crate::foundation::core::{Canvas, Rect, Rgba8};
use crate::foundation::error::{ClipframeError, ClipframeResult};

/// Styling and placement of the label container.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelStyle {
    /// Top edge of the container in canvas pixels.
    pub top: f64,
    /// Label font size in pixels.
    pub font_size_px: f32,
    /// Text fill.
    pub text_color: Rgba8,
    /// Container fill (semi-opaque so it hides template placeholder text).
    pub box_fill: Rgba8,
    /// Container corner radius.
    pub box_radius: f64,
    /// Horizontal padding between text and container edge.
    pub padding_x: f64,
    /// Vertical padding between text and container edge.
    pub padding_y: f64,
    /// Minimum container width.
    pub min_box_width: f64,
}

/// Fixed output geometry: canvas size, video window and label placement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanvasGeometry {
    /// Output frame size.
    pub canvas: Canvas,
    /// Color under every layer.
    pub background: Rgba8,
    /// Window the source clip is cover-fitted into.
    pub video_rect: Rect,
    /// Label container and text styling.
    pub label: LabelStyle,
}

impl CanvasGeometry {
    /// Template canvas width.
    pub const CANVAS_WIDTH: u32 = 1080;
    /// Template canvas height.
    pub const CANVAS_HEIGHT: u32 = 1920;

    /// The branded template layout.
    pub fn template() -> Self {
        Self {
            canvas: Canvas {
                width: Self::CANVAS_WIDTH,
                height: Self::CANVAS_HEIGHT,
            },
            background: Rgba8::WHITE,
            video_rect: Rect::new(170.0, 380.0, 170.0 + 740.0, 380.0 + 740.0),
            label: LabelStyle {
                top: 1180.0,
                font_size_px: 50.0,
                text_color: Rgba8::BLACK,
                box_fill: Rgba8::WHITE.with_alpha_f32(0.9),
                box_radius: 8.0,
                padding_x: 40.0,
                padding_y: 10.0,
                min_box_width: 400.0,
            },
        }
    }

    /// Uniformly scale the layout, keeping the canvas dimensions even.
    ///
    /// Used for cheap previews; the video window is snapped to whole pixels.
    pub fn scaled(&self, factor: f64) -> ClipframeResult<Self> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ClipframeError::config(
                "geometry scale factor must be finite and > 0",
            ));
        }
        let even = |v: u32| -> u32 {
            let s = ((f64::from(v) * factor).round() as u32).max(2);
            s + (s % 2)
        };
        let r = self.video_rect;
        let out = Self {
            canvas: Canvas {
                width: even(self.canvas.width),
                height: even(self.canvas.height),
            },
            background: self.background,
            video_rect: Rect::new(
                (r.x0 * factor).round(),
                (r.y0 * factor).round(),
                (r.x1 * factor).round(),
                (r.y1 * factor).round(),
            ),
            label: LabelStyle {
                top: (self.label.top * factor).round(),
                font_size_px: self.label.font_size_px * factor as f32,
                box_radius: self.label.box_radius * factor,
                padding_x: self.label.padding_x * factor,
                padding_y: self.label.padding_y * factor,
                min_box_width: self.label.min_box_width * factor,
                ..self.label
            },
        };
        out.validate()?;
        Ok(out)
    }

    /// Check the layout invariants.
    pub fn validate(&self) -> ClipframeResult<()> {
        let Canvas { width, height } = self.canvas;
        if width == 0 || height == 0 {
            return Err(ClipframeError::config("canvas size must be non-zero"));
        }
        if !width.is_multiple_of(2) || !height.is_multiple_of(2) {
            return Err(ClipframeError::config(
                "canvas width/height must be even for yuv420p output",
            ));
        }
        if width > u32::from(u16::MAX) || height > u32::from(u16::MAX) {
            return Err(ClipframeError::config("canvas is too large"));
        }

        let v = self.video_rect;
        let canvas = self.canvas.rect();
        if !(v.width() > 0.0 && v.height() > 0.0) {
            return Err(ClipframeError::config("video rect must have positive size"));
        }
        if v.x0 < canvas.x0 || v.y0 < canvas.y0 || v.x1 > canvas.x1 || v.y1 > canvas.y1 {
            return Err(ClipframeError::config(format!(
                "video rect {v:?} lies outside the {width}x{height} canvas"
            )));
        }

        let l = &self.label;
        if !(l.font_size_px.is_finite() && l.font_size_px > 0.0) {
            return Err(ClipframeError::config("label font size must be > 0"));
        }
        if l.top < v.y1 {
            return Err(ClipframeError::config(format!(
                "label top {} overlaps the video rect (bottom {})",
                l.top, v.y1
            )));
        }
        if l.top >= canvas.y1 {
            return Err(ClipframeError::config("label top lies below the canvas"));
        }
        for (name, value) in [
            ("box_radius", l.box_radius),
            ("padding_x", l.padding_x),
            ("padding_y", l.padding_y),
            ("min_box_width", l.min_box_width),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ClipframeError::config(format!(
                    "label {name} must be finite and >= 0"
                )));
            }
        }
        if l.min_box_width > canvas.width() {
            return Err(ClipframeError::config(
                "label min_box_width is wider than the canvas",
            ));
        }
        Ok(())
    }

    /// Container rect for a label whose text measures `text_w x text_h`.
    pub fn label_box(&self, text_w: f64, text_h: f64) -> Rect {
        self.label
            .container_rect(f64::from(self.canvas.width) / 2.0, text_w, text_h)
    }
}

impl LabelStyle {
    /// Container rect centered on `center_x` with its top edge at `top`.
    pub fn container_rect(&self, center_x: f64, text_w: f64, text_h: f64) -> Rect {
        let w = (text_w + 2.0 * self.padding_x).max(self.min_box_width);
        let h = text_h + 2.0 * self.padding_y;
        Rect::new(center_x - w / 2.0, self.top, center_x + w / 2.0, self.top + h)
    }

    /// Widest text that fits on the canvas inside the container padding.
    pub fn max_text_width(&self, canvas_width: u32) -> f64 {
        (f64::from(canvas_width) - 2.0 * self.padding_x).max(1.0)
    }
}

impl Default for CanvasGeometry {
    fn default() -> Self {
        Self::template()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/geometry.rs"]
mod tests;
