use crate::foundation::core::Rgba8;
use crate::foundation::error::{ClipframeError, ClipframeResult};

/// Brush color carried through Parley styles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

impl From<Rgba8> for TextBrushRgba8 {
    fn from(c: Rgba8) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}

/// One glyph positioned relative to the layout origin (top-left of the first line box).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionedGlyph {
    /// Glyph id within the run's font.
    pub id: u32,
    /// Pen x in pixels.
    pub x: f32,
    /// Baseline y in pixels.
    pub y: f32,
}

/// A run of glyphs sharing font size and color.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapedRun {
    /// Font size in pixels.
    pub font_size: f32,
    /// Fill color.
    pub color: Rgba8,
    /// Glyphs in paint order.
    pub glyphs: Vec<PositionedGlyph>,
}

/// Fully shaped single-paragraph text, detached from the layout engine.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapedText {
    /// Glyph runs in paint order.
    pub runs: Vec<ShapedRun>,
    /// Advance width of the widest line in pixels.
    pub width: f32,
    /// Total line-box height in pixels.
    pub height: f32,
}

impl ShapedText {
    /// Number of glyphs across all runs.
    pub fn glyph_count(&self) -> usize {
        self.runs.iter().map(|r| r.glyphs.len()).sum()
    }
}

/// Stateful helper for building Parley text layouts from raw font bytes.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    /// Last registered font and its family name; wrapping shapes many candidates per font.
    registered: Option<(Vec<u8>, String)>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            registered: None,
        }
    }

    fn family_for(&mut self, font_bytes: &[u8]) -> ClipframeResult<String> {
        if let Some((bytes, name)) = &self.registered
            && bytes.as_slice() == font_bytes
        {
            return Ok(name.clone());
        }
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            ClipframeError::preparation("no font families registered from font bytes")
        })?;
        let name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| ClipframeError::preparation("registered font family has no name"))?
            .to_string();
        self.registered = Some((font_bytes.to_vec(), name.clone()));
        Ok(name)
    }

    /// Shape `text` on a single unwrapped line with the font in `font_bytes`.
    pub(crate) fn shape_line(
        &mut self,
        text: &str,
        font_bytes: &[u8],
        size_px: f32,
        color: Rgba8,
    ) -> ClipframeResult<ShapedText> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(ClipframeError::preparation(
                "text size_px must be finite and > 0",
            ));
        }

        let family_name = self.family_for(font_bytes)?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(TextBrushRgba8::from(
            color,
        )));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);

        let mut runs = Vec::new();
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                let glyphs = run
                    .glyphs()
                    .map(|g| PositionedGlyph {
                        id: u32::from(g.id),
                        x: g.x,
                        y: g.y,
                    })
                    .collect::<Vec<_>>();
                if glyphs.is_empty() {
                    continue;
                }
                runs.push(ShapedRun {
                    font_size: run.run().font_size(),
                    color: Rgba8 {
                        r: brush.r,
                        g: brush.g,
                        b: brush.b,
                        a: brush.a,
                    },
                    glyphs,
                });
            }
        }

        Ok(ShapedText {
            runs,
            width: layout.width(),
            height: layout.height(),
        })
    }
}

/// Label broken into centered lines.
#[derive(Clone, Debug, PartialEq)]
pub struct WrappedText {
    /// Lines top to bottom.
    pub lines: Vec<ShapedText>,
    /// Font size actually used after shrink-to-fit.
    pub font_size: f32,
    /// Widest line.
    pub width: f32,
    /// Sum of line heights.
    pub height: f32,
}

impl TextLayoutEngine {
    /// Greedy word wrap to `max_width`, then shrink the font if a single word still overflows.
    ///
    /// Runs of whitespace collapse to one space, like HTML text.
    pub(crate) fn shape_wrapped(
        &mut self,
        text: &str,
        font_bytes: &[u8],
        size_px: f32,
        color: Rgba8,
        max_width: f32,
    ) -> ClipframeResult<WrappedText> {
        let first = self.wrap_at(text, font_bytes, size_px, color, max_width)?;
        if first.width <= max_width || first.width <= 0.0 {
            return Ok(first);
        }
        let shrunk = size_px * (max_width / first.width);
        tracing::debug!(size_px, shrunk, "label overflows, shrinking font");
        self.wrap_at(text, font_bytes, shrunk, color, max_width)
    }

    fn wrap_at(
        &mut self,
        text: &str,
        font_bytes: &[u8],
        size_px: f32,
        color: Rgba8,
        max_width: f32,
    ) -> ClipframeResult<WrappedText> {
        let mut lines = Vec::new();
        let mut current: Option<(String, ShapedText)> = None;
        for word in text.split_whitespace() {
            let candidate = match &current {
                Some((line, _)) => format!("{line} {word}"),
                None => word.to_string(),
            };
            let shaped = self.shape_line(&candidate, font_bytes, size_px, color)?;
            match current.take() {
                Some((_, prev)) if shaped.width > max_width => {
                    lines.push(prev);
                    let single = self.shape_line(word, font_bytes, size_px, color)?;
                    current = Some((word.to_string(), single));
                }
                _ => current = Some((candidate, shaped)),
            }
        }
        if let Some((_, last)) = current {
            lines.push(last);
        }

        let width = lines.iter().map(|l| l.width).fold(0.0f32, f32::max);
        let height = lines.iter().map(|l| l.height).sum();
        Ok(WrappedText {
            lines,
            font_size: size_px,
            width,
            height,
        })
    }
}

/// Read a label font file. Empty files are rejected here; unparsable ones fail at shaping.
pub fn load_font_bytes(path: &std::path::Path) -> ClipframeResult<Vec<u8>> {
    let bytes = std::fs::read(path).map_err(|e| {
        ClipframeError::preparation(format!("failed to read font '{}': {e}", path.display()))
    })?;
    if bytes.is_empty() {
        return Err(ClipframeError::preparation(format!(
            "font '{}' is empty",
            path.display()
        )));
    }
    Ok(bytes)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/text.rs"]
mod tests;
