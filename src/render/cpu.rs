use std::sync::Arc;

use kurbo::Shape;

use crate::assets::video_stream::VideoFrame;
use crate::composition::fit::cover_fit;
use crate::foundation::core::{Affine, Rect, Rgba8};
use crate::foundation::error::{ClipframeError, ClipframeResult};
use crate::render::backend::FrameRGBA;
use crate::render::prepare::{PreparedComposition, PreparedLabel, PreparedLayer};

/// Image paint plus its source size.
#[derive(Clone)]
struct ImagePaint {
    paint: vello_cpu::Image,
    w: u32,
    h: u32,
}

/// Paints shared by every worker for the whole job.
///
/// Built once per job; workers borrow it, so the template is uploaded a single time.
pub(crate) struct CpuPaints {
    template: Option<ImagePaint>,
    font: Option<vello_cpu::peniko::FontData>,
}

impl CpuPaints {
    pub(crate) fn new(prepared: &PreparedComposition) -> ClipframeResult<Self> {
        let template = prepared
            .layers
            .iter()
            .find_map(|l| match l {
                PreparedLayer::Image(img) => Some(img),
                _ => None,
            })
            .map(|img| {
                image_paint(&img.image.rgba8_premul, img.image.width, img.image.height)
                    .map_err(|e| ClipframeError::preparation(format!("template paint: {e}")))
            })
            .transpose()?;
        let font = prepared.font.as_ref().map(|bytes| {
            vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from(bytes.as_ref().clone()),
                0,
            )
        });
        Ok(Self { template, font })
    }
}

/// Per-worker raster state: one render context and one target pixmap.
pub(crate) struct CpuRasterizer {
    ctx: vello_cpu::RenderContext,
    pixmap: vello_cpu::Pixmap,
}

impl CpuRasterizer {
    pub(crate) fn new(width: u16, height: u16) -> Self {
        Self {
            ctx: vello_cpu::RenderContext::new(width, height),
            pixmap: vello_cpu::Pixmap::new(width, height),
        }
    }

    /// Paint one composition frame. `video` must be present iff the composition has a video layer.
    pub(crate) fn rasterize(
        &mut self,
        prepared: &PreparedComposition,
        paints: &CpuPaints,
        video: Option<&VideoFrame>,
    ) -> ClipframeResult<FrameRGBA> {
        let (w, h) = prepared.canvas_u16();
        if self.ctx.width() != w || self.ctx.height() != h {
            *self = Self::new(w, h);
        }
        let ctx = &mut self.ctx;
        ctx.reset();
        ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        // Background first so the result does not depend on prior pixmap contents.
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(color(prepared.background));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(w),
            f64::from(h),
        ));

        for layer in &prepared.layers {
            match layer {
                PreparedLayer::Image(img) => {
                    let Some(p) = paints.template.as_ref() else {
                        continue;
                    };
                    draw_cover(ctx, p, img.rect)?;
                }
                PreparedLayer::Video(v) => {
                    let frame = video.ok_or_else(|| {
                        ClipframeError::rasterization("video layer has no decoded frame")
                    })?;
                    let p = image_paint(&frame.rgba8_premul, frame.width, frame.height)?;
                    draw_cover(ctx, &p, v.rect)?;
                }
                PreparedLayer::Label(label) => draw_label(ctx, label, paints.font.as_ref())?,
            }
        }

        ctx.flush();
        ctx.render_to_pixmap(&mut self.pixmap);

        Ok(FrameRGBA {
            width: u32::from(w),
            height: u32::from(h),
            data: self.pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }
}

/// Place an image with `cover` fit. Only the crop region is filled, so no pixel lands outside
/// `dst`.
fn draw_cover(
    ctx: &mut vello_cpu::RenderContext,
    p: &ImagePaint,
    dst: Rect,
) -> ClipframeResult<()> {
    let fit = cover_fit(f64::from(p.w), f64::from(p.h), dst)?;
    let c = fit.src_crop;
    ctx.set_transform(affine_to_cpu(fit.transform()));
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(p.paint.clone());
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(c.x0, c.y0, c.x1, c.y1));
    Ok(())
}

fn draw_label(
    ctx: &mut vello_cpu::RenderContext,
    label: &PreparedLabel,
    font: Option<&vello_cpu::peniko::FontData>,
) -> ClipframeResult<()> {
    let b = label.box_rect;
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(color(label.box_fill));
    let rr = kurbo::RoundedRect::new(b.x0, b.y0, b.x1, b.y1, label.box_radius);
    let mut path = vello_cpu::kurbo::BezPath::new();
    for el in rr.path_elements(0.1) {
        path.push(el);
    }
    ctx.fill_path(&path);

    if label.lines.is_empty() {
        return Ok(());
    }
    let font =
        font.ok_or_else(|| ClipframeError::rasterization("label font is not loaded"))?;
    for (origin, line) in &label.lines {
        ctx.set_transform(affine_to_cpu(Affine::translate(*origin)));
        for run in &line.runs {
            ctx.set_paint(color(run.color));
            let glyphs = run.glyphs.iter().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(font)
                .font_size(run.font_size)
                .fill_glyphs(glyphs);
        }
    }
    Ok(())
}

fn color(c: Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn image_paint(premul: &[u8], width: u32, height: u32) -> ClipframeResult<ImagePaint> {
    let pixmap = pixmap_from_premul_bytes(premul, width, height)?;
    Ok(ImagePaint {
        paint: vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        },
        w: width,
        h: height,
    })
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> ClipframeResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| ClipframeError::rasterization("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| ClipframeError::rasterization("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(ClipframeError::rasterization("pixmap byte len mismatch"));
    }
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| {
            vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]])
        })
        .collect::<Vec<_>>();
    let may_have_opacities = bytes.chunks_exact(4).any(|px| px[3] != 255);
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
