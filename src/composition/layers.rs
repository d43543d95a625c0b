use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::assets::locator::SourceLocator;
use crate::composition::geometry::{CanvasGeometry, LabelStyle};
use crate::composition::label::OverlayLabel;
use crate::foundation::core::{Canvas, FrameIndex, Rect, Rgba8};

/// Z value of the template image.
pub const Z_TEMPLATE: i32 = 1;
/// Z value of the source clip.
pub const Z_VIDEO: i32 = 2;
/// Z value of the label.
pub const Z_LABEL: i32 = 3;

/// How a source is placed into its rect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fit {
    /// Fill the rect, crop overflow, keep aspect ratio.
    #[default]
    Cover,
}

/// Still image stretched over a rect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageLayer {
    /// Paint order; higher is on top.
    pub z: i32,
    /// Image file.
    pub source: PathBuf,
    /// Destination rect in canvas pixels.
    pub rect: Rect,
    /// Placement mode.
    pub fit: Fit,
}

/// Source clip played inside a rect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoLayer {
    /// Paint order; higher is on top.
    pub z: i32,
    /// Clip locator handed to the decoder.
    pub source: SourceLocator,
    /// Destination rect in canvas pixels.
    pub rect: Rect,
    /// Placement mode.
    pub fit: Fit,
    /// Composition frame at which the clip's first frame shows.
    pub start_frame: FrameIndex,
}

/// Label text in a rounded container.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextLayer {
    /// Paint order; higher is on top.
    pub z: i32,
    /// Display text (already case-normalized).
    pub text: String,
    /// Horizontal center line in canvas pixels.
    pub center_x: f64,
    /// Container styling; `style.top` is the container's top edge.
    pub style: LabelStyle,
}

/// One drawable layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layer {
    /// Template background.
    Image(ImageLayer),
    /// Source clip.
    Video(VideoLayer),
    /// Overlay label.
    Text(TextLayer),
}

impl Layer {
    /// Paint order of the layer.
    pub fn z(&self) -> i32 {
        match self {
            Self::Image(l) => l.z,
            Self::Video(l) => l.z,
            Self::Text(l) => l.z,
        }
    }
}

/// Layers sorted bottom to top, plus the canvas they paint onto.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerList {
    /// Output size.
    pub canvas: Canvas,
    /// Color under every layer.
    pub background: Rgba8,
    /// Layers in ascending `z`.
    pub layers: Vec<Layer>,
}

impl LayerList {
    /// Build a list, sorting `layers` by `z` (stable for equal values).
    pub fn new(canvas: Canvas, background: Rgba8, mut layers: Vec<Layer>) -> Self {
        layers.sort_by_key(Layer::z);
        Self {
            canvas,
            background,
            layers,
        }
    }

    /// The video layer, if present.
    pub fn video(&self) -> Option<&VideoLayer> {
        self.layers.iter().find_map(|l| match l {
            Layer::Video(v) => Some(v),
            _ => None,
        })
    }

    /// The image layer, if present.
    pub fn image(&self) -> Option<&ImageLayer> {
        self.layers.iter().find_map(|l| match l {
            Layer::Image(i) => Some(i),
            _ => None,
        })
    }

    /// The text layer, if present.
    pub fn text(&self) -> Option<&TextLayer> {
        self.layers.iter().find_map(|l| match l {
            Layer::Text(t) => Some(t),
            _ => None,
        })
    }
}

/// Describe the template composition for one job.
///
/// Pure: no file is touched here. A missing clip drops the video layer; everything else is always
/// present.
pub fn build_layers(
    geometry: &CanvasGeometry,
    template: &Path,
    video: Option<&SourceLocator>,
    label: &OverlayLabel,
) -> LayerList {
    let mut layers = vec![Layer::Image(ImageLayer {
        z: Z_TEMPLATE,
        source: template.to_path_buf(),
        rect: geometry.canvas.rect(),
        fit: Fit::Cover,
    })];

    if let Some(source) = video {
        layers.push(Layer::Video(VideoLayer {
            z: Z_VIDEO,
            source: source.clone(),
            rect: geometry.video_rect,
            fit: Fit::Cover,
            start_frame: FrameIndex(0),
        }));
    }

    layers.push(Layer::Text(TextLayer {
        z: Z_LABEL,
        text: label.display().to_string(),
        center_x: f64::from(geometry.canvas.width) / 2.0,
        style: geometry.label,
    }));

    LayerList::new(geometry.canvas, geometry.background, layers)
}

#[cfg(test)]
#[path = "../../tests/unit/composition/layers.rs"]
mod tests;
