//! Immutable watermark parameters.
//!
//! A [`WatermarkDescriptor`] is a validated snapshot of everything needed to
//! draw one watermark. The pipeline captures one per job, so later edits to
//! the caller's settings never reach in-flight work.
//!
//! # Example
//!
//! ```ignore
//! use gifstamp::watermark::{WatermarkDescriptor, WatermarkKind};
//!
//! let wm = WatermarkDescriptor::builder(WatermarkKind::Text)
//!     .text("DRAFT")
//!     .anchor(50.0, 50.0)
//!     .rotation_deg(-30.0)
//!     .opacity(0.4)
//!     .build()?;
//! ```

use super::error::DescriptorError;
use crate::constants::{
    DEFAULT_ANCHOR_MAX_PCT, DEFAULT_ANCHOR_MIN_PCT, DEFAULT_FONT_SIZE_PX, DEFAULT_IMAGE_SIZE_PCT,
    DEFAULT_OPACITY, DEFAULT_TILE_SPACING_PX,
};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// What the watermark draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkKind {
    /// A single text run centered on the anchor.
    #[default]
    Text,
    /// The same text run repeated over the whole frame.
    TiledText,
    /// A bitmap centered on the anchor.
    Image,
}

impl fmt::Display for WatermarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::TiledText => write!(f, "tiled_text"),
            Self::Image => write!(f, "image"),
        }
    }
}

/// Anchor position as percentages of the logical screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub x_pct: f32,
    pub y_pct: f32,
}

impl Anchor {
    pub fn new(x_pct: f32, y_pct: f32) -> Self {
        Self { x_pct, y_pct }
    }
}

impl Default for Anchor {
    fn default() -> Self {
        Self::new(50.0, 50.0)
    }
}

/// Permitted anchor range, applied to both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorBounds {
    pub min_pct: f32,
    pub max_pct: f32,
}

impl AnchorBounds {
    pub fn clamp(&self, anchor: Anchor) -> Anchor {
        Anchor {
            x_pct: anchor.x_pct.clamp(self.min_pct, self.max_pct),
            y_pct: anchor.y_pct.clamp(self.min_pct, self.max_pct),
        }
    }
}

impl Default for AnchorBounds {
    fn default() -> Self {
        Self {
            min_pct: DEFAULT_ANCHOR_MIN_PCT,
            max_pct: DEFAULT_ANCHOR_MAX_PCT,
        }
    }
}

/// Validated, immutable watermark parameters.
#[derive(Clone, PartialEq)]
pub struct WatermarkDescriptor {
    kind: WatermarkKind,
    text: String,
    color: Rgba<u8>,
    font_size_px: f32,
    opacity: f32,
    rotation_deg: f32,
    anchor: Anchor,
    scale: f32,
    tile_spacing_px: u32,
    image_source: Option<Arc<RgbaImage>>,
    image_size_pct: f32,
}

impl WatermarkDescriptor {
    pub fn builder(kind: WatermarkKind) -> WatermarkDescriptorBuilder {
        WatermarkDescriptorBuilder::new(kind)
    }

    /// Shorthand for a validated single text watermark with defaults.
    pub fn text(text: impl Into<String>) -> Result<Self, DescriptorError> {
        Self::builder(WatermarkKind::Text).text(text).build()
    }

    pub fn kind(&self) -> WatermarkKind {
        self.kind
    }

    pub fn text_content(&self) -> &str {
        &self.text
    }

    pub fn color(&self) -> Rgba<u8> {
        self.color
    }

    pub fn font_size_px(&self) -> f32 {
        self.font_size_px
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Rotation as given by the caller.
    pub fn rotation_deg(&self) -> f32 {
        self.rotation_deg
    }

    /// Rotation folded into `[0, 360)`.
    pub fn normalized_rotation(&self) -> f32 {
        let r = self.rotation_deg.rem_euclid(360.0);
        // rem_euclid can round up to exactly 360 for tiny negative inputs
        if r >= 360.0 {
            0.0
        } else {
            r
        }
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn tile_spacing_px(&self) -> u32 {
        self.tile_spacing_px
    }

    pub fn image_source(&self) -> Option<&RgbaImage> {
        self.image_source.as_deref()
    }

    pub fn image_size_pct(&self) -> f32 {
        self.image_size_pct
    }
}

impl fmt::Debug for WatermarkDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatermarkDescriptor")
            .field("kind", &self.kind)
            .field("text", &self.text)
            .field("color", &self.color.0)
            .field("font_size_px", &self.font_size_px)
            .field("opacity", &self.opacity)
            .field("rotation_deg", &self.rotation_deg)
            .field("anchor", &self.anchor)
            .field("scale", &self.scale)
            .field("tile_spacing_px", &self.tile_spacing_px)
            .field(
                "image_source",
                &self.image_source.as_ref().map(|img| img.dimensions()),
            )
            .field("image_size_pct", &self.image_size_pct)
            .finish()
    }
}

/// Builder for [`WatermarkDescriptor`].
#[derive(Debug, Clone)]
pub struct WatermarkDescriptorBuilder {
    kind: WatermarkKind,
    text: String,
    color: Rgba<u8>,
    font_size_px: f32,
    opacity: f32,
    rotation_deg: f32,
    anchor: Anchor,
    anchor_bounds: AnchorBounds,
    scale: f32,
    tile_spacing_px: u32,
    image_source: Option<Arc<RgbaImage>>,
    image_size_pct: f32,
}

impl WatermarkDescriptorBuilder {
    pub fn new(kind: WatermarkKind) -> Self {
        Self {
            kind,
            text: String::new(),
            color: Rgba([255, 255, 255, 255]),
            font_size_px: DEFAULT_FONT_SIZE_PX,
            opacity: DEFAULT_OPACITY,
            rotation_deg: 0.0,
            anchor: Anchor::default(),
            anchor_bounds: AnchorBounds::default(),
            scale: 1.0,
            tile_spacing_px: DEFAULT_TILE_SPACING_PX,
            image_source: None,
            image_size_pct: DEFAULT_IMAGE_SIZE_PCT,
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn color(mut self, color: Rgba<u8>) -> Self {
        self.color = color;
        self
    }

    pub fn font_size_px(mut self, size: f32) -> Self {
        self.font_size_px = size;
        self
    }

    pub fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn rotation_deg(mut self, degrees: f32) -> Self {
        self.rotation_deg = degrees;
        self
    }

    pub fn anchor(mut self, x_pct: f32, y_pct: f32) -> Self {
        self.anchor = Anchor::new(x_pct, y_pct);
        self
    }

    pub fn anchor_bounds(mut self, bounds: AnchorBounds) -> Self {
        self.anchor_bounds = bounds;
        self
    }

    pub fn scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn tile_spacing_px(mut self, spacing: u32) -> Self {
        self.tile_spacing_px = spacing;
        self
    }

    pub fn image_source(mut self, image: RgbaImage) -> Self {
        self.image_source = Some(Arc::new(image));
        self
    }

    pub fn shared_image_source(mut self, image: Arc<RgbaImage>) -> Self {
        self.image_source = Some(image);
        self
    }

    pub fn image_size_pct(mut self, pct: f32) -> Self {
        self.image_size_pct = pct;
        self
    }

    /// Validate and build.
    ///
    /// The anchor is clamped into the configured bounds; every other
    /// out-of-range value is rejected.
    pub fn build(self) -> Result<WatermarkDescriptor, DescriptorError> {
        match self.kind {
            WatermarkKind::Text | WatermarkKind::TiledText => {
                if self.text.trim().is_empty() {
                    return Err(DescriptorError::EmptyText);
                }
            }
            WatermarkKind::Image => match &self.image_source {
                None => return Err(DescriptorError::MissingImage),
                Some(img) if img.width() == 0 || img.height() == 0 => {
                    return Err(DescriptorError::invalid("image_source", "bitmap is empty"));
                }
                Some(_) => {}
            },
        }

        require_positive("font_size_px", self.font_size_px)?;
        require_positive("scale", self.scale)?;
        require_positive("image_size_pct", self.image_size_pct)?;

        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(DescriptorError::invalid(
                "opacity",
                format!("must be within [0, 1], got {}", self.opacity),
            ));
        }
        if !self.rotation_deg.is_finite() {
            return Err(DescriptorError::invalid("rotation_deg", "must be finite"));
        }
        if !self.anchor.x_pct.is_finite() || !self.anchor.y_pct.is_finite() {
            return Err(DescriptorError::invalid("anchor", "must be finite"));
        }
        if self.tile_spacing_px == 0 {
            return Err(DescriptorError::invalid("tile_spacing_px", "must be positive"));
        }
        // Also rejects NaN bounds, which would panic in `f32::clamp`.
        if !(self.anchor_bounds.min_pct <= self.anchor_bounds.max_pct) {
            return Err(DescriptorError::invalid(
                "anchor_bounds",
                format!(
                    "min {} must not exceed max {}",
                    self.anchor_bounds.min_pct, self.anchor_bounds.max_pct
                ),
            ));
        }

        let anchor = self.anchor_bounds.clamp(self.anchor);
        Ok(self.assemble(anchor))
    }

    /// Build without any validation.
    ///
    /// Only for callers that validate elsewhere. The compositor still
    /// rejects an image watermark without a source.
    pub fn build_unvalidated(self) -> WatermarkDescriptor {
        let anchor = self.anchor;
        self.assemble(anchor)
    }

    fn assemble(self, anchor: Anchor) -> WatermarkDescriptor {
        WatermarkDescriptor {
            kind: self.kind,
            text: self.text,
            color: self.color,
            font_size_px: self.font_size_px,
            opacity: self.opacity,
            rotation_deg: self.rotation_deg,
            anchor,
            scale: self.scale,
            tile_spacing_px: self.tile_spacing_px,
            image_source: self.image_source,
            image_size_pct: self.image_size_pct,
        }
    }
}

fn require_positive(field: &'static str, value: f32) -> Result<(), DescriptorError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DescriptorError::invalid(
            field,
            format!("must be a positive number, got {}", value),
        ))
    }
}
