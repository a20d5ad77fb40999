//! Serializable watermark settings.
//!
//! `WatermarkSettings` is the plain-data form loaded from configuration
//! files and the command line. [`WatermarkSettings::to_descriptor`] turns it
//! into a validated [`WatermarkDescriptor`].

use super::descriptor::{Anchor, AnchorBounds, WatermarkDescriptor, WatermarkKind};
use super::error::DescriptorError;
use super::text_renderer::parse_hex_color;
use crate::constants::{
    DEFAULT_FONT_SIZE_PX, DEFAULT_IMAGE_SIZE_PCT, DEFAULT_OPACITY, DEFAULT_TILE_SPACING_PX,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_color() -> String {
    "#FFFFFF".to_string()
}

fn default_font_size_px() -> f32 {
    DEFAULT_FONT_SIZE_PX
}

fn default_opacity() -> f32 {
    DEFAULT_OPACITY
}

fn default_scale() -> f32 {
    1.0
}

fn default_tile_spacing_px() -> u32 {
    DEFAULT_TILE_SPACING_PX
}

fn default_image_size_pct() -> f32 {
    DEFAULT_IMAGE_SIZE_PCT
}

/// Watermark settings as they appear in YAML.
///
/// ```yaml
/// kind: text
/// text: "DRAFT"
/// color: "#FFFFFFCC"
/// opacity: 0.4
/// rotation_deg: -30
/// anchor: { x_pct: 50, y_pct: 50 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkSettings {
    #[serde(default)]
    pub kind: WatermarkKind,
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_font_size_px")]
    pub font_size_px: f32,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default)]
    pub rotation_deg: f32,
    #[serde(default)]
    pub anchor: Anchor,
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default = "default_tile_spacing_px")]
    pub tile_spacing_px: u32,
    /// Path to the watermark bitmap (PNG, JPEG, WebP or GIF).
    #[serde(default)]
    pub image_path: Option<PathBuf>,
    #[serde(default = "default_image_size_pct")]
    pub image_size_pct: f32,
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            kind: WatermarkKind::default(),
            text: String::new(),
            color: default_color(),
            font_size_px: default_font_size_px(),
            opacity: default_opacity(),
            rotation_deg: 0.0,
            anchor: Anchor::default(),
            scale: default_scale(),
            tile_spacing_px: default_tile_spacing_px(),
            image_path: None,
            image_size_pct: default_image_size_pct(),
        }
    }
}

impl WatermarkSettings {
    /// Validate into an immutable descriptor, loading `image_path` for image
    /// watermarks.
    pub fn to_descriptor(
        &self,
        bounds: AnchorBounds,
    ) -> Result<WatermarkDescriptor, DescriptorError> {
        let color = parse_hex_color(&self.color)?;

        let mut builder = WatermarkDescriptor::builder(self.kind)
            .text(self.text.clone())
            .color(color)
            .font_size_px(self.font_size_px)
            .opacity(self.opacity)
            .rotation_deg(self.rotation_deg)
            .anchor(self.anchor.x_pct, self.anchor.y_pct)
            .anchor_bounds(bounds)
            .scale(self.scale)
            .tile_spacing_px(self.tile_spacing_px)
            .image_size_pct(self.image_size_pct);

        if self.kind == WatermarkKind::Image {
            if let Some(path) = &self.image_path {
                let image = image::open(path).map_err(|e| {
                    DescriptorError::ImageLoad(format!("{}: {}", path.display(), e))
                })?;
                builder = builder.image_source(image.to_rgba8());
            }
        }

        builder.build()
    }
}
