//! Watermark module for drawing text, tiled text and image watermarks.
//!
//! # Features
//!
//! - **Text watermarks** rendered with an embedded font
//! - **Tiled text** covering the whole frame, each tile rotated in place
//! - **Image watermarks** sized relative to the frame width
//! - **Percentage anchors** so the same settings fit any frame size
//!
//! # Configuration Example
//!
//! ```yaml
//! watermark:
//!   anchor_min_pct: -20
//!   anchor_max_pct: 120
//!   defaults:
//!     kind: text
//!     text: "DRAFT"
//!     opacity: 0.4
//!     rotation_deg: -30
//! ```

pub mod compositor;
pub mod descriptor;
pub mod error;
pub mod position;
pub mod settings;
pub mod text_renderer;

// Re-export main types for convenience
pub use compositor::{
    composite, composite_with_backdrop, composite_with_sprite, render_sprite, watermark_image,
};
pub use descriptor::{
    Anchor, AnchorBounds, WatermarkDescriptor, WatermarkDescriptorBuilder, WatermarkKind,
};
pub use error::{CompositorError, DescriptorError};
pub use position::{anchor_point, footprint, tile_centers, Footprint, ScreenPoint};
pub use settings::WatermarkSettings;
pub use text_renderer::{measure_text, parse_hex_color, render_text, TextRenderOptions};
