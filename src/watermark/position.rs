//! Position calculation for watermark placement.
//!
//! All positions are in logical-screen coordinates (y grows downward) and
//! refer to the *center* of the watermark sprite.
//!
//! # Example
//!
//! ```ignore
//! use gifstamp::watermark::position::anchor_point;
//! use gifstamp::watermark::Anchor;
//!
//! let p = anchor_point(Anchor::new(25.0, 50.0), 200, 100);
//! assert_eq!((p.x, p.y), (50.0, 50.0));
//! ```

use super::descriptor::Anchor;

/// A point on the logical screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounds of a rotated sprite, in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Footprint {
    /// Whether the screen point lies inside (inclusive).
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Absolute anchor point for a screen of the given size.
pub fn anchor_point(anchor: Anchor, screen_width: u32, screen_height: u32) -> ScreenPoint {
    ScreenPoint::new(
        anchor.x_pct / 100.0 * screen_width as f32,
        anchor.y_pct / 100.0 * screen_height as f32,
    )
}

/// Bounds covered by a `width x height` sprite centered on `center` and
/// rotated clockwise by `rotation_deg`.
pub fn footprint(center: ScreenPoint, width: f32, height: f32, rotation_deg: f32) -> Footprint {
    let radians = rotation_deg.to_radians();
    let cos = radians.cos().abs();
    let sin = radians.sin().abs();

    let half_w = (width * cos + height * sin) / 2.0;
    let half_h = (width * sin + height * cos) / 2.0;

    Footprint {
        min_x: center.x - half_w,
        min_y: center.y - half_h,
        max_x: center.x + half_w,
        max_y: center.y + half_h,
    }
}

/// Calculate tile centers for a tiled watermark.
///
/// Tiles start at the top-left corner and step by the sprite size plus
/// `spacing` on both axes. One extra row and column past the screen edge
/// keeps rotated tiles from leaving gaps at the right and bottom.
pub fn tile_centers(
    screen_width: u32,
    screen_height: u32,
    sprite_width: u32,
    sprite_height: u32,
    spacing: u32,
) -> Vec<ScreenPoint> {
    let mut positions = Vec::new();

    let step_x = u64::from(sprite_width) + u64::from(spacing);
    let step_y = u64::from(sprite_height) + u64::from(spacing);
    if step_x == 0 || step_y == 0 {
        return positions;
    }

    let limit_x = u64::from(screen_width) + step_x;
    let limit_y = u64::from(screen_height) + step_y;

    let mut y = 0u64;
    while y < limit_y {
        let mut x = 0u64;
        while x < limit_x {
            positions.push(ScreenPoint::new(
                x as f32 + sprite_width as f32 / 2.0,
                y as f32 + sprite_height as f32 / 2.0,
            ));
            x += step_x;
        }
        y += step_y;
    }

    positions
}

/// Target size for an image watermark.
///
/// Width is `size_pct` of the screen width times `scale`; height keeps the
/// source aspect ratio. Never smaller than 1x1, never clamped to the screen.
pub fn image_target_size(
    source_width: u32,
    source_height: u32,
    size_pct: f32,
    screen_width: u32,
    scale: f32,
) -> (u32, u32) {
    let width = (size_pct / 100.0 * screen_width as f32 * scale).round().max(1.0);
    let aspect = source_height as f32 / source_width.max(1) as f32;
    let height = (width * aspect).round().max(1.0);
    (width as u32, height as u32)
}
