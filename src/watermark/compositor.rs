//! Watermark compositor.
//!
//! [`composite`] is a pure function: the same frame and descriptor always
//! produce the same pixels. That is what makes per-frame parallelism and the
//! processing cache safe.
//!
//! # Features
//!
//! - Center-anchored placement with percentage-relative anchors
//! - Clockwise rotation around the sprite center with bilinear sampling
//! - Tiled text with per-tile rotation
//! - Porter-Duff "over" blending with a uniform opacity multiplier
//! - Frames that cover only part of the logical screen
//! - Transparent pixels that reveal an earlier frame are left alone, so the
//!   watermark is not stacked twice where frames overlap
//!
//! # Example
//!
//! ```ignore
//! use gifstamp::watermark::{compositor, WatermarkDescriptor};
//!
//! let wm = WatermarkDescriptor::text("DRAFT")?;
//! let out = compositor::composite(&frame, 100, 100, &wm)?;
//! ```

use super::descriptor::{WatermarkDescriptor, WatermarkKind};
use super::error::CompositorError;
use super::position::{anchor_point, footprint, image_target_size, tile_centers, ScreenPoint};
use super::text_renderer::{render_text, TextRenderOptions};
use crate::codec::{DisposalMethod, Frame, ShowThrough};
use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::{Rgba, RgbaImage};
use std::num::NonZeroU32;

/// Composite `wm` onto `frame`.
///
/// `screen_width`/`screen_height` are the logical screen the frame sits on;
/// anchors are relative to the screen, not to the frame rectangle. The
/// returned frame keeps the input's delay, disposal and offsets.
pub fn composite(
    frame: &Frame,
    screen_width: u32,
    screen_height: u32,
    wm: &WatermarkDescriptor,
) -> Result<Frame, CompositorError> {
    check_payload(wm)?;
    let sprite = render_sprite(wm, screen_width)?;
    Ok(composite_with_sprite(
        frame,
        screen_width,
        screen_height,
        wm,
        &sprite,
    ))
}

/// Composite using a sprite from [`render_sprite`].
///
/// Lets callers render the sprite once per document instead of once per
/// frame.
pub fn composite_with_sprite(
    frame: &Frame,
    screen_width: u32,
    screen_height: u32,
    wm: &WatermarkDescriptor,
    sprite: &RgbaImage,
) -> Frame {
    composite_with_backdrop(frame, screen_width, screen_height, wm, sprite, None)
}

/// Composite a frame that is part of an animation.
///
/// Pixels in `show_through` (see
/// [`GifDocument::show_through`](crate::codec::GifDocument::show_through))
/// stay transparent: an earlier, already watermarked frame is visible there.
pub fn composite_with_backdrop(
    frame: &Frame,
    screen_width: u32,
    screen_height: u32,
    wm: &WatermarkDescriptor,
    sprite: &RgbaImage,
    show_through: Option<&ShowThrough>,
) -> Frame {
    let mut pixels = frame.pixels.clone();
    let target = Target {
        origin: (frame.x_offset, frame.y_offset),
        skip: show_through,
    };
    let rotation = wm.normalized_rotation();

    match wm.kind() {
        WatermarkKind::Text | WatermarkKind::Image => {
            let center = anchor_point(wm.anchor(), screen_width, screen_height);
            draw_sprite(&mut pixels, &target, sprite, center, rotation, wm.opacity());
        }
        WatermarkKind::TiledText => {
            let centers = tile_centers(
                screen_width,
                screen_height,
                sprite.width(),
                sprite.height(),
                wm.tile_spacing_px(),
            );
            for center in centers {
                draw_sprite(&mut pixels, &target, sprite, center, rotation, wm.opacity());
            }
        }
    }

    frame.with_pixels(pixels)
}

/// Watermark a standalone bitmap (the non-animated path).
pub fn watermark_image(
    bitmap: &RgbaImage,
    wm: &WatermarkDescriptor,
) -> Result<RgbaImage, CompositorError> {
    check_payload(wm)?;
    let (width, height) = bitmap.dimensions();
    let sprite = render_sprite(wm, width)?;
    let frame = Frame::new(bitmap.clone(), 0, DisposalMethod::None);
    Ok(composite_with_sprite(&frame, width, height, wm, &sprite).pixels)
}

pub(crate) fn check_payload(wm: &WatermarkDescriptor) -> Result<(), CompositorError> {
    if wm.kind() == WatermarkKind::Image && wm.image_source().is_none() {
        return Err(CompositorError::MissingImage);
    }
    Ok(())
}

/// Render the unrotated watermark sprite for a screen `screen_width` wide.
///
/// Text is rendered at `font_size_px * scale`; images are resized to
/// `image_size_pct` of the screen width times `scale`.
pub fn render_sprite(
    wm: &WatermarkDescriptor,
    screen_width: u32,
) -> Result<RgbaImage, CompositorError> {
    match wm.kind() {
        WatermarkKind::Text | WatermarkKind::TiledText => render_text(&TextRenderOptions {
            text: wm.text_content().to_string(),
            font_size: wm.font_size_px() * wm.scale(),
            color: wm.color(),
        }),
        WatermarkKind::Image => {
            let source = wm.image_source().ok_or(CompositorError::MissingImage)?;
            let (width, height) = image_target_size(
                source.width(),
                source.height(),
                wm.image_size_pct(),
                screen_width,
                wm.scale(),
            );
            resize_sprite(source, width, height)
        }
    }
}

/// Resize with fast-image-resize using the Lanczos3 filter
fn resize_sprite(
    source: &RgbaImage,
    target_w: u32,
    target_h: u32,
) -> Result<RgbaImage, CompositorError> {
    if source.dimensions() == (target_w, target_h) {
        return Ok(source.clone());
    }

    let src_width = NonZeroU32::new(source.width())
        .ok_or_else(|| CompositorError::Resize("source width is 0".to_string()))?;
    let src_height = NonZeroU32::new(source.height())
        .ok_or_else(|| CompositorError::Resize("source height is 0".to_string()))?;
    let dst_width = NonZeroU32::new(target_w)
        .ok_or_else(|| CompositorError::Resize("target width is 0".to_string()))?;
    let dst_height = NonZeroU32::new(target_h)
        .ok_or_else(|| CompositorError::Resize("target height is 0".to_string()))?;

    let src_image = Image::from_vec_u8(
        src_width,
        src_height,
        source.as_raw().clone(),
        PixelType::U8x4,
    )
    .map_err(|e| CompositorError::Resize(format!("failed to create source image: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);
    let mut resizer = Resizer::new(ResizeAlg::Convolution(FilterType::Lanczos3));

    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| CompositorError::Resize(format!("resize operation failed: {:?}", e)))?;

    RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| CompositorError::Resize("failed to create output buffer".to_string()))
}

/// Where a frame sits on the screen and which of its pixels to leave alone.
struct Target<'a> {
    origin: (u32, u32),
    skip: Option<&'a ShowThrough>,
}

/// Draw `sprite` centered on the screen point `center`, rotated clockwise.
///
/// Only pixels inside the rotated footprint are visited, and pixels that
/// sample fully transparent watermark texels are left untouched.
fn draw_sprite(
    pixels: &mut RgbaImage,
    target: &Target<'_>,
    sprite: &RgbaImage,
    center: ScreenPoint,
    rotation_deg: f32,
    opacity: f32,
) {
    let sprite_w = sprite.width() as f32;
    let sprite_h = sprite.height() as f32;
    if sprite.width() == 0 || sprite.height() == 0 || opacity <= 0.0 {
        return;
    }

    let radians = rotation_deg.to_radians();
    let (sin, cos) = radians.sin_cos();

    let bounds = footprint(center, sprite_w, sprite_h, rotation_deg);
    let origin_x = target.origin.0 as f32;
    let origin_y = target.origin.1 as f32;

    // Frame-local pixel range, clipped to the frame rectangle.
    let x_start = (bounds.min_x - origin_x).floor().max(0.0) as u32;
    let y_start = (bounds.min_y - origin_y).floor().max(0.0) as u32;
    let x_end = ((bounds.max_x - origin_x).ceil().max(0.0) as u32).min(pixels.width());
    let y_end = ((bounds.max_y - origin_y).ceil().max(0.0) as u32).min(pixels.height());

    for y in y_start..y_end {
        for x in x_start..x_end {
            if target.skip.is_some_and(|skip| skip.contains(x, y)) {
                continue;
            }

            // Pixel center relative to the sprite center, then inverse rotation.
            let dx = x as f32 + origin_x + 0.5 - center.x;
            let dy = y as f32 + origin_y + 0.5 - center.y;
            let u = dx * cos + dy * sin + sprite_w / 2.0;
            let v = -dx * sin + dy * cos + sprite_h / 2.0;

            let sample = sample_bilinear(sprite, u - 0.5, v - 0.5);
            if sample[3] == 0 {
                continue;
            }

            let background = *pixels.get_pixel(x, y);
            pixels.put_pixel(x, y, blend_pixels(background, sample, opacity));
        }
    }
}

/// Bilinear sample with premultiplied interpolation; texels outside the
/// sprite count as fully transparent.
fn sample_bilinear(image: &RgbaImage, x: f32, y: f32) -> Rgba<u8> {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let taps = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x0 + 1, y0, fx * (1.0 - fy)),
        (x0, y0 + 1, (1.0 - fx) * fy),
        (x0 + 1, y0 + 1, fx * fy),
    ];

    let mut acc = [0.0f32; 4];
    for (tx, ty, weight) in taps {
        if weight <= 0.0
            || tx < 0
            || ty < 0
            || tx >= i64::from(image.width())
            || ty >= i64::from(image.height())
        {
            continue;
        }
        let p = image.get_pixel(tx as u32, ty as u32);
        let a = f32::from(p[3]) * weight;
        acc[0] += f32::from(p[0]) * a;
        acc[1] += f32::from(p[1]) * a;
        acc[2] += f32::from(p[2]) * a;
        acc[3] += a;
    }

    let alpha = acc[3].round().clamp(0.0, 255.0);
    if alpha <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |c: f32| (c / acc[3]).round().clamp(0.0, 255.0) as u8;
    Rgba([
        channel(acc[0]),
        channel(acc[1]),
        channel(acc[2]),
        alpha as u8,
    ])
}

/// Blend two pixels using alpha compositing with additional opacity.
///
/// Uses the "over" operator: result = foreground + background * (1 - foreground.alpha)
fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let fg_alpha = (f32::from(foreground[3]) / 255.0) * opacity.clamp(0.0, 1.0);
    if fg_alpha <= 0.0 {
        return background;
    }
    let bg_alpha = f32::from(background[3]) / 255.0;

    // Porter-Duff "over" operator
    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = f32::from(fg) / 255.0;
        let bg_f = f32::from(bg) / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}
