// Compositor property tests
// Determinism, locality of the blend and anchor behaviour across screen sizes

use super::common::*;
use gifstamp::codec::{DisposalMethod, Frame, GifDocument};
use gifstamp::watermark::{
    anchor_point, composite, composite_with_backdrop, footprint, render_sprite,
    WatermarkDescriptor, WatermarkKind,
};
use image::{Rgba, RgbaImage};
use rstest::rstest;

fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 2) as u8, (y * 3) as u8, ((x + y) % 256) as u8, 255])
    })
}

fn frame(width: u32, height: u32) -> Frame {
    Frame::new(gradient(width, height), 7, DisposalMethod::DoNotDispose)
}

fn red_block(anchor: (f32, f32)) -> WatermarkDescriptor {
    WatermarkDescriptor::builder(WatermarkKind::Image)
        .image_source(RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255])))
        .image_size_pct(10.0)
        .opacity(1.0)
        .anchor(anchor.0, anchor.1)
        .build()
        .unwrap()
}

/// Bounding box of pixels that differ between two images.
fn changed_bounds(a: &RgbaImage, b: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in a.enumerate_pixels() {
        if pixel != b.get_pixel(x, y) {
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
    }
    bounds
}

#[test]
fn test_composite_is_deterministic() {
    let input = frame(80, 60);
    let wm = WatermarkDescriptor::builder(WatermarkKind::TiledText)
        .text("SAMPLE")
        .font_size_px(12.0)
        .rotation_deg(-30.0)
        .opacity(0.6)
        .build()
        .unwrap();

    let first = composite(&input, 80, 60, &wm).unwrap();
    let second = composite(&input, 80, 60, &wm).unwrap();
    assert_eq!(first, second);
}

#[rstest]
#[case(0.0)]
#[case(20.0)]
#[case(-30.0)]
#[case(90.0)]
fn test_pixels_outside_footprint_are_untouched(#[case] rotation: f32) {
    let input = frame(120, 90);
    let wm = WatermarkDescriptor::builder(WatermarkKind::Text)
        .text("DRAFT")
        .font_size_px(20.0)
        .rotation_deg(rotation)
        .anchor(40.0, 60.0)
        .opacity(0.8)
        .build()
        .unwrap();

    let sprite = render_sprite(&wm, 120).unwrap();
    let center = anchor_point(wm.anchor(), 120, 90);
    let bounds = footprint(
        center,
        sprite.width() as f32 + 2.0,
        sprite.height() as f32 + 2.0,
        rotation,
    );

    let output = composite(&input, 120, 90, &wm).unwrap();
    let mut touched = 0;
    for (x, y, pixel) in output.pixels.enumerate_pixels() {
        if bounds.contains(x as f32 + 0.5, y as f32 + 0.5) {
            if pixel != input.pixels.get_pixel(x, y) {
                touched += 1;
            }
        } else {
            assert_eq!(pixel, input.pixels.get_pixel(x, y), "pixel ({x}, {y})");
        }
    }
    assert!(touched > 0);
}

#[rstest]
#[case(100)]
#[case(200)]
#[case(333)]
fn test_anchor_is_relative_to_screen_size(#[case] size: u32) {
    let input = frame(size, size);
    let wm = red_block((30.0, 70.0));
    let output = composite(&input, size, size, &wm).unwrap();

    let (x0, y0, x1, y1) = changed_bounds(&input.pixels, &output.pixels).unwrap();
    let cx = (x0 + x1 + 1) as f32 / 2.0 / size as f32;
    let cy = (y0 + y1 + 1) as f32 / 2.0 / size as f32;
    let tolerance = 1.5 / size as f32;

    assert!((cx - 0.30).abs() <= tolerance, "cx = {cx}");
    assert!((cy - 0.70).abs() <= tolerance, "cy = {cy}");

    // Image width tracks the screen width.
    let width = (x1 - x0 + 1) as f32 / size as f32;
    assert!((width - 0.10).abs() <= 2.0 / size as f32, "width = {width}");
}

#[test]
fn test_higher_opacity_moves_further_from_background() {
    let input = Frame::new(
        RgbaImage::from_pixel(64, 64, Rgba([0, 0, 0, 255])),
        5,
        DisposalMethod::None,
    );
    let center = |opacity: f32| {
        let wm = WatermarkDescriptor::builder(WatermarkKind::Image)
            .image_source(RgbaImage::from_pixel(4, 4, Rgba([200, 200, 200, 255])))
            .opacity(opacity)
            .build()
            .unwrap();
        *composite(&input, 64, 64, &wm).unwrap().pixels.get_pixel(32, 32)
    };

    let faint = center(0.25);
    let strong = center(0.75);
    let full = center(1.0);
    assert!(faint[0] < strong[0]);
    assert!(strong[0] < full[0]);
    assert_eq!(full, Rgba([200, 200, 200, 255]));
}

#[test]
fn test_transparent_frame_shows_watermarked_backdrop_unchanged() {
    let mut overlay = RgbaImage::new(40, 40);
    for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
        overlay.put_pixel(x, y, Rgba([0, 255, 0, 255]));
    }
    let doc = GifDocument::new(
        40,
        40,
        0,
        vec![
            Frame::new(gradient(40, 40), 5, DisposalMethod::DoNotDispose),
            Frame::new(overlay, 5, DisposalMethod::DoNotDispose),
        ],
    )
    .unwrap();
    let wm = red_block((50.0, 50.0));
    let sprite = render_sprite(&wm, 40).unwrap();

    let masks = doc.show_through();
    let frames = doc
        .frames()
        .iter()
        .zip(&masks)
        .map(|(frame, mask)| composite_with_backdrop(frame, 40, 40, &wm, &sprite, mask.as_ref()))
        .collect();
    let screens = doc.with_frames(frames).unwrap().coalesce();

    assert_eq!(*screens[0].pixels.get_pixel(20, 20), Rgba([255, 0, 0, 255]));
    for (x, y, pixel) in screens[1].pixels.enumerate_pixels() {
        if x < 2 && y < 2 {
            assert_eq!(*pixel, Rgba([0, 255, 0, 255]));
        } else {
            assert_eq!(pixel, screens[0].pixels.get_pixel(x, y), "pixel ({x}, {y})");
        }
    }
}

#[test]
fn test_transparent_pixels_with_nothing_behind_get_watermark() {
    let doc = GifDocument::new(
        40,
        40,
        0,
        vec![Frame::new(RgbaImage::new(40, 40), 5, DisposalMethod::None)],
    )
    .unwrap();
    assert_eq!(doc.show_through(), vec![None]);

    let wm = red_block((50.0, 50.0));
    let sprite = render_sprite(&wm, 40).unwrap();
    let output = composite_with_backdrop(&doc.frames()[0], 40, 40, &wm, &sprite, None);

    assert_eq!(*output.pixels.get_pixel(20, 20), Rgba([255, 0, 0, 255]));
    assert_eq!(*output.pixels.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
}

#[test]
fn test_frame_metadata_survives_compositing() {
    let input = frame(30, 30).with_offset(5, 6);
    let output = composite(&input, 50, 50, &red_block((50.0, 50.0))).unwrap();

    assert_eq!(output.delay_centiseconds, 7);
    assert_eq!(output.disposal, DisposalMethod::DoNotDispose);
    assert_eq!((output.x_offset, output.y_offset), (5, 6));
    assert_eq!(output.pixels.dimensions(), (30, 30));
    assert!(channel_delta(
        *output.pixels.get_pixel(20, 19),
        *input.pixels.get_pixel(20, 19)
    ) > 0);
}
