//! Text watermark rendering.
//!
//! Renders a single line of text into a transparent RGBA sprite. The sprite
//! is padded so that its geometric center is exactly the center of the text
//! line box, which lets the compositor place it by center.
//!
//! # Features
//!
//! - Hex color parsing (#RGB, #RRGGBB and #RRGGBBAA formats)
//! - Kerning-aware layout
//! - Embedded default font (no external dependencies)
//!
//! # Example
//!
//! ```ignore
//! use gifstamp::watermark::text_renderer::{render_text, TextRenderOptions, parse_hex_color};
//!
//! let options = TextRenderOptions {
//!     text: "DRAFT".to_string(),
//!     font_size: 32.0,
//!     color: parse_hex_color("#FFFFFF").unwrap(),
//! };
//!
//! let sprite = render_text(&options).unwrap();
//! ```

use super::error::{CompositorError, DescriptorError};
use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use std::sync::OnceLock;

/// Default embedded font (DejaVu Sans Bold, see fonts/LICENSE-DejaVu.txt).
static DEFAULT_FONT: OnceLock<FontRef<'static>> = OnceLock::new();

const EMBEDDED_FONT_DATA: &[u8] = include_bytes!("fonts/DejaVuSans-Bold.ttf");

/// Get the default font, initializing it lazily.
fn get_default_font() -> Result<&'static FontRef<'static>, CompositorError> {
    if let Some(font) = DEFAULT_FONT.get() {
        return Ok(font);
    }
    let font = FontRef::try_from_slice(EMBEDDED_FONT_DATA)
        .map_err(|e| CompositorError::Render(format!("embedded font: {}", e)))?;
    Ok(DEFAULT_FONT.get_or_init(|| font))
}

/// Options for text rendering.
#[derive(Debug, Clone)]
pub struct TextRenderOptions {
    /// The text to render.
    pub text: String,
    /// Font size in pixels.
    pub font_size: f32,
    /// Text color; its alpha scales glyph coverage.
    pub color: Rgba<u8>,
}

impl Default for TextRenderOptions {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: 24.0,
            color: Rgba([255, 255, 255, 255]),
        }
    }
}

/// Parse a hex color string into RGBA components.
///
/// Supports #RGB, #RRGGBB and #RRGGBBAA. Colors without an alpha component
/// are fully opaque.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(parse_hex_color("#FFF").unwrap(), Rgba([255, 255, 255, 255]));
/// assert_eq!(parse_hex_color("#FF000080").unwrap(), Rgba([255, 0, 0, 128]));
/// ```
pub fn parse_hex_color(hex: &str) -> Result<Rgba<u8>, DescriptorError> {
    let digits = hex
        .strip_prefix('#')
        .ok_or_else(|| DescriptorError::invalid("color", "must start with '#'"))?;

    if !digits.is_ascii() {
        return Err(DescriptorError::invalid("color", "invalid hex digit"));
    }

    let component = |s: &str| {
        u8::from_str_radix(s, 16).map_err(|_| DescriptorError::invalid("color", "invalid hex digit"))
    };

    match digits.len() {
        3 => {
            // #RGB format - each digit doubled: 0xF -> 0xFF
            let r = component(&digits[0..1])?;
            let g = component(&digits[1..2])?;
            let b = component(&digits[2..3])?;
            Ok(Rgba([r * 17, g * 17, b * 17, 255]))
        }
        6 => Ok(Rgba([
            component(&digits[0..2])?,
            component(&digits[2..4])?,
            component(&digits[4..6])?,
            255,
        ])),
        8 => Ok(Rgba([
            component(&digits[0..2])?,
            component(&digits[2..4])?,
            component(&digits[4..6])?,
            component(&digits[6..8])?,
        ])),
        n => Err(DescriptorError::invalid(
            "color",
            format!("must be #RGB, #RRGGBB or #RRGGBBAA, got {} digits", n),
        )),
    }
}

/// Calculate the layout size of a text run.
///
/// Returns `(advance_width, line_height)` in pixels, unrounded.
pub fn measure_text(text: &str, font_size: f32) -> Result<(f32, f32), CompositorError> {
    let font = get_default_font()?;
    let scaled_font = font.as_scaled(PxScale::from(font_size));

    let mut width = 0.0f32;
    let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

    for c in text.chars() {
        let glyph_id = scaled_font.glyph_id(c);

        if let Some(prev) = prev_glyph {
            width += scaled_font.kern(prev, glyph_id);
        }

        width += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    Ok((width, scaled_font.height()))
}

/// Padding around the line box; glyph ink may overhang the advance box.
fn padding_for(font_size: f32) -> u32 {
    (font_size * 0.15).ceil().max(2.0) as u32
}

/// Render text to an RGBA sprite with a transparent background.
///
/// The center of the returned image is the center of the line box.
pub fn render_text(options: &TextRenderOptions) -> Result<RgbaImage, CompositorError> {
    if options.text.is_empty() {
        return Err(CompositorError::Render("cannot render empty text".to_string()));
    }
    if !options.font_size.is_finite() || options.font_size <= 0.0 {
        return Err(CompositorError::Render(format!(
            "invalid font size {}",
            options.font_size
        )));
    }

    let font = get_default_font()?;
    let scale = PxScale::from(options.font_size);
    let scaled_font = font.as_scaled(scale);

    let (run_width, line_height) = measure_text(&options.text, options.font_size)?;
    let padding = padding_for(options.font_size);
    let canvas_width = run_width.ceil() as u32 + 2 * padding;
    let canvas_height = line_height.ceil() as u32 + 2 * padding;

    let mut image = RgbaImage::new(canvas_width.max(1), canvas_height.max(1));

    // Center the run inside the canvas with sub-pixel precision.
    let origin_x = (canvas_width as f32 - run_width) / 2.0;
    let top = (canvas_height as f32 - line_height) / 2.0;
    let baseline_y = top + scaled_font.ascent();

    let color = options.color;
    let max_alpha = f32::from(color[3]) / 255.0;

    let mut cursor_x = origin_x;
    let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

    for c in options.text.chars() {
        let glyph_id = scaled_font.glyph_id(c);

        if let Some(prev) = prev_glyph {
            cursor_x += scaled_font.kern(prev, glyph_id);
        }

        let glyph = glyph_id.with_scale_and_position(scale, ab_glyph::point(cursor_x, baseline_y));

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();

            outlined.draw(|px, py, coverage| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;

                if x >= 0 && y >= 0 && x < image.width() as i32 && y < image.height() as i32 {
                    let new_alpha = coverage.clamp(0.0, 1.0) * max_alpha;
                    let existing = image.get_pixel(x as u32, y as u32);
                    let old_alpha = f32::from(existing[3]) / 255.0;
                    // Same color everywhere, so only coverage accumulates.
                    let alpha = new_alpha + old_alpha * (1.0 - new_alpha);
                    image.put_pixel(
                        x as u32,
                        y as u32,
                        Rgba([color[0], color[1], color[2], (alpha * 255.0).round() as u8]),
                    );
                }
            });
        }

        cursor_x += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    Ok(image)
}
