//! Minimal static GIF writer used when every encode backend has failed.
//!
//! The output is a single GIF89a image using a fixed 6x7x6 color cube and an
//! uncompressed LZW stream (a clear code is emitted often enough that the
//! code width never grows past 9 bits). It depends on nothing but the pixel
//! buffer, which makes it the last line of defence.

use super::error::BackendError;
use super::frame::GifDocument;
use crate::constants::MAX_GIF_DIMENSION;
use image::RgbaImage;

const RED_LEVELS: u32 = 6;
const GREEN_LEVELS: u32 = 7;
const BLUE_LEVELS: u32 = 6;
const TRANSPARENT_INDEX: u8 = 255;

const MIN_CODE_SIZE: u8 = 8;
const CLEAR_CODE: u16 = 1 << MIN_CODE_SIZE;
const END_CODE: u16 = CLEAR_CODE + 1;
const CODE_WIDTH: u32 = 9;
/// Literals written between clear codes; keeps the decoder table below 512.
const LITERALS_PER_CLEAR: usize = 250;

/// Encode `doc.frames[0]`, flattened onto the logical screen, as a static GIF.
pub fn encode_static(doc: &GifDocument) -> Result<Vec<u8>, BackendError> {
    let screen = doc.first_frame_on_screen();
    encode_image(&screen)
}

/// Encode one RGBA image as a static GIF.
pub fn encode_image(image: &RgbaImage) -> Result<Vec<u8>, BackendError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || width > MAX_GIF_DIMENSION || height > MAX_GIF_DIMENSION {
        return Err(BackendError::Unsupported(format!(
            "{}x{} cannot be expressed as a GIF screen",
            width, height
        )));
    }
    // Checked above.
    let (w, h) = (width as u16, height as u16);

    let mut out = Vec::with_capacity(800 + image.len() / 4 * 10 / 8);
    out.extend_from_slice(b"GIF89a");

    // Logical screen descriptor: global table of 256 entries.
    out.extend_from_slice(&w.to_le_bytes());
    out.extend_from_slice(&h.to_le_bytes());
    out.push(0xF7);
    out.push(0);
    out.push(0);
    out.extend_from_slice(&palette());

    // Graphic control extension marking the transparent index.
    out.extend_from_slice(&[0x21, 0xF9, 0x04, 0x01, 0x00, 0x00, TRANSPARENT_INDEX, 0x00]);

    // Image descriptor at the origin, no local table, not interlaced.
    out.push(0x2C);
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&w.to_le_bytes());
    out.extend_from_slice(&h.to_le_bytes());
    out.push(0);

    out.push(MIN_CODE_SIZE);
    let indices = image.pixels().map(|p| palette_index(p.0));
    write_sub_blocks(&mut out, &lzw_literals(indices));
    out.push(0x3B);

    Ok(out)
}

fn palette() -> [u8; 256 * 3] {
    let mut table = [0u8; 256 * 3];
    let mut index = 0;
    for r in 0..RED_LEVELS {
        for g in 0..GREEN_LEVELS {
            for b in 0..BLUE_LEVELS {
                table[index * 3] = level_value(r, RED_LEVELS);
                table[index * 3 + 1] = level_value(g, GREEN_LEVELS);
                table[index * 3 + 2] = level_value(b, BLUE_LEVELS);
                index += 1;
            }
        }
    }
    table
}

fn level_value(level: u32, levels: u32) -> u8 {
    (level * 255 / (levels - 1)) as u8
}

fn level_of(value: u8, levels: u32) -> u32 {
    (u32::from(value) * (levels - 1) + 127) / 255
}

fn palette_index(rgba: [u8; 4]) -> u8 {
    if rgba[3] == 0 {
        return TRANSPARENT_INDEX;
    }
    let r = level_of(rgba[0], RED_LEVELS);
    let g = level_of(rgba[1], GREEN_LEVELS);
    let b = level_of(rgba[2], BLUE_LEVELS);
    (r * GREEN_LEVELS * BLUE_LEVELS + g * BLUE_LEVELS + b) as u8
}

/// LZW stream where every pixel is its own code.
fn lzw_literals(indices: impl Iterator<Item = u8>) -> Vec<u8> {
    let mut bits = BitWriter::default();
    bits.write(CLEAR_CODE);
    for (i, index) in indices.enumerate() {
        if i > 0 && i % LITERALS_PER_CLEAR == 0 {
            bits.write(CLEAR_CODE);
        }
        bits.write(u16::from(index));
    }
    bits.write(END_CODE);
    bits.finish()
}

#[derive(Default)]
struct BitWriter {
    bytes: Vec<u8>,
    acc: u32,
    nbits: u32,
}

impl BitWriter {
    fn write(&mut self, code: u16) {
        self.acc |= u32::from(code) << self.nbits;
        self.nbits += CODE_WIDTH;
        while self.nbits >= 8 {
            self.bytes.push((self.acc & 0xFF) as u8);
            self.acc >>= 8;
            self.nbits -= 8;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.nbits > 0 {
            self.bytes.push((self.acc & 0xFF) as u8);
        }
        self.bytes
    }
}

fn write_sub_blocks(out: &mut Vec<u8>, data: &[u8]) {
    for chunk in data.chunks(255) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    out.push(0);
}
