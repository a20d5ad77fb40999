//! Frame and document model shared by every pipeline stage.

use super::error::DocumentError;
use image::{Rgba, RgbaImage};

/// How a frame's region is treated before the next frame is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DisposalMethod {
    /// No disposal specified; renderers treat it like `DoNotDispose`.
    #[default]
    None,
    /// Leave the frame in place.
    DoNotDispose,
    /// Clear the frame's rectangle to the background (transparent).
    RestoreToBackground,
    /// Restore the rectangle to what it was before the frame was drawn.
    RestoreToPrevious,
}

impl From<gif::DisposalMethod> for DisposalMethod {
    fn from(method: gif::DisposalMethod) -> Self {
        match method {
            gif::DisposalMethod::Any => DisposalMethod::None,
            gif::DisposalMethod::Keep => DisposalMethod::DoNotDispose,
            gif::DisposalMethod::Background => DisposalMethod::RestoreToBackground,
            gif::DisposalMethod::Previous => DisposalMethod::RestoreToPrevious,
        }
    }
}

impl From<DisposalMethod> for gif::DisposalMethod {
    fn from(method: DisposalMethod) -> Self {
        match method {
            DisposalMethod::None => gif::DisposalMethod::Any,
            DisposalMethod::DoNotDispose => gif::DisposalMethod::Keep,
            DisposalMethod::RestoreToBackground => gif::DisposalMethod::Background,
            DisposalMethod::RestoreToPrevious => gif::DisposalMethod::Previous,
        }
    }
}

/// One frame of an animation: RGBA pixels plus timing and placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub pixels: RgbaImage,
    pub delay_centiseconds: u16,
    pub disposal: DisposalMethod,
    pub x_offset: u32,
    pub y_offset: u32,
}

impl Frame {
    /// Full-screen frame at the origin.
    pub fn new(pixels: RgbaImage, delay_centiseconds: u16, disposal: DisposalMethod) -> Self {
        Self {
            pixels,
            delay_centiseconds,
            disposal,
            x_offset: 0,
            y_offset: 0,
        }
    }

    pub fn with_offset(mut self, x_offset: u32, y_offset: u32) -> Self {
        self.x_offset = x_offset;
        self.y_offset = y_offset;
        self
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Same timing and placement, new pixels.
    pub fn with_pixels(&self, pixels: RgbaImage) -> Self {
        Self {
            pixels,
            delay_centiseconds: self.delay_centiseconds,
            disposal: self.disposal,
            x_offset: self.x_offset,
            y_offset: self.y_offset,
        }
    }
}

/// A decoded animation: logical screen, loop count and ordered frames.
///
/// `loop_count` counts plays: 0 loops forever, 1 plays once, N plays N times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GifDocument {
    width: u32,
    height: u32,
    loop_count: u16,
    frames: Vec<Frame>,
}

impl GifDocument {
    pub fn new(
        width: u32,
        height: u32,
        loop_count: u16,
        frames: Vec<Frame>,
    ) -> Result<Self, DocumentError> {
        if width == 0 || height == 0 {
            return Err(DocumentError::EmptyScreen { width, height });
        }
        if frames.is_empty() {
            return Err(DocumentError::NoFrames);
        }
        Ok(Self {
            width,
            height,
            loop_count,
            frames,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn loop_count(&self) -> u16 {
        self.loop_count
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }

    /// Build a new document on the same screen from processed frames.
    pub fn with_frames(&self, frames: Vec<Frame>) -> Result<Self, DocumentError> {
        Self::new(self.width, self.height, self.loop_count, frames)
    }

    /// Render disposal semantics into full-screen frames.
    ///
    /// Every returned frame covers the logical screen at offset 0 and uses
    /// `RestoreToBackground`, so a renderer shows exactly the same picture
    /// regardless of how the original frames were disposed.
    pub fn coalesce(&self) -> Vec<Frame> {
        let mut canvas = ScreenCanvas::new(self.width, self.height);
        self.frames
            .iter()
            .map(|frame| {
                let snapshot = canvas.draw(frame);
                Frame::new(
                    snapshot,
                    frame.delay_centiseconds,
                    DisposalMethod::RestoreToBackground,
                )
            })
            .collect()
    }

    /// Per frame, the transparent pixels through which an earlier frame is
    /// still visible, in frame-local coordinates.
    ///
    /// `None` means nothing shows through that frame.
    pub fn show_through(&self) -> Vec<Option<ShowThrough>> {
        let mut canvas = ScreenCanvas::new(self.width, self.height);
        self.frames
            .iter()
            .map(|frame| {
                let mask = canvas.show_through(frame);
                canvas.advance(frame);
                mask
            })
            .collect()
    }

    /// First frame drawn onto an otherwise transparent screen.
    pub fn first_frame_on_screen(&self) -> RgbaImage {
        let mut canvas = ScreenCanvas::new(self.width, self.height);
        // frames is never empty
        match self.frames.first() {
            Some(frame) => canvas.draw(frame),
            None => canvas.pixels,
        }
    }
}

/// Transparent pixels of one frame that reveal an earlier frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowThrough {
    width: u32,
    height: u32,
    mask: Vec<bool>,
}

impl ShowThrough {
    /// True when the frame-local pixel at `(x, y)` shows an earlier frame.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.mask[(y * self.width + x) as usize]
    }

    pub fn count(&self) -> usize {
        self.mask.iter().filter(|&&shown| shown).count()
    }
}

/// Logical screen state used while coalescing.
struct ScreenCanvas {
    pixels: RgbaImage,
}

impl ScreenCanvas {
    fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
        }
    }

    /// Draw `frame`, return the visible picture, then apply its disposal.
    fn draw(&mut self, frame: &Frame) -> RgbaImage {
        let saved = self.paint(frame);
        let snapshot = self.pixels.clone();
        self.dispose(frame, saved);
        snapshot
    }

    /// Like [`draw`](Self::draw) without keeping the picture.
    fn advance(&mut self, frame: &Frame) {
        let saved = self.paint(frame);
        self.dispose(frame, saved);
    }

    fn show_through(&self, frame: &Frame) -> Option<ShowThrough> {
        let (width, height) = frame.pixels.dimensions();
        let mut mask = vec![false; width as usize * height as usize];
        let mut any = false;

        for (x, y, pixel) in frame.pixels.enumerate_pixels() {
            if pixel[3] != 0 {
                continue;
            }
            let sx = x + frame.x_offset;
            let sy = y + frame.y_offset;
            let painted = sx < self.pixels.width()
                && sy < self.pixels.height()
                && self.pixels.get_pixel(sx, sy)[3] > 0;
            if painted {
                mask[(y * width + x) as usize] = true;
                any = true;
            }
        }

        any.then_some(ShowThrough {
            width,
            height,
            mask,
        })
    }

    /// Paint the opaque pixels of `frame`, returning the screen as it was
    /// when the frame asks to be restored afterwards.
    fn paint(&mut self, frame: &Frame) -> Option<RgbaImage> {
        let saved = match frame.disposal {
            DisposalMethod::RestoreToPrevious => Some(self.pixels.clone()),
            _ => None,
        };

        for (x, y, pixel) in frame.pixels.enumerate_pixels() {
            // Fully transparent pixels let the screen show through.
            if pixel[3] == 0 {
                continue;
            }
            let sx = x + frame.x_offset;
            let sy = y + frame.y_offset;
            if sx < self.pixels.width() && sy < self.pixels.height() {
                self.pixels.put_pixel(sx, sy, *pixel);
            }
        }

        saved
    }

    fn dispose(&mut self, frame: &Frame, saved: Option<RgbaImage>) {
        match frame.disposal {
            DisposalMethod::RestoreToBackground => self.clear_rect(frame),
            DisposalMethod::RestoreToPrevious => {
                if let Some(saved) = saved {
                    self.pixels = saved;
                }
            }
            DisposalMethod::None | DisposalMethod::DoNotDispose => {}
        }
    }

    fn clear_rect(&mut self, frame: &Frame) {
        let x_end = (frame.x_offset + frame.width()).min(self.pixels.width());
        let y_end = (frame.y_offset + frame.height()).min(self.pixels.height());
        for y in frame.y_offset..y_end {
            for x in frame.x_offset..x_end {
                self.pixels.put_pixel(x, y, Rgba([0, 0, 0, 0]));
            }
        }
    }
}
