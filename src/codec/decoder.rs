//! GIF decoding with an ordered chain of backends.
//!
//! The chain is tried in order and the first backend that produces a valid
//! document wins:
//!
//! 1. `native` - the `gif` crate's streaming decoder; keeps offsets,
//!    disposal, delays and the loop count
//! 2. `coalescing` - the `image` crate's animation decoder; yields
//!    full-screen composited frames
//! 3. `still` - a single representative frame via `image`
//!
//! A one-frame document from a later backend is a legitimate degraded result.
//! With [`FrameDecoder::decode_watched`] a backend that stops reporting
//! progress counts as failed and the next one is tried.

use super::error::{BackendError, BackendFailure, DecodeError};
use super::frame::{DisposalMethod, Frame, GifDocument};
use super::watchdog::{run_watched, Heartbeat};
use crate::constants::{DEFAULT_DECODE_MEMORY_LIMIT_BYTES, DEFAULT_MAX_FRAMES};
use bytes::Bytes;
use image::RgbaImage;
use std::io::Cursor;
use std::num::NonZeroU64;
use std::sync::Arc;
use std::time::Duration;

const GIF87A: &[u8] = b"GIF87a";
const GIF89A: &[u8] = b"GIF89a";

/// Returns true when `bytes` starts with a GIF signature.
pub fn has_gif_signature(bytes: &[u8]) -> bool {
    bytes.starts_with(GIF87A) || bytes.starts_with(GIF89A)
}

/// Resource limits applied by decode backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Upper bound on decoder buffer allocations (0 disables the limit).
    pub memory_limit_bytes: u64,
    /// Maximum number of frames accepted from one input.
    pub max_frames: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            memory_limit_bytes: DEFAULT_DECODE_MEMORY_LIMIT_BYTES,
            max_frames: DEFAULT_MAX_FRAMES,
        }
    }
}

/// A single strategy for turning GIF bytes into a [`GifDocument`].
pub trait DecodeBackend: Send + Sync {
    /// Short name used in logs and failure reports.
    fn name(&self) -> &'static str;

    /// Decode `bytes`, calling [`Heartbeat::beat`] as frames come out.
    fn decode(
        &self,
        bytes: &[u8],
        limits: &DecodeLimits,
        heartbeat: &Heartbeat,
    ) -> Result<GifDocument, BackendError>;
}

/// Maps a NETSCAPE2.0 repeat value to a play count.
///
/// An absent extension reads as `Finite(0)` and means the animation plays
/// once.
pub(crate) fn loop_count_from_repeat(repeat: gif::Repeat) -> u16 {
    match repeat {
        gif::Repeat::Infinite => 0,
        gif::Repeat::Finite(n) => n.saturating_add(1),
    }
}

fn delay_from_image(delay: image::Delay) -> u16 {
    let (numer, denom) = delay.numer_denom_ms();
    if denom == 0 {
        return 0;
    }
    let centis = (f64::from(numer) / f64::from(denom) / 10.0).round();
    centis.clamp(0.0, f64::from(u16::MAX)) as u16
}

/// Decoder built on the `gif` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBackend;

impl DecodeBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn decode(
        &self,
        bytes: &[u8],
        limits: &DecodeLimits,
        heartbeat: &Heartbeat,
    ) -> Result<GifDocument, BackendError> {
        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::RGBA);
        if let Some(limit) = NonZeroU64::new(limits.memory_limit_bytes) {
            options.set_memory_limit(gif::MemoryLimit::Bytes(limit));
        }

        let mut decoder = options.read_info(Cursor::new(bytes))?;
        let width = u32::from(decoder.width());
        let height = u32::from(decoder.height());

        let mut frames = Vec::new();
        while let Some(frame) = decoder.read_next_frame()? {
            if frames.len() >= limits.max_frames {
                return Err(BackendError::Unsupported(format!(
                    "more than {} frames",
                    limits.max_frames
                )));
            }

            let pixels = RgbaImage::from_raw(
                u32::from(frame.width),
                u32::from(frame.height),
                frame.buffer.to_vec(),
            )
            .ok_or_else(|| {
                BackendError::Codec(format!(
                    "frame buffer does not match {}x{}",
                    frame.width, frame.height
                ))
            })?;

            frames.push(Frame {
                pixels,
                delay_centiseconds: frame.delay,
                disposal: frame.dispose.into(),
                x_offset: u32::from(frame.left),
                y_offset: u32::from(frame.top),
            });
            heartbeat.beat();
        }

        // The loop extension may follow the first image, so read it last.
        let loop_count = loop_count_from_repeat(decoder.repeat());

        Ok(GifDocument::new(width, height, loop_count, frames)?)
    }
}

/// Decoder built on the `image` crate's animation support.
///
/// Frames come back already composited onto the full screen, so offsets are
/// zero and every frame is marked `RestoreToBackground`. The loop count is
/// not exposed by this decoder; animations are assumed to loop forever.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoalescingBackend;

impl DecodeBackend for CoalescingBackend {
    fn name(&self) -> &'static str {
        "coalescing"
    }

    fn decode(
        &self,
        bytes: &[u8],
        limits: &DecodeLimits,
        heartbeat: &Heartbeat,
    ) -> Result<GifDocument, BackendError> {
        use image::codecs::gif::GifDecoder;
        use image::{AnimationDecoder, ImageDecoder};

        let decoder = GifDecoder::new(Cursor::new(bytes))?;
        let (width, height) = decoder.dimensions();

        let mut frames = Vec::new();
        for frame in decoder.into_frames() {
            let frame = frame?;
            if frames.len() >= limits.max_frames {
                return Err(BackendError::Unsupported(format!(
                    "more than {} frames",
                    limits.max_frames
                )));
            }
            let delay = delay_from_image(frame.delay());
            frames.push(Frame::new(
                frame.into_buffer(),
                delay,
                DisposalMethod::RestoreToBackground,
            ));
            heartbeat.beat();
        }

        let loop_count = if frames.len() > 1 { 0 } else { 1 };
        Ok(GifDocument::new(width, height, loop_count, frames)?)
    }
}

/// Recovers only the first frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct StillFrameBackend;

impl DecodeBackend for StillFrameBackend {
    fn name(&self) -> &'static str {
        "still"
    }

    fn decode(
        &self,
        bytes: &[u8],
        _limits: &DecodeLimits,
        _heartbeat: &Heartbeat,
    ) -> Result<GifDocument, BackendError> {
        let image = image::load_from_memory_with_format(bytes, image::ImageFormat::Gif)?;
        let pixels = image.to_rgba8();
        let (width, height) = pixels.dimensions();
        let frame = Frame::new(pixels, 0, DisposalMethod::None);
        Ok(GifDocument::new(width, height, 1, vec![frame])?)
    }
}

/// Frame decoder that walks a backend chain.
pub struct FrameDecoder {
    backends: Vec<Arc<dyn DecodeBackend>>,
    limits: DecodeLimits,
}

impl FrameDecoder {
    /// Decoder with the default `native -> coalescing -> still` chain.
    pub fn new(limits: DecodeLimits) -> Self {
        Self::with_backends(
            vec![
                Box::new(NativeBackend),
                Box::new(CoalescingBackend),
                Box::new(StillFrameBackend),
            ],
            limits,
        )
    }

    pub fn with_backends(backends: Vec<Box<dyn DecodeBackend>>, limits: DecodeLimits) -> Self {
        Self {
            backends: backends.into_iter().map(Arc::from).collect(),
            limits,
        }
    }

    pub fn backend_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    pub fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    /// Decode `bytes` into a document.
    ///
    /// Inputs without a GIF signature are rejected before any backend runs.
    /// Backends run on the calling thread without a deadline.
    pub fn decode(&self, bytes: &[u8]) -> Result<GifDocument, DecodeError> {
        if !has_gif_signature(bytes) {
            return Err(DecodeError::InvalidFormat);
        }

        let heartbeat = Heartbeat::new();
        self.run_chain(|backend| backend.decode(bytes, &self.limits, &heartbeat))
    }

    /// Decode with a no-progress deadline on every backend attempt.
    ///
    /// A backend that reports no frame for `limit` is abandoned and the
    /// next one is tried. [`DecodeError::Stalled`] is returned only when the
    /// last backend stalls.
    pub fn decode_watched(
        &self,
        bytes: Bytes,
        limit: Duration,
    ) -> Result<GifDocument, DecodeError> {
        if !has_gif_signature(&bytes) {
            return Err(DecodeError::InvalidFormat);
        }

        let limits = self.limits;
        self.run_chain(|backend| {
            let backend = Arc::clone(backend);
            let bytes = bytes.clone();
            run_watched(backend.name(), limit, move |heartbeat| {
                backend.decode(&bytes, &limits, heartbeat)
            })
        })
    }

    fn run_chain<F>(&self, mut attempt: F) -> Result<GifDocument, DecodeError>
    where
        F: FnMut(&Arc<dyn DecodeBackend>) -> Result<GifDocument, BackendError>,
    {
        let mut failures = Vec::with_capacity(self.backends.len());
        let mut stalled = None;
        for backend in &self.backends {
            match attempt(backend) {
                Ok(doc) => {
                    tracing::debug!(
                        backend = backend.name(),
                        frames = doc.frame_count(),
                        width = doc.width(),
                        height = doc.height(),
                        "GIF decoded"
                    );
                    return Ok(doc);
                }
                Err(e) => {
                    tracing::warn!(backend = backend.name(), error = %e, "decode backend failed");
                    failures.push(BackendFailure::new(backend.name(), &e));
                    stalled = match e {
                        BackendError::Stalled(after) => Some(after),
                        _ => None,
                    };
                }
            }
        }

        match stalled {
            Some(after) => Err(DecodeError::Stalled { after, failures }),
            None => Err(DecodeError::AllBackendsFailed(failures)),
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DecodeLimits::default())
    }
}

impl std::fmt::Debug for FrameDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDecoder")
            .field("backends", &self.backend_names())
            .field("limits", &self.limits)
            .finish()
    }
}

/// Quick check whether `bytes` hold a GIF with more than one frame.
pub fn is_animated(bytes: &[u8]) -> bool {
    if !has_gif_signature(bytes) {
        return false;
    }
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::Indexed);
    let Ok(mut decoder) = options.read_info(Cursor::new(bytes)) else {
        return false;
    };

    let mut seen = 0;
    while let Ok(Some(_)) = decoder.next_frame_info() {
        seen += 1;
        if seen > 1 {
            return true;
        }
    }
    false
}
