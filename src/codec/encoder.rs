//! GIF encoding with an ordered chain of backends and a static fallback.
//!
//! Provides a trait-based encoder system that allows:
//! - Swapping the backend order (or injecting test backends)
//! - Exact round-tripping of delay, disposal, offsets and loop count
//! - A degraded static result instead of a hard error
//! - A per-backend no-progress deadline via [`FrameEncoder::encode_watched`]

use super::error::{BackendError, BackendFailure, EncodeError};
use super::fallback;
use super::frame::GifDocument;
use super::watchdog::{run_watched, Heartbeat};
use crate::constants::{DEFAULT_QUANTIZER_SPEED, MAX_GIF_DIMENSION};
use bytes::Bytes;
use image::RgbaImage;
use std::sync::Arc;
use std::time::Duration;

/// Name reported for results produced by the static fallback.
pub const STATIC_FALLBACK: &str = "static-fallback";

/// Result of encoding a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeResult {
    pub bytes: Bytes,
    /// True when only a static frame could be produced.
    pub degraded: bool,
    /// Backend that produced `bytes`.
    pub backend: &'static str,
}

/// Trait for GIF encoders
///
/// Implementations must be deterministic for a fixed document.
pub trait EncodeBackend: Send + Sync {
    /// Short name used in logs and failure reports.
    fn name(&self) -> &'static str;

    /// Encode `doc`, calling [`Heartbeat::beat`] after each written frame.
    fn encode(&self, doc: &GifDocument, heartbeat: &Heartbeat) -> Result<Vec<u8>, BackendError>;
}

fn clamp_speed(speed: i32) -> i32 {
    speed.clamp(1, 30)
}

fn to_u16(value: u32, what: &str) -> Result<u16, BackendError> {
    u16::try_from(value)
        .map_err(|_| BackendError::Unsupported(format!("{} {} exceeds GIF limits", what, value)))
}

/// Encoder built on the `gif` crate; preserves every frame attribute.
#[derive(Debug, Clone, Copy)]
pub struct NativeEncoder {
    speed: i32,
}

impl NativeEncoder {
    pub fn new(speed: i32) -> Self {
        Self {
            speed: clamp_speed(speed),
        }
    }
}

impl Default for NativeEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_QUANTIZER_SPEED)
    }
}

impl EncodeBackend for NativeEncoder {
    fn name(&self) -> &'static str {
        "native"
    }

    fn encode(&self, doc: &GifDocument, heartbeat: &Heartbeat) -> Result<Vec<u8>, BackendError> {
        let width = to_u16(doc.width(), "width")?;
        let height = to_u16(doc.height(), "height")?;

        let mut encoder = gif::Encoder::new(Vec::new(), width, height, &[])?;
        match doc.loop_count() {
            0 => encoder.set_repeat(gif::Repeat::Infinite)?,
            1 => {}
            plays => encoder.set_repeat(gif::Repeat::Finite(plays - 1))?,
        }

        for frame in doc.frames() {
            // A zero-sized rectangle still needs a pixel to be a valid image.
            let source = if frame.width() == 0 || frame.height() == 0 {
                RgbaImage::new(1, 1)
            } else {
                frame.pixels.clone()
            };
            let frame_width = to_u16(source.width(), "frame width")?;
            let frame_height = to_u16(source.height(), "frame height")?;

            let mut rgba = source.into_raw();
            let mut gif_frame =
                gif::Frame::from_rgba_speed(frame_width, frame_height, &mut rgba, self.speed);
            gif_frame.delay = frame.delay_centiseconds;
            gif_frame.dispose = frame.disposal.into();
            gif_frame.left = to_u16(frame.x_offset, "x offset")?;
            gif_frame.top = to_u16(frame.y_offset, "y offset")?;

            encoder.write_frame(&gif_frame)?;
            heartbeat.beat();
        }

        Ok(encoder.into_inner()?)
    }
}

/// Encoder built on the `image` crate.
///
/// That encoder sizes the screen from the first frame, drops offsets and
/// marks every frame `RestoreToBackground`, so the document is coalesced to
/// full-screen frames before writing.
#[derive(Debug, Clone, Copy)]
pub struct FlattenedEncoder {
    speed: i32,
}

impl FlattenedEncoder {
    pub fn new(speed: i32) -> Self {
        Self {
            speed: clamp_speed(speed),
        }
    }
}

impl Default for FlattenedEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_QUANTIZER_SPEED)
    }
}

impl EncodeBackend for FlattenedEncoder {
    fn name(&self) -> &'static str {
        "flattened"
    }

    fn encode(&self, doc: &GifDocument, heartbeat: &Heartbeat) -> Result<Vec<u8>, BackendError> {
        use image::codecs::gif::{GifEncoder, Repeat};
        use image::{Delay, Frame as ImageFrame};

        if doc.width() > MAX_GIF_DIMENSION || doc.height() > MAX_GIF_DIMENSION {
            return Err(BackendError::Unsupported(format!(
                "{}x{} exceeds GIF limits",
                doc.width(),
                doc.height()
            )));
        }

        let mut out = Vec::new();
        {
            let mut encoder = GifEncoder::new_with_speed(&mut out, self.speed);
            match doc.loop_count() {
                0 => encoder.set_repeat(Repeat::Infinite)?,
                1 => {}
                plays => encoder.set_repeat(Repeat::Finite(plays - 1))?,
            }

            for frame in doc.coalesce() {
                let delay = Delay::from_numer_denom_ms(u32::from(frame.delay_centiseconds) * 10, 1);
                encoder.encode_frame(ImageFrame::from_parts(frame.pixels, 0, 0, delay))?;
                heartbeat.beat();
            }
        }

        Ok(out)
    }
}

/// Frame encoder that walks a backend chain and degrades to a static GIF.
pub struct FrameEncoder {
    backends: Vec<Arc<dyn EncodeBackend>>,
}

impl FrameEncoder {
    /// Encoder with the default `native -> flattened` chain.
    pub fn new(speed: i32) -> Self {
        Self::with_backends(vec![
            Box::new(NativeEncoder::new(speed)),
            Box::new(FlattenedEncoder::new(speed)),
        ])
    }

    pub fn with_backends(backends: Vec<Box<dyn EncodeBackend>>) -> Self {
        Self {
            backends: backends.into_iter().map(Arc::from).collect(),
        }
    }

    pub fn backend_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Encode `doc`, falling back to a degraded static frame when every
    /// backend fails.
    pub fn encode(&self, doc: &GifDocument) -> Result<EncodeResult, EncodeError> {
        let heartbeat = Heartbeat::new();
        self.run_chain(doc, |backend| backend.encode(doc, &heartbeat))
    }

    /// Encode with a no-progress deadline on every backend attempt.
    ///
    /// A backend that writes no frame for `limit` is abandoned like a failed
    /// one, so a stalled chain still ends in the static fallback.
    /// [`EncodeError::Stalled`] is returned only when the last backend stalled
    /// and the fallback failed too.
    pub fn encode_watched(
        &self,
        doc: Arc<GifDocument>,
        limit: Duration,
    ) -> Result<EncodeResult, EncodeError> {
        self.run_chain(&doc, |backend| {
            let backend = Arc::clone(backend);
            let doc = Arc::clone(&doc);
            run_watched(backend.name(), limit, move |heartbeat| {
                backend.encode(&doc, heartbeat)
            })
        })
    }

    fn run_chain<F>(&self, doc: &GifDocument, mut attempt: F) -> Result<EncodeResult, EncodeError>
    where
        F: FnMut(&Arc<dyn EncodeBackend>) -> Result<Vec<u8>, BackendError>,
    {
        let mut failures = Vec::with_capacity(self.backends.len() + 1);
        let mut stalled = None;

        for backend in &self.backends {
            match attempt(backend) {
                Ok(bytes) => {
                    tracing::debug!(
                        backend = backend.name(),
                        frames = doc.frame_count(),
                        bytes = bytes.len(),
                        "GIF encoded"
                    );
                    return Ok(EncodeResult {
                        bytes: Bytes::from(bytes),
                        degraded: false,
                        backend: backend.name(),
                    });
                }
                Err(e) => {
                    tracing::warn!(backend = backend.name(), error = %e, "encode backend failed");
                    failures.push(BackendFailure::new(backend.name(), &e));
                    stalled = match e {
                        BackendError::Stalled(after) => Some(after),
                        _ => None,
                    };
                }
            }
        }

        match fallback::encode_static(doc) {
            Ok(bytes) => {
                tracing::warn!(
                    frames = doc.frame_count(),
                    failed_backends = failures.len(),
                    "all encode backends failed, downgraded to a static frame"
                );
                Ok(EncodeResult {
                    bytes: Bytes::from(bytes),
                    degraded: true,
                    backend: STATIC_FALLBACK,
                })
            }
            Err(e) => {
                failures.push(BackendFailure::new(STATIC_FALLBACK, &e));
                match stalled {
                    Some(after) => Err(EncodeError::Stalled { after, failures }),
                    None => Err(EncodeError::AllBackendsFailed(failures)),
                }
            }
        }
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_QUANTIZER_SPEED)
    }
}

impl std::fmt::Debug for FrameEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameEncoder")
            .field("backends", &self.backend_names())
            .finish()
    }
}
