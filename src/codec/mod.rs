//! GIF container codec.
//!
//! Decoding and encoding both go through an ordered list of interchangeable
//! backends so that one misbehaving library never takes the pipeline down.
//!
//! # Example
//!
//! ```ignore
//! use gifstamp::codec::{FrameDecoder, FrameEncoder};
//!
//! let doc = FrameDecoder::default().decode(&bytes)?;
//! let result = FrameEncoder::default().encode(&doc)?;
//! assert!(!result.degraded);
//! ```

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod fallback;
pub mod frame;
pub mod watchdog;

pub use decoder::{
    has_gif_signature, is_animated, CoalescingBackend, DecodeBackend, DecodeLimits, FrameDecoder,
    NativeBackend, StillFrameBackend,
};
pub use encoder::{
    EncodeBackend, EncodeResult, FlattenedEncoder, FrameEncoder, NativeEncoder, STATIC_FALLBACK,
};
pub use error::{BackendError, BackendFailure, DecodeError, DocumentError, EncodeError};
pub use frame::{DisposalMethod, Frame, GifDocument, ShowThrough};
pub use watchdog::Heartbeat;
