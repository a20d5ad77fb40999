// Constants module - centralized default values for configuration
//
// This module defines all default values used throughout the codebase.
// Using constants instead of magic numbers improves maintainability
// and makes it easier to understand and modify defaults.

// =============================================================================
// Pipeline defaults
// =============================================================================

/// Default number of jobs processed concurrently by the worker pool
pub const DEFAULT_WORKERS: usize = 2;

/// Default watchdog interval in seconds (no progress for this long is fatal)
pub const DEFAULT_WATCHDOG_SECS: u64 = 30;

/// Default number of encoded results kept in the processing cache
pub const DEFAULT_CACHE_CAPACITY: usize = 16;

/// Decimal places kept for floats when fingerprinting a descriptor
pub const FINGERPRINT_FLOAT_PRECISION: i32 = 4;

// =============================================================================
// Decoder defaults
// =============================================================================

/// Default memory limit for the native GIF decoder (256 MB)
pub const DEFAULT_DECODE_MEMORY_LIMIT_BYTES: u64 = 256 * 1024 * 1024;

/// Default maximum number of frames accepted from one GIF
pub const DEFAULT_MAX_FRAMES: usize = 5000;

// =============================================================================
// Encoder defaults
// =============================================================================

/// Default NeuQuant speed (1 = best quality, 30 = fastest)
pub const DEFAULT_QUANTIZER_SPEED: i32 = 10;

/// Largest logical screen dimension a GIF can express
pub const MAX_GIF_DIMENSION: u32 = u16::MAX as u32;

// =============================================================================
// Watermark defaults
// =============================================================================

/// Default lower bound for anchor percentages (allows dragging off-canvas)
pub const DEFAULT_ANCHOR_MIN_PCT: f32 = -20.0;

/// Default upper bound for anchor percentages
pub const DEFAULT_ANCHOR_MAX_PCT: f32 = 120.0;

/// Default font size in pixels
pub const DEFAULT_FONT_SIZE_PX: f32 = 32.0;

/// Default watermark opacity
pub const DEFAULT_OPACITY: f32 = 0.5;

/// Default spacing between tiles in pixels
pub const DEFAULT_TILE_SPACING_PX: u32 = 48;

/// Default image watermark width as a percentage of the frame width
pub const DEFAULT_IMAGE_SIZE_PCT: f32 = 25.0;
