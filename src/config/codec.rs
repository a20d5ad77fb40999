//! Decoder and encoder configuration types.

use serde::{Deserialize, Serialize};

use crate::codec::DecodeLimits;
use crate::constants::{
    DEFAULT_DECODE_MEMORY_LIMIT_BYTES, DEFAULT_MAX_FRAMES, DEFAULT_QUANTIZER_SPEED,
};

fn default_memory_limit_bytes() -> u64 {
    DEFAULT_DECODE_MEMORY_LIMIT_BYTES
}

fn default_max_frames() -> usize {
    DEFAULT_MAX_FRAMES
}

fn default_quantizer_speed() -> i32 {
    DEFAULT_QUANTIZER_SPEED
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Decoder allocation limit in bytes (0 disables the limit)
    #[serde(default = "default_memory_limit_bytes")]
    pub memory_limit_bytes: u64,
    /// Inputs with more frames than this are rejected
    #[serde(default = "default_max_frames")]
    pub max_frames: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            memory_limit_bytes: default_memory_limit_bytes(),
            max_frames: default_max_frames(),
        }
    }
}

impl DecoderConfig {
    pub fn limits(&self) -> DecodeLimits {
        DecodeLimits {
            memory_limit_bytes: self.memory_limit_bytes,
            max_frames: self.max_frames,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_frames == 0 {
            return Err("decoder.max_frames must be at least 1".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// NeuQuant speed, 1 (best) to 30 (fastest)
    #[serde(default = "default_quantizer_speed")]
    pub quantizer_speed: i32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            quantizer_speed: default_quantizer_speed(),
        }
    }
}

impl EncoderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=30).contains(&self.quantizer_speed) {
            return Err(format!(
                "encoder.quantizer_speed must be between 1 and 30, got {}",
                self.quantizer_speed
            ));
        }
        Ok(())
    }
}
