//! Watermark configuration types.
//!
//! Anchor bounds plus the default watermark applied when the command line
//! does not override it.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ANCHOR_MAX_PCT, DEFAULT_ANCHOR_MIN_PCT};
use crate::watermark::{AnchorBounds, WatermarkDescriptor, WatermarkSettings};

fn default_anchor_min_pct() -> f32 {
    DEFAULT_ANCHOR_MIN_PCT
}

fn default_anchor_max_pct() -> f32 {
    DEFAULT_ANCHOR_MAX_PCT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkConfig {
    /// Lowest accepted anchor percentage (default: -20)
    #[serde(default = "default_anchor_min_pct")]
    pub anchor_min_pct: f32,
    /// Highest accepted anchor percentage (default: 120)
    #[serde(default = "default_anchor_max_pct")]
    pub anchor_max_pct: f32,
    #[serde(default)]
    pub defaults: WatermarkSettings,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            anchor_min_pct: default_anchor_min_pct(),
            anchor_max_pct: default_anchor_max_pct(),
            defaults: WatermarkSettings::default(),
        }
    }
}

impl WatermarkConfig {
    pub fn anchor_bounds(&self) -> AnchorBounds {
        AnchorBounds {
            min_pct: self.anchor_min_pct,
            max_pct: self.anchor_max_pct,
        }
    }

    /// Build the configured default watermark.
    pub fn descriptor(&self) -> Result<WatermarkDescriptor, String> {
        self.defaults
            .to_descriptor(self.anchor_bounds())
            .map_err(|e| format!("watermark.defaults: {}", e))
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.anchor_min_pct.is_finite() || !self.anchor_max_pct.is_finite() {
            return Err("watermark anchor bounds must be finite".to_string());
        }
        if self.anchor_min_pct > self.anchor_max_pct {
            return Err(format!(
                "watermark.anchor_min_pct ({}) is greater than anchor_max_pct ({})",
                self.anchor_min_pct, self.anchor_max_pct
            ));
        }
        if !self.defaults.color.starts_with('#') {
            return Err(format!(
                "watermark.defaults.color '{}' must be a #hex color",
                self.defaults.color
            ));
        }
        Ok(())
    }
}
