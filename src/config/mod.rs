// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod codec;
pub mod pipeline;
pub mod watermark;

pub use codec::{DecoderConfig, EncoderConfig};
pub use pipeline::PipelineConfig;
pub use watermark::WatermarkConfig;

/// Top-level configuration, loaded from YAML.
///
/// Every section is optional; missing values fall back to `crate::constants`.
///
/// ```yaml
/// pipeline:
///   workers: 4
///   watchdog_secs: 30
/// decoder:
///   max_frames: 2000
/// encoder:
///   quantizer_speed: 10
/// watermark:
///   defaults:
///     text: "${WATERMARK_TEXT}"
///     opacity: 0.4
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub watermark: WatermarkConfig,
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        // An empty document means "all defaults"
        if substituted.trim().is_empty() {
            return Ok(Config::default());
        }

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.pipeline.validate()?;
        self.decoder.validate()?;
        self.encoder.validate()?;
        self.watermark.validate()?;
        Ok(())
    }
}
