//! Cache fingerprints.
//!
//! A fingerprint is SHA-256 over the source content hash and a canonical JSON
//! rendering of the watermark descriptor. Floats are rounded to a fixed
//! precision so that float noise from UI sliders does not cause misses.

use crate::constants::FINGERPRINT_FLOAT_PRECISION;
use crate::watermark::WatermarkDescriptor;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fmt;

/// Deterministic cache key for one (source, descriptor) pair.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint of `source` watermarked with `wm`.
    pub fn compute(source: &[u8], wm: &WatermarkDescriptor) -> Self {
        Self::from_content_hash(&content_hash(source), wm)
    }

    /// Fingerprint from a precomputed source hash (see [`content_hash`]).
    pub fn from_content_hash(source_hash: &[u8; 32], wm: &WatermarkDescriptor) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source_hash);
        hasher.update(canonical_descriptor(wm).as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 8 bytes are plenty to tell entries apart in logs.
        write!(f, "Fingerprint({}..)", hex::encode(&self.0[..8]))
    }
}

/// SHA-256 of the raw source bytes.
pub fn content_hash(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

fn round(value: f32) -> f64 {
    let factor = 10f64.powi(FINGERPRINT_FLOAT_PRECISION);
    // Adding 0.0 turns -0.0 into 0.0 so both serialize the same.
    (f64::from(value) * factor).round() / factor + 0.0
}

/// Canonical JSON for a descriptor.
///
/// Keys are emitted in sorted order by `serde_json::Map`. Rotation is folded
/// into `[0, 360)` first since equivalent angles draw identical pixels.
pub fn canonical_descriptor(wm: &WatermarkDescriptor) -> String {
    let image = wm.image_source().map(|img| {
        json!({
            "width": img.width(),
            "height": img.height(),
            "sha256": hex::encode(content_hash(img.as_raw())),
        })
    });
    let color = wm.color().0;

    json!({
        "kind": wm.kind().to_string(),
        "text": wm.text_content(),
        "color": [color[0], color[1], color[2], color[3]],
        "font_size_px": round(wm.font_size_px()),
        "opacity": round(wm.opacity()),
        "rotation_deg": round(wm.normalized_rotation()),
        "anchor": [round(wm.anchor().x_pct), round(wm.anchor().y_pct)],
        "scale": round(wm.scale()),
        "tile_spacing_px": wm.tile_spacing_px(),
        "image": image,
        "image_size_pct": round(wm.image_size_pct()),
    })
    .to_string()
}
