//! Fingerprint seeds and derived hashes.

use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::VmError;

/// Inclusive lower bound of the audio fingerprint float.
pub const AUDIO_FINGERPRINT_MIN: f64 = 124.0;
/// Inclusive upper bound of the audio fingerprint float.
pub const AUDIO_FINGERPRINT_MAX: f64 = 124.1;

/// The seven 64-bit seeds plus the audio fingerprint float.
///
/// Seeds are stable for the lifetime of a context. Within one process run
/// they are derived from a per-run session key and the context id, so
/// repeated lookups reproduce them without storage; across runs they are
/// unpredictable unless restored from a persisted profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FingerprintSeeds {
    pub canvas: u64,
    pub webgl: u64,
    pub audio: u64,
    pub fonts: u64,
    pub client_rects: u64,
    pub navigator: u64,
    pub screen: u64,
    /// Always within [124.0, 124.1].
    pub audio_fingerprint: f64,
}

impl FingerprintSeeds {
    /// Generate seeds from a random source.
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        Self {
            canvas: rng.r#gen(),
            webgl: rng.r#gen(),
            audio: rng.r#gen(),
            fonts: rng.r#gen(),
            client_rects: rng.r#gen(),
            navigator: rng.r#gen(),
            screen: rng.r#gen(),
            audio_fingerprint: AUDIO_FINGERPRINT_MIN
                + rng.gen_range(0.0..=1.0) * (AUDIO_FINGERPRINT_MAX - AUDIO_FINGERPRINT_MIN),
        }
    }

    /// Derive seeds deterministically from a per-run session key and a
    /// context id. The same (key, id) pair always yields the same seeds.
    pub fn derive(session_key: u64, context_id: &str) -> Self {
        let block = |label: u8| -> [u8; 32] {
            let mut hasher = Sha256::new();
            hasher.update(session_key.to_le_bytes());
            hasher.update(context_id.as_bytes());
            hasher.update([label]);
            hasher.finalize().into()
        };
        let a = block(0);
        let b = block(1);
        let word = |bytes: &[u8; 32], i: usize| -> u64 {
            u64::from_le_bytes(bytes[i * 8..i * 8 + 8].try_into().unwrap_or([0; 8]))
        };
        let audio_raw = word(&b, 3);
        Self {
            canvas: word(&a, 0),
            webgl: word(&a, 1),
            audio: word(&a, 2),
            fonts: word(&a, 3),
            client_rects: word(&b, 0),
            navigator: word(&b, 1),
            screen: word(&b, 2),
            audio_fingerprint: AUDIO_FINGERPRINT_MIN
                + (audio_raw as f64 / u64::MAX as f64)
                    * (AUDIO_FINGERPRINT_MAX - AUDIO_FINGERPRINT_MIN),
        }
    }

    /// Validate ranges after loading persisted seeds.
    ///
    /// # Errors
    ///
    /// Returns [`VmError::InvalidSeeds`] if the audio fingerprint is out of
    /// its band.
    pub fn validate(&self) -> Result<(), VmError> {
        if !(AUDIO_FINGERPRINT_MIN..=AUDIO_FINGERPRINT_MAX).contains(&self.audio_fingerprint) {
            return Err(VmError::InvalidSeeds(format!(
                "audio fingerprint {} outside [{AUDIO_FINGERPRINT_MIN}, {AUDIO_FINGERPRINT_MAX}]",
                self.audio_fingerprint
            )));
        }
        Ok(())
    }
}

/// The nine 32-character lowercase-hex fingerprint hashes.
///
/// Derived deterministically from the seeds, so a persisted profile
/// round-trips to identical hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintHashes {
    pub canvas_geometry: String,
    pub canvas_text: String,
    pub webgl_params: String,
    pub webgl_extensions: String,
    pub webgl_context: String,
    pub webgl_ext_params: String,
    pub shader_precisions: String,
    pub fonts: String,
    pub plugins: String,
}

impl FingerprintHashes {
    /// Derive all nine hashes from the seeds.
    pub fn derive(seeds: &FingerprintSeeds) -> Self {
        Self {
            canvas_geometry: hash32("canvas-geometry", seeds.canvas),
            canvas_text: hash32("canvas-text", seeds.canvas.rotate_left(13)),
            webgl_params: hash32("webgl-params", seeds.webgl),
            webgl_extensions: hash32("webgl-extensions", seeds.webgl.rotate_left(7)),
            webgl_context: hash32("webgl-context", seeds.webgl.rotate_left(29)),
            webgl_ext_params: hash32("webgl-ext-params", seeds.webgl.rotate_left(43)),
            shader_precisions: hash32("shader-precisions", seeds.webgl ^ seeds.navigator),
            fonts: hash32("fonts", seeds.fonts),
            plugins: hash32("plugins", seeds.navigator),
        }
    }

    /// All nine hashes, for iteration in checks and tests.
    pub fn all(&self) -> [&str; 9] {
        [
            &self.canvas_geometry,
            &self.canvas_text,
            &self.webgl_params,
            &self.webgl_extensions,
            &self.webgl_context,
            &self.webgl_ext_params,
            &self.shader_precisions,
            &self.fonts,
            &self.plugins,
        ]
    }
}

/// A 32-character lowercase-hex digest with MD5-shaped entropy.
fn hash32(label: &str, seed: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(label.as_bytes());
    hasher.update(seed.to_le_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}
