//! Resolved virtual-machine profile types.
//!
//! A [`VirtualMachine`] is the complete synthetic device identity presented
//! to pages: OS, browser, GPU, screen, audio, canvas, fonts, timezone,
//! language, network, media, permissions, client hints, storage, and
//! battery. Every field set is mutually consistent — the user agent,
//! platform string, client-hint platform, GPU renderer, and font list all
//! describe the same machine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::seeds::{FingerprintHashes, FingerprintSeeds};

/// Operating system identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsProfile {
    /// Human name: "Windows", "macOS", "Linux".
    pub name: String,
    /// Version string, e.g. "10.0" or "14.4.1".
    pub version: String,
    /// `navigator.platform` value: "Win32", "MacIntel", "Linux x86_64".
    pub platform: String,
    /// `navigator.maxTouchPoints`.
    pub touch_points: u32,
}

/// Browser identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserProfile {
    /// Product name, e.g. "Chrome".
    pub name: String,
    /// Full version, e.g. "124.0.6367.91".
    pub version: String,
    /// Complete user-agent string.
    pub user_agent: String,
    /// `navigator.vendor`.
    pub vendor: String,
    /// Feature flags surfaced to pages (e.g. "pdf-viewer").
    pub flags: Vec<String>,
}

/// CPU identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuProfile {
    /// Architecture token: "x86", "arm".
    pub architecture: String,
    /// `navigator.hardwareConcurrency`.
    pub cores: u32,
}

/// One `getShaderPrecisionFormat` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderPrecision {
    /// "VERTEX" or "FRAGMENT".
    pub shader_type: String,
    /// "HIGH_FLOAT", "MEDIUM_FLOAT", "LOW_FLOAT", "HIGH_INT", ...
    pub precision_type: String,
    pub range_min: i32,
    pub range_max: i32,
    pub precision: i32,
}

/// WebGL capability table. Values come from the template unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuCapabilities {
    pub max_texture_size: u32,
    pub max_viewport_dims: [u32; 2],
    pub max_vertex_attribs: u32,
    pub max_vertex_uniform_vectors: u32,
    pub max_fragment_uniform_vectors: u32,
    pub max_varying_vectors: u32,
    pub max_combined_texture_image_units: u32,
    pub max_renderbuffer_size: u32,
    pub aliased_line_width_range: [f32; 2],
    pub aliased_point_size_range: [f32; 2],
    pub shader_precisions: Vec<ShaderPrecision>,
    pub extensions: Vec<String>,
}

/// GPU identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuProfile {
    /// `WebGLRenderingContext.VENDOR`.
    pub vendor: String,
    /// `WebGLRenderingContext.RENDERER`.
    pub renderer: String,
    /// `UNMASKED_VENDOR_WEBGL`.
    pub unmasked_vendor: String,
    /// `UNMASKED_RENDERER_WEBGL` (the ANGLE string on Windows).
    pub unmasked_renderer: String,
    pub capabilities: GpuCapabilities,
}

/// Screen identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenProfile {
    pub width: u32,
    pub height: u32,
    pub avail_width: u32,
    pub avail_height: u32,
    pub color_depth: u32,
    pub pixel_depth: u32,
    pub device_pixel_ratio: f64,
}

/// Audio stack identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioProfile {
    pub sample_rate: u32,
    pub max_channel_count: u32,
    /// The audio fingerprint float, always in [124.0, 124.1].
    pub fingerprint: f64,
}

/// Canvas noise configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasProfile {
    /// Seed driving canvas noise derivation.
    pub seed: u64,
    /// Noise application is resolved at injection time, not here.
    pub apply_noise: bool,
}

/// Timezone identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimezoneProfile {
    /// IANA name, e.g. "America/New_York".
    pub name: String,
    /// Offset from UTC in minutes (as `Date.getTimezoneOffset` reports).
    pub offset_minutes: i32,
}

/// Language identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageProfile {
    /// Primary `navigator.language`.
    pub language: String,
    /// Full `navigator.languages` list.
    pub languages: Vec<String>,
}

/// Network information surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkProfile {
    /// `navigator.connection.effectiveType`.
    pub effective_type: String,
    /// Downlink estimate in Mbps.
    pub downlink: f64,
    /// Round-trip estimate in ms.
    pub rtt: u32,
}

/// Media device counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaProfile {
    pub audio_inputs: u32,
    pub audio_outputs: u32,
    pub video_inputs: u32,
}

/// Client-hints header set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientHints {
    /// `sec-ch-ua`.
    pub sec_ch_ua: String,
    /// `sec-ch-ua-platform`, quoted per spec (e.g. `"Windows"`).
    pub sec_ch_ua_platform: String,
    /// `sec-ch-ua-platform-version`.
    pub sec_ch_ua_platform_version: String,
    /// `sec-ch-ua-full-version`.
    pub sec_ch_ua_full_version: String,
    /// `sec-ch-ua-mobile` ("?0" or "?1").
    pub sec_ch_ua_mobile: String,
    /// `sec-ch-ua-arch`.
    pub sec_ch_ua_arch: String,
}

/// Storage quota surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageProfile {
    pub quota_mb: u64,
}

/// Battery surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryProfile {
    pub charging: bool,
    /// Level in [0.0, 1.0].
    pub level: f64,
}

/// The fully resolved synthetic device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualMachine {
    pub os: OsProfile,
    pub browser: BrowserProfile,
    pub cpu: CpuProfile,
    pub gpu: GpuProfile,
    pub screen: ScreenProfile,
    pub audio: AudioProfile,
    pub canvas: CanvasProfile,
    pub fonts: Vec<String>,
    pub timezone: TimezoneProfile,
    pub language: LanguageProfile,
    pub network: NetworkProfile,
    pub media: MediaProfile,
    /// Permission name → default state ("granted", "denied", "prompt").
    pub permissions: BTreeMap<String, String>,
    pub client_hints: ClientHints,
    pub storage: StorageProfile,
    pub battery: BatteryProfile,
}

/// Seeds, hashes, and the resolved VM for one context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub seeds: FingerprintSeeds,
    pub hashes: FingerprintHashes,
    pub vm: VirtualMachine,
}
