//! Built-in virtual-machine template database and seed-driven resolution.
//!
//! Templates are complete, internally consistent device descriptions.
//! Resolution never mixes fields across templates; the seeds only pick
//! which template and which of its screen/timezone variants apply, so the
//! resulting [`VirtualMachine`] is consistent by construction.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::error::VmError;

use super::seeds::FingerprintSeeds;
use super::types::{
    AudioProfile, BatteryProfile, BrowserProfile, CanvasProfile, ClientHints, CpuProfile,
    GpuCapabilities, GpuProfile, LanguageProfile, MediaProfile, NetworkProfile, OsProfile,
    ScreenProfile, ShaderPrecision, StorageProfile, TimezoneProfile, VirtualMachine,
};

/// Chrome version carried by every built-in template.
const CHROME_VERSION: &str = "124.0.6367.91";
const CHROME_MAJOR: &str = "124";

/// Filters narrowing template selection.
#[derive(Debug, Clone, Default)]
pub struct VmFilter {
    /// Case-insensitive substring matched against the OS name
    /// ("windows", "macos", "linux").
    pub os: Option<String>,
    /// Case-insensitive substring matched against the GPU renderer string
    /// ("nvidia", "amd", "apple", "intel").
    pub gpu: Option<String>,
}

impl VmFilter {
    /// A filter constraining only the OS.
    pub fn os(os: impl Into<String>) -> Self {
        Self {
            os: Some(os.into()),
            gpu: None,
        }
    }
}

/// One entry in the built-in database.
#[derive(Debug, Clone)]
pub struct VmTemplate {
    pub key: &'static str,
    pub os: OsProfile,
    pub user_agent: String,
    pub arch: &'static str,
    pub platform_version: &'static str,
    pub core_options: Vec<u32>,
    pub gpu: GpuProfile,
    pub screens: Vec<ScreenProfile>,
    pub fonts: Vec<String>,
    pub timezones: Vec<TimezoneProfile>,
    pub languages: Vec<LanguageProfile>,
}

fn screen(width: u32, height: u32, avail_delta: u32, dpr: f64) -> ScreenProfile {
    ScreenProfile {
        width,
        height,
        avail_width: width,
        avail_height: height - avail_delta,
        color_depth: 24,
        pixel_depth: 24,
        device_pixel_ratio: dpr,
    }
}

fn tz(name: &str, offset_minutes: i32) -> TimezoneProfile {
    TimezoneProfile {
        name: name.to_string(),
        offset_minutes,
    }
}

fn lang(primary: &str, rest: &[&str]) -> LanguageProfile {
    let mut languages = vec![primary.to_string()];
    languages.extend(rest.iter().map(|s| (*s).to_string()));
    LanguageProfile {
        language: primary.to_string(),
        languages,
    }
}

fn standard_precisions() -> Vec<ShaderPrecision> {
    let mut out = Vec::new();
    for shader_type in ["VERTEX", "FRAGMENT"] {
        for (precision_type, range_min, range_max, precision) in [
            ("HIGH_FLOAT", 127, 127, 23),
            ("MEDIUM_FLOAT", 127, 127, 23),
            ("LOW_FLOAT", 127, 127, 23),
            ("HIGH_INT", 31, 30, 0),
            ("MEDIUM_INT", 31, 30, 0),
            ("LOW_INT", 31, 30, 0),
        ] {
            out.push(ShaderPrecision {
                shader_type: shader_type.to_string(),
                precision_type: precision_type.to_string(),
                range_min,
                range_max,
                precision,
            });
        }
    }
    out
}

fn chrome_extensions() -> Vec<String> {
    [
        "ANGLE_instanced_arrays",
        "EXT_blend_minmax",
        "EXT_color_buffer_half_float",
        "EXT_float_blend",
        "EXT_texture_compression_bptc",
        "EXT_texture_filter_anisotropic",
        "OES_element_index_uint",
        "OES_standard_derivatives",
        "OES_texture_float",
        "OES_texture_float_linear",
        "OES_texture_half_float",
        "OES_texture_half_float_linear",
        "OES_vertex_array_object",
        "WEBGL_color_buffer_float",
        "WEBGL_compressed_texture_s3tc",
        "WEBGL_compressed_texture_s3tc_srgb",
        "WEBGL_debug_renderer_info",
        "WEBGL_debug_shaders",
        "WEBGL_depth_texture",
        "WEBGL_lose_context",
        "WEBGL_multi_draw",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

fn gpu(
    unmasked_vendor: &str,
    unmasked_renderer: &str,
    max_texture_size: u32,
) -> GpuProfile {
    GpuProfile {
        vendor: "WebKit".to_string(),
        renderer: "WebKit WebGL".to_string(),
        unmasked_vendor: unmasked_vendor.to_string(),
        unmasked_renderer: unmasked_renderer.to_string(),
        capabilities: GpuCapabilities {
            max_texture_size,
            max_viewport_dims: [max_texture_size, max_texture_size],
            max_vertex_attribs: 16,
            max_vertex_uniform_vectors: 4096,
            max_fragment_uniform_vectors: 1024,
            max_varying_vectors: 30,
            max_combined_texture_image_units: 32,
            max_renderbuffer_size: max_texture_size,
            aliased_line_width_range: [1.0, 1.0],
            aliased_point_size_range: [1.0, 1024.0],
            shader_precisions: standard_precisions(),
            extensions: chrome_extensions(),
        },
    }
}

fn fonts(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

fn windows_fonts() -> Vec<String> {
    fonts(&[
        "Arial", "Arial Black", "Bahnschrift", "Calibri", "Cambria", "Candara", "Comic Sans MS",
        "Consolas", "Constantia", "Corbel", "Courier New", "Ebrima", "Franklin Gothic Medium",
        "Georgia", "Impact", "Lucida Console", "Malgun Gothic", "Microsoft Sans Serif",
        "MS Gothic", "Segoe Print", "Segoe Script", "Segoe UI", "Segoe UI Emoji", "SimSun",
        "Tahoma", "Times New Roman", "Trebuchet MS", "Verdana", "Yu Gothic",
    ])
}

fn macos_fonts() -> Vec<String> {
    fonts(&[
        "American Typewriter", "Arial", "Arial Black", "Avenir", "Avenir Next", "Baskerville",
        "Chalkboard", "Cochin", "Copperplate", "Courier New", "Futura", "Geneva", "Georgia",
        "Gill Sans", "Helvetica", "Helvetica Neue", "Hoefler Text", "Lucida Grande", "Menlo",
        "Monaco", "Optima", "Palatino", "San Francisco", "SF Pro", "Times New Roman",
        "Trebuchet MS", "Verdana",
    ])
}

fn linux_fonts() -> Vec<String> {
    fonts(&[
        "Cantarell", "DejaVu Sans", "DejaVu Sans Mono", "DejaVu Serif", "FreeMono", "FreeSans",
        "FreeSerif", "Liberation Mono", "Liberation Sans", "Liberation Serif", "Noto Sans",
        "Noto Serif", "Ubuntu", "Ubuntu Mono",
    ])
}

fn us_timezones() -> Vec<TimezoneProfile> {
    vec![
        tz("America/New_York", 300),
        tz("America/Chicago", 360),
        tz("America/Denver", 420),
        tz("America/Los_Angeles", 480),
    ]
}

fn eu_timezones() -> Vec<TimezoneProfile> {
    vec![
        tz("Europe/London", 0),
        tz("Europe/Berlin", -60),
        tz("Europe/Paris", -60),
        tz("Europe/Warsaw", -60),
    ]
}

static TEMPLATES: LazyLock<Vec<VmTemplate>> = LazyLock::new(|| {
    let mut all = Vec::new();
    let ua_windows = format!(
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/{CHROME_VERSION} Safari/537.36"
    );
    let ua_macos = format!(
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/{CHROME_VERSION} Safari/537.36"
    );
    let ua_linux = format!(
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/{CHROME_VERSION} Safari/537.36"
    );

    all.push(VmTemplate {
        key: "windows-nvidia",
        os: OsProfile {
            name: "Windows".to_string(),
            version: "10.0".to_string(),
            platform: "Win32".to_string(),
            touch_points: 0,
        },
        user_agent: ua_windows.clone(),
        arch: "x86",
        platform_version: "15.0.0",
        core_options: vec![8, 12, 16],
        gpu: gpu(
            "Google Inc. (NVIDIA)",
            "ANGLE (NVIDIA, NVIDIA GeForce RTX 3060 Direct3D11 vs_5_0 ps_5_0, D3D11)",
            16384,
        ),
        screens: vec![
            screen(1920, 1080, 40, 1.0),
            screen(2560, 1440, 40, 1.0),
            screen(1366, 768, 40, 1.0),
        ],
        fonts: windows_fonts(),
        timezones: us_timezones(),
        languages: vec![lang("en-US", &["en"])],
    });

    all.push(VmTemplate {
        key: "windows-amd",
        os: OsProfile {
            name: "Windows".to_string(),
            version: "10.0".to_string(),
            platform: "Win32".to_string(),
            touch_points: 0,
        },
        user_agent: ua_windows,
        arch: "x86",
        platform_version: "10.0.0",
        core_options: vec![6, 8, 12],
        gpu: gpu(
            "Google Inc. (AMD)",
            "ANGLE (AMD, AMD Radeon RX 6700 XT Direct3D11 vs_5_0 ps_5_0, D3D11)",
            16384,
        ),
        screens: vec![screen(1920, 1080, 40, 1.0), screen(3440, 1440, 40, 1.0)],
        fonts: windows_fonts(),
        timezones: eu_timezones(),
        languages: vec![lang("en-GB", &["en-US", "en"]), lang("de-DE", &["de", "en"])],
    });

    all.push(VmTemplate {
        key: "macos-apple-silicon",
        os: OsProfile {
            name: "macOS".to_string(),
            version: "14.4.1".to_string(),
            platform: "MacIntel".to_string(),
            touch_points: 0,
        },
        user_agent: ua_macos.clone(),
        arch: "arm",
        platform_version: "14.4.1",
        core_options: vec![8, 10, 12],
        gpu: gpu(
            "Google Inc. (Apple)",
            "ANGLE (Apple, ANGLE Metal Renderer: Apple M3, Unspecified Version)",
            16384,
        ),
        screens: vec![screen(1512, 982, 32, 2.0), screen(1728, 1117, 32, 2.0)],
        fonts: macos_fonts(),
        timezones: us_timezones(),
        languages: vec![lang("en-US", &["en"])],
    });

    all.push(VmTemplate {
        key: "macos-intel",
        os: OsProfile {
            name: "macOS".to_string(),
            version: "13.6.6".to_string(),
            platform: "MacIntel".to_string(),
            touch_points: 0,
        },
        user_agent: ua_macos,
        arch: "x86",
        platform_version: "13.6.6",
        core_options: vec![4, 8],
        gpu: gpu(
            "Google Inc. (Intel Inc.)",
            "ANGLE (Intel Inc., Intel(R) Iris(TM) Plus Graphics 655, OpenGL 4.1)",
            16384,
        ),
        screens: vec![screen(1440, 900, 32, 2.0), screen(2560, 1600, 32, 2.0)],
        fonts: macos_fonts(),
        timezones: eu_timezones(),
        languages: vec![lang("en-GB", &["en"])],
    });

    all.push(VmTemplate {
        key: "linux-nvidia",
        os: OsProfile {
            name: "Linux".to_string(),
            version: "6.5.0".to_string(),
            platform: "Linux x86_64".to_string(),
            touch_points: 0,
        },
        user_agent: ua_linux.clone(),
        arch: "x86",
        platform_version: "6.5.0",
        core_options: vec![8, 12, 16, 24],
        gpu: gpu(
            "Google Inc. (NVIDIA Corporation)",
            "ANGLE (NVIDIA Corporation, NVIDIA GeForce GTX 1660/PCIe/SSE2, OpenGL 4.5.0)",
            32768,
        ),
        screens: vec![screen(1920, 1080, 28, 1.0), screen(2560, 1440, 28, 1.0)],
        fonts: linux_fonts(),
        timezones: eu_timezones(),
        languages: vec![lang("en-US", &["en"])],
    });

    all.push(VmTemplate {
        key: "linux-intel",
        os: OsProfile {
            name: "Linux".to_string(),
            version: "6.8.0".to_string(),
            platform: "Linux x86_64".to_string(),
            touch_points: 0,
        },
        user_agent: ua_linux,
        arch: "x86",
        platform_version: "6.8.0",
        core_options: vec![4, 8],
        gpu: gpu(
            "Google Inc. (Intel)",
            "ANGLE (Intel, Mesa Intel(R) UHD Graphics 630 (CFL GT2), OpenGL 4.6)",
            16384,
        ),
        screens: vec![screen(1920, 1080, 28, 1.0), screen(1366, 768, 28, 1.0)],
        fonts: linux_fonts(),
        timezones: us_timezones(),
        languages: vec![lang("en-US", &["en"])],
    });

    all
});

/// The full template database.
pub fn templates() -> &'static [VmTemplate] {
    &TEMPLATES
}

/// Pick from a slice using a seed. Slices here are never empty.
fn pick<'a, T>(items: &'a [T], seed: u64) -> &'a T {
    &items[(seed % items.len() as u64) as usize]
}

/// Resolve seeds (plus optional filters) into a [`VirtualMachine`].
///
/// # Errors
///
/// Returns [`VmError::NoMatchingTemplate`] if the filters exclude every
/// template.
pub fn resolve(seeds: &FingerprintSeeds, filter: &VmFilter) -> Result<VirtualMachine, VmError> {
    let candidates: Vec<&VmTemplate> = templates()
        .iter()
        .filter(|t| {
            filter
                .os
                .as_ref()
                .is_none_or(|os| t.os.name.to_lowercase().contains(&os.to_lowercase()))
        })
        .filter(|t| {
            filter.gpu.as_ref().is_none_or(|gpu| {
                t.gpu
                    .unmasked_renderer
                    .to_lowercase()
                    .contains(&gpu.to_lowercase())
            })
        })
        .collect();

    if candidates.is_empty() {
        return Err(VmError::NoMatchingTemplate {
            os: filter.os.clone(),
            gpu: filter.gpu.clone(),
        });
    }

    let template = pick(&candidates, seeds.navigator);
    let screen = pick(&template.screens, seeds.screen).clone();
    let timezone = pick(&template.timezones, seeds.navigator.rotate_right(17)).clone();
    let language = pick(&template.languages, seeds.navigator.rotate_right(31)).clone();
    let cores = *pick(&template.core_options, seeds.navigator.rotate_right(43));

    let client_hints = ClientHints {
        sec_ch_ua: format!(
            "\"Chromium\";v=\"{CHROME_MAJOR}\", \"Google Chrome\";v=\"{CHROME_MAJOR}\", \
             \"Not-A.Brand\";v=\"99\""
        ),
        sec_ch_ua_platform: format!("\"{}\"", template.os.name),
        sec_ch_ua_platform_version: format!("\"{}\"", template.platform_version),
        sec_ch_ua_full_version: format!("\"{CHROME_VERSION}\""),
        sec_ch_ua_mobile: "?0".to_string(),
        sec_ch_ua_arch: format!("\"{}\"", template.arch),
    };

    let mut permissions = BTreeMap::new();
    for name in ["geolocation", "notifications", "camera", "microphone", "midi"] {
        permissions.insert(name.to_string(), "prompt".to_string());
    }

    Ok(VirtualMachine {
        os: template.os.clone(),
        browser: BrowserProfile {
            name: "Chrome".to_string(),
            version: CHROME_VERSION.to_string(),
            user_agent: template.user_agent.clone(),
            vendor: "Google Inc.".to_string(),
            flags: vec!["pdf-viewer".to_string(), "webgl2".to_string()],
        },
        cpu: CpuProfile {
            architecture: template.arch.to_string(),
            cores,
        },
        gpu: template.gpu.clone(),
        screen,
        audio: AudioProfile {
            sample_rate: 48000,
            max_channel_count: 2,
            fingerprint: seeds.audio_fingerprint,
        },
        canvas: CanvasProfile {
            seed: seeds.canvas,
            apply_noise: false,
        },
        fonts: template.fonts.clone(),
        timezone,
        language,
        network: NetworkProfile {
            effective_type: "4g".to_string(),
            downlink: 10.0,
            rtt: 50,
        },
        media: MediaProfile {
            audio_inputs: 1,
            audio_outputs: 1,
            video_inputs: 1,
        },
        permissions,
        client_hints,
        storage: StorageProfile {
            quota_mb: 120_000,
        },
        battery: BatteryProfile {
            charging: seeds.navigator & 1 == 0,
            level: 0.45 + (seeds.navigator % 50) as f64 / 100.0,
        },
    })
}
