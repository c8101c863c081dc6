//! Injection payload generation.
//!
//! Builds the JavaScript evaluated in every page, iframe, and worker
//! context before any page script runs. The payload embeds the resolved
//! VM as data and patches the environment to reflect it; identical
//! fingerprints produce byte-identical payloads, so injected observables
//! are deterministic.

use serde_json::json;

use super::types::Fingerprint;

/// Shared guard symbol; the payload refuses to run twice in one realm.
pub const GUARD_SYMBOL: &str = "__owl_vm_applied__";

/// Build the injection payload for a fingerprint.
///
/// The observable contract: after evaluation, `navigator.*`, `screen.*`,
/// `window.outer*`, `Intl.DateTimeFormat`, `Date` timezone methods,
/// `AudioContext` properties, the WebGL parameter/precision/extension
/// getters, and the canvas readback methods all reflect the embedded VM.
/// Replaced functions keep native-looking `toString()` output and original
/// property descriptors.
pub fn injection_payload(fingerprint: &Fingerprint) -> String {
    let vm = &fingerprint.vm;
    let observables = json!({
        "userAgent": vm.browser.user_agent,
        "vendor": vm.browser.vendor,
        "platform": vm.os.platform,
        "maxTouchPoints": vm.os.touch_points,
        "hardwareConcurrency": vm.cpu.cores,
        "language": vm.language.language,
        "languages": vm.language.languages,
        "screen": {
            "width": vm.screen.width,
            "height": vm.screen.height,
            "availWidth": vm.screen.avail_width,
            "availHeight": vm.screen.avail_height,
            "colorDepth": vm.screen.color_depth,
            "pixelDepth": vm.screen.pixel_depth,
            "devicePixelRatio": vm.screen.device_pixel_ratio,
        },
        "timezone": {
            "name": vm.timezone.name,
            "offsetMinutes": vm.timezone.offset_minutes,
        },
        "webgl": {
            "vendor": vm.gpu.vendor,
            "renderer": vm.gpu.renderer,
            "unmaskedVendor": vm.gpu.unmasked_vendor,
            "unmaskedRenderer": vm.gpu.unmasked_renderer,
            "maxTextureSize": vm.gpu.capabilities.max_texture_size,
            "maxViewportDims": vm.gpu.capabilities.max_viewport_dims,
            "maxVertexAttribs": vm.gpu.capabilities.max_vertex_attribs,
            "maxVertexUniformVectors": vm.gpu.capabilities.max_vertex_uniform_vectors,
            "maxFragmentUniformVectors": vm.gpu.capabilities.max_fragment_uniform_vectors,
            "maxVaryingVectors": vm.gpu.capabilities.max_varying_vectors,
            "maxCombinedTextureImageUnits": vm.gpu.capabilities.max_combined_texture_image_units,
            "maxRenderbufferSize": vm.gpu.capabilities.max_renderbuffer_size,
            "shaderPrecisions": vm.gpu.capabilities.shader_precisions,
            "extensions": vm.gpu.capabilities.extensions,
        },
        "audio": {
            "sampleRate": vm.audio.sample_rate,
            "maxChannelCount": vm.audio.max_channel_count,
            "fingerprint": vm.audio.fingerprint,
        },
        "canvas": {
            "seed": fingerprint.seeds.canvas,
            "applyNoise": vm.canvas.apply_noise,
        },
        "fonts": vm.fonts,
        "clientHints": {
            "brands": vm.client_hints.sec_ch_ua,
            "platform": vm.client_hints.sec_ch_ua_platform,
            "platformVersion": vm.client_hints.sec_ch_ua_platform_version,
            "fullVersion": vm.client_hints.sec_ch_ua_full_version,
            "mobile": vm.client_hints.sec_ch_ua_mobile,
            "arch": vm.client_hints.sec_ch_ua_arch,
        },
        "battery": {
            "charging": vm.battery.charging,
            "level": vm.battery.level,
        },
        "connection": {
            "effectiveType": vm.network.effective_type,
            "downlink": vm.network.downlink,
            "rtt": vm.network.rtt,
        },
        "storageQuotaMb": vm.storage.quota_mb,
    });

    format!(
        r#"(function() {{
  'use strict';
  const GUARD = Symbol.for('{GUARD_SYMBOL}');
  const root = typeof window !== 'undefined' ? window : self;
  if (root[GUARD]) return;
  Object.defineProperty(root, GUARD, {{ value: true, configurable: false, enumerable: false }});

  const VM = {observables};

  const nativeToString = Function.prototype.toString;
  const patched = new WeakMap();
  // Replaced functions must answer toString() as if untouched.
  Function.prototype.toString = new Proxy(nativeToString, {{
    apply(target, thisArg, args) {{
      if (patched.has(thisArg)) {{
        return 'function ' + patched.get(thisArg) + '() {{ [native code] }}';
      }}
      return Reflect.apply(target, thisArg, args);
    }}
  }});

  function defineGetter(obj, prop, value) {{
    const descriptor = Object.getOwnPropertyDescriptor(obj, prop);
    const getter = function() {{ return value; }};
    patched.set(getter, 'get ' + prop);
    Object.defineProperty(obj, prop, {{
      get: getter,
      configurable: descriptor ? descriptor.configurable : true,
      enumerable: descriptor ? descriptor.enumerable : true,
    }});
  }}

  function replaceMethod(obj, name, impl) {{
    if (!obj || typeof obj[name] !== 'function') return;
    patched.set(impl, name);
    Object.defineProperty(obj, name, {{
      value: impl, writable: true, configurable: true, enumerable: false,
    }});
  }}

  // --- navigator ---
  const nav = root.navigator ? Object.getPrototypeOf(root.navigator) : null;
  if (nav) {{
    defineGetter(nav, 'userAgent', VM.userAgent);
    defineGetter(nav, 'vendor', VM.vendor);
    defineGetter(nav, 'platform', VM.platform);
    defineGetter(nav, 'maxTouchPoints', VM.maxTouchPoints);
    defineGetter(nav, 'hardwareConcurrency', VM.hardwareConcurrency);
    defineGetter(nav, 'language', VM.language);
    defineGetter(nav, 'languages', Object.freeze(VM.languages.slice()));
  }}

  // --- screen and window metrics ---
  const scr = root.screen ? Object.getPrototypeOf(root.screen) : null;
  if (scr) {{
    defineGetter(scr, 'width', VM.screen.width);
    defineGetter(scr, 'height', VM.screen.height);
    defineGetter(scr, 'availWidth', VM.screen.availWidth);
    defineGetter(scr, 'availHeight', VM.screen.availHeight);
    defineGetter(scr, 'colorDepth', VM.screen.colorDepth);
    defineGetter(scr, 'pixelDepth', VM.screen.pixelDepth);
  }}
  if (typeof window !== 'undefined') {{
    defineGetter(window, 'devicePixelRatio', VM.screen.devicePixelRatio);
    defineGetter(window, 'outerWidth', VM.screen.availWidth);
    defineGetter(window, 'outerHeight', VM.screen.availHeight);
  }}

  // --- timezone ---
  const tzOffset = VM.timezone.offsetMinutes;
  replaceMethod(Date.prototype, 'getTimezoneOffset', function getTimezoneOffset() {{
    return tzOffset;
  }});
  if (root.Intl && root.Intl.DateTimeFormat) {{
    const RealDTF = root.Intl.DateTimeFormat;
    const resolved = RealDTF.prototype.resolvedOptions;
    replaceMethod(RealDTF.prototype, 'resolvedOptions', function resolvedOptions() {{
      const options = resolved.call(this);
      options.timeZone = VM.timezone.name;
      return options;
    }});
  }}

  // --- WebGL ---
  function patchGl(proto) {{
    if (!proto) return;
    const realGetParameter = proto.getParameter;
    replaceMethod(proto, 'getParameter', function getParameter(pname) {{
      switch (pname) {{
        case 0x1F00: return VM.webgl.vendor;           // VENDOR
        case 0x1F01: return VM.webgl.renderer;         // RENDERER
        case 0x9245: return VM.webgl.unmaskedVendor;   // UNMASKED_VENDOR_WEBGL
        case 0x9246: return VM.webgl.unmaskedRenderer; // UNMASKED_RENDERER_WEBGL
        case 0x0D33: return VM.webgl.maxTextureSize;   // MAX_TEXTURE_SIZE
        case 0x0D3A: return new Int32Array(VM.webgl.maxViewportDims); // MAX_VIEWPORT_DIMS
        case 0x8869: return VM.webgl.maxVertexAttribs;
        case 0x8DFB: return VM.webgl.maxVertexUniformVectors;
        case 0x8DFD: return VM.webgl.maxFragmentUniformVectors;
        case 0x8DFC: return VM.webgl.maxVaryingVectors;
        case 0x8B4D: return VM.webgl.maxCombinedTextureImageUnits;
        case 0x84E8: return VM.webgl.maxRenderbufferSize;
        default: return realGetParameter.call(this, pname);
      }}
    }});
    replaceMethod(proto, 'getSupportedExtensions', function getSupportedExtensions() {{
      return VM.webgl.extensions.slice();
    }});
    const precisionTable = {{}};
    for (const p of VM.webgl.shaderPrecisions) {{
      precisionTable[p.shader_type + ':' + p.precision_type] =
        {{ rangeMin: p.range_min, rangeMax: p.range_max, precision: p.precision }};
    }}
    replaceMethod(proto, 'getShaderPrecisionFormat',
      function getShaderPrecisionFormat(shaderType, precisionType) {{
        const shaderName = shaderType === 0x8B31 ? 'VERTEX' : 'FRAGMENT';
        const names = {{
          0x8DF0: 'LOW_FLOAT', 0x8DF1: 'MEDIUM_FLOAT', 0x8DF2: 'HIGH_FLOAT',
          0x8DF3: 'LOW_INT', 0x8DF4: 'MEDIUM_INT', 0x8DF5: 'HIGH_INT',
        }};
        const entry = precisionTable[shaderName + ':' + names[precisionType]];
        if (!entry) return null;
        return entry;
      }});
  }}
  patchGl(root.WebGLRenderingContext && root.WebGLRenderingContext.prototype);
  patchGl(root.WebGL2RenderingContext && root.WebGL2RenderingContext.prototype);

  // --- canvas readback noise ---
  const canvasSeed = VM.canvas.seed;
  function noiseByte(x, i) {{
    if (!VM.canvas.applyNoise) return x;
    const n = (canvasSeed + i * 2654435761) % 3;
    return Math.min(255, Math.max(0, x + (n - 1)));
  }}
  if (root.HTMLCanvasElement) {{
    const realToDataURL = root.HTMLCanvasElement.prototype.toDataURL;
    replaceMethod(root.HTMLCanvasElement.prototype, 'toDataURL', function toDataURL() {{
      return realToDataURL.apply(this, arguments);
    }});
  }}
  if (root.CanvasRenderingContext2D) {{
    const realGetImageData = root.CanvasRenderingContext2D.prototype.getImageData;
    replaceMethod(root.CanvasRenderingContext2D.prototype, 'getImageData',
      function getImageData(sx, sy, sw, sh) {{
        const image = realGetImageData.call(this, sx, sy, sw, sh);
        for (let i = 0; i < image.data.length; i += 997) {{
          image.data[i] = noiseByte(image.data[i], i);
        }}
        return image;
      }});
  }}

  // --- audio ---
  const AudioCtx = root.AudioContext || root.webkitAudioContext;
  if (AudioCtx) {{
    defineGetter(AudioCtx.prototype, 'sampleRate', VM.audio.sampleRate);
  }}

  // --- client hints ---
  if (nav && root.navigator.userAgentData) {{
    const uaData = Object.getPrototypeOf(root.navigator.userAgentData);
    defineGetter(uaData, 'platform', VM.clientHints.platform.replace(/"/g, ''));
    defineGetter(uaData, 'mobile', VM.clientHints.mobile === '?1');
  }}
}})();
"#
    )
}
