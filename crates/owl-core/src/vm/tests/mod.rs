use super::*;

#[test]
fn test_get_or_create_is_idempotent() {
    let engine = VmEngine::new();
    let first = engine.get_or_create("ctx_1", &VmFilter::default()).unwrap();
    let second = engine.get_or_create("ctx_1", &VmFilter::default()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_distinct_contexts_never_share_seeds() {
    let engine = VmEngine::new();
    let mut seen = std::collections::HashSet::new();
    for i in 0..64 {
        let fp = engine
            .get_or_create(&format!("ctx_{i}"), &VmFilter::default())
            .unwrap();
        let tuple = (
            fp.seeds.canvas,
            fp.seeds.webgl,
            fp.seeds.audio,
            fp.seeds.fonts,
            fp.seeds.client_rects,
            fp.seeds.navigator,
            fp.seeds.screen,
        );
        assert!(seen.insert(tuple), "seed tuple repeated at ctx_{i}");
    }
}

#[test]
fn test_seeds_unpredictable_across_session_keys() {
    let a = VmEngine::with_session_key(1).get_or_create("ctx_1", &VmFilter::default()).unwrap();
    let b = VmEngine::with_session_key(2).get_or_create("ctx_1", &VmFilter::default()).unwrap();
    assert_ne!(a.seeds, b.seeds);
}

#[test]
fn test_seeds_reproducible_within_session() {
    let seeds_a = FingerprintSeeds::derive(99, "ctx_7");
    let seeds_b = FingerprintSeeds::derive(99, "ctx_7");
    assert_eq!(seeds_a, seeds_b);
}

#[test]
fn test_audio_fingerprint_stays_in_band() {
    for i in 0..100 {
        let seeds = FingerprintSeeds::derive(i, "ctx_audio");
        assert!(
            (AUDIO_FINGERPRINT_MIN..=AUDIO_FINGERPRINT_MAX).contains(&seeds.audio_fingerprint),
            "audio fingerprint {} out of band",
            seeds.audio_fingerprint
        );
    }
}

#[test]
fn test_hashes_are_hex32() {
    let seeds = FingerprintSeeds::derive(3, "ctx_1");
    let hashes = FingerprintHashes::derive(&seeds);
    for hash in hashes.all() {
        assert_eq!(hash.len(), 32);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}

#[test]
fn test_hashes_differ_across_labels() {
    let seeds = FingerprintSeeds::derive(3, "ctx_1");
    let hashes = FingerprintHashes::derive(&seeds);
    let all = hashes.all();
    for i in 0..all.len() {
        for j in i + 1..all.len() {
            assert_ne!(all[i], all[j]);
        }
    }
}

#[test]
fn test_windows_vm_is_pairwise_consistent() {
    let engine = VmEngine::with_session_key(42);
    let fp = engine
        .get_or_create("ctx_win", &VmFilter::os("windows"))
        .unwrap();
    assert_eq!(fp.vm.os.platform, "Win32");
    assert!(fp.vm.browser.user_agent.contains("Windows NT"));
    assert_eq!(fp.vm.client_hints.sec_ch_ua_platform, "\"Windows\"");
    assert!(fp.vm.gpu.unmasked_renderer.contains("D3D11"));
    assert!(fp.vm.fonts.iter().any(|f| f == "Segoe UI"));
    assert!(!fp.vm.fonts.iter().any(|f| f == "Helvetica Neue"));
}

#[test]
fn test_macos_vm_is_pairwise_consistent() {
    let engine = VmEngine::with_session_key(42);
    let fp = engine
        .get_or_create("ctx_mac", &VmFilter::os("macos"))
        .unwrap();
    assert_eq!(fp.vm.os.platform, "MacIntel");
    assert!(fp.vm.browser.user_agent.contains("Macintosh"));
    assert_eq!(fp.vm.client_hints.sec_ch_ua_platform, "\"macOS\"");
    assert!(fp.vm.fonts.iter().any(|f| f == "Helvetica Neue"));
    assert!(!fp.vm.gpu.unmasked_renderer.contains("D3D11"));
}

#[test]
fn test_linux_vm_is_pairwise_consistent() {
    let engine = VmEngine::with_session_key(42);
    let fp = engine
        .get_or_create("ctx_linux", &VmFilter::os("linux"))
        .unwrap();
    assert_eq!(fp.vm.os.platform, "Linux x86_64");
    assert!(fp.vm.browser.user_agent.contains("X11; Linux"));
    assert_eq!(fp.vm.client_hints.sec_ch_ua_platform, "\"Linux\"");
    assert!(fp.vm.fonts.iter().any(|f| f == "DejaVu Sans"));
}

#[test]
fn test_browser_versions_agree_across_surfaces() {
    let engine = VmEngine::with_session_key(42);
    let fp = engine.get_or_create("ctx_v", &VmFilter::default()).unwrap();
    let version = &fp.vm.browser.version;
    let major = version.split('.').next().unwrap();
    assert!(fp.vm.browser.user_agent.contains(&format!("Chrome/{version}")));
    assert!(fp.vm.client_hints.sec_ch_ua.contains(&format!("v=\"{major}\"")));
    assert!(fp.vm.client_hints.sec_ch_ua_full_version.contains(version));
}

#[test]
fn test_gpu_filter_narrows_selection() {
    let engine = VmEngine::with_session_key(42);
    let fp = engine
        .get_or_create(
            "ctx_gpu",
            &VmFilter {
                os: Some("windows".to_string()),
                gpu: Some("nvidia".to_string()),
            },
        )
        .unwrap();
    assert!(fp.vm.gpu.unmasked_renderer.contains("NVIDIA"));
}

#[test]
fn test_unsatisfiable_filter_errors() {
    let engine = VmEngine::new();
    let err = engine.get_or_create(
        "ctx_bad",
        &VmFilter {
            os: Some("windows".to_string()),
            gpu: Some("apple".to_string()),
        },
    );
    assert!(matches!(err, Err(crate::error::VmError::NoMatchingTemplate { .. })));
}

#[test]
fn test_set_seeds_overrides_generation() {
    let engine = VmEngine::with_session_key(42);
    let original = engine.get_or_create("ctx_p", &VmFilter::default()).unwrap();
    let foreign = FingerprintSeeds::derive(7777, "other");
    let restored = engine
        .set_seeds("ctx_p", foreign, &VmFilter::default())
        .unwrap();
    assert_ne!(original.seeds, restored.seeds);
    // get_or_create must now return the overridden identity.
    let cached = engine.get_or_create("ctx_p", &VmFilter::default()).unwrap();
    assert_eq!(cached.seeds, foreign);
    assert_eq!(cached.hashes, FingerprintHashes::derive(&foreign));
}

#[test]
fn test_set_seeds_rejects_out_of_band_audio() {
    let engine = VmEngine::new();
    let mut seeds = FingerprintSeeds::derive(1, "ctx_a");
    seeds.audio_fingerprint = 125.5;
    assert!(engine.set_seeds("ctx_a", seeds, &VmFilter::default()).is_err());
}

#[test]
fn test_clear_evicts_entry() {
    let engine = VmEngine::with_session_key(42);
    engine.get_or_create("ctx_c", &VmFilter::default()).unwrap();
    assert_eq!(engine.len(), 1);
    engine.clear("ctx_c");
    assert!(engine.is_empty());
    assert!(engine.seeds("ctx_c").is_none());
}

#[test]
fn test_gpu_capabilities_come_from_template_unchanged() {
    let engine = VmEngine::with_session_key(42);
    let fp = engine
        .get_or_create("ctx_caps", &VmFilter::os("windows"))
        .unwrap();
    let template = templates()
        .iter()
        .find(|t| t.gpu.unmasked_renderer == fp.vm.gpu.unmasked_renderer)
        .expect("resolved GPU must come from a template");
    assert_eq!(template.gpu.capabilities, fp.vm.gpu.capabilities);
}

#[test]
fn test_resolution_is_deterministic_for_same_seeds() {
    let seeds = FingerprintSeeds::derive(11, "ctx_d");
    let a = resolve(&seeds, &VmFilter::default()).unwrap();
    let b = resolve(&seeds, &VmFilter::default()).unwrap();
    assert_eq!(a, b);
}
