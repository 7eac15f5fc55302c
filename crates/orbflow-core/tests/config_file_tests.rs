use orbflow_core::{
    ColorConfig, ColorPreset, ColorStrategy, ColorStrategyKind, CoreError, DetectorConfig,
    EngineConfig, Gradient, Rgba,
};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_toml_section_overrides() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("engine.toml");
    fs::write(
        &path,
        r#"
[clearance]
min_radius = 0.2
max_radius = 0.8

[fusion]
radius_strategy = "ClearanceModulated"
"#,
    )
    .unwrap();

    let config = EngineConfig::load(&path).unwrap();
    assert_eq!(config.clearance.min_radius, 0.2);
    assert_eq!(config.clearance.max_radius, 0.8);
    assert_eq!(config.clearance.padding, 0.1);
    assert_eq!(config.beat, EngineConfig::default().beat);
}

#[test]
fn test_invalid_file_values_are_corrected_not_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("engine.json");
    fs::write(
        &path,
        r#"{ "color": { "saturation": 3.0, "brightness": 0.0 } }"#,
    )
    .unwrap();

    let (config, corrections) = EngineConfig::load(&path).unwrap().sanitized();
    assert_eq!(config.color.saturation, 1.0);
    assert_eq!(config.color.brightness, 0.1);
    assert_eq!(corrections.len(), 2);
}

#[test]
fn test_unsupported_extension() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("engine.yaml");
    fs::write(&path, "spectrum: {}").unwrap();
    assert!(matches!(
        EngineConfig::load(&path),
        Err(CoreError::UnsupportedFormat(_))
    ));
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("engine.ron");
    fs::write(&path, "(spectrum: ").unwrap();
    assert!(matches!(EngineConfig::load(&path), Err(CoreError::RonParse(_))));
}

#[test]
fn test_preset_file_used_by_color_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mono.ron");
    let preset = ColorPreset {
        name: "Mono".to_string(),
        description: String::new(),
        primary: Gradient::from_stops(&[(0.0, Rgba::BLACK), (1.0, Rgba::WHITE)]),
        secondary: Gradient::from_stops(&[(0.0, Rgba::WHITE)]),
        accent: Gradient::from_stops(&[(0.0, Rgba::RED)]),
    };
    preset.save(&path).unwrap();

    let config = ColorConfig {
        strategy: ColorStrategyKind::PresetGradient,
        preset_path: Some(path),
        ..Default::default()
    };
    match ColorStrategy::from_config(&config) {
        ColorStrategy::PresetGradient(Some(loaded)) => assert_eq!(loaded, preset),
        other => panic!("unexpected strategy {:?}", other),
    }
}

#[test]
fn test_missing_preset_file_falls_back_to_builtin() {
    let config = ColorConfig {
        strategy: ColorStrategyKind::PresetGradient,
        preset: Some("Cool Ocean".to_string()),
        preset_path: Some("/nonexistent/preset.ron".into()),
        ..Default::default()
    };
    match ColorStrategy::from_config(&config) {
        ColorStrategy::PresetGradient(Some(loaded)) => assert_eq!(loaded.name, "Cool Ocean"),
        other => panic!("unexpected strategy {:?}", other),
    }
}

#[test]
fn test_unknown_preset_has_no_gradient() {
    let config = ColorConfig {
        strategy: ColorStrategyKind::PresetGradient,
        preset: Some("Neon".to_string()),
        ..Default::default()
    };
    assert_eq!(
        ColorStrategy::from_config(&config),
        ColorStrategy::PresetGradient(None)
    );
}

#[test]
fn test_partial_volume_spike_section_keeps_its_own_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("engine.toml");
    fs::write(&path, "[volume_spike]\nenabled = false\n").unwrap();

    let config = EngineConfig::load(&path).unwrap();
    let spike = &config.volume_spike;
    assert!(!spike.enabled);
    assert_eq!(spike.threshold_multiplier, 1.5);
    assert_eq!(spike.cooldown_seconds, 0.15);
    assert_eq!(spike.pulse_duration_seconds, 0.4);
    assert_eq!(config.beat, DetectorConfig::beat());
}

#[test]
fn test_saved_default_config_loads_back() {
    let dir = tempdir().unwrap();
    for name in ["engine.ron", "engine.json"] {
        let path = dir.path().join(name);
        EngineConfig::default().save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), EngineConfig::default(), "{}", name);
    }
}
