use camposanto::config::{AppConfig, AppConfigOverrides};
use glam::Vec3;

#[test]
fn shipped_config_parses_with_the_full_garden() {
    let config = AppConfig::load("config/app.json").expect("shipped config");
    assert_eq!(config.environment.plants.len(), 8);
    assert_eq!(config.environment.plants[0].name, "Lavanda");
    assert_eq!(config.environment.plants[1].position, Vec3::new(-3.0, 0.0, 4.0));
    assert_eq!(config.audio.verses.len(), 3);
    assert!((config.frame.max_delta_seconds - 0.25).abs() < f32::EPSILON);
    assert_eq!(config.input_bindings.as_deref(), Some(std::path::Path::new("config/input.json")));
}

#[test]
fn command_line_overrides_win_over_the_file() {
    let mut config = AppConfig::load("config/app.json").expect("shipped config");
    let overrides = AppConfigOverrides { height: Some(480), vsync: Some(false), ..Default::default() };
    config.apply_overrides(&overrides);
    assert_eq!((config.window.width, config.window.height, config.window.vsync), (1280, 480, false));
}
