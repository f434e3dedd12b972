// Integration test: Engine config files
//
// Saves and reloads configs in both supported formats and checks that
// invalid files are rejected with the right error.

use drumloop::config::{SampleConfig, SampleSource};
use drumloop::sampler::DrumSound;
use drumloop::{ConfigError, DrumMachine, EngineConfig, build_library};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_default_config_round_trips_through_ron_and_json() {
    let dir = tempdir().unwrap();
    let config = EngineConfig::default();

    for name in ["kit.ron", "kit.json"] {
        let path = dir.path().join(name);
        config.save(&path).unwrap();
        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, config, "{}", name);
    }
}

#[test]
fn test_default_timing() {
    let config = EngineConfig::default();
    assert_eq!(config.sample_rate(), 44138);

    let timing = config.timing(config.sample_rate()).unwrap();
    assert_eq!(timing.samples_per_tick, 949);
    assert_eq!(timing.ticks_per_bar, 72);
    assert_eq!(timing.loop_bars, 10);
    assert_eq!(timing.loop_length_samples(), 949 * 72 * 10);
}

#[test]
fn test_invalid_values_rejected_on_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.ron");

    let mut config = EngineConfig::default();
    config.voices[2].pan = 40;
    config.save(&path).unwrap();
    assert!(matches!(
        EngineConfig::load(&path),
        Err(ConfigError::PanOutOfRange { voice: 2, pan: 40 })
    ));

    let mut config = EngineConfig::default();
    config.arrangement.push(7);
    config.save(&path).unwrap();
    assert!(matches!(
        EngineConfig::load(&path),
        Err(ConfigError::UnknownPattern { bar: 10, pattern: 7 })
    ));

    let mut config = EngineConfig::default();
    config.tempo_bpm = 0;
    config.save(&path).unwrap();
    assert!(matches!(EngineConfig::load(&path), Err(ConfigError::ZeroTempo)));
}

#[test]
fn test_malformed_ron_reports_parse_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.ron");
    fs::write(&path, "(tempo_bpm: ").unwrap();

    assert!(matches!(EngineConfig::load(&path), Err(ConfigError::Ron(_))));
}

#[test]
fn test_default_config_builds_a_machine() {
    let config = EngineConfig::default();
    let rate = config.sample_rate();
    let library = build_library(&config.samples, rate).unwrap().into_shared();
    assert_eq!(library.len(), config.samples.len());

    let mut machine = DrumMachine::from_config(&config, library, rate).unwrap();
    assert_eq!(machine.mixer().voices().len(), config.voices.len());

    // the intro pattern opens on a hit
    let mut opening = vec![drumloop::StereoFrame::SILENCE; 64];
    machine.render_into(&mut opening);
    assert!(opening.iter().any(|f| *f != drumloop::StereoFrame::SILENCE));
}

#[test]
fn test_builtin_source_serializes_by_name() {
    let sample = SampleConfig {
        name: "kick".to_string(),
        source: SampleSource::Builtin(DrumSound::Kick),
    };
    let json = serde_json::to_string(&sample).unwrap();
    let back: SampleConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, sample);
}
