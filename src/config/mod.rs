// Engine configuration - kit, voices, patterns and ring sizing
//
// Everything here is fixed before playback starts. Files are RON or JSON,
// chosen by extension.

pub mod defaults;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::audio::timing::SampleClock;
use crate::sampler::DrumSound;
use crate::sequencer::{Arrangement, Pattern, TransportTiming};
use crate::synth::PAN_MAX;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Unsupported config format: '{0}' (expected .ron or .json)")]
    UnsupportedFormat(String),

    #[error("Invalid sample clock: {base_clock_hz} Hz / {serializer_divisor}")]
    InvalidClock {
        base_clock_hz: u32,
        serializer_divisor: f32,
    },

    #[error("Tempo must be greater than 0 BPM")]
    ZeroTempo,

    #[error("Beats per bar must be greater than 0")]
    ZeroBeatsPerBar,

    #[error("Ticks per bar must be greater than 0")]
    ZeroTicksPerBar,

    #[error("{bpm} BPM at {sample_rate} Hz gives ticks shorter than one sample")]
    TickTooShort { bpm: u32, sample_rate: u32 },

    #[error("{bpm} BPM gives ticks longer than the counter range")]
    TickTooLong { bpm: u32 },

    #[error("Arrangement must contain at least one bar")]
    EmptyArrangement,

    #[error("Bar {bar} refers to unknown pattern {pattern}")]
    UnknownPattern { bar: usize, pattern: usize },

    #[error("Arrangement has {bars} bars but the transport loops over {loop_bars}")]
    LoopLengthMismatch { bars: usize, loop_bars: usize },

    #[error("Pattern '{pattern}' spans {found} ticks, expected {expected}")]
    TickCountMismatch {
        pattern: String,
        found: usize,
        expected: usize,
    },

    #[error("At least one voice is required")]
    NoVoices,

    #[error("Ring depth must be at least 2 (got {0})")]
    RingTooShallow(usize),

    #[error("Frames per buffer must be greater than 0")]
    EmptyBuffer,

    #[error("Voice {voice}: pan {pan} is outside 0..={max}", max = PAN_MAX)]
    PanOutOfRange { voice: usize, pan: u8 },

    #[error("Voice {voice}: unknown sample '{name}'")]
    UnknownSample { voice: usize, name: String },

    #[error("Duplicate sample name '{0}'")]
    DuplicateSample(String),

    #[error("Pattern '{pattern}': expected {expected} rows (one per voice), found {found}")]
    RowCount {
        pattern: String,
        expected: usize,
        found: usize,
    },

    #[error("Pattern '{pattern}' row {row}: {found} cells exceed {ticks} ticks per bar")]
    RowTooLong {
        pattern: String,
        row: usize,
        found: usize,
        ticks: usize,
    },

    #[error("Pattern '{pattern}' row {row}, tick {tick}: invalid cell {cell:?}")]
    InvalidCell {
        pattern: String,
        row: usize,
        tick: usize,
        cell: char,
    },
}

/// Where a waveform comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleSource {
    /// Synthesized at startup
    Builtin(DrumSound),
    /// 16/24/32-bit or float WAV, relative paths resolve against the config file
    Wav(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleConfig {
    pub name: String,
    pub source: SampleSource,
}

/// One mixer channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// 0..=32; left gain is `pan`, right gain is `32 - pan`
    pub pan: u8,
    /// Base gain before emphasis
    pub volume: u8,
    /// Sample name, or none for a silent voice
    pub sample: Option<String>,
}

/// One bar of hits: a row of cells per voice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternConfig {
    pub name: String,
    pub rows: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub clock: SampleClock,
    pub tempo_bpm: u32,
    pub beats_per_bar: u32,
    pub ticks_per_bar: usize,
    pub ring_depth: usize,
    pub frames_per_buffer: usize,
    pub samples: Vec<SampleConfig>,
    pub voices: Vec<VoiceConfig>,
    pub patterns: Vec<PatternConfig>,
    pub arrangement: Vec<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        defaults::engine_config()
    }
}

impl EngineConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = match extension(path).as_str() {
            "ron" => ron::from_str::<EngineConfig>(&content)?,
            "json" => serde_json::from_str::<EngineConfig>(&content)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        if let Some(base_dir) = path.parent() {
            config.resolve_paths(base_dir);
        }
        config.validate()?;

        Ok(config)
    }

    /// Write the config in the format given by the file extension
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = match extension(path).as_str() {
            "ron" => self.to_ron()?,
            "json" => serde_json::to_string_pretty(self)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn to_ron(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).map_err(|e| {
            ConfigError::SerializationError(format!("Failed to serialize to RON: {}", e))
        })
    }

    /// Make relative WAV paths relative to `base_dir`
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        for sample in &mut self.samples {
            if let SampleSource::Wav(path) = &mut sample.source {
                if path.is_relative() {
                    *path = base_dir.join(&*path);
                }
            }
        }
    }

    /// Rate derived from the serializer clock
    pub fn sample_rate(&self) -> u32 {
        self.clock.sample_rate()
    }

    /// Transport timing at `sample_rate`
    pub fn timing(&self, sample_rate: u32) -> Result<TransportTiming, ConfigError> {
        TransportTiming::from_tempo(
            sample_rate,
            self.tempo_bpm,
            self.beats_per_bar,
            self.ticks_per_bar,
            self.arrangement.len(),
        )
    }

    /// Decode every pattern grid
    pub fn parse_patterns(&self) -> Result<Vec<Pattern>, ConfigError> {
        self.patterns
            .iter()
            .map(|p| Pattern::parse(&p.name, &p.rows, self.voices.len(), self.ticks_per_bar))
            .collect()
    }

    pub fn arrangement(&self) -> Result<Arrangement, ConfigError> {
        Arrangement::new(self.arrangement.clone(), self.patterns.len())
    }

    /// Check every invariant the engine relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.clock.is_valid() || self.sample_rate() == 0 {
            return Err(ConfigError::InvalidClock {
                base_clock_hz: self.clock.base_clock_hz,
                serializer_divisor: self.clock.serializer_divisor,
            });
        }
        if self.ring_depth < 2 {
            return Err(ConfigError::RingTooShallow(self.ring_depth));
        }
        if self.frames_per_buffer == 0 {
            return Err(ConfigError::EmptyBuffer);
        }
        if self.voices.is_empty() {
            return Err(ConfigError::NoVoices);
        }

        for (index, sample) in self.samples.iter().enumerate() {
            if self.samples[..index].iter().any(|s| s.name == sample.name) {
                return Err(ConfigError::DuplicateSample(sample.name.clone()));
            }
        }

        for (voice, config) in self.voices.iter().enumerate() {
            if config.pan > PAN_MAX {
                return Err(ConfigError::PanOutOfRange {
                    voice,
                    pan: config.pan,
                });
            }
            if let Some(name) = &config.sample {
                if !self.samples.iter().any(|s| &s.name == name) {
                    return Err(ConfigError::UnknownSample {
                        voice,
                        name: name.clone(),
                    });
                }
            }
        }

        self.timing(self.sample_rate())?;
        self.arrangement()?;
        self.parse_patterns()?;

        Ok(())
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn small_config() -> EngineConfig {
        EngineConfig {
            clock: SampleClock::new(128_000_000, 40.0),
            tempo_bpm: 120,
            beats_per_bar: 4,
            ticks_per_bar: 16,
            ring_depth: 4,
            frames_per_buffer: 64,
            samples: vec![SampleConfig {
                name: "kick".into(),
                source: SampleSource::Builtin(DrumSound::Kick),
            }],
            voices: vec![VoiceConfig {
                pan: 16,
                volume: 100,
                sample: Some("kick".into()),
            }],
            patterns: vec![PatternConfig {
                name: "four".into(),
                rows: vec!["1   1   1   1   ".into()],
            }],
            arrangement: vec![0],
        }
    }

    #[test]
    fn test_small_config_valid() {
        let config = small_config();
        config.validate().unwrap();
        // 50 kHz, 120 BPM: 25000 samples per beat, 4 beats over 16 ticks
        assert_eq!(config.timing(50_000).unwrap().samples_per_tick, 6250);
    }

    #[test]
    fn test_rejects_zero_tempo() {
        let mut config = small_config();
        config.tempo_bpm = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTempo)));
    }

    #[test]
    fn test_rejects_empty_arrangement() {
        let mut config = small_config();
        config.arrangement.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyArrangement)
        ));
    }

    #[test]
    fn test_rejects_unknown_pattern() {
        let mut config = small_config();
        config.arrangement = vec![0, 1];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownPattern { bar: 1, pattern: 1 })
        ));
    }

    #[test]
    fn test_rejects_pan_out_of_range() {
        let mut config = small_config();
        config.voices[0].pan = 33;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PanOutOfRange { voice: 0, pan: 33 })
        ));
    }

    #[test]
    fn test_rejects_unknown_sample() {
        let mut config = small_config();
        config.voices[0].sample = Some("cowbell".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownSample { voice: 0, .. })
        ));
    }

    #[test]
    fn test_silent_voice_allowed() {
        let mut config = small_config();
        config.voices[0].sample = None;
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_duplicate_sample() {
        let mut config = small_config();
        config.samples.push(config.samples[0].clone());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateSample(name)) if name == "kick"
        ));
    }

    #[test]
    fn test_rejects_bad_ring() {
        let mut config = small_config();
        config.ring_depth = 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RingTooShallow(1))
        ));

        let mut config = small_config();
        config.frames_per_buffer = 0;
        assert!(matches!(config.validate(), Err(ConfigError::EmptyBuffer)));
    }

    #[test]
    fn test_rejects_bad_clock() {
        let mut config = small_config();
        config.clock.serializer_divisor = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidClock { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_rows() {
        let mut config = small_config();
        config.patterns[0].rows = vec!["1   1   1   1   1".into()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RowTooLong { .. })
        ));

        config.patterns[0].rows = vec![];
        assert!(matches!(config.validate(), Err(ConfigError::RowCount { .. })));
    }

    #[test]
    fn test_ron_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kit.ron");

        let config = EngineConfig::default();
        config.save(&path).unwrap();
        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_json_file_and_relative_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kit.json");

        let mut config = small_config();
        config.samples[0].source = SampleSource::Wav(PathBuf::from("sounds/kick.wav"));
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(
            loaded.samples[0].source,
            SampleSource::Wav(dir.path().join("sounds/kick.wav"))
        );
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kit.toml");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            EngineConfig::load(&path),
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "toml"
        ));
    }
}
