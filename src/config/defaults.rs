// Stock configuration - the kit, voices and ten bar programme the engine
// plays when no config file is given

use crate::audio::timing::SampleClock;
use crate::config::{EngineConfig, PatternConfig, SampleConfig, SampleSource, VoiceConfig};
use crate::sampler::DrumSound;

pub const TEMPO_BPM: u32 = 155;
pub const BEATS_PER_BAR: u32 = 4;
pub const TICKS_PER_BAR: usize = 72;
pub const RING_DEPTH: usize = 4;
pub const FRAMES_PER_BUFFER: usize = 49;

/// Bar -> pattern index for the stock loop
pub const ARRANGEMENT: [usize; 10] = [0, 0, 0, 2, 2, 2, 2, 2, 1, 0];

// (pan, volume, sample)
const VOICES: [(u8, u8, DrumSound); 6] = [
    (16, 192, DrumSound::Kick),
    (8, 0, DrumSound::Clap),
    (16, 40, DrumSound::Snare),
    (18, 80, DrumSound::HiHat),
    (28, 30, DrumSound::Perc),
    (4, 30, DrumSound::Kick),
];

pub const PATTERN_0: [&str; 6] = [
    "1        1                     1    1        1                          ",
    "                                                                        ",
    "                  1                                   1                 ",
    "                                                                        ",
    "1        1        1        1        1        1        1        1        ",
    "                                                                        ",
];

pub const PATTERN_1: [&str; 6] = [
    "9                                   1                                   ",
    "                                                                        ",
    "4        1        1        1        3        1        1        1        ",
    "                                                                        ",
    "                                                                        ",
    "                                                                        ",
];

pub const PATTERN_2: [&str; 6] = [
    "9                                   1                                   ",
    "         1                 1                 1                 1        ",
    "1                 1                 1                 1                 ",
    "5        1        1        1        1        1                 1        ",
    "5                          1                 1                          ",
    "         1                          4                          1        ",
];

pub fn engine_config() -> EngineConfig {
    EngineConfig {
        clock: SampleClock::default(),
        tempo_bpm: TEMPO_BPM,
        beats_per_bar: BEATS_PER_BAR,
        ticks_per_bar: TICKS_PER_BAR,
        ring_depth: RING_DEPTH,
        frames_per_buffer: FRAMES_PER_BUFFER,
        samples: DrumSound::ALL
            .iter()
            .map(|&sound| SampleConfig {
                name: sound.name().to_string(),
                source: SampleSource::Builtin(sound),
            })
            .collect(),
        voices: VOICES
            .iter()
            .map(|&(pan, volume, sound)| VoiceConfig {
                pan,
                volume,
                sample: Some(sound.name().to_string()),
            })
            .collect(),
        patterns: [("intro", PATTERN_0), ("break", PATTERN_1), ("groove", PATTERN_2)]
            .into_iter()
            .map(|(name, rows)| PatternConfig {
                name: name.to_string(),
                rows: rows.iter().map(|row| row.to_string()).collect(),
            })
            .collect(),
        arrangement: ARRANGEMENT.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_rows_span_a_bar() {
        for rows in [PATTERN_0, PATTERN_1, PATTERN_2] {
            for row in rows {
                assert_eq!(row.len(), TICKS_PER_BAR);
            }
        }
    }

    #[test]
    fn test_stock_config_is_valid() {
        let config = engine_config();
        config.validate().unwrap();
        assert_eq!(config.voices.len(), 6);
        assert_eq!(config.arrangement.len(), 10);
        assert_eq!(config.sample_rate(), 44138);
    }
}
