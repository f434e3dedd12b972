// Built-in kit - Synthesized stand-ins for the stock drum tables
//
// Rendered once at startup, never in the audio path. Noise comes from a
// fixed-seed generator so every run produces identical tables.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use crate::audio::format_conversion::f32_to_i16;
use crate::sampler::library::Waveform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrumSound {
    Kick,
    Clap,
    Snare,
    HiHat,
    Perc,
}

impl DrumSound {
    pub const ALL: [DrumSound; 5] = [
        DrumSound::Kick,
        DrumSound::Clap,
        DrumSound::Snare,
        DrumSound::HiHat,
        DrumSound::Perc,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DrumSound::Kick => "kick",
            DrumSound::Clap => "clap",
            DrumSound::Snare => "snare",
            DrumSound::HiHat => "hihat",
            DrumSound::Perc => "perc",
        }
    }

    /// Length of the rendered hit in seconds
    fn duration(self) -> f32 {
        match self {
            DrumSound::Kick => 0.35,
            DrumSound::Clap => 0.25,
            DrumSound::Snare => 0.22,
            DrumSound::HiHat => 0.06,
            DrumSound::Perc => 0.12,
        }
    }

    fn seed(self) -> u64 {
        match self {
            DrumSound::Kick => 1,
            DrumSound::Clap => 2,
            DrumSound::Snare => 3,
            DrumSound::HiHat => 4,
            DrumSound::Perc => 5,
        }
    }
}

/// Render `sound` at `sample_rate` into a waveform named after the sound
pub fn synthesize(sound: DrumSound, sample_rate: u32) -> Waveform {
    let rate = sample_rate.max(1) as f32;
    let frames = (sound.duration() * rate) as usize;
    let mut rng = StdRng::seed_from_u64(sound.seed());

    let mut phase = 0.0f32;
    let samples: Vec<i16> = (0..frames)
        .map(|n| {
            let t = n as f32 / rate;
            let mut noise = || rng.gen_range(-1.0f32..=1.0);

            let value = match sound {
                DrumSound::Kick => {
                    // pitch sweep 150 Hz -> 45 Hz
                    let freq = 45.0 + 105.0 * (-t * 30.0).exp();
                    phase += TAU * freq / rate;
                    phase.sin() * (-t * 9.0).exp()
                }
                DrumSound::Snare => {
                    phase += TAU * 185.0 / rate;
                    let body = phase.sin() * (-t * 25.0).exp();
                    let rattle = noise() * (-t * 14.0).exp();
                    0.45 * body + 0.55 * rattle
                }
                DrumSound::Clap => {
                    // three quick bursts then a diffuse tail
                    let burst = (t * 100.0) as u32;
                    let gate = if burst < 3 && (t * 100.0).fract() < 0.6 { 1.0 } else { 0.0 };
                    let tail = if t > 0.03 {
                        0.6 * (-(t - 0.03) * 18.0).exp()
                    } else {
                        0.0
                    };
                    noise() * (gate * (-t * 40.0).exp() + tail)
                }
                DrumSound::HiHat => {
                    let sample = noise();
                    // crude high-pass: difference of successive noise values
                    (sample - noise() * 0.5) * (-t * 60.0).exp() * 0.6
                }
                DrumSound::Perc => {
                    phase += TAU * 620.0 / rate;
                    (phase.sin() + 0.3 * (2.0 * phase).sin()) * (-t * 30.0).exp() * 0.7
                }
            };

            f32_to_i16(value * 0.9)
        })
        .collect();

    Waveform::new(sound.name(), &samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lengths_follow_sample_rate() {
        let kick = synthesize(DrumSound::Kick, 44138);
        assert_eq!(kick.len(), (0.35f32 * 44138.0) as usize);

        let hat = synthesize(DrumSound::HiHat, 10_000);
        assert_eq!(hat.len(), (0.06f32 * 10_000.0) as usize);
    }

    #[test]
    fn test_deterministic() {
        for sound in DrumSound::ALL {
            assert_eq!(synthesize(sound, 22050), synthesize(sound, 22050));
        }
    }

    #[test]
    fn test_silence_sentinel_and_audible_body() {
        for sound in DrumSound::ALL {
            let wave = synthesize(sound, 44138);
            assert_eq!(wave.get(0), 0, "{} must start silent", sound.name());
            assert!(wave.peak() > 1000, "{} is too quiet", sound.name());
            assert_eq!(wave.name(), sound.name());
        }
    }

    #[test]
    fn test_decays_toward_silence() {
        let kick = synthesize(DrumSound::Kick, 44138);
        let tail = &kick.samples()[kick.len() - 100..];
        let tail_peak = tail.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);
        assert!(tail_peak < kick.peak() / 4);
    }
}
