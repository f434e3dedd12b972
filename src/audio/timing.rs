// Audio timing - Output sample rate derived from the serializer clock

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bit clocks per frame: 16-bit words, 2 channels, 2 PIO cycles per bit
const CYCLES_PER_FRAME: f64 = 32.0 * 2.0;

/// Clock tree feeding the serializer.
///
/// The output rate is `base_clock_hz / serializer_divisor / 32 / 2`,
/// truncated to whole hertz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleClock {
    pub base_clock_hz: u32,
    pub serializer_divisor: f32,
}

impl SampleClock {
    pub const fn new(base_clock_hz: u32, serializer_divisor: f32) -> Self {
        Self {
            base_clock_hz,
            serializer_divisor,
        }
    }

    /// Derived sample rate in Hz (0 if the clock is not usable)
    pub fn sample_rate(&self) -> u32 {
        if !self.is_valid() {
            return 0;
        }
        (self.base_clock_hz as f64 / self.serializer_divisor as f64 / CYCLES_PER_FRAME) as u32
    }

    pub fn is_valid(&self) -> bool {
        self.base_clock_hz > 0
            && self.serializer_divisor.is_finite()
            && self.serializer_divisor > 0.0
    }
}

impl Default for SampleClock {
    fn default() -> Self {
        // 125 MHz system clock through a 44.25 fractional divider
        Self::new(125_000_000, 44.25)
    }
}

/// Wall-clock time taken to drain `frames` at `sample_rate`
pub fn frames_to_duration(frames: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos((frames as u64 * 1_000_000_000) / sample_rate as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_clock_rate() {
        // 125_000_000 / 44.25 / 64 = 44138.4
        assert_eq!(SampleClock::default().sample_rate(), 44138);
    }

    #[test]
    fn test_integer_divisor() {
        let clock = SampleClock::new(128_000_000, 40.0);
        assert_eq!(clock.sample_rate(), 50_000);
    }

    #[test]
    fn test_invalid_clock() {
        assert_eq!(SampleClock::new(0, 44.25).sample_rate(), 0);
        assert_eq!(SampleClock::new(125_000_000, 0.0).sample_rate(), 0);
        assert!(!SampleClock::new(125_000_000, f32::NAN).is_valid());
    }

    #[test]
    fn test_frames_to_duration() {
        assert_eq!(frames_to_duration(48_000, 48_000), Duration::from_secs(1));
        assert_eq!(frames_to_duration(48, 48_000), Duration::from_millis(1));
        assert_eq!(frames_to_duration(10, 0), Duration::ZERO);
    }
}
