// Transport - Sample / tick / bar counters driving the pattern lookups
//
// Owned by the fill loop and advanced exactly once per generated frame.
// There is no stopped state: the counters cycle through the loop forever.

use crate::config::ConfigError;

/// Timing constants derived from the tempo settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportTiming {
    pub samples_per_tick: u32,
    pub ticks_per_bar: usize,
    pub loop_bars: usize,
}

impl TransportTiming {
    pub fn new(samples_per_tick: u32, ticks_per_bar: usize, loop_bars: usize) -> Self {
        assert!(samples_per_tick > 0, "A tick must last at least 1 sample");
        assert!(ticks_per_bar > 0, "A bar must have at least 1 tick");
        assert!(loop_bars > 0, "The loop must have at least 1 bar");

        Self {
            samples_per_tick,
            ticks_per_bar,
            loop_bars,
        }
    }

    /// Derive tick length from tempo, in whole samples.
    ///
    /// samples_per_beat = rate * 60 / bpm
    /// samples_per_tick = samples_per_beat * beats_per_bar / ticks_per_bar
    ///
    /// Both divisions truncate, so the loop runs very slightly fast rather than
    /// accumulating fractional drift.
    pub fn from_tempo(
        sample_rate: u32,
        bpm: u32,
        beats_per_bar: u32,
        ticks_per_bar: usize,
        loop_bars: usize,
    ) -> Result<Self, ConfigError> {
        if bpm == 0 {
            return Err(ConfigError::ZeroTempo);
        }
        if beats_per_bar == 0 {
            return Err(ConfigError::ZeroBeatsPerBar);
        }
        if ticks_per_bar == 0 {
            return Err(ConfigError::ZeroTicksPerBar);
        }
        if loop_bars == 0 {
            return Err(ConfigError::EmptyArrangement);
        }

        let samples_per_beat = sample_rate as u64 * 60 / bpm as u64;
        let samples_per_tick = samples_per_beat * beats_per_bar as u64 / ticks_per_bar as u64;
        if samples_per_tick == 0 {
            return Err(ConfigError::TickTooShort { bpm, sample_rate });
        }

        let samples_per_tick =
            u32::try_from(samples_per_tick).map_err(|_| ConfigError::TickTooLong { bpm })?;

        Ok(Self::new(samples_per_tick, ticks_per_bar, loop_bars))
    }

    pub fn samples_per_bar(&self) -> u64 {
        self.samples_per_tick as u64 * self.ticks_per_bar as u64
    }

    /// Frames in one full pass of the arrangement
    pub fn loop_length_samples(&self) -> u64 {
        self.samples_per_bar() * self.loop_bars as u64
    }
}

/// Which boundaries the last `advance()` crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStep {
    /// Still inside the same tick
    Sample,
    /// Entered a new tick in the same bar
    Tick,
    /// Entered a new bar
    Bar,
    /// Wrapped back to bar 0, tick 0
    Loop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transport {
    timing: TransportTiming,
    bar: usize,
    tick: usize,
    sample: u32,
}

impl Transport {
    pub fn new(timing: TransportTiming) -> Self {
        Self {
            timing,
            bar: 0,
            tick: 0,
            sample: 0,
        }
    }

    pub fn timing(&self) -> &TransportTiming {
        &self.timing
    }

    #[inline]
    pub fn bar(&self) -> usize {
        self.bar
    }

    #[inline]
    pub fn tick(&self) -> usize {
        self.tick
    }

    #[inline]
    pub fn sample_of_tick(&self) -> u32 {
        self.sample
    }

    /// True on the first sample of a tick, where onsets fire
    #[inline]
    pub fn is_tick_start(&self) -> bool {
        self.sample == 0
    }

    /// Current position as (bar, tick, sample)
    pub fn position(&self) -> (usize, usize, u32) {
        (self.bar, self.tick, self.sample)
    }

    /// Frames elapsed since the start of the loop
    pub fn frames_into_loop(&self) -> u64 {
        self.bar as u64 * self.timing.samples_per_bar()
            + self.tick as u64 * self.timing.samples_per_tick as u64
            + self.sample as u64
    }

    /// Step one sample, carrying into tick and bar
    #[inline]
    pub fn advance(&mut self) -> TransportStep {
        self.sample += 1;
        if self.sample < self.timing.samples_per_tick {
            return TransportStep::Sample;
        }

        self.sample = 0;
        self.tick += 1;
        if self.tick < self.timing.ticks_per_bar {
            return TransportStep::Tick;
        }

        self.tick = 0;
        self.bar += 1;
        if self.bar < self.timing.loop_bars {
            return TransportStep::Bar;
        }

        self.bar = 0;
        TransportStep::Loop
    }

    /// Back to the top of the loop
    pub fn reset(&mut self) {
        self.bar = 0;
        self.tick = 0;
        self.sample = 0;
    }
}
