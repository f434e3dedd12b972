// Sequencer Player - Fires pattern onsets on tick boundaries

use super::pattern::{Arrangement, Onset, Pattern};
use super::transport::{Transport, TransportStep, TransportTiming};
use crate::config::ConfigError;
use crate::synth::Voice;

/// Walks the arrangement one sample at a time and triggers voices
pub struct PatternSequencer {
    transport: Transport,
    patterns: Vec<Pattern>,
    arrangement: Arrangement,
}

impl PatternSequencer {
    /// Every arranged pattern must span `timing.ticks_per_bar` ticks and the
    /// arrangement must be `timing.loop_bars` long.
    pub fn new(
        timing: TransportTiming,
        patterns: Vec<Pattern>,
        arrangement: Arrangement,
    ) -> Result<Self, ConfigError> {
        if arrangement.len() != timing.loop_bars {
            return Err(ConfigError::LoopLengthMismatch {
                bars: arrangement.len(),
                loop_bars: timing.loop_bars,
            });
        }
        if let Some(pattern) = patterns.iter().find(|p| p.ticks() != timing.ticks_per_bar) {
            return Err(ConfigError::TickCountMismatch {
                pattern: pattern.name().to_string(),
                found: pattern.ticks(),
                expected: timing.ticks_per_bar,
            });
        }
        if let Some((bar, &pattern)) = arrangement
            .bars()
            .iter()
            .enumerate()
            .find(|(_, p)| **p >= patterns.len())
        {
            return Err(ConfigError::UnknownPattern { bar, pattern });
        }

        Ok(Self {
            transport: Transport::new(timing),
            patterns,
            arrangement,
        })
    }

    /// Process one sample period.
    ///
    /// On the first sample of a tick, every voice whose row has a hit at this
    /// tick is retriggered. The transport then steps forward.
    #[inline]
    pub fn advance(&mut self, voices: &mut [Voice]) -> TransportStep {
        if self.transport.is_tick_start() {
            let pattern = &self.patterns[self.arrangement.pattern_for_bar(self.transport.bar())];
            let tick = self.transport.tick();

            for (row, voice) in voices.iter_mut().enumerate() {
                if let Onset::Hit(intensity) = pattern.onset(row, tick) {
                    voice.trigger(intensity);
                }
            }
        }

        self.transport.advance()
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Pattern playing in the current bar
    pub fn current_pattern(&self) -> &Pattern {
        &self.patterns[self.arrangement.pattern_for_bar(self.transport.bar())]
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn arrangement(&self) -> &Arrangement {
        &self.arrangement
    }

    /// Back to bar 0, tick 0. Voices are left as they are.
    pub fn rewind(&mut self) {
        self.transport.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::{SampleLibrary, Waveform};
    use crate::sequencer::Intensity;

    fn sequencer(rows: &[&str], samples_per_tick: u32, bars: Vec<usize>) -> PatternSequencer {
        let ticks = rows[0].len();
        let pattern = Pattern::parse("p", rows, rows.len(), ticks).unwrap();
        let timing = TransportTiming::new(samples_per_tick, ticks, bars.len());
        let arrangement = Arrangement::new(bars, 1).unwrap();
        PatternSequencer::new(timing, vec![pattern], arrangement).unwrap()
    }

    #[test]
    fn test_onset_fires_on_first_sample_of_tick() {
        let mut sequencer = sequencer(&[" 3  "], 5, vec![0]);
        let mut voices = vec![Voice::new(16, 0, None)];

        // tick 0: nothing
        for _ in 0..5 {
            sequencer.advance(&mut voices);
            assert_eq!(voices[0].position(), 0);
        }

        // first sample of tick 1
        sequencer.advance(&mut voices);
        assert_eq!(voices[0].position(), 1);
        assert_eq!(voices[0].emphasis(), 24);
    }

    #[test]
    fn test_onset_fires_once_per_tick() {
        let mut library = SampleLibrary::new();
        library.insert(Waveform::new("long", &[1; 100]));
        let mut sequencer = sequencer(&["1   "], 10, vec![0]);
        let mut voices = vec![Voice::new(16, 0, Some(0))];

        sequencer.advance(&mut voices);
        voices[0].next_sample(&library);
        for _ in 1..10 {
            sequencer.advance(&mut voices);
            voices[0].next_sample(&library);
        }
        // not retriggered mid-tick
        assert_eq!(voices[0].position(), 11);
    }

    #[test]
    fn test_step_reports_loop() {
        let mut sequencer = sequencer(&["1 "], 2, vec![0, 0]);
        let mut voices = vec![Voice::new(16, 0, None)];

        let steps: Vec<TransportStep> = (0..8).map(|_| sequencer.advance(&mut voices)).collect();
        assert_eq!(steps[7], TransportStep::Loop);
        assert_eq!(steps[3], TransportStep::Bar);
        assert_eq!(sequencer.transport().position(), (0, 0, 0));
    }

    #[test]
    fn test_arrangement_selects_pattern() {
        let a = Pattern::parse("a", &["1 "], 1, 2).unwrap();
        let b = Pattern::parse("b", &[" 9"], 1, 2).unwrap();
        let timing = TransportTiming::new(1, 2, 2);
        let arrangement = Arrangement::new(vec![1, 0], 2).unwrap();
        let mut sequencer = PatternSequencer::new(timing, vec![a, b], arrangement).unwrap();
        let mut voices = vec![Voice::new(16, 0, None)];

        assert_eq!(sequencer.current_pattern().name(), "b");
        sequencer.advance(&mut voices);
        assert_eq!(voices[0].position(), 0);
        sequencer.advance(&mut voices);
        assert_eq!(voices[0].emphasis(), Intensity::MAX.emphasis());

        assert_eq!(sequencer.current_pattern().name(), "a");
    }

    #[test]
    fn test_extra_voices_stay_idle() {
        let mut sequencer = sequencer(&["1   "], 1, vec![0]);
        let mut voices = vec![Voice::new(16, 0, None), Voice::new(16, 0, None)];
        sequencer.advance(&mut voices);
        assert!(voices[0].is_playing());
        assert!(!voices[1].is_playing());
    }

    #[test]
    fn test_rejects_mismatched_shape() {
        let pattern = Pattern::parse("p", &["1   "], 1, 4).unwrap();
        let timing = TransportTiming::new(1, 8, 1);
        let arrangement = Arrangement::new(vec![0], 1).unwrap();
        assert!(matches!(
            PatternSequencer::new(timing, vec![pattern], arrangement.clone()),
            Err(ConfigError::TickCountMismatch { found: 4, expected: 8, .. })
        ));

        let pattern = Pattern::parse("p", &["1   "], 1, 4).unwrap();
        let timing = TransportTiming::new(1, 4, 2);
        assert!(matches!(
            PatternSequencer::new(timing, vec![pattern], arrangement),
            Err(ConfigError::LoopLengthMismatch { bars: 1, loop_bars: 2 })
        ));
    }

    #[test]
    fn test_rewind() {
        let mut sequencer = sequencer(&["1   "], 3, vec![0]);
        let mut voices = vec![Voice::new(16, 0, None)];
        for _ in 0..7 {
            sequencer.advance(&mut voices);
        }
        sequencer.rewind();
        assert_eq!(sequencer.transport().position(), (0, 0, 0));
    }
}
