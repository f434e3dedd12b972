// Voice - One mixer channel playing a drum waveform from start to end

use crate::sampler::{SampleId, SampleLibrary};
use crate::sequencer::Intensity;

/// Largest pan value; left gain is `pan`, right gain is `PAN_MAX - pan`
pub const PAN_MAX: u8 = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pan: u8,
    volume: u8,
    sample: Option<SampleId>,
    // 0 = idle (reads the silence sentinel)
    position: usize,
    emphasis: u16,
}

impl Voice {
    pub fn new(pan: u8, volume: u8, sample: Option<SampleId>) -> Self {
        assert!(pan <= PAN_MAX, "Pan must be within 0..=32");

        Self {
            pan,
            volume,
            sample,
            position: 0,
            emphasis: 0,
        }
    }

    /// Restart the waveform from its first audible sample.
    ///
    /// A hit on a voice that is still sounding cuts the old hit off.
    #[inline]
    pub fn trigger(&mut self, intensity: Intensity) {
        self.position = 1;
        self.emphasis = intensity.emphasis();
    }

    /// Current sample and step forward; idle voices stay on the sentinel
    #[inline]
    pub fn next_sample(&mut self, library: &SampleLibrary) -> i16 {
        let Some(waveform) = self.sample.and_then(|id| library.get(id)) else {
            return 0;
        };

        let value = waveform.get(self.position);
        if self.position != 0 {
            self.position += 1;
            if self.position >= waveform.table_len() {
                self.position = 0;
            }
        }
        value
    }

    /// volume + emphasis
    #[inline]
    pub fn gain(&self) -> i64 {
        self.volume as i64 + self.emphasis as i64
    }

    /// (left, right) pan weights, summing to `PAN_MAX`
    #[inline]
    pub fn pan_weights(&self) -> (i64, i64) {
        (self.pan as i64, (PAN_MAX - self.pan) as i64)
    }

    pub fn pan(&self) -> u8 {
        self.pan
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn sample(&self) -> Option<SampleId> {
        self.sample
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn emphasis(&self) -> u16 {
        self.emphasis
    }

    pub fn is_playing(&self) -> bool {
        self.position != 0
    }
}
