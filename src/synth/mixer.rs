// Voice Mixer - Sums every voice into one stereo frame per call

use std::sync::Arc;

use super::voice::Voice;
use crate::audio::frame::StereoFrame;
use crate::sampler::SampleLibrary;

pub struct VoiceMixer {
    voices: Vec<Voice>,
    library: Arc<SampleLibrary>,
}

impl VoiceMixer {
    pub fn new(voices: Vec<Voice>, library: Arc<SampleLibrary>) -> Self {
        Self { voices, library }
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn voices_mut(&mut self) -> &mut [Voice] {
        &mut self.voices
    }

    pub fn library(&self) -> &SampleLibrary {
        &self.library
    }

    /// Wide accumulators for one frame, before scaling.
    ///
    /// left  += sample * gain * pan
    /// right += sample * gain * (32 - pan)
    ///
    /// Every voice advances, including silent ones.
    #[inline]
    pub fn mix(&mut self) -> (i64, i64) {
        let mut left = 0i64;
        let mut right = 0i64;

        for voice in &mut self.voices {
            let sample = voice.next_sample(&self.library) as i64;
            let weighted = sample * voice.gain();
            let (pan_left, pan_right) = voice.pan_weights();
            left += weighted * pan_left;
            right += weighted * pan_right;
        }

        (left, right)
    }

    /// Next output frame, scaled and saturated
    #[inline]
    pub fn render(&mut self) -> StereoFrame {
        let (left, right) = self.mix();
        StereoFrame::from_accumulators(left, right)
    }

    /// Voices currently sounding
    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_playing()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::frame::MIX_SHIFT;
    use crate::sampler::Waveform;
    use crate::sequencer::Intensity;

    fn mixer(voices: Vec<Voice>, samples: &[i16]) -> VoiceMixer {
        let mut library = SampleLibrary::new();
        library.insert(Waveform::new("test", samples));
        VoiceMixer::new(voices, library.into_shared())
    }

    #[test]
    fn test_idle_mixer_is_silent() {
        let mut mixer = mixer(vec![Voice::new(16, 255, Some(0)); 4], &[i16::MAX; 8]);
        for _ in 0..10 {
            assert_eq!(mixer.render(), StereoFrame::SILENCE);
        }
    }

    #[test]
    fn test_pan_split() {
        let mut mixer = mixer(vec![Voice::new(8, 100, Some(0))], &[1000]);
        mixer.voices_mut()[0].trigger(Intensity::MIN);

        let (left, right) = mixer.mix();
        assert_eq!(left, 1000 * 100 * 8);
        assert_eq!(right, 1000 * 100 * 24);
    }

    #[test]
    fn test_pan_sum_invariant() {
        // left + right == sample * gain * 32 for every pan
        for pan in 0..=32u8 {
            let mut mixer = mixer(vec![Voice::new(pan, 77, Some(0))], &[-1234]);
            mixer.voices_mut()[0].trigger(Intensity::new(2).unwrap());

            let (left, right) = mixer.mix();
            assert_eq!(left + right, -1234 * (77 + 12) * 32);
        }
    }

    #[test]
    fn test_hard_left_and_right() {
        let mut mixer = mixer(
            vec![Voice::new(32, 64, Some(0)), Voice::new(0, 64, Some(0))],
            &[4096],
        );
        mixer.voices_mut()[0].trigger(Intensity::MIN);
        let (left, right) = mixer.mix();
        assert_eq!(right, 0);
        assert_eq!(left, 4096 * 64 * 32);
    }

    #[test]
    fn test_scaled_output() {
        let mut mixer = mixer(vec![Voice::new(16, 128, Some(0))], &[16384]);
        mixer.voices_mut()[0].trigger(Intensity::MIN);

        let expected = ((16384i64 * 128 * 16) >> MIX_SHIFT) as i16;
        assert_eq!(mixer.render(), StereoFrame::new(expected, expected));
    }

    #[test]
    fn test_saturates_instead_of_wrapping() {
        let mut mixer = mixer(vec![Voice::new(32, 255, Some(0)); 6], &[i16::MAX]);
        for voice in mixer.voices_mut() {
            voice.trigger(Intensity::MAX);
        }

        let frame = mixer.render();
        assert_eq!(frame.left, i16::MAX);
        assert_eq!(frame.right, 0);
    }

    #[test]
    fn test_active_voices() {
        let mut mixer = mixer(vec![Voice::new(16, 10, Some(0)); 3], &[1, 2]);
        mixer.voices_mut()[1].trigger(Intensity::MIN);
        assert_eq!(mixer.active_voices(), 1);

        mixer.render();
        mixer.render();
        assert_eq!(mixer.active_voices(), 0);
    }
}
