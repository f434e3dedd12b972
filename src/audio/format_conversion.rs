// Format conversion for CPAL audio streams
//
// The engine produces packed signed 16-bit stereo frames. Devices may ask for
// f32, i16 or u16; cpal's `FromSample<i16>` covers the conversion.
//
// All conversions are allocation-free and suitable for real-time audio callbacks.

use cpal::{FromSample, Sample};

use crate::audio::frame::StereoFrame;

/// Convert f32 sample to i16
///
/// Maps [-1.0, 1.0] to [i16::MIN, i16::MAX]
/// Clamps values outside the range to prevent overflow
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);

    // Positive and negative halves scale separately so both extremes are reachable
    if clamped >= 0.0 {
        (clamped * i16::MAX as f32) as i16
    } else {
        (clamped * -(i16::MIN as f32)) as i16
    }
}

/// Write one packed engine frame into an interleaved device frame
///
/// Channels past the second are silenced. A mono device gets the average
/// of left and right.
#[inline]
pub fn write_frame_to_interleaved<T>(packed: u32, output_frame: &mut [T])
where
    T: Sample + FromSample<i16>,
{
    let frame = StereoFrame::unpack(packed);

    match output_frame {
        [] => {}
        [mono] => {
            let mixed = ((frame.left as i32 + frame.right as i32) / 2) as i16;
            *mono = T::from_sample(mixed);
        }
        [left, right, rest @ ..] => {
            *left = T::from_sample(frame.left);
            *right = T::from_sample(frame.right);
            for channel_sample in rest {
                *channel_sample = T::EQUILIBRIUM;
            }
        }
    }
}

/// Fill a whole interleaved device buffer with silence
#[inline]
pub fn write_silence<T: Sample>(output: &mut [T]) {
    for sample in output.iter_mut() {
        *sample = T::EQUILIBRIUM;
    }
}
