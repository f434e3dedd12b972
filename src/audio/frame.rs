// Stereo frame - the packed unit handed to the transfer mechanism
//
// One frame is a single 32-bit word: left sample in the high half, right
// sample in the low half, both signed 16-bit PCM.

/// Right shift applied to the wide mix accumulators before packing.
///
/// volume (8 bits) x pan (5 bits) grows a 16-bit sample by 13 bits; the two
/// extra bits leave headroom for several voices summing at full scale.
pub const MIX_SHIFT: u32 = 15;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StereoFrame {
    pub left: i16,
    pub right: i16,
}

impl StereoFrame {
    pub const SILENCE: StereoFrame = StereoFrame { left: 0, right: 0 };

    pub fn new(left: i16, right: i16) -> Self {
        Self { left, right }
    }

    /// Convert mix accumulators to output width: shift by `MIX_SHIFT`, then
    /// saturate to the i16 range.
    #[inline]
    pub fn from_accumulators(left: i64, right: i64) -> Self {
        Self {
            left: narrow(left),
            right: narrow(right),
        }
    }

    /// Pack into the wire word (left high, right low)
    #[inline]
    pub fn pack(self) -> u32 {
        ((self.left as u16 as u32) << 16) | (self.right as u16 as u32)
    }

    #[inline]
    pub fn unpack(word: u32) -> Self {
        Self {
            left: (word >> 16) as u16 as i16,
            right: word as u16 as i16,
        }
    }
}

#[inline]
fn narrow(acc: i64) -> i16 {
    (acc >> MIX_SHIFT).clamp(i16::MIN as i64, i16::MAX as i64) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_layout() {
        let frame = StereoFrame::new(0x1234, -1);
        assert_eq!(frame.pack(), 0x1234_FFFF);

        let frame = StereoFrame::new(-2, 7);
        assert_eq!(frame.pack(), 0xFFFE_0007);
        assert_eq!(StereoFrame::unpack(0xFFFE_0007), frame);
    }

    #[test]
    fn test_silence_packs_to_zero() {
        assert_eq!(StereoFrame::SILENCE.pack(), 0);
        assert_eq!(StereoFrame::unpack(0), StereoFrame::SILENCE);
    }

    #[test]
    fn test_accumulator_shift() {
        // volume 255, pan 32, full-scale sample on one channel
        let acc = 255i64 * 32767 * 32;
        let frame = StereoFrame::from_accumulators(acc, 0);
        assert_eq!(frame.left, (acc >> MIX_SHIFT) as i16);
        assert_eq!(frame.right, 0);
    }

    #[test]
    fn test_accumulator_saturates() {
        let frame = StereoFrame::from_accumulators(i64::MAX / 2, i64::MIN / 2);
        assert_eq!(frame.left, i16::MAX);
        assert_eq!(frame.right, i16::MIN);
    }

    #[test]
    fn test_negative_shift_rounds_toward_negative_infinity() {
        // arithmetic shift, not division
        let frame = StereoFrame::from_accumulators(-1, -(1 << MIX_SHIFT));
        assert_eq!(frame.left, -1);
        assert_eq!(frame.right, -1);
    }
}
