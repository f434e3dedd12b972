// PCM5242 - Clock and interface setup for running the DAC from the bit clock
//
// The DAC has no master clock here: its PLL is fed from BCK. Divider values
// suit a 64x BCK/LRCK ratio at roughly 44.1 kHz with 16-bit I2S words.

use tracing::{debug, info, warn};

use super::{CodecError, RegisterBus};

/// 7-bit I2C address with both ADR pins low
pub const DEFAULT_ADDRESS: u8 = 0x4D;

const PAGE_SELECT: u8 = 0x00;

/// Register writes in order, all on page 0
pub const INIT_SEQUENCE: [(u8, u8); 19] = [
    // disable auto clock config, ignore SCK loss
    (0x25, 0x1A),
    // PLL: P=1, J=32, D=0, R=2
    (0x14, 0x00),
    (0x15, 0x32),
    (0x16, 0x00),
    (0x17, 0x00),
    (0x18, 0x01),
    // NMAC=2, NDAC=16, NCP=4, OSR=8
    (0x1B, 0x01),
    (0x1C, 0x0F),
    (0x1D, 0x04),
    (0x1E, 0x07),
    // single speed
    (0x22, 0x00),
    // 1024 DSP cycles per sample
    (0x23, 0x04),
    (0x24, 0x00),
    // PLL reference = BCK
    (0x0D, 0x10),
    // I2S, 16-bit words
    (40, 0x00),
    // digital volume 0 dB, both channels
    (61, 0x00),
    (62, 0x00),
    // auto-mute off
    (65, 0x00),
    // stand-by request
    (0x02, 0x10),
];

/// Final write that releases stand-by
const STANDBY_RELEASE: (u8, u8) = (0x02, 0x00);

/// Expected page 0 status once the DAC is running
pub const STATUS_CHECKS: [(u8, u8); 11] = [
    (90, 0x00),
    (91, 0x30),
    (93, 0x20),
    (94, 0x40),
    (95, 0x10),
    (108, 0x33),
    (109, 0x00),
    (115, 0x00),
    (118, 0x85),
    (120, 0x00),
    (4, 0x01),
];

/// A register that did not read back what was expected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterMismatch {
    pub reg: u8,
    pub expected: u8,
    pub found: u8,
}

/// Everything that went wrong while programming the DAC
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodecReport {
    pub writes: usize,
    pub failed_writes: Vec<(u8, CodecError)>,
    pub mismatches: Vec<RegisterMismatch>,
    pub failed_reads: Vec<(u8, CodecError)>,
}

impl CodecReport {
    pub fn is_clean(&self) -> bool {
        self.failed_writes.is_empty() && self.mismatches.is_empty() && self.failed_reads.is_empty()
    }
}

pub struct Pcm5242<B: RegisterBus> {
    bus: B,
}

impl<B: RegisterBus> Pcm5242<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn into_bus(self) -> B {
        self.bus
    }

    pub fn select_page(&mut self, page: u8) -> Result<(), CodecError> {
        self.bus.write_register(PAGE_SELECT, page)
    }

    /// Run the full setup sequence, then read every register back.
    ///
    /// Never fails: bus errors and read-back mismatches are logged and
    /// collected in the report, and the sequence carries on.
    pub fn configure(&mut self) -> CodecReport {
        let mut report = CodecReport::default();

        let writes = std::iter::once((PAGE_SELECT, 0))
            .chain(INIT_SEQUENCE)
            .chain(std::iter::once(STANDBY_RELEASE));
        for (reg, value) in writes {
            report.writes += 1;
            if let Err(err) = self.bus.write_register(reg, value) {
                warn!(reg, value, %err, "codec write failed");
                report.failed_writes.push((reg, err));
            }
        }

        self.verify_into(&mut report);
        info!(
            writes = report.writes,
            failed = report.failed_writes.len(),
            mismatches = report.mismatches.len(),
            "codec configured"
        );
        report
    }

    /// Compare the last value written to each register with what reads back
    pub fn verify(&mut self) -> CodecReport {
        let mut report = CodecReport::default();
        self.verify_into(&mut report);
        report
    }

    fn verify_into(&mut self, report: &mut CodecReport) {
        let expected = final_values();
        self.check(&expected, report);
    }

    /// Compare the run-time status registers against a healthy DAC
    pub fn check_status(&mut self) -> CodecReport {
        let mut report = CodecReport::default();
        if let Err(err) = self.select_page(0) {
            report.failed_writes.push((PAGE_SELECT, err));
            return report;
        }
        self.check(&STATUS_CHECKS, &mut report);
        report
    }

    fn check(&mut self, expected: &[(u8, u8)], report: &mut CodecReport) {
        for &(reg, value) in expected {
            match self.bus.read_register(reg) {
                Ok(found) if found != value => {
                    debug!(reg, expected = value, found, "codec register mismatch");
                    report.mismatches.push(RegisterMismatch {
                        reg,
                        expected: value,
                        found,
                    });
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(reg, %err, "codec read failed");
                    report.failed_reads.push((reg, err));
                }
            }
        }
    }

    /// Read registers 0..255 of the current page; unreadable ones are `None`
    pub fn dump_registers(&mut self) -> Vec<(u8, Option<u8>)> {
        (0..255u8)
            .map(|reg| match self.bus.read_register(reg) {
                Ok(value) => (reg, Some(value)),
                Err(err) => {
                    debug!(reg, %err, "register dump read failed");
                    (reg, None)
                }
            })
            .collect()
    }
}

// Last value written to each register by the setup sequence
fn final_values() -> Vec<(u8, u8)> {
    let mut values: Vec<(u8, u8)> = Vec::new();
    for (reg, value) in INIT_SEQUENCE.into_iter().chain(std::iter::once(STANDBY_RELEASE)) {
        match values.iter_mut().find(|(r, _)| *r == reg) {
            Some(entry) => entry.1 = value,
            None => values.push((reg, value)),
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MemoryBus;

    /// Bus that drops writes and reads to selected registers
    struct FaultyBus {
        inner: MemoryBus,
        bad_write: u8,
        bad_read: u8,
    }

    impl RegisterBus for FaultyBus {
        fn write_register(&mut self, reg: u8, value: u8) -> Result<(), CodecError> {
            if reg == self.bad_write {
                return Err(CodecError::Nack {
                    address: DEFAULT_ADDRESS,
                    reg,
                });
            }
            self.inner.write_register(reg, value)
        }

        fn read_register(&mut self, reg: u8) -> Result<u8, CodecError> {
            if reg == self.bad_read {
                return Err(CodecError::ShortRead { reg });
            }
            self.inner.read_register(reg)
        }
    }

    #[test]
    fn test_sequence_order() {
        let mut codec = Pcm5242::new(MemoryBus::new(DEFAULT_ADDRESS));
        let report = codec.configure();
        assert!(report.is_clean());
        assert_eq!(report.writes, 21);

        let writes = codec.bus().writes();
        assert_eq!(writes.first(), Some(&(0, 0x00, 0x00)));
        assert_eq!(writes[1], (0, 0x25, 0x1A));
        assert_eq!(writes[19], (0, 0x02, 0x10));
        assert_eq!(writes[20], (0, 0x02, 0x00));
    }

    #[test]
    fn test_standby_released_last() {
        let mut codec = Pcm5242::new(MemoryBus::new(DEFAULT_ADDRESS));
        codec.configure();
        let mut bus = codec.into_bus();
        assert_eq!(bus.read_register(0x02), Ok(0x00));
        assert_eq!(bus.read_register(0x15), Ok(0x32));
    }

    #[test]
    fn test_write_failure_does_not_stop_sequence() {
        let bus = FaultyBus {
            inner: MemoryBus::new(DEFAULT_ADDRESS),
            bad_write: 0x15,
            bad_read: 0xFF,
        };
        let mut codec = Pcm5242::new(bus);
        let report = codec.configure();

        assert_eq!(report.failed_writes.len(), 1);
        assert_eq!(report.failed_writes[0].0, 0x15);
        // later writes still landed
        assert_eq!(codec.bus().inner.writes().last(), Some(&(0, 0x02, 0x00)));
        // and the missing one shows up on read-back
        assert_eq!(
            report.mismatches,
            vec![RegisterMismatch {
                reg: 0x15,
                expected: 0x32,
                found: 0
            }]
        );
    }

    #[test]
    fn test_read_failure_reported() {
        let bus = FaultyBus {
            inner: MemoryBus::new(DEFAULT_ADDRESS),
            bad_write: 0xFF,
            bad_read: 0x1C,
        };
        let mut codec = Pcm5242::new(bus);
        let report = codec.configure();
        assert_eq!(report.failed_reads.len(), 1);
        assert!(!report.is_clean());

        let dump = codec.dump_registers();
        assert_eq!(dump.len(), 255);
        assert_eq!(dump[0x1C], (0x1C, None));
        assert_eq!(dump[0x25], (0x25, Some(0x1A)));
    }

    #[test]
    fn test_status_check() {
        let mut bus = MemoryBus::new(DEFAULT_ADDRESS);
        for (reg, value) in STATUS_CHECKS {
            bus.poke(0, reg, value);
        }
        bus.poke(0, 118, 0x00);

        let mut codec = Pcm5242::new(bus);
        let report = codec.check_status();
        assert_eq!(
            report.mismatches,
            vec![RegisterMismatch {
                reg: 118,
                expected: 0x85,
                found: 0x00
            }]
        );
    }

    #[test]
    fn test_final_values_dedup() {
        let values = final_values();
        assert_eq!(values.iter().filter(|(r, _)| *r == 0x02).count(), 1);
        assert!(values.contains(&(0x02, 0x00)));
        assert_eq!(values.len(), 19);
    }
}
