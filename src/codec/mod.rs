// Codec module - DAC control over a byte-register bus
//
// Codec faults never stop playback. Every operation here reports what went
// wrong and carries on.

pub mod pcm5242;

pub use pcm5242::{CodecReport, Pcm5242, RegisterMismatch};

/// Register bus error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Device 0x{address:02x} did not acknowledge register 0x{reg:02x}")]
    Nack { address: u8, reg: u8 },

    #[error("Couldn't read register 0x{reg:02x}")]
    ShortRead { reg: u8 },

    #[error("Bus error: {0}")]
    Bus(String),
}

/// One 8-bit register file behind an address on a control bus
pub trait RegisterBus {
    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), CodecError>;
    fn read_register(&mut self, reg: u8) -> Result<u8, CodecError>;
}

/// Shadow register file standing in for a codec on hosts without one.
///
/// Writes land in the current page (selected through register 0) and are
/// recorded in order.
#[derive(Debug, Clone)]
pub struct MemoryBus {
    address: u8,
    page: u8,
    pages: Vec<[u8; 256]>,
    writes: Vec<(u8, u8, u8)>,
}

impl MemoryBus {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            page: 0,
            pages: vec![[0; 256]],
            writes: Vec::new(),
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn page(&self) -> u8 {
        self.page
    }

    /// Every write as (page, register, value), oldest first
    pub fn writes(&self) -> &[(u8, u8, u8)] {
        &self.writes
    }

    /// Preload a register without recording a write
    pub fn poke(&mut self, page: u8, reg: u8, value: u8) {
        self.page_mut(page)[reg as usize] = value;
    }

    fn page_mut(&mut self, page: u8) -> &mut [u8; 256] {
        let index = page as usize;
        if index >= self.pages.len() {
            self.pages.resize(index + 1, [0; 256]);
        }
        &mut self.pages[index]
    }
}

impl RegisterBus for MemoryBus {
    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), CodecError> {
        self.writes.push((self.page, reg, value));
        if reg == 0 {
            self.page = value;
        }
        let page = self.page;
        self.page_mut(page)[reg as usize] = value;
        Ok(())
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, CodecError> {
        Ok(self
            .pages
            .get(self.page as usize)
            .map(|page| page[reg as usize])
            .unwrap_or(0))
    }
}
