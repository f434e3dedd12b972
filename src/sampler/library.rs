// Sample library - Immutable registry of drum waveforms

use std::sync::Arc;

/// Index of a waveform in the library
pub type SampleId = usize;

/// Immutable signed 16-bit waveform.
///
/// Index 0 is always silence, so an idle voice can keep reading it forever.
/// Audible samples start at index 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waveform {
    name: String,
    table: Box<[i16]>,
}

impl Waveform {
    /// Build from audible samples; the silence sentinel is prepended
    pub fn new(name: impl Into<String>, samples: &[i16]) -> Self {
        let mut table = Vec::with_capacity(samples.len() + 1);
        table.push(0);
        table.extend_from_slice(samples);

        Self {
            name: name.into(),
            table: table.into_boxed_slice(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Sample at `position`; 0 past the end
    #[inline]
    pub fn get(&self, position: usize) -> i16 {
        self.table.get(position).copied().unwrap_or(0)
    }

    /// Stored length including the sentinel. A playing voice wraps to idle
    /// when its position reaches this value.
    #[inline]
    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    /// Number of audible samples (frames of playback per onset)
    pub fn len(&self) -> usize {
        self.table.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn samples(&self) -> &[i16] {
        &self.table[1..]
    }

    /// Largest absolute amplitude
    pub fn peak(&self) -> u16 {
        self.table.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0)
    }
}

/// Read-only set of waveforms addressed by `SampleId`
#[derive(Debug, Clone, Default)]
pub struct SampleLibrary {
    waveforms: Vec<Waveform>,
}

impl SampleLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waveform at startup. Returns its id.
    pub fn insert(&mut self, waveform: Waveform) -> SampleId {
        self.waveforms.push(waveform);
        self.waveforms.len() - 1
    }

    /// Freeze the library for sharing with the mixer
    pub fn into_shared(self) -> Arc<SampleLibrary> {
        Arc::new(self)
    }

    #[inline]
    pub fn get(&self, id: SampleId) -> Option<&Waveform> {
        self.waveforms.get(id)
    }

    pub fn find(&self, name: &str) -> Option<SampleId> {
        self.waveforms.iter().position(|w| w.name == name)
    }

    pub fn len(&self) -> usize {
        self.waveforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waveforms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SampleId, &Waveform)> {
        self.waveforms.iter().enumerate()
    }
}
