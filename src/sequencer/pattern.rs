// Pattern - One bar of drum hits, one row per voice, one column per tick
//
// Cells are decoded from their text form once, when the configuration is
// loaded. The audio path only ever sees `Onset` values.

use crate::config::ConfigError;

/// Gain added per intensity level above 1
pub const EMPHASIS_STEP: u16 = 12;

/// Hit strength 1..=9
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Intensity(u8);

impl Intensity {
    pub const MIN: Intensity = Intensity(1);
    pub const MAX: Intensity = Intensity(9);

    pub fn new(level: u8) -> Option<Self> {
        (Self::MIN.0..=Self::MAX.0)
            .contains(&level)
            .then_some(Self(level))
    }

    pub fn level(self) -> u8 {
        self.0
    }

    /// Gain boost for this level: 0 at level 1, +12 per level above
    #[inline]
    pub fn emphasis(self) -> u16 {
        (self.0 as u16 - 1) * EMPHASIS_STEP
    }
}

/// Content of one pattern cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Onset {
    #[default]
    Rest,
    Hit(Intensity),
}

impl Onset {
    /// Decode a cell: space or '.' is a rest, '1'..='9' a hit
    pub fn from_cell(cell: char) -> Option<Self> {
        match cell {
            ' ' | '.' => Some(Onset::Rest),
            _ => cell
                .to_digit(10)
                .and_then(|d| Intensity::new(d as u8))
                .map(Onset::Hit),
        }
    }

    pub fn to_cell(self) -> char {
        match self {
            Onset::Rest => '.',
            Onset::Hit(intensity) => char::from(b'0' + intensity.level()),
        }
    }
}

/// Immutable grid of onsets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    name: String,
    voices: usize,
    ticks: usize,
    // row-major: voice * ticks + tick
    cells: Vec<Onset>,
}

impl Pattern {
    /// Create an empty pattern (all rests)
    pub fn new(name: impl Into<String>, voices: usize, ticks: usize) -> Self {
        assert!(ticks > 0, "Pattern must have at least 1 tick");

        Self {
            name: name.into(),
            voices,
            ticks,
            cells: vec![Onset::Rest; voices * ticks],
        }
    }

    /// Decode text rows, one per voice.
    ///
    /// Rows shorter than `ticks` are padded with rests; longer rows and
    /// unknown characters are rejected.
    pub fn parse<S: AsRef<str>>(
        name: &str,
        rows: &[S],
        voices: usize,
        ticks: usize,
    ) -> Result<Self, ConfigError> {
        if rows.len() != voices {
            return Err(ConfigError::RowCount {
                pattern: name.to_string(),
                expected: voices,
                found: rows.len(),
            });
        }

        let mut pattern = Self::new(name, voices, ticks);
        for (voice, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let found = row.chars().count();
            if found > ticks {
                return Err(ConfigError::RowTooLong {
                    pattern: name.to_string(),
                    row: voice,
                    found,
                    ticks,
                });
            }

            for (tick, cell) in row.chars().enumerate() {
                let onset = Onset::from_cell(cell).ok_or_else(|| ConfigError::InvalidCell {
                    pattern: name.to_string(),
                    row: voice,
                    tick,
                    cell,
                })?;
                pattern.set(voice, tick, onset);
            }
        }

        Ok(pattern)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn voices(&self) -> usize {
        self.voices
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    /// Onset for `voice` at `tick`; rows or ticks outside the grid are rests
    #[inline]
    pub fn onset(&self, voice: usize, tick: usize) -> Onset {
        if voice >= self.voices || tick >= self.ticks {
            return Onset::Rest;
        }
        self.cells[voice * self.ticks + tick]
    }

    pub fn set(&mut self, voice: usize, tick: usize, onset: Onset) {
        assert!(voice < self.voices && tick < self.ticks, "Cell outside pattern");
        self.cells[voice * self.ticks + tick] = onset;
    }

    /// Text form of one row
    pub fn row_string(&self, voice: usize) -> String {
        (0..self.ticks)
            .map(|tick| self.onset(voice, tick).to_cell())
            .collect()
    }

    /// Number of hits in the whole grid
    pub fn hit_count(&self) -> usize {
        self.cells.iter().filter(|c| **c != Onset::Rest).count()
    }
}

/// Cyclic bar -> pattern mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrangement {
    bars: Vec<usize>,
}

impl Arrangement {
    pub fn new(bars: Vec<usize>, pattern_count: usize) -> Result<Self, ConfigError> {
        if bars.is_empty() {
            return Err(ConfigError::EmptyArrangement);
        }
        if let Some((bar, &pattern)) = bars.iter().enumerate().find(|(_, p)| **p >= pattern_count) {
            return Err(ConfigError::UnknownPattern { bar, pattern });
        }

        Ok(Self { bars })
    }

    /// Loop length in bars
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    #[inline]
    pub fn pattern_for_bar(&self, bar: usize) -> usize {
        self.bars[bar % self.bars.len()]
    }

    pub fn bars(&self) -> &[usize] {
        &self.bars
    }
}
