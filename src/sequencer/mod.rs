// Sequencer module
// Pattern grids, bar arrangement and the sample-accurate transport

pub mod pattern;
pub mod player;
pub mod transport;

pub use pattern::{Arrangement, Intensity, Onset, Pattern};
pub use player::PatternSequencer;
pub use transport::{Transport, TransportStep, TransportTiming};
