// Synth module - Drum voices and the stereo mixer

pub mod mixer;
pub mod voice;

pub use mixer::VoiceMixer;
pub use voice::{PAN_MAX, Voice};
