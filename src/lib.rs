// drumloop - Library exports for the CLI, tests and benchmarks

pub mod audio;
pub mod codec;
pub mod config;
pub mod messaging;
pub mod sampler;
pub mod sequencer;
pub mod synth;

// Re-export commonly used types for convenience
pub use audio::buffer::{BufferRing, RingConsumer, RingMonitor, RingProducer, RingStats};
pub use audio::engine::{DrumEngine, DrumMachine, FillStatus};
pub use audio::frame::StereoFrame;
pub use audio::sink::{BlockLatch, OutputDevice, OutputSink};
pub use audio::timing::SampleClock;
pub use config::{ConfigError, EngineConfig};
pub use messaging::channels::{create_command_channel, create_notification_channel};
pub use sampler::{SampleLibrary, Waveform, build_library};
pub use sequencer::{Pattern, PatternSequencer, Transport, TransportTiming};
pub use synth::{Voice, VoiceMixer};
