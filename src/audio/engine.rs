// Drum engine - Frame generation and the block fill loop
//
// `DrumMachine` owns every piece of sequencing and mixing state and turns it
// into one stereo frame per call. `DrumEngine` drives it block by block into
// the producer half of the buffer ring.
//
// The fill path never locks or logs. Anything worth reporting is pushed into
// the notification channel and logged by the control thread.

use ringbuf::traits::{Consumer, Producer};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

use crate::audio::buffer::{RingProducer, STARTUP_REPEATS};
use crate::audio::cpu_monitor::CpuMonitor;
use crate::audio::frame::StereoFrame;
use crate::config::{ConfigError, EngineConfig};
use crate::messaging::channels::{CommandConsumer, NotificationProducer};
use crate::messaging::command::Command;
use crate::messaging::notification::Notification;
use crate::sampler::SampleLibrary;
use crate::sequencer::PatternSequencer;
use crate::synth::{PAN_MAX, Voice, VoiceMixer};

/// Sequencer and mixer, advanced together one frame at a time
pub struct DrumMachine {
    sequencer: PatternSequencer,
    mixer: VoiceMixer,
}

impl DrumMachine {
    pub fn new(sequencer: PatternSequencer, mixer: VoiceMixer) -> Self {
        Self { sequencer, mixer }
    }

    /// Build from a validated config, with voices bound to `library` by name
    pub fn from_config(
        config: &EngineConfig,
        library: Arc<SampleLibrary>,
        sample_rate: u32,
    ) -> Result<Self, ConfigError> {
        let timing = config.timing(sample_rate)?;
        let sequencer =
            PatternSequencer::new(timing, config.parse_patterns()?, config.arrangement()?)?;

        let voices = config
            .voices
            .iter()
            .enumerate()
            .map(|(index, voice)| {
                let sample = match &voice.sample {
                    Some(name) => Some(library.find(name).ok_or_else(|| {
                        ConfigError::UnknownSample {
                            voice: index,
                            name: name.clone(),
                        }
                    })?),
                    None => None,
                };
                if voice.pan > PAN_MAX {
                    return Err(ConfigError::PanOutOfRange {
                        voice: index,
                        pan: voice.pan,
                    });
                }
                Ok(Voice::new(voice.pan, voice.volume, sample))
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            samples_per_tick = timing.samples_per_tick,
            loop_frames = timing.loop_length_samples(),
            voices = voices.len(),
            "drum machine ready"
        );

        Ok(Self::new(sequencer, VoiceMixer::new(voices, library)))
    }

    /// Fire due onsets, step the transport, then mix
    #[inline]
    pub fn next_frame(&mut self) -> StereoFrame {
        self.sequencer.advance(self.mixer.voices_mut());
        self.mixer.render()
    }

    pub fn render_into(&mut self, out: &mut [StereoFrame]) {
        for frame in out.iter_mut() {
            *frame = self.next_frame();
        }
    }

    pub fn sequencer(&self) -> &PatternSequencer {
        &self.sequencer
    }

    pub fn mixer(&self) -> &VoiceMixer {
        &self.mixer
    }

    /// Back to the top of the loop; voices already sounding ring out
    pub fn rewind(&mut self) {
        self.sequencer.rewind();
    }
}

/// Outcome of one pass of the fill loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStatus {
    /// At least one block was written
    Filled(usize),
    /// Every free slot is full, the consumer has to move first
    Backpressure,
}

/// Producer side: keeps the ring topped up from the drum machine
pub struct DrumEngine {
    machine: DrumMachine,
    producer: RingProducer,
    cpu_monitor: CpuMonitor,
    notifications: Option<NotificationProducer>,
    overloaded: bool,
    repeats_reported: u64,
}

impl DrumEngine {
    pub fn new(machine: DrumMachine, producer: RingProducer, sample_rate: u32) -> Self {
        let cpu_monitor = CpuMonitor::new(sample_rate, producer.ring().frames_per_block());

        Self {
            machine,
            producer,
            cpu_monitor,
            notifications: None,
            overloaded: false,
            repeats_reported: STARTUP_REPEATS,
        }
    }

    /// Route overload and repeated-block warnings to `notifications`
    pub fn with_notifications(mut self, notifications: NotificationProducer) -> Self {
        self.notifications = Some(notifications);
        self
    }

    /// Shared handle on the fill-time statistics
    pub fn cpu_monitor(&self) -> CpuMonitor {
        self.cpu_monitor.clone()
    }

    pub fn machine(&self) -> &DrumMachine {
        &self.machine
    }

    pub fn producer(&self) -> &RingProducer {
        &self.producer
    }

    /// Fill the ring before the first transfer is armed.
    ///
    /// Returns the number of blocks written (the ring depth on a fresh ring).
    pub fn prefill(&mut self) -> usize {
        let blocks = self.fill_lap();
        debug!(blocks, "ring primed");
        blocks
    }

    /// Fill every slot the consumer has released
    pub fn pump(&mut self) -> FillStatus {
        self.check_repeats();
        let blocks = self.fill_lap();

        if blocks == 0 {
            FillStatus::Backpressure
        } else {
            FillStatus::Filled(blocks)
        }
    }

    // At most one lap per call
    fn fill_lap(&mut self) -> usize {
        let depth = self.producer.ring().depth();
        let mut blocks = 0;
        while blocks < depth && self.fill_one() {
            blocks += 1;
        }
        blocks
    }

    #[inline]
    fn fill_one(&mut self) -> bool {
        let start = self.cpu_monitor.start_measure();
        let machine = &mut self.machine;
        let filled = self.producer.fill_next(|| machine.next_frame()).is_some();
        if filled {
            self.cpu_monitor.end_measure(start);
            self.check_overload();
        }
        filled
    }

    // Raise one warning per overload episode
    fn check_overload(&mut self) {
        let load_pct = self.cpu_monitor.get_cpu_percentage();
        let overloaded = load_pct > 100.0;
        if overloaded && !self.overloaded {
            self.notify(Notification::FillOverload { load_pct });
        }
        self.overloaded = overloaded;
    }

    // Report stale transfers beyond the one every start produces
    fn check_repeats(&mut self) {
        let total = self.producer.ring().stats().repeated_blocks;
        if total > self.repeats_reported {
            let count = total - self.repeats_reported;
            self.repeats_reported = total;
            self.notify(Notification::BlocksRepeated { count, total });
        }
    }

    fn notify(&mut self, notification: Notification) {
        if let Some(tx) = self.notifications.as_mut() {
            let _ = tx.try_push(notification);
        }
    }

    /// Run the fill loop until `Command::Stop`.
    ///
    /// Between passes the loop sleeps for `poll`; a quarter of a block's
    /// playback time keeps it ahead of the consumer.
    pub fn run(mut self, mut commands: CommandConsumer, poll: Duration) -> Self {
        loop {
            while let Some(command) = commands.try_pop() {
                match command {
                    Command::Rewind => self.machine.rewind(),
                    Command::Stop => return self,
                }
            }

            if self.pump() == FillStatus::Backpressure {
                thread::sleep(poll);
            }
        }
    }

    /// Sleep interval suited to this ring's block size
    pub fn default_poll(&self) -> Duration {
        (self.cpu_monitor.block_duration() / 4).max(Duration::from_micros(100))
    }
}
