// Output sink - Plays ring blocks through a CPAL output stream
//
// The device callback stands in for the transfer engine: it drains the
// latched block frame by frame and, once the block is used up, raises the
// completion notification that arms the next one.
//
// Supported device formats: F32, I16, U16. Conversion from the packed 16-bit
// frames happens on write through `FromSample<i16>`.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::traits::Producer;
use tracing::info;

use crate::audio::AudioError;
use crate::audio::buffer::{Block, RingConsumer, TransferTarget};
use crate::audio::device::{AtomicDeviceStatus, DeviceStatus, choose_config};
use crate::audio::format_conversion::{write_frame_to_interleaved, write_silence};
use crate::messaging::channels::NotificationProducer;
use crate::messaging::notification::Notification;

/// Private copy of the block currently being played.
///
/// Copying on arm releases the ring slot immediately, so the producer can
/// refill it while this copy drains.
pub struct BlockLatch {
    frames: Box<[u32]>,
    cursor: usize,
    slot: Option<usize>,
}

impl BlockLatch {
    /// Latch sized for `frames_per_block`; starts drained
    pub fn new(frames_per_block: usize) -> Self {
        Self {
            frames: vec![0; frames_per_block].into_boxed_slice(),
            cursor: frames_per_block,
            slot: None,
        }
    }

    #[inline]
    pub fn is_drained(&self) -> bool {
        self.cursor >= self.frames.len()
    }

    /// Next packed frame; silence once drained
    #[inline]
    pub fn next_word(&mut self) -> u32 {
        match self.frames.get(self.cursor) {
            Some(&word) => {
                self.cursor += 1;
                word
            }
            None => 0,
        }
    }

    /// Ring slot the latched frames came from
    pub fn slot(&self) -> Option<usize> {
        self.slot
    }
}

impl TransferTarget for BlockLatch {
    #[inline]
    fn rearm(&mut self, slot: usize, block: &Block) {
        block.copy_to(&mut self.frames);
        self.cursor = 0;
        self.slot = Some(slot);
    }
}

/// Feed one device buffer from the ring
#[inline]
pub fn drain_into<T>(
    consumer: &mut RingConsumer,
    latch: &mut BlockLatch,
    data: &mut [T],
    channels: usize,
) where
    T: SizedSample + FromSample<i16>,
{
    if !consumer.is_started() {
        write_silence(data);
        return;
    }

    for frame in data.chunks_mut(channels) {
        if latch.is_drained() {
            consumer.on_transfer_complete(latch);
        }
        write_frame_to_interleaved(latch.next_word(), frame);
    }
}

pub struct OutputSink {
    _device: Device,
    _stream: Stream,
    sample_rate: u32,
    channels: usize,
    pub status: AtomicDeviceStatus,
}

/// A device with a chosen stream config, not yet playing
pub struct OutputDevice {
    device: Device,
    config: cpal::SupportedStreamConfig,
}

impl OutputDevice {
    /// Resolve the device and settle on a stream config near `preferred_rate`
    pub fn open(device: Device, preferred_rate: u32) -> Result<Self, AudioError> {
        let config = choose_config(&device, preferred_rate)?;
        info!(
            device = %device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate = config.sample_rate().0,
            channels = config.channels(),
            format = ?config.sample_format(),
            "output device selected"
        );
        Ok(Self { device, config })
    }

    /// Rate the stream will actually run at
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate().0
    }

    /// Arm the first transfer and start the stream.
    ///
    /// The ring must already be primed.
    pub fn start(
        self,
        mut consumer: RingConsumer,
        mut notification_tx: NotificationProducer,
    ) -> Result<OutputSink, AudioError> {
        let sample_format = self.config.sample_format();
        let sample_rate = self.config.sample_rate().0;
        let channels = self.config.channels() as usize;
        let config: StreamConfig = self.config.into();

        let status = AtomicDeviceStatus::new(DeviceStatus::Connecting);
        let mut latch = BlockLatch::new(consumer.ring().frames_per_block());
        consumer.start(&mut latch);

        let _ = notification_tx.try_push(Notification::StreamStarted {
            sample_rate,
            channels,
        });

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(
                &self.device,
                &config,
                channels,
                consumer,
                latch,
                status.clone(),
                notification_tx,
            ),
            SampleFormat::I16 => Self::build_stream::<i16>(
                &self.device,
                &config,
                channels,
                consumer,
                latch,
                status.clone(),
                notification_tx,
            ),
            SampleFormat::U16 => Self::build_stream::<u16>(
                &self.device,
                &config,
                channels,
                consumer,
                latch,
                status.clone(),
                notification_tx,
            ),
            other => return Err(AudioError::UnsupportedFormat(other)),
        }?;

        stream.play()?;
        status.set(DeviceStatus::Connected);

        Ok(OutputSink {
            _device: self.device,
            _stream: stream,
            sample_rate,
            channels,
            status,
        })
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        channels: usize,
        mut consumer: RingConsumer,
        mut latch: BlockLatch,
        status: AtomicDeviceStatus,
        mut notification_tx: NotificationProducer,
    ) -> Result<Stream, AudioError>
    where
        T: SizedSample + FromSample<i16> + Send + 'static,
    {
        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                // No allocations, no I/O, no locks
                drain_into(&mut consumer, &mut latch, data, channels);
            },
            move |err| {
                // Runs outside the audio callback
                status.set(DeviceStatus::Error);
                let _ = notification_tx.try_push(Notification::StreamFailed(err.to_string()));
            },
            None,
        )?;

        Ok(stream)
    }
}

impl OutputSink {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }
}
