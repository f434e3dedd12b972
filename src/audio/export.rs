// Audio Export - Offline rendering to WAV files
//
// Runs the same drum machine as live playback, as fast as possible and
// without the buffer ring, writing 16-bit stereo PCM.

use hound::{WavSpec, WavWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::audio::engine::DrumMachine;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Nothing to render: length must be at least one frame")]
    EmptyRender,
}

/// How much to render and where
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub output_path: PathBuf,
    pub sample_rate: u32,
    /// Full passes of the arrangement
    pub loops: u32,
    /// Extra frames after the last loop so the final hits ring out
    pub tail_frames: u64,
}

impl ExportSettings {
    pub fn new(output_path: impl Into<PathBuf>, sample_rate: u32) -> Self {
        Self {
            output_path: output_path.into(),
            sample_rate,
            loops: 1,
            tail_frames: 0,
        }
    }
}

/// Result of a finished export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub frames: u64,
    /// Frames that hit the i16 limit on either channel
    pub clipped_frames: u64,
}

/// Progress callback for export (reports 0.0 to 1.0)
pub type ProgressCallback = Box<dyn FnMut(f32) + Send>;

pub struct AudioExporter {
    settings: ExportSettings,
}

impl AudioExporter {
    pub fn new(settings: ExportSettings) -> Self {
        Self { settings }
    }

    /// Render `settings.loops` passes of the arrangement from `machine`'s
    /// current position
    pub fn export(
        &self,
        machine: &mut DrumMachine,
        mut progress_callback: Option<ProgressCallback>,
    ) -> Result<ExportSummary, ExportError> {
        let loop_frames = machine
            .sequencer()
            .transport()
            .timing()
            .loop_length_samples();
        let total_frames = loop_frames * self.settings.loops as u64 + self.settings.tail_frames;
        if total_frames == 0 {
            return Err(ExportError::EmptyRender);
        }

        info!(
            path = %self.settings.output_path.display(),
            frames = total_frames,
            sample_rate = self.settings.sample_rate,
            "exporting audio"
        );

        let spec = WavSpec {
            channels: 2,
            sample_rate: self.settings.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&self.settings.output_path, spec)?;

        let progress_interval = (self.settings.sample_rate as u64).max(1);
        let mut clipped_frames = 0;

        for rendered in 0..total_frames {
            let frame = machine.next_frame();
            if is_clipped(frame.left) || is_clipped(frame.right) {
                clipped_frames += 1;
            }
            writer.write_sample(frame.left)?;
            writer.write_sample(frame.right)?;

            if rendered % progress_interval == 0 {
                if let Some(callback) = progress_callback.as_mut() {
                    callback(rendered as f32 / total_frames as f32);
                }
            }
        }
        writer.finalize()?;

        if let Some(callback) = progress_callback.as_mut() {
            callback(1.0);
        }
        debug!(clipped_frames, "export finished");

        Ok(ExportSummary {
            path: self.settings.output_path.clone(),
            frames: total_frames,
            clipped_frames,
        })
    }

    pub fn output_path(&self) -> &Path {
        &self.settings.output_path
    }
}

fn is_clipped(sample: i16) -> bool {
    sample == i16::MAX || sample == i16::MIN
}
