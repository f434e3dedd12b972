// Notifications - Playback events logged by the control thread
//
// The fill loop and the stream error callback push these through the
// notification channel. Fields stay typed until `log` turns them into
// tracing events.

use tracing::{error, info, warn};

use crate::codec::CodecReport;

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Output stream running
    StreamStarted { sample_rate: u32, channels: usize },
    /// Host stream error; the sink stops transferring
    StreamFailed(String),
    /// Average fill time per block went past the block's playback time
    FillOverload { load_pct: f32 },
    /// Transfers that found no fresh block since the last report
    BlocksRepeated { count: u64, total: u64 },
    /// DAC bring-up finished with faults
    CodecFaults {
        failed_writes: usize,
        failed_reads: usize,
        mismatches: usize,
    },
}

impl Notification {
    /// `None` for a clean report
    pub fn from_codec_report(report: &CodecReport) -> Option<Self> {
        (!report.is_clean()).then(|| Self::CodecFaults {
            failed_writes: report.failed_writes.len(),
            failed_reads: report.failed_reads.len(),
            mismatches: report.mismatches.len(),
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::StreamFailed(_))
    }

    /// Emit through `tracing` with the event's fields
    pub fn log(&self) {
        match self {
            Self::StreamStarted {
                sample_rate,
                channels,
            } => info!(sample_rate, channels, "audio stream started"),
            Self::StreamFailed(reason) => error!(%reason, "audio stream failed"),
            Self::FillOverload { load_pct } => {
                warn!(load_pct, "block fill is slower than playback, blocks will repeat")
            }
            Self::BlocksRepeated { count, total } => {
                warn!(count, total, "stale blocks transferred")
            }
            Self::CodecFaults {
                failed_writes,
                failed_reads,
                mismatches,
            } => warn!(failed_writes, failed_reads, mismatches, "codec setup faults"),
        }
    }
}
