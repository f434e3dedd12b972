// Audio module - Buffer ring, fill loop and CPAL output

pub mod buffer;
pub mod cpu_monitor;
pub mod device;
pub mod engine;
pub mod export;
pub mod format_conversion;
pub mod frame;
pub mod sink;
pub mod timing;

/// Output device error types
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("No audio output device found")]
    NoDevice,

    #[error("Output device '{0}' not found")]
    DeviceNotFound(String),

    #[error("Failed to enumerate devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("Failed to query supported configs: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("Failed to query default config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("Unsupported sample format: {0:?}. Supported formats: F32, I16, U16")]
    UnsupportedFormat(cpal::SampleFormat),

    #[error("Error in stream creation: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Error in stream start: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}
