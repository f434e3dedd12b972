pub mod kit;
pub mod library;
pub mod loader;

use std::path::PathBuf;
use tracing::info;

use crate::config::{SampleConfig, SampleSource};

pub use kit::{DrumSound, synthesize};
pub use library::{SampleId, SampleLibrary, Waveform};
pub use loader::load_sample;

/// Sample loading error types
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("Failed to read '{path}': {source}")]
    Wav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("Unsupported sample format: '{0}' (expected .wav)")]
    UnsupportedFormat(String),

    #[error("Unsupported bit depth: {0}")]
    UnsupportedBitDepth(u16),

    #[error("Duplicate sample name '{0}'")]
    DuplicateName(String),
}

/// Load or synthesize every configured sample, in order.
///
/// Sample ids follow the order of `samples`.
pub fn build_library(
    samples: &[SampleConfig],
    sample_rate: u32,
) -> Result<SampleLibrary, SampleError> {
    let mut library = SampleLibrary::new();

    for sample in samples {
        if library.find(&sample.name).is_some() {
            return Err(SampleError::DuplicateName(sample.name.clone()));
        }

        let mut waveform = match &sample.source {
            SampleSource::Builtin(sound) => synthesize(*sound, sample_rate),
            SampleSource::Wav(path) => load_sample(path, &sample.name, sample_rate)?,
        };
        waveform.rename(&sample.name);

        info!(
            sample = %sample.name,
            frames = waveform.len(),
            peak = waveform.peak(),
            "sample ready"
        );
        library.insert(waveform);
    }

    Ok(library)
}
