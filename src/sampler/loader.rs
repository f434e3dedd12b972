use hound::{SampleFormat, WavReader};
use std::path::Path;
use tracing::{debug, warn};

use crate::audio::format_conversion::f32_to_i16;
use crate::sampler::SampleError;
use crate::sampler::library::Waveform;

/// Load a sample file into a mono 16-bit waveform.
///
/// Multi-channel files are averaged down to mono. The file is used at its
/// native rate; a mismatch with `target_rate` is only logged.
pub fn load_sample(path: &Path, name: &str, target_rate: u32) -> Result<Waveform, SampleError> {
    let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

    match extension.to_lowercase().as_str() {
        "wav" => load_wav(path, name, target_rate),
        _ => Err(SampleError::UnsupportedFormat(extension.to_string())),
    }
}

fn load_wav(path: &Path, name: &str, target_rate: u32) -> Result<Waveform, SampleError> {
    let wav_err = |source| SampleError::Wav {
        path: path.to_path_buf(),
        source,
    };

    let reader = WavReader::open(path).map_err(wav_err)?;
    let spec = reader.spec();

    if spec.sample_rate != target_rate {
        warn!(
            sample = name,
            file_rate = spec.sample_rate,
            output_rate = target_rate,
            "sample rate differs from output rate, playing at native speed"
        );
    }

    let interleaved: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .map(|s| s.map(f32_to_i16))
            .collect::<Result<_, _>>()
            .map_err(wav_err)?,
        (SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .collect::<Result<_, _>>()
            .map_err(wav_err)?,
        (SampleFormat::Int, bits @ (8 | 24 | 32)) => reader
            .into_samples::<i32>()
            .map(|s| s.map(|x| rescale_to_i16(x, bits)))
            .collect::<Result<_, _>>()
            .map_err(wav_err)?,
        (_, bits) => return Err(SampleError::UnsupportedBitDepth(bits)),
    };

    let mono = downmix(&interleaved, spec.channels as usize);
    debug!(
        sample = name,
        frames = mono.len(),
        channels = spec.channels,
        bits = spec.bits_per_sample,
        "loaded wav"
    );

    Ok(Waveform::new(name, &mono))
}

fn rescale_to_i16(sample: i32, bits: u16) -> i16 {
    if bits >= 16 {
        (sample >> (bits - 16)) as i16
    } else {
        (sample << (16 - bits)) as i16
    }
}

fn downmix(interleaved: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use tempfile::tempdir;

    fn write_wav<S: hound::Sample + Copy>(path: &Path, spec: WavSpec, samples: &[S]) {
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn spec(channels: u16, bits: u16, format: SampleFormat) -> WavSpec {
        WavSpec {
            channels,
            sample_rate: 44138,
            bits_per_sample: bits,
            sample_format: format,
        }
    }

    #[test]
    fn test_load_mono_i16() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kick.wav");
        write_wav(&path, spec(1, 16, SampleFormat::Int), &[1000i16, -2000, 3000]);

        let wave = load_sample(&path, "kick", 44138).unwrap();
        assert_eq!(wave.name(), "kick");
        assert_eq!(wave.samples(), &[1000, -2000, 3000]);
        assert_eq!(wave.get(0), 0);
    }

    #[test]
    fn test_load_stereo_downmix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clap.wav");
        write_wav(&path, spec(2, 16, SampleFormat::Int), &[1000i16, 3000, -400, 0]);

        let wave = load_sample(&path, "clap", 44138).unwrap();
        assert_eq!(wave.samples(), &[2000, -200]);
    }

    #[test]
    fn test_load_float() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hat.wav");
        write_wav(&path, spec(1, 32, SampleFormat::Float), &[0.0f32, 1.0, -1.0]);

        let wave = load_sample(&path, "hat", 44138).unwrap();
        assert_eq!(wave.samples(), &[0, i16::MAX, i16::MIN]);
    }

    #[test]
    fn test_load_24_bit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("perc.wav");
        write_wav(&path, spec(1, 24, SampleFormat::Int), &[0x10_0000i32, -0x10_0000]);

        let wave = load_sample(&path, "perc", 44138).unwrap();
        assert_eq!(wave.samples(), &[0x1000, -0x1000]);
    }

    #[test]
    fn test_unsupported_format() {
        let err = load_sample(Path::new("kick.mp3"), "kick", 44138).unwrap_err();
        assert!(matches!(err, SampleError::UnsupportedFormat(ext) if ext == "mp3"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_sample(Path::new("/nonexistent/kick.wav"), "kick", 44138).unwrap_err();
        assert!(matches!(err, SampleError::Wav { .. }));
    }

    #[test]
    fn test_rescale() {
        assert_eq!(rescale_to_i16(127, 8), 127 << 8);
        assert_eq!(rescale_to_i16(i32::MIN, 32), i16::MIN);
    }
}
