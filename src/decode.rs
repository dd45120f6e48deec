// Audio decoding - raw bytes in, mono f32 sample buffers out
//
// Only WAV is supported natively. The `Decoder` trait is the seam for host
// applications that want to plug in a wider codec set; the engine never
// assumes more than "bytes become an AudioSample or a DecodeError".

use std::io::Cursor;

use crate::error::DecodeError;
use crate::sample::AudioSample;

/// Turns encoded audio bytes into a decoded sample buffer.
pub trait Decoder {
    fn decode(&self, bytes: &[u8]) -> Result<AudioSample, DecodeError>;
}

/// WAV decoder backed by hound.
///
/// Multi-channel files are reduced to their first channel; the comparison
/// engine analyzes a single stream per slot.
#[derive(Debug, Default)]
pub struct WavDecoder;

impl WavDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for WavDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<AudioSample, DecodeError> {
        let reader = hound::WavReader::new(Cursor::new(bytes)).map_err(map_hound_error)?;
        let spec = reader.spec();

        if spec.channels == 0 {
            return Err(DecodeError::Malformed {
                details: "WAV header declares zero channels".to_string(),
            });
        }

        let channels = spec.channels as usize;
        let samples = match spec.sample_format {
            hound::SampleFormat::Float => {
                collect_first_channel(reader.into_samples::<f32>(), channels)?
            }
            hound::SampleFormat::Int => {
                // Scale integer PCM to [-1, 1] by the format's full-scale value
                if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                    return Err(DecodeError::UnsupportedFormat {
                        details: format!("{}-bit integer PCM", spec.bits_per_sample),
                    });
                }
                let full_scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                let scaled = reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / full_scale));
                collect_first_channel(scaled, channels)?
            }
        };

        if samples.is_empty() {
            return Err(DecodeError::EmptyStream);
        }

        Ok(AudioSample::new(samples, spec.sample_rate))
    }
}

/// Keep every `channels`-th sample starting from the first.
fn collect_first_channel<I>(iter: I, channels: usize) -> Result<Vec<f32>, DecodeError>
where
    I: Iterator<Item = hound::Result<f32>>,
{
    let mut out = Vec::new();
    for (i, sample) in iter.enumerate() {
        let value = sample.map_err(map_hound_error)?;
        if i % channels == 0 {
            out.push(value);
        }
    }
    Ok(out)
}

fn map_hound_error(err: hound::Error) -> DecodeError {
    match err {
        hound::Error::FormatError(details) => DecodeError::Malformed {
            details: details.to_string(),
        },
        hound::Error::Unsupported => DecodeError::UnsupportedFormat {
            details: "WAV feature not supported by decoder".to_string(),
        },
        other => DecodeError::Malformed {
            details: other.to_string(),
        },
    }
}
