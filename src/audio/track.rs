use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::{DubError, Result};

/// Which part of the pipeline a track came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackSource {
    Original,
    Background,
    Synthesized,
    Mixed,
}

/// Decoded PCM audio: interleaved 16-bit samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
    source: TrackSource,
}

impl AudioTrack {
    pub fn new(samples: Vec<i16>, sample_rate: u32, channels: u16, source: TrackSource) -> Result<Self> {
        if sample_rate < 1000 {
            return Err(DubError::Validation(format!(
                "unsupported sample rate {} Hz",
                sample_rate
            )));
        }
        if channels == 0 {
            return Err(DubError::Validation("audio has zero channels".to_string()));
        }
        if samples.len() % channels as usize != 0 {
            return Err(DubError::Validation(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                channels
            )));
        }

        Ok(Self {
            samples,
            sample_rate,
            channels,
            source,
        })
    }

    /// A silent track of exactly `duration_ms` milliseconds.
    pub fn silent(duration_ms: u64, sample_rate: u32, channels: u16, source: TrackSource) -> Result<Self> {
        let frames = frames_for_ms(duration_ms, sample_rate);
        Self::new(vec![0; frames * channels as usize], sample_rate, channels, source)
    }

    pub fn from_wav<P: AsRef<Path>>(path: P, source: TrackSource) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();

        debug!(
            "Decoding {} ({} Hz, {} ch, {} bit {:?})",
            path.display(),
            spec.sample_rate,
            spec.channels,
            spec.bits_per_sample,
            spec.sample_format
        );

        let samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, 16) => reader
                .samples::<i16>()
                .collect::<std::result::Result<Vec<_>, _>>()?,
            (hound::SampleFormat::Int, bits) if bits <= 32 => {
                let shift = bits as i32 - 16;
                reader
                    .samples::<i32>()
                    .map(|s| {
                        s.map(|v| {
                            if shift >= 0 {
                                (v >> shift) as i16
                            } else {
                                (v << -shift) as i16
                            }
                        })
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
            (hound::SampleFormat::Float, _) => reader
                .samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16))
                .collect::<std::result::Result<Vec<_>, _>>()?,
            (format, bits) => {
                return Err(DubError::Validation(format!(
                    "unsupported WAV encoding: {:?} {} bit",
                    format, bits
                )));
            }
        };

        Self::new(samples, spec.sample_rate, spec.channels, source)
    }

    pub fn write_wav<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(path.as_ref(), spec)?;
        for sample in &self.samples {
            writer.write_sample(*sample)?;
        }
        writer.finalize()?;
        Ok(())
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn source(&self) -> TrackSource {
        self.source
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_ms(&self) -> u64 {
        self.frames() as u64 * 1000 / self.sample_rate as u64
    }

    /// Keep only the first `frames` frames.
    pub fn truncate_frames(&mut self, frames: usize) {
        self.samples.truncate(frames * self.channels as usize);
    }

    /// Append `frames` frames of digital silence.
    pub fn pad_frames(&mut self, frames: usize) {
        self.samples
            .resize(self.samples.len() + frames * self.channels as usize, 0);
    }

    /// Convert to another sample rate and channel count.
    ///
    /// Channels are up-mixed by duplication and down-mixed by averaging;
    /// the rate change is plain linear interpolation.
    pub fn convert(&self, sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == self.sample_rate && channels == self.channels {
            return Ok(self.clone());
        }

        let remapped = remap_channels(&self.samples, self.channels, channels);
        let resampled = resample(&remapped, channels as usize, self.sample_rate, sample_rate);
        Self::new(resampled, sample_rate, channels, self.source)
    }
}

/// Duration of a WAV file from its header, without decoding the samples.
pub fn probe_duration_ms<P: AsRef<Path>>(path: P) -> Result<u64> {
    let reader = hound::WavReader::open(path.as_ref())?;
    let rate = reader.spec().sample_rate as u64;
    if rate == 0 {
        return Err(DubError::Validation("WAV header has a zero sample rate".to_string()));
    }
    Ok(reader.duration() as u64 * 1000 / rate)
}

/// Number of frames needed so that the track lasts exactly `duration_ms`.
///
/// Rounded up: `frames * 1000 / rate` then floors back to `duration_ms`
/// for any rate of at least 1 kHz.
pub fn frames_for_ms(duration_ms: u64, sample_rate: u32) -> usize {
    (duration_ms * sample_rate as u64).div_ceil(1000) as usize
}

fn remap_channels(samples: &[i16], from: u16, to: u16) -> Vec<i16> {
    if from == to {
        return samples.to_vec();
    }

    let from = from as usize;
    let to = to as usize;
    let mut out = Vec::with_capacity(samples.len() / from * to);

    for frame in samples.chunks_exact(from) {
        if to == 1 {
            let sum: i32 = frame.iter().map(|s| *s as i32).sum();
            out.push((sum / from as i32) as i16);
        } else if from == 1 {
            out.extend(std::iter::repeat(frame[0]).take(to));
        } else {
            for ch in 0..to {
                out.push(frame[ch.min(from - 1)]);
            }
        }
    }

    out
}

fn resample(samples: &[i16], channels: usize, from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let in_frames = samples.len() / channels;
    let ratio = from_rate as f64 / to_rate as f64;
    let out_frames = (in_frames as f64 / ratio).ceil() as usize;
    let mut out = Vec::with_capacity(out_frames * channels);

    for i in 0..out_frames {
        let source_pos = i as f64 * ratio;
        let idx = (source_pos.floor() as usize).min(in_frames - 1);
        let fraction = source_pos - idx as f64;

        for ch in 0..channels {
            let left = samples[idx * channels + ch] as f64;
            let value = if idx + 1 >= in_frames {
                left
            } else {
                let right = samples[(idx + 1) * channels + ch] as f64;
                left + (right - left) * fraction
            };
            out.push(value.round() as i16);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_for_ms_round_trips_to_exact_duration() {
        for rate in [8000, 16000, 22050, 24000, 44100, 48000] {
            for ms in [0, 1, 7, 999, 1000, 4000, 6500, 123_457] {
                let frames = frames_for_ms(ms, rate);
                assert_eq!(frames as u64 * 1000 / rate as u64, ms, "rate {} ms {}", rate, ms);
            }
        }
    }

    #[test]
    fn test_silent_track_duration() {
        let track = AudioTrack::silent(2500, 22050, 2, TrackSource::Synthesized).unwrap();
        assert_eq!(track.duration_ms(), 2500);
        assert!(track.samples().iter().all(|s| *s == 0));
    }

    #[test]
    fn test_new_rejects_ragged_channels() {
        let err = AudioTrack::new(vec![1, 2, 3], 16000, 2, TrackSource::Original).unwrap_err();
        assert!(matches!(err, DubError::Validation(_)));
    }

    #[test]
    fn test_wav_round_trip_preserves_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<i16> = (0..1600).map(|i| ((i % 100) * 300 - 15000) as i16).collect();
        let track = AudioTrack::new(samples.clone(), 16000, 1, TrackSource::Original).unwrap();

        track.write_wav(&path).unwrap();
        let loaded = AudioTrack::from_wav(&path, TrackSource::Original).unwrap();

        assert_eq!(loaded.samples(), samples.as_slice());
        assert_eq!(loaded.duration_ms(), 100);
        assert_eq!(probe_duration_ms(&path).unwrap(), 100);
    }

    #[test]
    fn test_convert_mono_to_stereo_and_rate() {
        let track = AudioTrack::new(vec![100; 1600], 16000, 1, TrackSource::Synthesized).unwrap();
        let converted = track.convert(32000, 2).unwrap();

        assert_eq!(converted.channels(), 2);
        assert_eq!(converted.sample_rate(), 32000);
        assert_eq!(converted.duration_ms(), 100);
        assert!(converted.samples().iter().all(|s| *s == 100));
    }

    #[test]
    fn test_convert_stereo_to_mono_averages() {
        let track = AudioTrack::new(vec![100, 300, -200, 0], 16000, 2, TrackSource::Background).unwrap();
        let mono = track.convert(16000, 1).unwrap();
        assert_eq!(mono.samples(), &[200, -100]);
    }
}
