use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::audio::{frames_for_ms, AudioTrack, TrackSource};
use crate::error::{DubError, Result};
use super::{BackgroundSeparator, MediaProcessor};

/// A call recorded by one of the fakes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    Extract { video: PathBuf, audio: PathBuf },
    Normalize { input: PathBuf, output: PathBuf },
    Remux { video: PathBuf, audio: PathBuf, output: PathBuf },
    Separate { audio: PathBuf },
}

fn record(calls: &Mutex<Vec<FakeCall>>, call: FakeCall) {
    if let Ok(mut calls) = calls.lock() {
        calls.push(call);
    }
}

fn recorded(calls: &Mutex<Vec<FakeCall>>) -> Vec<FakeCall> {
    calls.lock().map(|c| c.clone()).unwrap_or_default()
}

fn failed(tool: &str) -> DubError {
    DubError::Process {
        tool: tool.to_string(),
        status: "exit status: 1".to_string(),
        stderr: format!("{} failed (simulated)", tool),
    }
}

/// Length of the tone a non-WAV input decodes to.
pub const FAKE_DECODED_MS: u64 = 750;

/// Writes a deterministic tone on extraction and a byte concatenation on remux.
/// Normalization passes WAV through and decodes anything else to a
/// `FAKE_DECODED_MS` mono tone.
pub struct FakeMediaProcessor {
    duration_ms: u64,
    sample_rate: u32,
    fail_remux: bool,
    calls: Mutex<Vec<FakeCall>>,
}

impl FakeMediaProcessor {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            sample_rate: 16000,
            fail_remux: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_remux(mut self) -> Self {
        self.fail_remux = true;
        self
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        recorded(&self.calls)
    }

    fn tone(&self) -> Result<AudioTrack> {
        let frames = frames_for_ms(self.duration_ms, self.sample_rate);
        let samples = (0..frames * 2)
            .map(|i| (((i / 2) % 64) as i16 - 32) * 256)
            .collect();
        AudioTrack::new(samples, self.sample_rate, 2, TrackSource::Original)
    }
}

#[async_trait]
impl MediaProcessor for FakeMediaProcessor {
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        record(
            &self.calls,
            FakeCall::Extract {
                video: video_path.to_path_buf(),
                audio: audio_path.to_path_buf(),
            },
        );
        if !video_path.exists() {
            return Err(DubError::ArtifactNotFound(video_path.to_path_buf()));
        }

        debug!("Fake extraction of {} ms to {}", self.duration_ms, audio_path.display());
        self.tone()?.write_wav(audio_path)
    }

    async fn normalize_audio(&self, input_path: &Path, wav_path: &Path) -> Result<()> {
        record(
            &self.calls,
            FakeCall::Normalize {
                input: input_path.to_path_buf(),
                output: wav_path.to_path_buf(),
            },
        );

        if !input_path.exists() {
            return Err(DubError::ArtifactNotFound(input_path.to_path_buf()));
        }

        let track = match AudioTrack::from_wav(input_path, TrackSource::Synthesized) {
            Ok(track) => track,
            Err(_) => {
                let samples = (0..frames_for_ms(FAKE_DECODED_MS, 24000))
                    .map(|i| ((i % 48) as i16 - 24) * 512)
                    .collect();
                AudioTrack::new(samples, 24000, 1, TrackSource::Synthesized)?
            }
        };
        track.write_wav(wav_path)
    }

    async fn remux(&self, video_path: &Path, audio_path: &Path, output_path: &Path) -> Result<()> {
        record(
            &self.calls,
            FakeCall::Remux {
                video: video_path.to_path_buf(),
                audio: audio_path.to_path_buf(),
                output: output_path.to_path_buf(),
            },
        );
        if self.fail_remux {
            return Err(failed("ffmpeg"));
        }

        let mut bytes = tokio::fs::read(video_path).await?;
        bytes.extend(tokio::fs::read(audio_path).await?);
        tokio::fs::write(output_path, bytes).await?;
        Ok(())
    }

    async fn check_availability(&self) -> Result<String> {
        Ok("fake media processor".to_string())
    }
}

/// Writes an attenuated copy of the input as the background stem.
pub struct FakeSeparator {
    fail: bool,
    calls: Mutex<Vec<FakeCall>>,
}

impl FakeSeparator {
    pub fn new() -> Self {
        Self {
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        recorded(&self.calls)
    }
}

impl Default for FakeSeparator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackgroundSeparator for FakeSeparator {
    async fn separate_background(&self, audio_path: &Path, output_dir: &Path) -> Result<PathBuf> {
        record(
            &self.calls,
            FakeCall::Separate {
                audio: audio_path.to_path_buf(),
            },
        );
        if self.fail {
            return Err(failed("demucs"));
        }

        let source = AudioTrack::from_wav(audio_path, TrackSource::Original)?;
        let samples = source.samples().iter().map(|s| s / 2).collect();
        let background = AudioTrack::new(
            samples,
            source.sample_rate(),
            source.channels(),
            TrackSource::Background,
        )?;

        tokio::fs::create_dir_all(output_dir).await?;
        let path = output_dir.join("no_vocals.wav");
        background.write_wav(&path)?;
        Ok(path)
    }

    async fn check_availability(&self) -> Result<String> {
        Ok("fake separator".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_extraction_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("in.mp4");
        std::fs::write(&video, b"video").unwrap();

        let media = FakeMediaProcessor::new(1500);
        let first = dir.path().join("a.wav");
        let second = dir.path().join("b.wav");
        media.extract_audio(&video, &first).await.unwrap();
        media.extract_audio(&video, &second).await.unwrap();

        assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
        assert_eq!(crate::audio::probe_duration_ms(&first).unwrap(), 1500);
        assert_eq!(media.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_fake_normalization_decodes_non_wav_input() {
        let dir = tempfile::tempdir().unwrap();
        let reply = dir.path().join("reply.bin");
        std::fs::write(&reply, b"ID3\x04\x00\x00 not a wav").unwrap();
        let wav = dir.path().join("speech.wav");

        FakeMediaProcessor::new(1000)
            .normalize_audio(&reply, &wav)
            .await
            .unwrap();
        assert_eq!(crate::audio::probe_duration_ms(&wav).unwrap(), FAKE_DECODED_MS);
    }

    #[tokio::test]
    async fn test_failing_separator_reports_process_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FakeSeparator::failing()
            .separate_background(&dir.path().join("a.wav"), dir.path())
            .await
            .unwrap_err();
        assert!(err.is_process());
    }
}
