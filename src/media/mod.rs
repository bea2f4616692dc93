// External media tools behind capability traits:
// - Commands: process invocation with captured stderr
// - Processor: ffmpeg extraction, normalization and remux
// - Separator: demucs background separation
// - Fake: in-process stand-ins used by tests and dry runs

pub mod commands;
pub mod fake;
pub mod processor;
pub mod separator;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use commands::{MediaCommand, MediaCommandBuilder};
pub use fake::{FakeMediaProcessor, FakeSeparator};
pub use processor::FfmpegProcessor;
pub use separator::DemucsSeparator;

use crate::config::{MediaConfig, SeparatorConfig};
use crate::error::Result;

/// Audio extraction and remuxing.
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// Write the video's audio stream to `audio_path` as WAV.
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()>;

    /// Decode `input_path` in whatever container it arrived in and write it as PCM WAV.
    async fn normalize_audio(&self, input_path: &Path, wav_path: &Path) -> Result<()>;

    /// Combine the video stream of `video_path` with `audio_path` into `output_path`.
    async fn remux(&self, video_path: &Path, audio_path: &Path, output_path: &Path) -> Result<()>;

    /// Version string of the underlying tool.
    async fn check_availability(&self) -> Result<String>;
}

/// Produces a track with the speech removed.
#[async_trait]
pub trait BackgroundSeparator: Send + Sync {
    /// Separate `audio_path`, writing under `output_dir`; returns the background file.
    async fn separate_background(&self, audio_path: &Path, output_dir: &Path) -> Result<PathBuf>;

    async fn check_availability(&self) -> Result<String>;
}

pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    pub fn create_processor(config: MediaConfig) -> Arc<dyn MediaProcessor> {
        Arc::new(FfmpegProcessor::new(config))
    }

    pub fn create_separator(config: SeparatorConfig) -> Arc<dyn BackgroundSeparator> {
        Arc::new(DemucsSeparator::new(config))
    }
}
