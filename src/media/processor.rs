use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

use crate::config::MediaConfig;
use crate::error::{DubError, Result};
use super::{MediaCommandBuilder, MediaProcessor};

/// ffmpeg-backed audio extraction and remuxing.
pub struct FfmpegProcessor {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl FfmpegProcessor {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
        }
    }
}

#[async_trait]
impl MediaProcessor for FfmpegProcessor {
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        info!("Extracting audio from {} to {}", video_path.display(), audio_path.display());

        self.command_builder
            .extract_audio(video_path, audio_path)
            .execute()
            .await?;

        if !audio_path.exists() {
            return Err(DubError::ArtifactNotFound(audio_path.to_path_buf()));
        }

        info!("Audio extraction completed");
        Ok(())
    }

    async fn normalize_audio(&self, input_path: &Path, wav_path: &Path) -> Result<()> {
        debug!("Normalizing {} to {}", input_path.display(), wav_path.display());

        self.command_builder
            .normalize_audio(input_path, wav_path)
            .execute()
            .await?;

        if !wav_path.exists() {
            return Err(DubError::ArtifactNotFound(wav_path.to_path_buf()));
        }
        Ok(())
    }

    async fn remux(&self, video_path: &Path, audio_path: &Path, output_path: &Path) -> Result<()> {
        info!(
            "Remuxing {} with {} -> {}",
            video_path.display(),
            audio_path.display(),
            output_path.display()
        );

        self.command_builder
            .remux(
                video_path,
                audio_path,
                output_path,
                &self.config.audio_codec,
                &self.config.audio_bitrate,
            )
            .execute()
            .await?;

        if !output_path.exists() {
            return Err(DubError::ArtifactNotFound(output_path.to_path_buf()));
        }

        info!("Remux completed");
        Ok(())
    }

    async fn check_availability(&self) -> Result<String> {
        debug!("Checking media processor version");

        let stdout = self.command_builder.version_check().execute_with_output().await?;
        let first_line = stdout.lines().next().unwrap_or("unknown version");
        Ok(first_line.to_string())
    }
}
