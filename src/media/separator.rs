use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::SeparatorConfig;
use crate::error::{DubError, Result};
use super::{BackgroundSeparator, MediaCommand};

/// Splits vocals from the rest of the mix with demucs.
pub struct DemucsSeparator {
    config: SeparatorConfig,
}

impl DemucsSeparator {
    pub fn new(config: SeparatorConfig) -> Self {
        Self { config }
    }

    fn command(&self, audio_path: &Path, output_dir: &Path) -> MediaCommand {
        MediaCommand::new(&self.config.binary_path, "Background separation")
            .arg(format!("--two-stems={}", self.config.two_stems))
            .arg("-o")
            .output(output_dir)
            .output(audio_path)
    }
}

/// Locate the background stem demucs wrote under `output_dir`.
///
/// demucs nests its output as `<model>/<track>/<stem>`; a file whose parent
/// directory matches the track name is preferred over any other match.
pub fn find_stem(output_dir: &Path, track_name: &str, stem_file: &str) -> Option<PathBuf> {
    let mut matches: Vec<PathBuf> = WalkDir::new(output_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name().to_string_lossy() == stem_file)
        .map(|e| e.into_path())
        .collect();
    matches.sort();

    let for_track = matches.iter().position(|p| {
        p.parent()
            .and_then(|d| d.file_name())
            .is_some_and(|d| d.to_string_lossy() == track_name)
    });

    match for_track {
        Some(idx) => Some(matches.swap_remove(idx)),
        None => matches.into_iter().next(),
    }
}

#[async_trait]
impl BackgroundSeparator for DemucsSeparator {
    async fn separate_background(&self, audio_path: &Path, output_dir: &Path) -> Result<PathBuf> {
        info!("Separating background from {}", audio_path.display());

        tokio::fs::create_dir_all(output_dir).await?;
        self.command(audio_path, output_dir).execute().await?;

        let track_name = audio_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let stem = find_stem(output_dir, &track_name, &self.config.background_stem)
            .ok_or_else(|| DubError::ArtifactNotFound(output_dir.join(&self.config.background_stem)))?;

        debug!("Background stem at {}", stem.display());
        Ok(stem)
    }

    async fn check_availability(&self) -> Result<String> {
        let stdout = MediaCommand::new(&self.config.binary_path, "Version check")
            .arg("--help")
            .execute_with_output()
            .await?;
        Ok(stdout.lines().next().unwrap_or("demucs").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_command_args() {
        let separator = DemucsSeparator::new(SeparatorConfig {
            binary_path: "demucs".to_string(),
            two_stems: "vocals".to_string(),
            background_stem: "no_vocals.wav".to_string(),
        });
        let cmd = separator.command(Path::new("run/source_audio.wav"), Path::new("run/separated"));
        assert_eq!(
            cmd.args,
            vec!["--two-stems=vocals", "-o", "run/separated", "run/source_audio.wav"]
        );
    }

    #[test]
    fn test_find_stem_prefers_track_directory() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("htdemucs/other/no_vocals.wav").write_binary(b"x").unwrap();
        temp.child("htdemucs/source_audio/no_vocals.wav").write_binary(b"y").unwrap();
        temp.child("htdemucs/source_audio/vocals.wav").write_binary(b"z").unwrap();

        let found = find_stem(temp.path(), "source_audio", "no_vocals.wav").unwrap();
        assert!(found.ends_with("htdemucs/source_audio/no_vocals.wav"));
    }

    #[test]
    fn test_find_stem_missing() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("htdemucs/source_audio/vocals.wav").write_binary(b"z").unwrap();
        assert!(find_stem(temp.path(), "source_audio", "no_vocals.wav").is_none());
    }
}
