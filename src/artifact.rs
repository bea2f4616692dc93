//! Named intermediate files produced and consumed by pipeline stages.
//!
//! Every run owns one [`ArtifactStore`] rooted at its own run directory, so
//! two runs never share a path even when they process the same video.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::{DubError, Result};
use crate::pipeline::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactRole {
    SourceVideo,
    SourceAudio,
    BackgroundTrack,
    Transcript,
    Translation,
    SynthesizedSpeech,
    AlignedSpeech,
    MixedSpeech,
    FinalVideo,
}

impl ArtifactRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceVideo => "source_video",
            Self::SourceAudio => "source_audio",
            Self::BackgroundTrack => "background_track",
            Self::Transcript => "transcript",
            Self::Translation => "translation",
            Self::SynthesizedSpeech => "synthesized_speech",
            Self::AlignedSpeech => "aligned_speech",
            Self::MixedSpeech => "mixed_speech",
            Self::FinalVideo => "final_video",
        }
    }

    /// File name used for this role inside a run directory.
    ///
    /// `SourceVideo` and `FinalVideo` live outside the run directory and are
    /// bound explicitly, so they have no run-local name.
    pub fn file_name(&self) -> Option<&'static str> {
        match self {
            Self::SourceVideo | Self::FinalVideo => None,
            Self::SourceAudio => Some("source_audio.wav"),
            Self::BackgroundTrack => Some("background.wav"),
            Self::Transcript => Some("transcript.txt"),
            Self::Translation => Some("translation.txt"),
            Self::SynthesizedSpeech => Some("synthesized_speech.wav"),
            Self::AlignedSpeech => Some("aligned_speech.wav"),
            Self::MixedSpeech => Some("mixed_speech.wav"),
        }
    }
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bound artifact: where it lives and which stage wrote it.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub role: ArtifactRole,
    pub path: PathBuf,
    /// `None` for artifacts supplied by the caller rather than a stage
    pub produced_by: Option<Stage>,
}

/// Process-local role → path mapping for a single run.
#[derive(Debug)]
pub struct ArtifactStore {
    run_dir: PathBuf,
    artifacts: BTreeMap<ArtifactRole, Artifact>,
}

impl ArtifactStore {
    pub fn new<P: Into<PathBuf>>(run_dir: P) -> Self {
        Self {
            run_dir: run_dir.into(),
            artifacts: BTreeMap::new(),
        }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Run-scoped location a stage should write `role` to.
    pub fn path_for(&self, role: ArtifactRole) -> PathBuf {
        match role.file_name() {
            Some(name) => self.run_dir.join(name),
            None => self.run_dir.join(role.as_str()),
        }
    }

    /// Bind `role` to `path`, replacing any earlier binding.
    pub fn put<P: Into<PathBuf>>(&mut self, role: ArtifactRole, path: P, produced_by: Option<Stage>) {
        let path = path.into();
        debug!("Binding artifact {} -> {}", role, path.display());
        self.artifacts.insert(
            role,
            Artifact {
                role,
                path,
                produced_by,
            },
        );
    }

    pub fn get(&self, role: ArtifactRole) -> Result<&Path> {
        self.artifacts
            .get(&role)
            .map(|a| a.path.as_path())
            .ok_or(DubError::MissingInput { role })
    }

    pub fn has(&self, role: ArtifactRole) -> bool {
        self.artifacts.contains_key(&role)
    }

    /// Fail with `MissingInput` for the first role in `roles` that is unbound.
    pub fn require(&self, roles: &[ArtifactRole]) -> Result<()> {
        match roles.iter().find(|role| !self.has(**role)) {
            Some(role) => Err(DubError::MissingInput { role: *role }),
            None => Ok(()),
        }
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.values()
    }
}
