use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::artifact::{Artifact, ArtifactRole, ArtifactStore};
use crate::error::{DubError, Result};
use super::model::SelectedModel;
use super::text::TextSlot;
use super::Stage;

pub const NO_SPEECH_SEGMENT: &str = "no speech segment";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    /// Finished without dubbed audio.
    Partial { reason: String },
    Failed { stage: Stage, cause: String },
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Running => f.write_str("running"),
            Self::Completed => f.write_str("completed"),
            Self::Partial { reason } => write!(f, "partial: {}", reason),
            Self::Failed { stage, cause } => write!(f, "failed at {}: {}", stage, cause),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub outcome: StageOutcome,
    pub elapsed_ms: u64,
}

/// Everything one dubbing run owns: its id, its run directory and artifacts,
/// the evolving text and the per-stage outcomes.
#[derive(Debug)]
pub struct PipelineRun {
    id: Uuid,
    input_video: Option<PathBuf>,
    output_path: Option<PathBuf>,
    pub(crate) store: ArtifactStore,
    pub(crate) text: TextSlot,
    pub(crate) speech_text: Option<String>,
    pub(crate) selected_model: Option<SelectedModel>,
    pub(crate) transcription_model: Option<String>,
    records: Vec<StageRecord>,
    status: RunStatus,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    /// A run for `input_video` whose dubbed result will be written to `output_path`.
    pub fn new(work_dir: &Path, input_video: &Path, output_path: PathBuf) -> Result<Self> {
        if !input_video.is_file() {
            return Err(DubError::Validation(format!(
                "input video {} does not exist or is not a file",
                input_video.display()
            )));
        }

        let mut run = Self::scratch(work_dir)?;
        run.store.put(ArtifactRole::SourceVideo, input_video, None);
        run.input_video = Some(input_video.to_path_buf());
        run.output_path = Some(output_path);
        Ok(run)
    }

    /// A run with no inputs bound, for invoking single stages.
    pub fn scratch(work_dir: &Path) -> Result<Self> {
        let id = Uuid::new_v4();
        let run_dir = work_dir.join("runs").join(id.to_string());
        std::fs::create_dir_all(&run_dir)?;

        Ok(Self {
            id,
            input_video: None,
            output_path: None,
            store: ArtifactStore::new(run_dir),
            text: TextSlot::default(),
            speech_text: None,
            selected_model: None,
            transcription_model: None,
            records: Vec::new(),
            status: RunStatus::Pending,
            started_at: Utc::now(),
            finished_at: None,
        })
    }

    /// Force a specific speech-to-text model instead of choosing by duration.
    pub fn with_transcription_model(mut self, model: Option<String>) -> Self {
        self.transcription_model = model;
        self
    }

    /// Supply an artifact from outside the pipeline.
    pub fn bind(&mut self, role: ArtifactRole, path: impl Into<PathBuf>) {
        self.store.put(role, path, None);
    }

    /// Text to synthesize, bypassing quoted-segment selection.
    pub fn set_speech_text(&mut self, text: String) {
        self.speech_text = Some(text);
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn run_dir(&self) -> &Path {
        self.store.run_dir()
    }

    pub fn input_video(&self) -> Option<&Path> {
        self.input_video.as_deref()
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn text(&self) -> &TextSlot {
        &self.text
    }

    pub fn speech_text(&self) -> Option<&str> {
        self.speech_text.as_deref()
    }

    pub fn selected_model(&self) -> Option<&SelectedModel> {
        self.selected_model.as_ref()
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    /// Latest outcome recorded for `stage`, if it ran.
    pub fn outcome(&self, stage: Stage) -> Option<StageOutcome> {
        self.records
            .iter()
            .rev()
            .find(|r| r.stage == stage)
            .map(|r| r.outcome)
    }

    pub(crate) fn record(&mut self, stage: Stage, outcome: StageOutcome, elapsed_ms: u64) {
        self.records.push(StageRecord {
            stage,
            outcome,
            elapsed_ms,
        });
    }

    pub(crate) fn set_status(&mut self, status: RunStatus) {
        if status.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        self.status = status;
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            run_id: self.id,
            status: self.status.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
            input_video: self.input_video.clone(),
            run_dir: self.run_dir().to_path_buf(),
            artifacts: self.store.artifacts().cloned().collect(),
            text: self.text.clone(),
            selected_model: self.selected_model.clone(),
            speech_text: self.speech_text.clone(),
            final_video: self
                .store
                .get(ArtifactRole::FinalVideo)
                .ok()
                .map(Path::to_path_buf),
            stages: self.records.clone(),
        }
    }
}

/// Serializable summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub input_video: Option<PathBuf>,
    pub run_dir: PathBuf,
    pub artifacts: Vec<Artifact>,
    pub text: TextSlot,
    pub selected_model: Option<SelectedModel>,
    pub speech_text: Option<String>,
    pub final_video: Option<PathBuf>,
    pub stages: Vec<StageRecord>,
}
