// Dubbing pipeline control:
// - Stage: the fixed stage order and each stage's declared artifacts
// - Run: per-run context, status and report
// - Text: empty-result policy and the evolving transcript text
// - Model: speech-to-text model selection
// - Orchestrator: drives stages against a run

pub mod model;
pub mod orchestrator;
pub mod prompts;
pub mod run;
pub mod stage;
pub mod text;

pub use model::{select_transcription_model, ModelChoice, SelectedModel};
pub use orchestrator::PipelineOrchestrator;
pub use run::{PipelineRun, RunReport, RunStatus, StageOutcome, StageRecord, NO_SPEECH_SEGMENT};
pub use stage::Stage;
pub use text::{EmptyPolicy, TextKind, TextSlot};
