use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use indicatif::ProgressBar;
use tracing::{error, info, info_span, warn, Instrument};

use crate::artifact::{Artifact, ArtifactRole};
use crate::audio::{probe_duration_ms, AudioMixer, AudioTrack, DurationReconciler, TrackSource};
use crate::config::{Config, PipelineConfig, ServiceConfig};
use crate::error::{DubError, Result, StageError};
use crate::media::{BackgroundSeparator, MediaProcessor};
use crate::naming;
use crate::service::SpeechService;
use crate::speech::SpeechSelector;
use super::model::select_transcription_model;
use super::run::{PipelineRun, RunStatus, StageOutcome, NO_SPEECH_SEGMENT};
use super::text::{EmptyPolicy, TextKind};
use super::{prompts, Stage};

/// Raw synthesis reply, kept beside the normalized WAV.
const SPEECH_REPLY_FILE: &str = "speech_reply.bin";

/// Runs the dubbing stages in order against one `PipelineRun` at a time.
///
/// Holds no per-run state, so one orchestrator can drive several runs
/// concurrently as long as each run has its own context.
pub struct PipelineOrchestrator {
    service_config: ServiceConfig,
    pipeline_config: PipelineConfig,
    service: Arc<dyn SpeechService>,
    media: Arc<dyn MediaProcessor>,
    separator: Arc<dyn BackgroundSeparator>,
    mixer: AudioMixer,
}

impl PipelineOrchestrator {
    pub fn new(
        config: &Config,
        service: Arc<dyn SpeechService>,
        media: Arc<dyn MediaProcessor>,
        separator: Arc<dyn BackgroundSeparator>,
    ) -> Self {
        Self {
            service_config: config.service.clone(),
            pipeline_config: config.pipeline.clone(),
            service,
            media,
            separator,
            mixer: AudioMixer::new(config.pipeline.background_attenuation_db),
        }
    }

    /// A run for `input_video` whose result lands in `output_dir` under the derived title.
    pub fn create_run(&self, input_video: &Path, output_dir: &Path) -> Result<PipelineRun> {
        self.create_run_to(input_video, self.output_path_for(input_video, output_dir))
    }

    /// A run for `input_video` writing its dubbed result to exactly `output_path`.
    pub fn create_run_to(&self, input_video: &Path, output_path: PathBuf) -> Result<PipelineRun> {
        PipelineRun::new(&self.pipeline_config.work_dir, input_video, output_path)
    }

    /// Where the dubbed version of `input_video` goes inside `output_dir`.
    pub fn output_path_for(&self, input_video: &Path, output_dir: &Path) -> PathBuf {
        output_dir.join(naming::output_file_name(
            input_video,
            &self.pipeline_config.output_suffix,
        ))
    }

    /// An empty run for invoking individual stages.
    pub fn scratch_run(&self) -> Result<PipelineRun> {
        PipelineRun::scratch(&self.pipeline_config.work_dir)
    }

    /// Execute every stage in order, stopping at the first failure.
    ///
    /// Artifacts written before a failure stay bound in `run`. A translation
    /// with no quoted segment ends the run as `Partial` without synthesis.
    pub async fn run(
        &self,
        run: &mut PipelineRun,
        progress: &ProgressBar,
    ) -> std::result::Result<RunStatus, StageError> {
        let span = info_span!("run", run_id = %run.id());
        self.drive(run, progress).instrument(span).await
    }

    async fn drive(
        &self,
        run: &mut PipelineRun,
        progress: &ProgressBar,
    ) -> std::result::Result<RunStatus, StageError> {
        info!(
            "Starting run in {} for {}",
            run.run_dir().display(),
            run.input_video().map(|p| p.display().to_string()).unwrap_or_default()
        );
        run.set_status(RunStatus::Running);

        for stage in Stage::ALL {
            if stage == Stage::Synthesize && run.speech_text().is_none_or(|s| s.trim().is_empty()) {
                info!("No quoted speech segment; skipping synthesis, mixing and remux");
                for skipped in &Stage::ALL[stage.index()..] {
                    run.record(*skipped, StageOutcome::Skipped, 0);
                }
                let status = RunStatus::Partial {
                    reason: NO_SPEECH_SEGMENT.to_string(),
                };
                run.set_status(status.clone());
                progress.finish_with_message(status.to_string());
                return Ok(status);
            }

            if stage == Stage::MixBackground && !run.store.has(ArtifactRole::BackgroundTrack) {
                warn!("No background track; remuxing speech without it");
                run.record(stage, StageOutcome::Skipped, 0);
                continue;
            }

            progress.set_message(stage.to_string());
            if let Err(e) = self.run_stage(run, stage).await {
                error!("Run aborted: {}", e);
                run.set_status(RunStatus::Failed {
                    stage: e.stage,
                    cause: e.source.to_string(),
                });
                progress.abandon_with_message(format!("failed at {}", e.stage));
                return Err(e);
            }
        }

        run.set_status(RunStatus::Completed);
        progress.finish_with_message("completed");
        info!("Run completed");
        Ok(RunStatus::Completed)
    }

    /// Execute a single stage against `run`.
    ///
    /// Declared inputs are checked before any collaborator is called. On
    /// success the stage's output replaces any earlier binding for its role.
    /// May be called again after a failure as long as the inputs are still bound.
    pub async fn run_stage(
        &self,
        run: &mut PipelineRun,
        stage: Stage,
    ) -> std::result::Result<Option<Artifact>, StageError> {
        let started = Instant::now();
        info!("Stage {} starting", stage);

        let result = match run.store.require(stage.inputs()) {
            Ok(()) => self.execute(run, stage).await,
            Err(e) => Err(e),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(path) => {
                run.record(stage, StageOutcome::Succeeded, elapsed_ms);
                info!("Stage {} finished in {} ms", stage, elapsed_ms);

                Ok(stage.output().zip(path).map(|(role, path)| {
                    run.store.put(role, path.clone(), Some(stage));
                    Artifact {
                        role,
                        path,
                        produced_by: Some(stage),
                    }
                }))
            }
            Err(source) => {
                run.record(stage, StageOutcome::Failed, elapsed_ms);
                Err(StageError::new(stage, source))
            }
        }
    }

    async fn execute(&self, run: &mut PipelineRun, stage: Stage) -> Result<Option<PathBuf>> {
        let path = match stage {
            Stage::ExtractAudio => self.extract_audio(run).await?,
            Stage::SeparateBackground => self.separate_background(run).await?,
            Stage::Transcribe => self.transcribe(run).await?,
            Stage::GrammarCorrectEnglish => self.correct_english(run).await?,
            Stage::Translate => self.translate(run).await?,
            Stage::OptimizeForSpeech => self.optimize_for_speech(run).await?,
            Stage::SelectSpeech => {
                self.select_speech(run).await?;
                return Ok(None);
            }
            Stage::Synthesize => self.synthesize(run).await?,
            Stage::ReconcileDuration => self.reconcile_duration(run)?,
            Stage::MixBackground => self.mix_background(run)?,
            Stage::Remux => self.remux(run).await?,
        };
        Ok(Some(path))
    }

    async fn extract_audio(&self, run: &PipelineRun) -> Result<PathBuf> {
        let video = run.store.get(ArtifactRole::SourceVideo)?;
        let audio = run.store.path_for(ArtifactRole::SourceAudio);
        self.media.extract_audio(video, &audio).await?;
        Ok(audio)
    }

    async fn separate_background(&self, run: &PipelineRun) -> Result<PathBuf> {
        let audio = run.store.get(ArtifactRole::SourceAudio)?;
        let out_dir = run.run_dir().join("separation");

        let stem = self.separator.separate_background(audio, &out_dir).await?;
        if !stem.exists() {
            return Err(DubError::ArtifactNotFound(stem));
        }

        let background = run.store.path_for(ArtifactRole::BackgroundTrack);
        tokio::fs::copy(&stem, &background).await?;
        Ok(background)
    }

    async fn transcribe(&self, run: &mut PipelineRun) -> Result<PathBuf> {
        let audio = run.store.get(ArtifactRole::SourceAudio)?.to_path_buf();

        let duration_ms = match probe_duration_ms(&audio) {
            Ok(ms) => Some(ms),
            Err(e) => {
                warn!("Could not measure {}: {}", audio.display(), e);
                None
            }
        };
        let selected = select_transcription_model(
            duration_ms,
            self.pipeline_config.short_form_max_secs,
            &self.service_config,
            run.transcription_model.as_deref(),
        );

        let transcript = self.service.transcribe(&audio, &selected.name).await?;
        run.selected_model = Some(selected);
        info!("Transcript has {} characters", transcript.chars().count());

        self.store_text(run, Stage::Transcribe, ArtifactRole::Transcript, "", transcript)
            .await
    }

    async fn correct_english(&self, run: &mut PipelineRun) -> Result<PathBuf> {
        let stage = Stage::GrammarCorrectEnglish;
        let input = read_text(run, ArtifactRole::Transcript).await?;

        let reply = self
            .service
            .chat(&prompts::english_grammar(&input), &self.service_config.chat_model)
            .await;
        let output = empty_on_no_content(stage, reply)?;

        self.store_text(run, stage, ArtifactRole::Transcript, &input, output)
            .await
    }

    async fn translate(&self, run: &mut PipelineRun) -> Result<PathBuf> {
        let stage = Stage::Translate;
        let input = read_text(run, ArtifactRole::Transcript).await?;

        let reply = self
            .service
            .translate(
                &input,
                &self.service_config.source_language,
                &self.service_config.target_language,
                &self.service_config.translation_model,
            )
            .await;
        let output = empty_on_no_content(stage, reply)?;

        self.store_text(run, stage, ArtifactRole::Translation, &input, output)
            .await
    }

    async fn optimize_for_speech(&self, run: &mut PipelineRun) -> Result<PathBuf> {
        let stage = Stage::OptimizeForSpeech;
        let input = read_text(run, ArtifactRole::Translation).await?;

        let reply = self
            .service
            .chat(&prompts::arabic_speech_rewrite(&input), &self.service_config.chat_model)
            .await;
        let output = empty_on_no_content(stage, reply)?;

        self.store_text(run, stage, ArtifactRole::Translation, &input, output)
            .await
    }

    async fn select_speech(&self, run: &mut PipelineRun) -> Result<()> {
        let text = read_text(run, ArtifactRole::Translation).await?;
        let speech = SpeechSelector::select(&text);

        if speech.is_empty() {
            info!("Translation contains no quoted segment");
        } else {
            info!("Selected {} characters for synthesis", speech.chars().count());
        }
        run.speech_text = Some(speech);
        Ok(())
    }

    async fn synthesize(&self, run: &mut PipelineRun) -> Result<PathBuf> {
        let speech = match run.speech_text.clone() {
            Some(speech) => speech,
            None => SpeechSelector::select(&read_text(run, ArtifactRole::Translation).await?),
        };
        if speech.trim().is_empty() {
            return Err(DubError::Validation(NO_SPEECH_SEGMENT.to_string()));
        }

        let bytes = self
            .service
            .synthesize_speech(
                &speech,
                &self.service_config.tts_model,
                &self.service_config.tts_voice,
            )
            .await?;

        // The service picks the container; decode it to WAV before anything reads it.
        let reply = run.run_dir().join(SPEECH_REPLY_FILE);
        tokio::fs::write(&reply, &bytes).await?;
        info!("Received {} bytes of synthesized speech", bytes.len());

        let path = run.store.path_for(ArtifactRole::SynthesizedSpeech);
        self.media.normalize_audio(&reply, &path).await?;
        Ok(path)
    }

    fn reconcile_duration(&self, run: &PipelineRun) -> Result<PathBuf> {
        let reference_ms = probe_duration_ms(run.store.get(ArtifactRole::SourceAudio)?)?;
        let speech = AudioTrack::from_wav(
            run.store.get(ArtifactRole::SynthesizedSpeech)?,
            TrackSource::Synthesized,
        )?;

        let aligned = DurationReconciler::reconcile(speech, reference_ms);
        let path = run.store.path_for(ArtifactRole::AlignedSpeech);
        aligned.write_wav(&path)?;
        Ok(path)
    }

    fn mix_background(&self, run: &PipelineRun) -> Result<PathBuf> {
        let background = AudioTrack::from_wav(
            run.store.get(ArtifactRole::BackgroundTrack)?,
            TrackSource::Background,
        )?;
        let speech = AudioTrack::from_wav(
            run.store.get(ArtifactRole::AlignedSpeech)?,
            TrackSource::Synthesized,
        )?;

        let mixed = self.mixer.mix(&background, &speech)?;
        let path = run.store.path_for(ArtifactRole::MixedSpeech);
        mixed.write_wav(&path)?;
        Ok(path)
    }

    async fn remux(&self, run: &PipelineRun) -> Result<PathBuf> {
        let video = run.store.get(ArtifactRole::SourceVideo)?;
        let audio = if run.store.has(ArtifactRole::MixedSpeech) {
            run.store.get(ArtifactRole::MixedSpeech)?
        } else {
            run.store.get(ArtifactRole::AlignedSpeech)?
        };
        let output = run.output_path().map(Path::to_path_buf).ok_or_else(|| {
            DubError::Validation("run has no output path for the final video".to_string())
        })?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        self.media.remux(video, audio, &output).await?;
        if !output.exists() {
            return Err(DubError::ArtifactNotFound(output));
        }
        Ok(output)
    }

    /// Apply the stage's empty-result policy, then write the text to `role`'s file.
    async fn store_text(
        &self,
        run: &mut PipelineRun,
        stage: Stage,
        role: ArtifactRole,
        input: &str,
        output: String,
    ) -> Result<PathBuf> {
        let kind = TextKind::for_stage(stage)
            .ok_or_else(|| DubError::Validation(format!("{} does not produce text", stage)))?;

        let (text, fell_back) = run
            .text
            .advance(kind, input, output, EmptyPolicy::for_stage(stage));
        if fell_back {
            warn!("{} returned empty text; keeping the previous text", stage);
        }

        let path = run.store.path_for(role);
        tokio::fs::write(&path, text).await?;
        Ok(path)
    }
}

async fn read_text(run: &PipelineRun, role: ArtifactRole) -> Result<String> {
    let path = run.store.get(role)?;
    Ok(tokio::fs::read_to_string(path).await?)
}

/// An empty-content reply counts as empty text for stages that fall back.
fn empty_on_no_content(stage: Stage, reply: Result<String>) -> Result<String> {
    match reply {
        Err(e) if e.is_empty_response() && EmptyPolicy::for_stage(stage) == EmptyPolicy::FallBackToPrevious => {
            warn!("{}: {}", stage, e);
            Ok(String::new())
        }
        other => other,
    }
}
