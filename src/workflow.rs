use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::artifact::ArtifactRole;
use crate::config::Config;
use crate::error::{DubError, Result};
use crate::media::{BackgroundSeparator, MediaProcessor, MediaProcessorFactory};
use crate::naming;
use crate::pipeline::prompts::ASSISTANT_SYSTEM;
use crate::pipeline::{PipelineOrchestrator, PipelineRun, RunReport, Stage};
use crate::service::{ChatMessage, SpeechService, SpeechServiceFactory};
use crate::speech::SpeechSelector;

const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "mov", "mkv", "webm", "avi"];

/// Outcome of a directory batch.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub reports: Vec<RunReport>,
    /// Videos whose run could not be created at all
    pub rejected: Vec<(PathBuf, String)>,
}

/// Command-level entry points over the pipeline.
pub struct Workflow {
    config: Config,
    orchestrator: Arc<PipelineOrchestrator>,
    service: Arc<dyn SpeechService>,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let service = SpeechServiceFactory::create_service(&config.service)?;
        let media = MediaProcessorFactory::create_processor(config.media.clone());
        let separator = MediaProcessorFactory::create_separator(config.separator.clone());

        Ok(Self::with_collaborators(config, service, media, separator))
    }

    pub fn with_collaborators(
        config: Config,
        service: Arc<dyn SpeechService>,
        media: Arc<dyn MediaProcessor>,
        separator: Arc<dyn BackgroundSeparator>,
    ) -> Self {
        let orchestrator = Arc::new(PipelineOrchestrator::new(
            &config,
            service.clone(),
            media,
            separator,
        ));

        Self {
            config,
            orchestrator,
            service,
        }
    }

    /// Dub one video. A failed stage is reported in the returned report's
    /// status rather than as an error, so its artifacts can still be listed.
    pub async fn process_single_file<P: AsRef<Path>>(
        &self,
        input_path: P,
        output_dir: Option<&Path>,
        stt_model: Option<String>,
    ) -> Result<RunReport> {
        let input_path = input_path.as_ref();
        info!("Processing single file: {}", input_path.display());

        let output_dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => input_path
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| DubError::Config("Cannot determine output directory".to_string()))?,
        };
        fs::create_dir_all(&output_dir).await?;

        let run = self
            .orchestrator
            .create_run(input_path, &output_dir)?
            .with_transcription_model(stt_model);

        Ok(dub(&self.orchestrator, run, spinner(input_path)).await)
    }

    /// Dub every video under `input_dir`, at most `jobs` at a time.
    pub async fn process_directory<P: AsRef<Path>>(
        &self,
        input_dir: P,
        output_dir: Option<&Path>,
        jobs: Option<usize>,
    ) -> Result<BatchSummary> {
        let input_dir = input_dir.as_ref();
        info!("Processing directory: {}", input_dir.display());

        if !input_dir.is_dir() {
            return Err(DubError::Validation(format!(
                "{} is not a directory",
                input_dir.display()
            )));
        }

        let output_dir = output_dir.unwrap_or(input_dir).to_path_buf();
        fs::create_dir_all(&output_dir).await?;

        let videos = find_videos(input_dir);
        let jobs = jobs.unwrap_or(self.config.pipeline.max_concurrent_runs).max(1);
        info!("Found {} video files to process ({} at a time)", videos.len(), jobs);

        let semaphore = Arc::new(Semaphore::new(jobs));
        let progress = MultiProgress::new();
        let mut tasks = JoinSet::new();
        let mut summary = BatchSummary::default();
        let mut claimed = HashSet::new();

        for video in videos {
            // Titles repeat across extensions and subdirectories; number the later ones.
            let output_path = naming::claim_unique(
                self.orchestrator.output_path_for(&video, &output_dir),
                &mut claimed,
            );

            // Every run gets its own id and run directory before any work starts.
            let run = match self.orchestrator.create_run_to(&video, output_path) {
                Ok(run) => run,
                Err(e) => {
                    warn!("Skipping {}: {}", video.display(), e);
                    summary.rejected.push((video, e.to_string()));
                    continue;
                }
            };

            let bar = progress.add(spinner(&video));
            let orchestrator = self.orchestrator.clone();
            let semaphore = semaphore.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                dub(&orchestrator, run, bar).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => summary.reports.push(report),
                Err(e) => warn!("Run task aborted: {}", e),
            }
        }

        Ok(summary)
    }

    /// Extract a video's audio track to `output_path`.
    pub async fn extract_audio(&self, input_path: &Path, output_path: &Path) -> Result<()> {
        let mut run = self.orchestrator.scratch_run()?;
        run.bind(ArtifactRole::SourceVideo, input_path);

        let audio = self.single_stage(&mut run, Stage::ExtractAudio).await?;
        copy_out(&audio, output_path).await
    }

    pub async fn transcribe_audio(
        &self,
        input_path: &Path,
        output_path: &Path,
        model: Option<String>,
    ) -> Result<()> {
        let mut run = self.orchestrator.scratch_run()?.with_transcription_model(model);
        run.bind(ArtifactRole::SourceAudio, input_path);

        let transcript = self.single_stage(&mut run, Stage::Transcribe).await?;
        copy_out(&transcript, output_path).await
    }

    pub async fn translate_text(&self, input_path: &Path, output_path: &Path) -> Result<()> {
        let mut run = self.orchestrator.scratch_run()?;
        run.bind(ArtifactRole::Transcript, input_path);

        let translation = self.single_stage(&mut run, Stage::Translate).await?;
        copy_out(&translation, output_path).await
    }

    /// Synthesize speech for a text file; with `quoted_only`, only its quoted segments.
    pub async fn speak(&self, input_path: &Path, output_path: &Path, quoted_only: bool) -> Result<()> {
        let text = fs::read_to_string(input_path).await?;
        let speech = if quoted_only {
            SpeechSelector::select(&text)
        } else {
            text.trim().to_string()
        };
        if speech.is_empty() {
            return Err(DubError::Validation(format!(
                "{} has no text to speak",
                input_path.display()
            )));
        }

        let mut run = self.orchestrator.scratch_run()?;
        run.bind(ArtifactRole::Translation, input_path);
        run.set_speech_text(speech);

        let audio = self.single_stage(&mut run, Stage::Synthesize).await?;
        copy_out(&audio, output_path).await
    }

    /// Line-based chat with the configured model, keeping the conversation history.
    pub async fn chat(&self) -> Result<()> {
        let model = &self.config.service.chat_model;
        let mut history = vec![ChatMessage::system(ASSISTANT_SYSTEM)];
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        println!("Chatting with {}. Type 'quit' or 'exit' to end the conversation.", model);
        loop {
            print!("\nYou: ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
                break;
            }

            history.push(ChatMessage::user(line));
            match self.service.chat(&history, model).await {
                Ok(reply) => {
                    println!("\n{}: {}", model, reply);
                    history.push(ChatMessage::assistant(reply));
                }
                Err(e) => {
                    history.pop();
                    eprintln!("\nError: {}", e);
                }
            }
        }

        println!("\nGoodbye!");
        Ok(())
    }

    async fn single_stage(&self, run: &mut PipelineRun, stage: Stage) -> Result<PathBuf> {
        let artifact = self
            .orchestrator
            .run_stage(run, stage)
            .await
            .map_err(|e| e.source)?;

        artifact
            .map(|a| a.path)
            .ok_or_else(|| DubError::Validation(format!("{} produced no artifact", stage)))
    }
}

/// Availability of each external tool, as (name, version or error).
pub async fn check_tools(config: &Config) -> Vec<(&'static str, Result<String>)> {
    let media = MediaProcessorFactory::create_processor(config.media.clone());
    let separator = MediaProcessorFactory::create_separator(config.separator.clone());
    vec![
        ("ffmpeg", media.check_availability().await),
        ("demucs", separator.check_availability().await),
    ]
}

async fn dub(orchestrator: &PipelineOrchestrator, mut run: PipelineRun, progress: ProgressBar) -> RunReport {
    if let Err(e) = orchestrator.run(&mut run, &progress).await {
        warn!("Run {} failed: {}", run.id(), e);
    }
    run.report()
}

fn spinner(video: &Path) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {prefix}: {msg}") {
        bar.set_style(style);
    }
    bar.set_prefix(
        video
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn find_videos(input_dir: &Path) -> Vec<PathBuf> {
    let mut videos: Vec<PathBuf> = WalkDir::new(input_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        })
        .map(|e| e.into_path())
        .collect();
    videos.sort();
    videos
}

async fn copy_out(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::copy(from, to).await?;
    info!("Wrote {}", to.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{FakeMediaProcessor, FakeSeparator};
    use crate::pipeline::RunStatus;
    use crate::service::MockSpeechService;
    use assert_fs::prelude::*;

    fn workflow(work: &Path, service: MockSpeechService) -> Workflow {
        let mut config = Config::default();
        config.pipeline.work_dir = work.join("work");
        Workflow::with_collaborators(
            config,
            Arc::new(service),
            Arc::new(FakeMediaProcessor::new(1000)),
            Arc::new(FakeSeparator::new()),
        )
    }

    #[test]
    fn test_find_videos_filters_by_extension() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.mp4").touch().unwrap();
        temp.child("nested/b.MKV").touch().unwrap();
        temp.child("notes.txt").touch().unwrap();

        let videos = find_videos(temp.path());
        assert_eq!(videos.len(), 2);
        assert!(videos[0].ends_with("a.mp4"));
    }

    #[tokio::test]
    async fn test_batch_isolates_failures_per_run() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("in/one.mp4").write_binary(b"1").unwrap();
        temp.child("in/two.mp4").write_binary(b"2").unwrap();

        let mut service = MockSpeechService::new();
        service.expect_transcribe().times(2).returning(|_, _| {
            Err(DubError::remote(Some(401), crate::error::RemoteCause::Unauthorized, "bad key"))
        });

        let workflow = workflow(temp.path(), service);
        let summary = workflow
            .process_directory(temp.child("in").path(), Some(temp.child("out").path()), Some(2))
            .await
            .unwrap();

        assert_eq!(summary.reports.len(), 2);
        assert!(summary.rejected.is_empty());
        assert!(summary
            .reports
            .iter()
            .all(|r| matches!(r.status, RunStatus::Failed { stage: Stage::Transcribe, .. })));
        assert_ne!(summary.reports[0].run_dir, summary.reports[1].run_dir);
    }

    #[tokio::test]
    async fn test_batch_gives_same_titled_videos_distinct_outputs() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("in/talk.mp4").write_binary(b"mp4").unwrap();
        temp.child("in/talk.mov").write_binary(b"mov").unwrap();

        let speech = {
            let path = temp.child("speech.wav");
            crate::audio::AudioTrack::silent(400, 24000, 1, crate::audio::TrackSource::Synthesized)
                .unwrap()
                .write_wav(path.path())
                .unwrap();
            std::fs::read(path.path()).unwrap()
        };

        let mut service = MockSpeechService::new();
        service
            .expect_transcribe()
            .returning(|_, _| Ok("hello".to_string()));
        service.expect_chat().returning(|_, _| Ok("«مرحبا»".to_string()));
        service
            .expect_translate()
            .returning(|_, _, _, _| Ok("مرحبا".to_string()));
        service
            .expect_synthesize_speech()
            .times(2)
            .returning(move |_, _, _| Ok(speech.clone()));

        let workflow = workflow(temp.path(), service);
        let out = temp.child("out");
        let summary = workflow
            .process_directory(temp.child("in").path(), Some(out.path()), Some(2))
            .await
            .unwrap();

        assert_eq!(summary.reports.len(), 2);
        assert!(summary.reports.iter().all(|r| r.status == RunStatus::Completed));

        let outputs: HashSet<PathBuf> = summary
            .reports
            .iter()
            .filter_map(|r| r.final_video.clone())
            .collect();
        assert_eq!(
            outputs,
            HashSet::from([
                out.path().join("talk - arabic dub.mp4"),
                out.path().join("talk - arabic dub (2).mp4"),
            ])
        );
        assert!(outputs.iter().all(|p| p.is_file()));
    }

    #[tokio::test]
    async fn test_speak_quoted_only_without_quotes_is_rejected() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.child("text.txt");
        input.write_str("لا اقتباس هنا").unwrap();

        let mut service = MockSpeechService::new();
        service.expect_synthesize_speech().never();

        let workflow = workflow(temp.path(), service);
        let err = workflow
            .speak(input.path(), temp.child("out.wav").path(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, DubError::Validation(_)));
    }

    #[tokio::test]
    async fn test_translate_text_writes_output() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.child("en.txt");
        input.write_str("Good morning.").unwrap();

        let mut service = MockSpeechService::new();
        service
            .expect_translate()
            .returning(|_, _, _, _| Ok("صباح الخير".to_string()));

        let workflow = workflow(temp.path(), service);
        let output = temp.child("ar.txt");
        tokio_test::assert_ok!(workflow.translate_text(input.path(), output.path()).await);
        output.assert("صباح الخير");
    }
}
