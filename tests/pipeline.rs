use std::path::Path;
use std::sync::{Arc, Mutex};

use assert_fs::prelude::*;
use async_trait::async_trait;
use indicatif::ProgressBar;

use dubar::artifact::ArtifactRole;
use dubar::audio::{probe_duration_ms, AudioTrack, TrackSource};
use dubar::config::Config;
use dubar::error::{DubError, RemoteCause, Result};
use dubar::media::{FakeMediaProcessor, FakeSeparator};
use dubar::pipeline::{PipelineOrchestrator, RunStatus, Stage, StageOutcome};
use dubar::service::{ChatMessage, SpeechService};

/// Answers every call from fixed text and logs which endpoints were hit.
struct ScriptedService {
    optimized_arabic: String,
    speech_ms: u64,
    fail_translation: bool,
    calls: Mutex<Vec<&'static str>>,
}

impl ScriptedService {
    fn new(optimized_arabic: &str) -> Self {
        Self {
            optimized_arabic: optimized_arabic.to_string(),
            speech_ms: 700,
            fail_translation: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechService for ScriptedService {
    async fn chat(&self, messages: &[ChatMessage], _model: &str) -> Result<String> {
        self.calls.lock().unwrap().push("chat");
        if messages[0].content == "You are a helpful assistant." {
            Ok("Welcome to the show.".to_string())
        } else {
            Ok(self.optimized_arabic.clone())
        }
    }

    async fn transcribe(&self, audio_path: &Path, _model: &str) -> Result<String> {
        self.calls.lock().unwrap().push("transcribe");
        assert!(audio_path.exists());
        Ok("welcome to the show".to_string())
    }

    async fn translate(&self, _text: &str, _src: &str, _tgt: &str, _model: &str) -> Result<String> {
        self.calls.lock().unwrap().push("translate");
        if self.fail_translation {
            return Err(DubError::remote(Some(500), RemoteCause::ServerError, "translation down"));
        }
        Ok("مرحبا بكم في البرنامج".to_string())
    }

    async fn synthesize_speech(&self, _text: &str, _model: &str, _voice: &str) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push("synthesize_speech");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tts.wav");
        AudioTrack::silent(self.speech_ms, 22050, 1, TrackSource::Synthesized)?.write_wav(&path)?;
        Ok(std::fs::read(path)?)
    }
}

struct Setup {
    temp: assert_fs::TempDir,
    media: Arc<FakeMediaProcessor>,
    orchestrator: PipelineOrchestrator,
}

fn setup(service: Arc<ScriptedService>, source_ms: u64) -> Setup {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("input/Interview.mp4").write_binary(b"not really a video").unwrap();

    let mut config = Config::default();
    config.pipeline.work_dir = temp.path().join("work");

    let media = Arc::new(FakeMediaProcessor::new(source_ms));
    let orchestrator =
        PipelineOrchestrator::new(&config, service, media.clone(), Arc::new(FakeSeparator::new()));

    Setup {
        temp,
        media,
        orchestrator,
    }
}

#[tokio::test]
async fn dubbing_a_video_end_to_end() {
    let service = Arc::new(ScriptedService::new("يقول المذيع «مرحبا بكم» للجمهور"));
    let s = setup(service.clone(), 1500);
    let input = s.temp.child("input/Interview.mp4");
    let output_dir = s.temp.child("output");

    let mut run = s.orchestrator.create_run(input.path(), output_dir.path()).unwrap();
    let status = s.orchestrator.run(&mut run, &ProgressBar::hidden()).await.unwrap();

    assert_eq!(status, RunStatus::Completed);
    assert!(output_dir.child("Interview - arabic dub.mp4").path().is_file());

    let report = run.report();
    assert_eq!(report.speech_text.as_deref(), Some("مرحبا بكم"));
    assert_eq!(report.stages.len(), Stage::ALL.len());
    assert!(report.stages.iter().all(|r| r.outcome == StageOutcome::Succeeded));

    // speech padded to the 1.5 s source, mixed over the background
    let mixed = run.artifacts().get(ArtifactRole::MixedSpeech).unwrap();
    assert_eq!(probe_duration_ms(mixed).unwrap(), 1500);

    assert_eq!(
        service.calls(),
        vec!["transcribe", "chat", "translate", "chat", "synthesize_speech"]
    );
    assert!(run.run_dir().starts_with(s.temp.path().join("work/runs")));
}

#[tokio::test]
async fn translation_failure_keeps_earlier_artifacts() {
    let mut scripted = ScriptedService::new("«نص»");
    scripted.fail_translation = true;
    let service = Arc::new(scripted);
    let s = setup(service.clone(), 1000);
    let input = s.temp.child("input/Interview.mp4");

    let mut run = s
        .orchestrator
        .create_run(input.path(), s.temp.child("output").path())
        .unwrap();
    let err = s
        .orchestrator
        .run(&mut run, &ProgressBar::hidden())
        .await
        .unwrap_err();

    assert_eq!(err.stage, Stage::Translate);
    assert!(err.to_string().starts_with("translate: "));
    assert_eq!(service.calls(), vec!["transcribe", "chat", "translate"]);

    let transcript = run.artifacts().get(ArtifactRole::Transcript).unwrap();
    assert_eq!(std::fs::read_to_string(transcript).unwrap(), "Welcome to the show.");
    assert!(!run.artifacts().has(ArtifactRole::Translation));
    assert_eq!(run.outcome(Stage::OptimizeForSpeech), None);
}

#[tokio::test]
async fn failed_stage_can_be_rerun_in_isolation() {
    let mut scripted = ScriptedService::new("«نص»");
    scripted.fail_translation = true;
    let s = setup(Arc::new(scripted), 1000);
    let input = s.temp.child("input/Interview.mp4");

    let mut run = s
        .orchestrator
        .create_run(input.path(), s.temp.child("output").path())
        .unwrap();
    let _ = s.orchestrator.run(&mut run, &ProgressBar::hidden()).await;

    // earlier stages re-run safely against the artifacts they already produced
    let audio = s
        .orchestrator
        .run_stage(&mut run, Stage::ExtractAudio)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(audio.path, run.run_dir().join("source_audio.wav"));
    assert_eq!(s.media.calls().len(), 2);
}

#[tokio::test]
async fn concurrent_runs_do_not_share_paths() {
    let service = Arc::new(ScriptedService::new("«واحد» و«اثنان»"));
    let s = setup(service, 800);
    let input = s.temp.child("input/Interview.mp4");
    let out_a = s.temp.child("out-a");
    let out_b = s.temp.child("out-b");

    let mut a = s.orchestrator.create_run(input.path(), out_a.path()).unwrap();
    let mut b = s.orchestrator.create_run(input.path(), out_b.path()).unwrap();

    let bar_a = ProgressBar::hidden();
    let bar_b = ProgressBar::hidden();
    let (ra, rb) = tokio::join!(
        s.orchestrator.run(&mut a, &bar_a),
        s.orchestrator.run(&mut b, &bar_b),
    );

    assert_eq!(ra.unwrap(), RunStatus::Completed);
    assert_eq!(rb.unwrap(), RunStatus::Completed);
    assert_ne!(
        a.artifacts().get(ArtifactRole::SourceAudio).unwrap(),
        b.artifacts().get(ArtifactRole::SourceAudio).unwrap()
    );
    assert_eq!(a.speech_text(), Some("واحد اثنان"));
}
