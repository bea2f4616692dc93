// Remote speech and language service
//
// One client covers chat completion, transcription, translation and
// text-to-speech; the pipeline talks to it through `SpeechService`.

pub mod fanar;
pub mod types;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub use fanar::FanarClient;
pub use types::{ChatMessage, ChatRole};

use crate::config::ServiceConfig;
use crate::error::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Chat completion; returns the first choice's content.
    async fn chat(&self, messages: &[ChatMessage], model: &str) -> Result<String>;

    /// Speech-to-text on an audio file.
    async fn transcribe(&self, audio_path: &Path, model: &str) -> Result<String>;

    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
        model: &str,
    ) -> Result<String>;

    /// Text-to-speech; returns the encoded audio bytes (WAV).
    async fn synthesize_speech(&self, text: &str, model: &str, voice: &str) -> Result<Vec<u8>>;
}

pub struct SpeechServiceFactory;

impl SpeechServiceFactory {
    pub fn create_service(config: &ServiceConfig) -> Result<Arc<dyn SpeechService>> {
        Ok(Arc::new(FanarClient::new(config)?))
    }
}
