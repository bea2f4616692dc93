use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{DubError, Result};

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_chat_max_tokens() -> u32 {
    1000
}

fn default_max_concurrent_runs() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub media: MediaConfig,
    pub separator: SeparatorConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the speech/language service
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// API key; takes precedence over `api_key_env` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model used for grammar correction and chat
    pub chat_model: String,
    /// Completion length limit sent with every chat request
    #[serde(default = "default_chat_max_tokens")]
    pub chat_max_tokens: u32,
    /// Speech-to-text model for short clips
    pub short_form_stt_model: String,
    /// Speech-to-text model for long-form audio
    pub long_form_stt_model: String,
    /// Machine translation model
    pub translation_model: String,
    /// Text-to-speech model
    pub tts_model: String,
    /// Text-to-speech voice
    pub tts_voice: String,
    pub source_language: String,
    pub target_language: String,
    /// Upper bound for a single transcription request
    pub transcription_timeout_secs: u64,
    /// Upper bound for every other request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Audio codec for the remuxed output
    pub audio_codec: String,
    /// Audio bit rate for the remuxed output
    pub audio_bitrate: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeparatorConfig {
    /// Path to the demucs binary
    pub binary_path: String,
    /// Stem passed to `--two-stems`
    pub two_stems: String,
    /// File name of the non-vocal stem demucs writes
    pub background_stem: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root directory for run directories and logs
    pub work_dir: PathBuf,
    /// Longest source audio (seconds) still sent to the short-form model
    pub short_form_max_secs: f64,
    /// Attenuation applied to the background track before overlay
    pub background_attenuation_db: f64,
    /// Upper bound on runs executing at once in batch mode
    #[serde(default = "default_max_concurrent_runs")]
    pub max_concurrent_runs: usize,
    /// Appended to the video title to form the output file name
    pub output_suffix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                base_url: "https://api.fanar.qa/v1".to_string(),
                api_key_env: "FANAR_API_KEY".to_string(),
                api_key: None,
                chat_model: "Fanar".to_string(),
                chat_max_tokens: default_chat_max_tokens(),
                short_form_stt_model: "Fanar-Aura-STT-1".to_string(),
                long_form_stt_model: "Fanar-Aura-STT-LF-1".to_string(),
                translation_model: "Fanar-Shaheen-MT-1".to_string(),
                tts_model: "Fanar-Aura-TTS-1".to_string(),
                tts_voice: "default".to_string(),
                source_language: "en".to_string(),
                target_language: "ar".to_string(),
                transcription_timeout_secs: 300,
                request_timeout_secs: default_request_timeout_secs(),
            },
            media: MediaConfig {
                binary_path: "ffmpeg".to_string(),
                audio_codec: "aac".to_string(),
                audio_bitrate: "192k".to_string(),
            },
            separator: SeparatorConfig {
                binary_path: "demucs".to_string(),
                two_stems: "vocals".to_string(),
                background_stem: "no_vocals.wav".to_string(),
            },
            pipeline: PipelineConfig {
                work_dir: PathBuf::from(".dubar"),
                short_form_max_secs: 30.0,
                background_attenuation_db: 10.0,
                max_concurrent_runs: default_max_concurrent_runs(),
                output_suffix: " - arabic dub".to_string(),
            },
        }
    }
}

impl ServiceConfig {
    /// Resolve the API key from the inline value or the configured environment variable.
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.to_string());
        }

        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(DubError::Config(format!(
                "API key not found: set {} or service.api_key",
                self.api_key_env
            ))),
        }
    }

    pub fn transcription_timeout(&self) -> Duration {
        Duration::from_secs(self.transcription_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DubError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| DubError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DubError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| DubError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.short_form_max_secs <= 0.0 {
            return Err(DubError::Config(
                "pipeline.short_form_max_secs must be positive".to_string(),
            ));
        }
        if self.pipeline.background_attenuation_db < 0.0 {
            return Err(DubError::Config(
                "pipeline.background_attenuation_db must not be negative".to_string(),
            ));
        }
        if self.pipeline.max_concurrent_runs == 0 {
            return Err(DubError::Config(
                "pipeline.max_concurrent_runs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
