use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use tracing::{debug, info};

use crate::config::ServiceConfig;
use crate::error::{DubError, RemoteCause, Result};
use super::types::{
    audio_mime_type, ChatMessage, ChatRequest, ChatResponse, SpeechRequest, TranslationRequest,
    TranslationResponse,
};
use super::SpeechService;

/// HTTP client for the Fanar speech/language API.
pub struct FanarClient {
    client: Client,
    base_url: String,
    api_key: String,
    chat_max_tokens: u32,
    request_timeout: Duration,
    transcription_timeout: Duration,
}

impl FanarClient {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let api_key = config.resolve_api_key()?;

        let client = Client::builder()
            .user_agent(concat!("dubar/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            chat_max_tokens: config.chat_max_tokens,
            request_timeout: config.request_timeout(),
            transcription_timeout: config.transcription_timeout(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    fn map_send_error(operation: &str, timeout: Duration, e: reqwest::Error) -> DubError {
        if e.is_timeout() {
            DubError::Timeout {
                operation: operation.to_string(),
                after: timeout,
            }
        } else {
            DubError::Http(e)
        }
    }

    /// Turn a non-2xx response into a `RemoteService` error carrying the body.
    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(DubError::remote(
            Some(status.as_u16()),
            RemoteCause::from_status(status.as_u16()),
            body,
        ))
    }
}

#[async_trait]
impl SpeechService for FanarClient {
    async fn chat(&self, messages: &[ChatMessage], model: &str) -> Result<String> {
        let url = self.url("chat/completions");
        debug!("Sending chat request to: {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model,
                messages,
                max_tokens: self.chat_max_tokens,
            })
            .send()
            .await
            .map_err(|e| Self::map_send_error("chat", self.request_timeout, e))?;
        let response = Self::check_status(response).await?;
        let status = response.status().as_u16();

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                DubError::remote(Some(status), RemoteCause::EmptyResponse, "no choices found in response")
            })
    }

    async fn transcribe(&self, audio_path: &Path, model: &str) -> Result<String> {
        if !audio_path.exists() {
            return Err(DubError::ArtifactNotFound(audio_path.to_path_buf()));
        }

        let bytes = tokio::fs::read(audio_path).await?;
        info!("Uploading {} bytes for transcription with {}", bytes.len(), model);

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_string());
        let mime = audio_mime_type(audio_path.extension().and_then(|e| e.to_str()));
        let part = Part::bytes(bytes).file_name(file_name).mime_str(mime)?;
        let form = Form::new().text("model", model.to_string()).part("file", part);

        let url = self.url("audio/transcriptions");
        debug!("Sending transcription request to: {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .timeout(self.transcription_timeout)
            .send()
            .await
            .map_err(|e| Self::map_send_error("transcription", self.transcription_timeout, e))?;
        let response = Self::check_status(response).await?;

        let body: serde_json::Value = response.json().await.map_err(|e| {
            Self::map_send_error("transcription", self.transcription_timeout, e)
        })?;

        // Some responses carry the text elsewhere; keep the raw payload rather than lose it.
        match body.get("text").and_then(|t| t.as_str()) {
            Some(text) if !text.is_empty() => Ok(text.to_string()),
            _ => Ok(body.to_string()),
        }
    }

    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
        model: &str,
    ) -> Result<String> {
        let url = self.url("translations");
        debug!("Sending translation request to: {}", url);

        let request = TranslationRequest::new(model, text, source_lang, target_lang);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::map_send_error("translation", self.request_timeout, e))?;
        let response = Self::check_status(response).await?;
        let status = response.status().as_u16();

        let parsed: TranslationResponse = response.json().await?;
        match parsed.text {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(DubError::remote(
                Some(status),
                RemoteCause::EmptyResponse,
                "no translated text found in response",
            )),
        }
    }

    async fn synthesize_speech(&self, text: &str, model: &str, voice: &str) -> Result<Vec<u8>> {
        let url = self.url("audio/speech");
        debug!("Sending speech request to: {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&SpeechRequest {
                model,
                input: text,
                voice,
            })
            .send()
            .await
            .map_err(|e| Self::map_send_error("speech synthesis", self.request_timeout, e))?;
        let response = Self::check_status(response).await?;

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn client(request_timeout_secs: u64) -> FanarClient {
        let mut config = Config::default().service;
        config.api_key = Some("test-key".to_string());
        config.base_url = "http://localhost:9/v1/".to_string();
        config.request_timeout_secs = request_timeout_secs;
        FanarClient::new(&config).unwrap()
    }

    #[test]
    fn test_client_keeps_configured_timeouts() {
        let client = client(45);
        assert_eq!(client.request_timeout, Duration::from_secs(45));
        assert_eq!(client.transcription_timeout, Duration::from_secs(300));
        assert_eq!(client.chat_max_tokens, 1000);
        assert_eq!(client.url("audio/speech"), "http://localhost:9/v1/audio/speech");
    }

    #[tokio::test]
    async fn test_missing_audio_file_is_reported_before_upload() {
        let err = client(1)
            .transcribe(Path::new("/nonexistent/dubar-audio.wav"), "Fanar-Aura-STT-1")
            .await
            .unwrap_err();
        assert!(matches!(err, DubError::ArtifactNotFound(_)));
    }
}
